//! # Periodic Query
//!
//! A background thread that repeatedly issues a blocking query and forwards successful payloads
//! to a queue, for objects whose state must stream to the caller (e.g. audio level meters).
//!
//! ## Invariants
//! - **Latency Compensated**: the time a query took is subtracted from the next sleep, and the
//!   sleep never goes negative.
//! - **Resilient**: a failed query (connection down, object detached) is skipped; the loop keeps
//!   going. Only `stop` (or drop) ends it.
//! - **Prompt Stop**: `stop` wakes the thread out of its sleep and joins it.

use std::sync::Arc;
use std::sync::Condvar;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::mpsc;

use wirepack::Value;
use wirerpc::CallError;

/// Stop flag plus the condition variable the loop sleeps on.
type StopSignal = Arc<(Mutex<bool>, Condvar)>;

pub struct PeriodicQuery {
    stop: StopSignal,
    thread: Option<thread::JoinHandle<()>>,
}

impl PeriodicQuery {
    /// Starts polling `query` every `interval_ms` milliseconds.
    ///
    /// The interval is re-read each round, so changing it takes effect on the next sleep.
    /// The loop also ends if `sink`'s receiver is dropped.
    pub fn start<F>(interval_ms: Arc<AtomicU32>, mut query: F, sink: mpsc::UnboundedSender<Vec<Value>>) -> Self
    where
        F: FnMut() -> Result<Vec<Value>, CallError> + Send + 'static,
    {
        let stop: StopSignal = Arc::new((Mutex::new(false), Condvar::new()));
        let signal = stop.clone();

        let thread = thread::spawn(move || {
            loop {
                if stopped(&signal) {
                    break;
                }

                let started = Instant::now();
                match query() {
                    Ok(payload) => {
                        if sink.send(payload).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!(error = %e, "periodic query skipped"),
                }

                let interval = Duration::from_millis(interval_ms.load(Ordering::Relaxed).max(1) as u64);
                let wait = interval.saturating_sub(started.elapsed());
                if sleep_unless_stopped(&signal, wait) {
                    break;
                }
            }
        });

        Self { stop, thread: Some(thread) }
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Signals the thread and waits for it to exit. Idempotent.
    pub fn stop(&mut self) {
        {
            let (lock, cvar) = &*self.stop;
            *lock.lock().unwrap_or_else(PoisonError::into_inner) = true;
            cvar.notify_all();
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("periodic query thread panicked");
            }
        }
    }
}

impl Drop for PeriodicQuery {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stopped(signal: &StopSignal) -> bool {
    *signal.0.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sleeps for `wait`, returning early (and `true`) if stop was requested.
fn sleep_unless_stopped(signal: &StopSignal, wait: Duration) -> bool {
    let (lock, cvar) = &**signal;
    let guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
    let (guard, _timeout) = cvar
        .wait_timeout_while(guard, wait, |stop| !*stop)
        .unwrap_or_else(PoisonError::into_inner);
    *guard
}
