use std::panic::AssertUnwindSafe;
use std::panic::catch_unwind;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::thread;

use tokio::sync::mpsc;

use wirepack::Value;
use wirerpc::CallError;

use super::Source;
use super::payload_f32;
use super::payload_u32;
use super::payload_u64;
use crate::controller::Controller;
use crate::endpoint::Endpoint;
use crate::engine::ChannelLevel;
use crate::engine::FaderType;
use crate::query::PeriodicQuery;

type LevelsCallback = Arc<dyn Fn(&[ChannelLevel]) + Send + Sync>;

/// Identifies one registered callback on one meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackId(u64);

/// Parses a `VolMeter.Query` payload: `[UInt32 n, (f32, f32, f32) × n]`.
pub fn decode_levels(payload: &[Value]) -> Result<Vec<ChannelLevel>, CallError> {
    let channels = payload_u32(payload, 0)? as usize;
    let expected = 1 + channels * 3;
    if payload.len() != expected {
        return Err(CallError::Malformed(format!(
            "level payload for {} channels must hold {} values, found {}",
            channels,
            expected,
            payload.len()
        )));
    }
    (0..channels)
        .map(|ch| -> Result<ChannelLevel, CallError> {
            let base = 1 + ch * 3;
            Ok(ChannelLevel {
                magnitude: payload_f32(payload, base)?,
                peak: payload_f32(payload, base + 1)?,
                input_peak: payload_f32(payload, base + 2)?,
            })
        })
        .collect()
}

/// The periodic query and the thread that hands its results to callbacks.
struct Stream {
    query: PeriodicQuery,
    dispatch: thread::JoinHandle<()>,
}

impl Stream {
    fn stop(mut self) {
        // Stopping the query drops the sender, which ends the dispatch thread after it drains.
        self.query.stop();
        if self.dispatch.join().is_err() {
            tracing::warn!("level dispatch thread panicked");
        }
    }
}

/// A remote volume meter.
pub struct VolMeter {
    controller: Arc<Controller>,
    handle: u64,
    interval_ms: Arc<AtomicU32>,
    callbacks: Arc<Mutex<Vec<(CallbackId, LevelsCallback)>>>,
    next_callback: AtomicU64,
    stream: Mutex<Option<Stream>>,
}

impl VolMeter {
    pub fn create(controller: &Arc<Controller>, fader_type: FaderType) -> Result<Self, CallError> {
        let payload = controller.call(Endpoint::VolMeterCreate, &[Value::Int32(fader_type as i32)])?;
        let handle = payload_u64(&payload, 0)?;
        let interval = payload_u32(&payload, 1)?;
        Ok(Self {
            controller: controller.clone(),
            handle,
            interval_ms: Arc::new(AtomicU32::new(interval)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            next_callback: AtomicU64::new(1),
            stream: Mutex::new(None),
        })
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    fn call(&self, endpoint: Endpoint, extra: &[Value]) -> Result<Vec<Value>, CallError> {
        let mut args = Vec::with_capacity(1 + extra.len());
        args.push(Value::UInt64(self.handle));
        args.extend_from_slice(extra);
        self.controller.call(endpoint, &args)
    }

    pub fn attach(&self, source: &Source) -> Result<(), CallError> {
        self.call(Endpoint::VolMeterAttach, &[Value::UInt64(source.handle())]).map(drop)
    }

    pub fn detach(&self) -> Result<(), CallError> {
        self.call(Endpoint::VolMeterDetach, &[]).map(drop)
    }

    pub fn update_interval(&self) -> Result<u32, CallError> {
        let interval = payload_u32(&self.call(Endpoint::VolMeterGetUpdateInterval, &[])?, 0)?;
        self.interval_ms.store(interval, Ordering::Relaxed);
        Ok(interval)
    }

    /// Changes the interval on the server and for a running stream.
    pub fn set_update_interval(&self, interval_ms: u32) -> Result<u32, CallError> {
        let payload = self.call(Endpoint::VolMeterSetUpdateInterval, &[Value::UInt32(interval_ms)])?;
        let interval = payload_u32(&payload, 0)?;
        self.interval_ms.store(interval, Ordering::Relaxed);
        Ok(interval)
    }

    /// One-shot read of the current levels.
    pub fn query(&self) -> Result<Vec<ChannelLevel>, CallError> {
        decode_levels(&self.call(Endpoint::VolMeterQuery, &[])?)
    }

    /// Registers `callback` for level updates. The first callback starts streaming.
    ///
    /// Callbacks run on a dedicated thread and must not call `remove_callback` or `destroy`.
    pub fn add_callback<F>(&self, callback: F) -> Result<CallbackId, CallError>
    where
        F: Fn(&[ChannelLevel]) + Send + Sync + 'static,
    {
        self.call(Endpoint::VolMeterAddCallback, &[])?;

        let id = CallbackId(self.next_callback.fetch_add(1, Ordering::Relaxed));
        let callback: LevelsCallback = Arc::new(callback);
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner).push((id, callback));

        let mut stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
        if stream.is_none() {
            *stream = Some(self.start_stream());
        }
        Ok(id)
    }

    /// Unregisters a callback. The last one stops streaming.
    ///
    /// Returns `Ok(false)` without contacting the server if `id` was not registered.
    pub fn remove_callback(&self, id: CallbackId) -> Result<bool, CallError> {
        let now_empty = {
            let mut callbacks = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner);
            let before = callbacks.len();
            callbacks.retain(|(existing, _)| *existing != id);
            if callbacks.len() == before {
                return Ok(false);
            }
            callbacks.is_empty()
        };

        if now_empty {
            self.stop_stream_if_idle();
        }
        self.call(Endpoint::VolMeterRemoveCallback, &[])?;
        Ok(true)
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }

    /// Stops streaming and destroys the meter on the server.
    pub fn destroy(self) -> Result<(), CallError> {
        self.stop_stream();
        self.call(Endpoint::VolMeterDestroy, &[]).map(drop)
    }

    fn start_stream(&self) -> Stream {
        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<Value>>();

        let controller = self.controller.clone();
        let handle = self.handle;
        let query = PeriodicQuery::start(
            self.interval_ms.clone(),
            move || controller.call(Endpoint::VolMeterQuery, &[Value::UInt64(handle)]),
            tx,
        );

        let callbacks = self.callbacks.clone();
        let dispatch = thread::spawn(move || {
            while let Some(payload) = rx.blocking_recv() {
                let levels = match decode_levels(&payload) {
                    Ok(levels) => levels,
                    Err(e) => {
                        tracing::warn!(handle, error = %e, "discarding level update");
                        continue;
                    }
                };
                let snapshot: Vec<LevelsCallback> = callbacks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .iter()
                    .map(|(_, cb)| cb.clone())
                    .collect();
                for cb in snapshot {
                    if catch_unwind(AssertUnwindSafe(|| cb(&levels))).is_err() {
                        tracing::warn!(handle, "level callback panicked");
                    }
                }
            }
        });

        tracing::debug!(handle, "level stream started");
        Stream { query, dispatch }
    }

    fn stop_stream(&self) {
        let stream = self.stream.lock().unwrap_or_else(PoisonError::into_inner).take();
        self.finish_stream(stream);
    }

    /// Stops streaming only if no callback is registered by the time the stream slot is held.
    ///
    /// `add_callback` pushes before it inspects the slot, so a callback added concurrently either
    /// keeps this stream alive or finds the slot empty and starts a new one.
    fn stop_stream_if_idle(&self) {
        let stream = {
            let mut slot = self.stream.lock().unwrap_or_else(PoisonError::into_inner);
            let idle = self.callbacks.lock().unwrap_or_else(PoisonError::into_inner).is_empty();
            if idle { slot.take() } else { None }
        };
        self.finish_stream(stream);
    }

    /// Joins outside the slot lock; the dispatch thread may still be running callbacks.
    fn finish_stream(&self, stream: Option<Stream>) {
        if let Some(stream) = stream {
            stream.stop();
            tracing::debug!(handle = self.handle, "level stream stopped");
        }
    }
}

impl Drop for VolMeter {
    fn drop(&mut self) {
        self.stop_stream();
    }
}

impl std::fmt::Debug for VolMeter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolMeter")
            .field("handle", &self.handle)
            .field("interval_ms", &self.interval_ms.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
