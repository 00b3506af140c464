//! # Engine Model
//!
//! A small stand-in for the media engine: it owns sources and volume meters and announces their
//! creation and destruction to lifecycle listeners.
//!
//! ## Lifecycle
//!
//! Handles are not managed by callers. `create_*` and `release_*`/`destroy_*` emit an
//! `EngineEvent` on the calling thread, after the engine's own lists are updated and unlocked,
//! and the server's `ObjectManager`s allocate or free handles in response.

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::PoisonError;
use std::sync::RwLock;
use std::sync::Weak;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use crate::handles::ObjectManager;

// ============================================================================
//  LEVELS
// ============================================================================

/// Audio levels of one channel, in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelLevel {
    pub magnitude: f32,
    pub peak: f32,
    pub input_peak: f32,
}

impl ChannelLevel {
    pub const SILENT: ChannelLevel = ChannelLevel {
        magnitude: f32::NEG_INFINITY,
        peak: f32::NEG_INFINITY,
        input_peak: f32::NEG_INFINITY,
    };
}

// ============================================================================
//  SOURCE
// ============================================================================

pub struct Source {
    id: String,
    name: Mutex<String>,
    settings: Mutex<String>,
    flags: AtomicU32,
    muted: AtomicBool,
    enabled: AtomicBool,
    removed: AtomicBool,
    levels: Mutex<Vec<ChannelLevel>>,
}

impl Source {
    pub const DEFAULT_CHANNELS: usize = 2;

    fn new(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: Mutex::new(name.to_string()),
            settings: Mutex::new("{}".to_string()),
            flags: AtomicU32::new(0),
            muted: AtomicBool::new(false),
            enabled: AtomicBool::new(true),
            removed: AtomicBool::new(false),
            levels: Mutex::new(vec![ChannelLevel::SILENT; Self::DEFAULT_CHANNELS]),
        }
    }

    /// The input kind this source was created from.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> String {
        self.name.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn set_name(&self, name: &str) {
        *self.name.lock().unwrap_or_else(PoisonError::into_inner) = name.to_string();
    }

    /// Opaque settings text. The engine stores it and hands it back unchanged.
    pub fn settings(&self) -> String {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn update(&self, settings: &str) {
        *self.settings.lock().unwrap_or_else(PoisonError::into_inner) = settings.to_string();
    }

    pub fn flags(&self) -> u32 {
        self.flags.load(Ordering::SeqCst)
    }

    pub fn set_flags(&self, flags: u32) {
        self.flags.store(flags, Ordering::SeqCst);
    }

    pub fn muted(&self) -> bool {
        self.muted.load(Ordering::SeqCst)
    }

    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }

    pub fn enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    /// Marks the source as removed from every scene. It stays alive until released.
    pub fn remove(&self) {
        self.removed.store(true, Ordering::SeqCst);
    }

    pub fn removed(&self) -> bool {
        self.removed.load(Ordering::SeqCst)
    }

    pub fn levels(&self) -> Vec<ChannelLevel> {
        self.levels.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Feeds new levels, as the audio thread would.
    pub fn set_levels(&self, levels: Vec<ChannelLevel>) {
        *self.levels.lock().unwrap_or_else(PoisonError::into_inner) = levels;
    }
}

// ============================================================================
//  METER
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaderType {
    Cubic,
    Iec,
    Log,
}

impl FaderType {
    pub fn from_i32(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(FaderType::Cubic),
            1 => Some(FaderType::Iec),
            2 => Some(FaderType::Log),
            _ => None,
        }
    }
}

/// Why a meter cannot produce levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeterError {
    Detached,
    SourceGone,
}

impl std::fmt::Display for MeterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Detached => write!(f, "VolMeter is not attached to a source."),
            Self::SourceGone => write!(f, "Attached source is no longer available."),
        }
    }
}

impl std::error::Error for MeterError {}

pub struct Meter {
    fader_type: FaderType,
    interval_ms: AtomicU32,
    source: Mutex<Option<Weak<Source>>>,
    callbacks: AtomicUsize,
}

impl Meter {
    fn new(fader_type: FaderType, interval_ms: u32) -> Self {
        Self {
            fader_type,
            interval_ms: AtomicU32::new(interval_ms),
            source: Mutex::new(None),
            callbacks: AtomicUsize::new(0),
        }
    }

    pub fn fader_type(&self) -> FaderType {
        self.fader_type
    }

    pub fn update_interval(&self) -> u32 {
        self.interval_ms.load(Ordering::SeqCst)
    }

    pub fn set_update_interval(&self, interval_ms: u32) {
        self.interval_ms.store(interval_ms, Ordering::SeqCst);
    }

    /// Attaches to `source`, replacing any previous attachment. The meter does not keep it alive.
    pub fn attach(&self, source: &Arc<Source>) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::downgrade(source));
    }

    pub fn detach(&self) {
        *self.source.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn source(&self) -> Result<Arc<Source>, MeterError> {
        let slot = self.source.lock().unwrap_or_else(PoisonError::into_inner);
        let weak = slot.as_ref().ok_or(MeterError::Detached)?;
        weak.upgrade().ok_or(MeterError::SourceGone)
    }

    /// Current levels of the attached source.
    pub fn levels(&self) -> Result<Vec<ChannelLevel>, MeterError> {
        let source = self.source()?;
        if source.removed() {
            return Err(MeterError::SourceGone);
        }
        Ok(source.levels())
    }

    pub fn add_callback(&self) {
        self.callbacks.fetch_add(1, Ordering::SeqCst);
    }

    /// Drops one callback registration. Never goes below zero.
    pub fn remove_callback(&self) {
        let _ = self
            .callbacks
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
    }

    pub fn callbacks(&self) -> usize {
        self.callbacks.load(Ordering::SeqCst)
    }
}

// ============================================================================
//  EVENTS
// ============================================================================

#[derive(Clone)]
pub enum EngineEvent {
    SourceCreated(Arc<Source>),
    SourceDestroyed(Arc<Source>),
    MeterCreated(Arc<Meter>),
    MeterDestroyed(Arc<Meter>),
}

/// Receives engine lifecycle signals on the thread that caused them.
pub trait LifecycleListener: Send + Sync {
    fn on_event(&self, event: &EngineEvent);
}

impl LifecycleListener for ObjectManager<Source> {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::SourceCreated(source) => {
                let handle = self.allocate(source.clone());
                tracing::debug!(handle, id = source.id(), "source handle allocated");
            }
            EngineEvent::SourceDestroyed(source) => {
                if let Some(handle) = self.free_object(source) {
                    tracing::debug!(handle, "source handle freed");
                }
            }
            _ => {}
        }
    }
}

impl LifecycleListener for ObjectManager<Meter> {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::MeterCreated(meter) => {
                let handle = self.allocate(meter.clone());
                tracing::debug!(handle, "meter handle allocated");
            }
            EngineEvent::MeterDestroyed(meter) => {
                if let Some(handle) = self.free_object(meter) {
                    tracing::debug!(handle, "meter handle freed");
                }
            }
            _ => {}
        }
    }
}

// ============================================================================
//  ENGINE
// ============================================================================

#[derive(Default)]
pub struct Engine {
    sources: Mutex<Vec<Arc<Source>>>,
    meters: Mutex<Vec<Arc<Meter>>>,
    listeners: RwLock<Vec<Arc<dyn LifecycleListener>>>,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: Arc<dyn LifecycleListener>) {
        self.listeners.write().unwrap_or_else(PoisonError::into_inner).push(listener);
    }

    fn emit(&self, event: EngineEvent) {
        let listeners = self.listeners.read().unwrap_or_else(PoisonError::into_inner).clone();
        for listener in listeners {
            listener.on_event(&event);
        }
    }

    pub fn create_source(&self, id: &str, name: &str) -> Arc<Source> {
        let source = Arc::new(Source::new(id, name));
        self.sources.lock().unwrap_or_else(PoisonError::into_inner).push(source.clone());
        self.emit(EngineEvent::SourceCreated(source.clone()));
        source
    }

    /// Drops the engine's reference. Returns false if the source was already released.
    pub fn release_source(&self, source: &Arc<Source>) -> bool {
        let released = take(&self.sources, source);
        if released {
            self.emit(EngineEvent::SourceDestroyed(source.clone()));
        }
        released
    }

    pub fn create_meter(&self, fader_type: FaderType, interval_ms: u32) -> Arc<Meter> {
        let meter = Arc::new(Meter::new(fader_type, interval_ms));
        self.meters.lock().unwrap_or_else(PoisonError::into_inner).push(meter.clone());
        self.emit(EngineEvent::MeterCreated(meter.clone()));
        meter
    }

    /// Drops the engine's reference. Returns false if the meter was already destroyed.
    pub fn destroy_meter(&self, meter: &Arc<Meter>) -> bool {
        let destroyed = take(&self.meters, meter);
        if destroyed {
            meter.detach();
            self.emit(EngineEvent::MeterDestroyed(meter.clone()));
        }
        destroyed
    }

    pub fn source_count(&self) -> usize {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn meter_count(&self) -> usize {
        self.meters.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

fn take<T>(list: &Mutex<Vec<Arc<T>>>, item: &Arc<T>) -> bool {
    let mut list = list.lock().unwrap_or_else(PoisonError::into_inner);
    match list.iter().position(|x| Arc::ptr_eq(x, item)) {
        Some(idx) => {
            list.swap_remove(idx);
            true
        }
        None => false,
    }
}
