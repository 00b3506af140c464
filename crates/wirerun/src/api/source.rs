use std::sync::Arc;

use wirepack::Value;
use wirerpc::CallError;

use super::payload_bool;
use super::payload_string;
use super::payload_u32;
use crate::controller::Controller;
use crate::endpoint::Endpoint;

/// A remote engine source.
#[derive(Clone)]
pub struct Source {
    controller: Arc<Controller>,
    handle: u64,
}

impl Source {
    pub fn from_handle(controller: Arc<Controller>, handle: u64) -> Self {
        Self { controller, handle }
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

    pub fn id(&self) -> Result<String, CallError> {
        payload_string(&self.call(Endpoint::SourceGetId, &[])?, 0)
    }

    pub fn name(&self) -> Result<String, CallError> {
        payload_string(&self.call(Endpoint::SourceGetName, &[])?, 0)
    }

    /// Renames the source and returns the name the engine kept.
    pub fn set_name(&self, name: &str) -> Result<String, CallError> {
        payload_string(&self.call(Endpoint::SourceSetName, &[Value::from(name)])?, 0)
    }

    pub fn settings(&self) -> Result<String, CallError> {
        payload_string(&self.call(Endpoint::SourceGetSettings, &[])?, 0)
    }

    pub fn update(&self, settings: &str) -> Result<String, CallError> {
        payload_string(&self.call(Endpoint::SourceUpdate, &[Value::from(settings)])?, 0)
    }

    pub fn flags(&self) -> Result<u32, CallError> {
        payload_u32(&self.call(Endpoint::SourceGetFlags, &[])?, 0)
    }

    pub fn set_flags(&self, flags: u32) -> Result<u32, CallError> {
        payload_u32(&self.call(Endpoint::SourceSetFlags, &[Value::from(flags)])?, 0)
    }

    pub fn muted(&self) -> Result<bool, CallError> {
        payload_bool(&self.call(Endpoint::SourceGetMuted, &[])?, 0)
    }

    pub fn set_muted(&self, muted: bool) -> Result<bool, CallError> {
        payload_bool(&self.call(Endpoint::SourceSetMuted, &[Value::Int32(muted as i32)])?, 0)
    }

    pub fn enabled(&self) -> Result<bool, CallError> {
        payload_bool(&self.call(Endpoint::SourceGetEnabled, &[])?, 0)
    }

    pub fn set_enabled(&self, enabled: bool) -> Result<bool, CallError> {
        payload_bool(&self.call(Endpoint::SourceSetEnabled, &[Value::Int32(enabled as i32)])?, 0)
    }

    pub fn status(&self) -> Result<u32, CallError> {
        payload_u32(&self.call(Endpoint::SourceGetStatus, &[])?, 0)
    }

    /// Removes the source from every scene. The handle stays valid until `release`.
    pub fn remove(&self) -> Result<(), CallError> {
        self.call(Endpoint::SourceRemove, &[]).map(drop)
    }

    /// Drops the engine's reference; the handle stops resolving afterwards.
    pub fn release(self) -> Result<(), CallError> {
        self.call(Endpoint::SourceRelease, &[]).map(drop)
    }
}

impl std::fmt::Debug for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Source").field("handle", &self.handle).finish_non_exhaustive()
    }
}
