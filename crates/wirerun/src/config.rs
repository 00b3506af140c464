//! Server configuration.

/// Settings for one server context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerConfig {
    /// First handle issued by each object manager.
    pub first_handle: u64,
    /// Update interval reported by a newly created volume meter.
    pub meter_interval_ms: u32,
}

impl ServerConfig {
    pub const DEFAULT_FIRST_HANDLE: u64 = 1001;
    pub const DEFAULT_METER_INTERVAL_MS: u32 = 33;

    pub fn with_first_handle(mut self, first_handle: u64) -> Self {
        self.first_handle = first_handle;
        self
    }

    pub fn with_meter_interval_ms(mut self, meter_interval_ms: u32) -> Self {
        self.meter_interval_ms = meter_interval_ms;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            first_handle: Self::DEFAULT_FIRST_HANDLE,
            meter_interval_ms: Self::DEFAULT_METER_INTERVAL_MS,
        }
    }
}
