//! # Server Context
//!
//! Everything a handler may touch, owned explicitly and passed to the dispatcher by reference.
//! There is no process-wide state: two contexts in one process are fully independent.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::engine::Engine;
use crate::engine::Meter;
use crate::engine::Source;
use crate::handles::ObjectManager;

pub struct ServerContext {
    pub engine: Engine,
    pub sources: Arc<ObjectManager<Source>>,
    pub meters: Arc<ObjectManager<Meter>>,
    pub config: ServerConfig,
}

impl ServerContext {
    /// Builds an engine and subscribes one handle table per object kind to its lifecycle signals.
    pub fn new(config: ServerConfig) -> Self {
        let engine = Engine::new();
        let sources = Arc::new(ObjectManager::new(config.first_handle));
        let meters = Arc::new(ObjectManager::new(config.first_handle));
        engine.subscribe(sources.clone());
        engine.subscribe(meters.clone());
        Self { engine, sources, meters, config }
    }
}

impl Default for ServerContext {
    fn default() -> Self {
        Self::new(ServerConfig::default())
    }
}
