//! API shared state

use crate::actors::StorageHandle;
use crate::monitor::Monitor;

/// Shared state passed to all API handlers
#[derive(Clone)]
pub struct ApiState {
    /// Store, evaluator and settings behind the external operations
    pub monitor: Monitor,

    /// Handle to the storage actor, if persistence is enabled
    pub storage: Option<StorageHandle>,
}

impl ApiState {
    pub fn new(monitor: Monitor, storage: Option<StorageHandle>) -> Self {
        Self { monitor, storage }
    }
}
