//! Actors driving the monitor
//!
//! Each actor runs as an independent tokio task and is controlled through a
//! cloneable handle.
//!
//! ```text
//!   SchedulerActor ──tick──▶ Monitor::record ──▶ SampleStore
//!                                 │
//!                                 ├── broadcast SampleEvent ──▶ StorageActor, WebSocket clients
//!                                 └── broadcast AlertTransition ──▶ WebSocket clients
//! ```
//!
//! ## Communication Patterns
//!
//! 1. **Commands**: each actor has an mpsc command channel
//! 2. **Events**: broadcast channels for fan-out
//! 3. **Request/Response**: oneshot channels carried inside commands

pub mod messages;
pub mod scheduler;
pub mod storage;

pub use messages::{SampleEvent, StorageStats};
pub use scheduler::SchedulerHandle;
pub use storage::StorageHandle;
