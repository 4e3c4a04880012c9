//! Durable persistence for samples
//!
//! The in-memory [`crate::store::SampleStore`] is what the dashboard reads.
//! Backends here keep a longer history on disk and feed the store on startup.
//!
//! - [`sqlite::SqliteBackend`] (feature `storage-sqlite`): embedded database
//! - [`memory::MemoryBackend`]: bounded in-process buffer, for tests or when
//!   durability is not wanted

pub mod backend;
pub mod error;
pub mod memory;
pub mod restore;
pub mod schema;
#[cfg(feature = "storage-sqlite")]
pub mod sqlite;

pub use backend::{BackendStats, HealthStatus, QueryRange, StorageBackend};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryBackend;
pub use restore::recent_samples;
pub use schema::SampleRecord;
