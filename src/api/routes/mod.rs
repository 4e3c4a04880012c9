//! Route handlers, one module per resource

pub mod alerts;
pub mod disks;
pub mod health;
pub mod metrics;
pub mod stats;
pub mod thresholds;
