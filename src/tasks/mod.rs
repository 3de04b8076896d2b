//! Background Tasks Module
//!
//! Contains background tasks that run periodically while caches are live.
//!
//! # Tasks
//! - Expiry sweep: removes expired cache entries at configured intervals,
//!   or early under memory pressure

mod sweep;

pub use sweep::{spawn_sweep_task, SweepHandle};
