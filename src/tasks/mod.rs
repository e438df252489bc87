//! Background Tasks Module
//!
//! Contains background tasks owned by store instances.
//!
//! # Tasks
//! - Expiry sweep: Removes expired entries at a configured interval

mod gc;

pub use gc::{spawn_gc_task, GcHandle, MIN_GC_INTERVAL};
