//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - Master ref refresh: advances the cache epoch when upstream content changes

mod refresh;

pub use refresh::{spawn_refresh_task, Refresher};
