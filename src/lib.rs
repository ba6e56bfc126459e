//! Exclusive relative-motion pointer capture on top of a browser-like backend.
//!
//! [`PointerLockService`] is the entry point: initialize it once, then create
//! capture sessions that yield motion deltas until the capture ends.

pub mod config;
pub mod error;
pub mod events;
pub mod services;
pub mod utils;

pub use config::Config;
pub use error::{PointerLockError, Result};
pub use events::{CaptureTarget, MotionDelta};
pub use services::{MotionStream, PointerLockService, SessionConfig};
