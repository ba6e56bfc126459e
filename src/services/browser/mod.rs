//! Browser-side contract: responsibility and boundaries
//!
//! This module describes ONLY the primitives the browser offers for pointer lock
//! (request, release, current target query, change notifications, page-level
//! pointer events). It MUST NOT decide whether a capture succeeded: confirmation,
//! watchdog and cleanup live in `capture_session`.

mod simulated;
mod r#trait;

pub use self::r#trait::{PageListener, PointerLockBackend};
pub use self::simulated::{create_simulated_browser, LockPolicy, SimulatedBrowser};
