pub mod browser;
pub mod capture_session;
pub mod event_hub;
pub mod pointer_lock;

pub use browser::{create_simulated_browser, PointerLockBackend, SimulatedBrowser};
pub use capture_session::{MotionStream, SessionConfig};
pub use event_hub::PointerEventHub;
pub use pointer_lock::PointerLockService;
