pub mod capture;
pub mod pointer;

pub use capture::{CaptureChange, CaptureTarget, ScreenPosition};
pub use pointer::{MotionDelta, PointerButton, PointerMove, PointerRelease};
