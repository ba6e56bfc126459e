//! CaptureSession: responsibility and boundaries
//!
//! A session drives exactly one pointer capture lifecycle on top of the shared
//! `PointerEventHub` feeds: request, confirm-or-timeout, relay of motion deltas,
//! and termination by consumer cancellation, browser revocation or release gesture.
//! Retrying is the consumer's job: a failed session never restarts itself.

mod session;
mod state;
mod stream;


pub use self::session::{
    CaptureSession, CursorIcon, MotionItem, SessionConfig, SessionId, SessionRegistry, WindowMode,
};
pub(crate) use self::session::SessionSetup;
pub use self::state::{Effect, SessionEvent, SessionState, Transition};
pub use self::stream::MotionStream;
