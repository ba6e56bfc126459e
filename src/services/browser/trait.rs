use crate::error::Result;
use crate::events::{CaptureChange, CaptureTarget, PointerMove, PointerRelease, ScreenPosition};
use tokio::sync::broadcast;

/// Listener attached to a page-level event source. Stays attached for the page lifetime.
pub type PageListener<E> = Box<dyn Fn(E) + Send + Sync + 'static>;

/// Browser-side pointer lock primitives consumed by capture sessions.
///
/// Every call is best-effort on the browser side: a request may be silently ignored,
/// and capture may be revoked at any moment without consumer action. Implementations
/// only report what the browser reports; detection of silent failures belongs to
/// the capture session.
pub trait PointerLockBackend: Send + Sync {
    /// Ask the browser to capture the pointer for `target`.
    ///
    /// `Err` means the request failed synchronously (e.g. too soon after a release).
    /// `Ok` does not mean capture was granted.
    fn request_pointer_lock(&self, target: CaptureTarget) -> Result<()>;

    /// Release the current capture. May fail if capture is already gone.
    fn exit_pointer_lock(&self) -> Result<()>;

    /// The element the browser currently reports as holding capture.
    fn pointer_lock_element(&self) -> Option<CaptureTarget>;

    /// Subscribe to capture-change notifications.
    fn subscribe_lock_change(&self) -> broadcast::Receiver<CaptureChange>;

    /// Attach a page-level pointer move listener.
    fn add_pointer_move_listener(&self, listener: PageListener<PointerMove>);

    /// Attach a page-level pointer release listener.
    fn add_pointer_up_listener(&self, listener: PageListener<PointerRelease>);

    /// One-shot query of the browsing window position on screen.
    fn window_screen_position(&self) -> Result<ScreenPosition>;
}
