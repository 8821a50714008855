//! Capabilities the loop consumes from its host environment.
//!
//! The loop never sleeps or schedules anything itself. It asks the host for
//! the next display frame, and the host answers by calling
//! [`GameLoop::frame`](crate::GameLoop::frame) with the handle it returned and
//! the frame timestamp.

/// Identifies one outstanding frame request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameHandle(pub u64);

/// Per-display-frame callback scheduling, e.g. a browser's animation frame API.
pub trait FrameScheduler {
    /// Ask for one callback on the next display frame.
    fn request_frame(&mut self) -> FrameHandle;

    /// Withdraw a request made with [`request_frame`](Self::request_frame).
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Whether the host surface (tab, window) is currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Visible,
    Hidden,
}

/// Identifies a visibility subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchHandle(pub u64);

/// Source of visibility change notifications.
///
/// While subscribed, the host reports changes through
/// [`GameLoop::visibility_changed`](crate::GameLoop::visibility_changed).
pub trait VisibilitySource {
    fn subscribe(&mut self) -> WatchHandle;
    fn unsubscribe(&mut self, handle: WatchHandle);
}
