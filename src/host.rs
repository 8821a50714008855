//! Headless stand-in for a browser's frame and visibility APIs.

use std::sync::Arc;

use minigame_loop::{FrameHandle, FrameScheduler, VisibilitySource, WatchHandle};
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct DisplayState {
    next_handle: u64,
    pending: Option<FrameHandle>,
    watcher: Option<WatchHandle>,
    frames_requested: u64,
}

/// A fake display shared between the game loop (which requests frames and
/// subscribes to visibility) and the driver (which delivers them).
#[derive(Debug, Clone, Default)]
pub struct SimulatedDisplay {
    state: Arc<Mutex<DisplayState>>,
}

impl SimulatedDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the outstanding frame request, if any, so it can be delivered.
    pub fn take_frame(&self) -> Option<FrameHandle> {
        self.state.lock().pending.take()
    }

    /// Whether anything is listening for visibility changes.
    pub fn has_watcher(&self) -> bool {
        self.state.lock().watcher.is_some()
    }

    pub fn frames_requested(&self) -> u64 {
        self.state.lock().frames_requested
    }
}

impl FrameScheduler for SimulatedDisplay {
    fn request_frame(&mut self) -> FrameHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        state.frames_requested += 1;
        let handle = FrameHandle(state.next_handle);
        state.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let mut state = self.state.lock();
        if state.pending == Some(handle) {
            state.pending = None;
        }
    }
}

impl VisibilitySource for SimulatedDisplay {
    fn subscribe(&mut self) -> WatchHandle {
        let mut state = self.state.lock();
        state.next_handle += 1;
        let handle = WatchHandle(state.next_handle);
        state.watcher = Some(handle);
        handle
    }

    fn unsubscribe(&mut self, handle: WatchHandle) {
        let mut state = self.state.lock();
        if state.watcher == Some(handle) {
            state.watcher = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requests_are_taken_once() {
        let mut display = SimulatedDisplay::new();
        let handle = display.request_frame();
        assert_eq!(display.take_frame(), Some(handle));
        assert_eq!(display.take_frame(), None);
        assert_eq!(display.frames_requested(), 1);
    }

    #[test]
    fn cancel_only_drops_matching_request() {
        let mut display = SimulatedDisplay::new();
        let old = display.request_frame();
        let current = display.request_frame();
        display.cancel_frame(old);
        assert_eq!(display.take_frame(), Some(current));

        let handle = display.request_frame();
        display.cancel_frame(handle);
        assert_eq!(display.take_frame(), None);
    }

    #[test]
    fn watcher_lifecycle() {
        let mut display = SimulatedDisplay::new();
        let watch = display.subscribe();
        assert!(display.clone().has_watcher());
        display.unsubscribe(watch);
        assert!(!display.has_watcher());
    }
}
