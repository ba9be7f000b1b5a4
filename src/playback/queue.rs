//! Switch queue
//!
//! At most one pending video request, last-write-wins. A request either
//! short-circuits (already showing), waits for the end-of-clip handler, or
//! asks the caller to commit right away. There is no timer-based eviction:
//! a deferred request sits until the current clip ends or something
//! overwrites it.

use crate::playback::player::VideoId;
use crate::playback::state::PlaybackState;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct SwitchOptions {
    pub return_to_previous: bool,
    pub immediate: bool,
}

impl SwitchOptions {
    pub fn immediate() -> Self {
        Self {
            return_to_previous: false,
            immediate: true,
        }
    }

    pub fn deferred() -> Self {
        Self::default()
    }

    pub fn with_return(mut self) -> Self {
        self.return_to_previous = true;
        self
    }
}

/// A pending switch, waiting to be committed
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchRequest {
    pub video: VideoId,
    pub return_to_previous: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueOutcome {
    /// The clip is already showing (or already being switched to)
    AlreadyShowing,
    /// Queued; the end-of-clip handler will pick it up
    Deferred,
    /// Queued; the caller should commit now
    CommitNow,
}

#[derive(Debug, Default)]
pub struct SwitchQueue {
    pending: Option<SwitchRequest>,
}

impl SwitchQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a switch request. `current_video` is updated when a commit is
    /// decided, so an equal id means the clip is showing or already on its
    /// way in; that covers redundant idle restarts too.
    pub fn request(
        &mut self,
        state: &PlaybackState,
        video: &str,
        opts: SwitchOptions,
    ) -> QueueOutcome {
        if video == state.current_video {
            debug!("Already showing '{}', ignoring request", video);
            return QueueOutcome::AlreadyShowing;
        }

        if let Some(old) = &self.pending {
            debug!("Overwriting queued '{}' with '{}'", old.video, video);
        }
        self.pending = Some(SwitchRequest {
            video: video.to_string(),
            return_to_previous: opts.return_to_previous,
        });

        if opts.immediate {
            QueueOutcome::CommitNow
        } else {
            QueueOutcome::Deferred
        }
    }

    /// Take the pending request; cleared exactly once when a commit begins
    pub fn take(&mut self) -> Option<SwitchRequest> {
        self.pending.take()
    }

    pub fn peek(&self) -> Option<&SwitchRequest> {
        self.pending.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_none()
    }

    pub fn clear(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> PlaybackState {
        PlaybackState::new("idle.mp4", "idle.mp4")
    }

    #[test]
    fn test_request_current_video_is_noop() {
        let mut q = SwitchQueue::new();
        let s = state();
        let outcome = q.request(&s, "idle.mp4", SwitchOptions::immediate());
        assert_eq!(outcome, QueueOutcome::AlreadyShowing);
        assert!(q.is_empty());
    }

    #[test]
    fn test_request_queues_and_reports_mode() {
        let mut q = SwitchQueue::new();
        let s = state();
        assert_eq!(
            q.request(&s, "jump.mp4", SwitchOptions::deferred()),
            QueueOutcome::Deferred
        );
        assert_eq!(q.peek().unwrap().video, "jump.mp4");

        let mut q2 = SwitchQueue::new();
        assert_eq!(
            q2.request(&s, "jump.mp4", SwitchOptions::immediate()),
            QueueOutcome::CommitNow
        );
    }

    #[test]
    fn test_second_request_overwrites_first() {
        let mut q = SwitchQueue::new();
        let s = state();
        q.request(&s, "jump.mp4", SwitchOptions::deferred());
        q.request(&s, "circle.mp4", SwitchOptions::deferred());
        assert_eq!(q.peek().unwrap().video, "circle.mp4");
        assert_eq!(q.take().unwrap().video, "circle.mp4");
        assert!(q.take().is_none());
    }

    #[test]
    fn test_return_flag_carried_on_request() {
        let mut q = SwitchQueue::new();
        let s = state();
        q.request(&s, "wave.mp4", SwitchOptions::immediate().with_return());
        assert!(q.peek().unwrap().return_to_previous);
    }
}
