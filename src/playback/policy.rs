//! End-of-clip rules
//!
//! Decides what happens when the visible clip reaches its natural end.
//! The order is significant: an explicitly queued successor always beats
//! the return-to-previous hop and the idle fallback.

use crate::playback::player::VideoId;
use crate::playback::queue::SwitchQueue;
use crate::playback::state::PlaybackState;

#[derive(Debug, Clone, PartialEq)]
pub enum EndedAction {
    /// Rule 1: commit whatever is queued
    CommitQueued,
    /// Rule 2: the ended clip was return-to-previous; go back
    ReturnToPrevious(VideoId),
    /// Rule 3: the idle clip ended; restart it in place, no crossfade
    RestartInPlace,
    /// Rule 4: a one-shot clip ended with nothing queued; fall back to idle
    FallbackToIdle,
}

/// Evaluate the rules for a clip that just ended. Pure: the caller clears
/// `previous_video` when acting on `ReturnToPrevious`.
pub fn end_of_clip_action(
    ended_video: &str,
    ended_returns_to_previous: bool,
    state: &PlaybackState,
    queue: &SwitchQueue,
) -> EndedAction {
    if !queue.is_empty() {
        return EndedAction::CommitQueued;
    }
    if ended_returns_to_previous {
        if let Some(previous) = &state.previous_video {
            return EndedAction::ReturnToPrevious(previous.clone());
        }
    }
    if ended_video == state.idle_video {
        return EndedAction::RestartInPlace;
    }
    EndedAction::FallbackToIdle
}
