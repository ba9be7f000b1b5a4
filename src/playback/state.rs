//! Playback state
//!
//! The handful of fields the switch queue, the deck, and the end-of-clip
//! rules coordinate through. `current_video` is updated the moment a
//! switch is decided, not when the crossfade finishes, which is what makes
//! rapid repeated requests for the same clip cheap no-ops.

use crate::playback::player::VideoId;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    pub current_video: VideoId,
    pub idle_video: VideoId,
    /// Set only when entering a return-to-previous clip; consumed once.
    pub previous_video: Option<VideoId>,
    /// True between "transition started" and "transition committed".
    pub is_switching: bool,
}

impl PlaybackState {
    pub fn new(default_video: impl Into<VideoId>, idle_video: impl Into<VideoId>) -> Self {
        Self {
            current_video: default_video.into(),
            idle_video: idle_video.into(),
            previous_video: None,
            is_switching: false,
        }
    }

    /// Reset for a configuration set switch
    pub fn reset(&mut self, default_video: impl Into<VideoId>, idle_video: impl Into<VideoId>) {
        self.current_video = default_video.into();
        self.idle_video = idle_video.into();
        self.previous_video = None;
        self.is_switching = false;
    }
}
