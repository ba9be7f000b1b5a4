//! Conversation fallback
//!
//! When no command claims a final recognition result, the utterance can be
//! handed to a remote LLM/TTS proxy. While a turn streams, the avatar
//! loops a dedicated talking clip; a successful command match interrupts
//! the turn before the new clip is requested — talking and command
//! playback are mutually exclusive.

pub mod http;

use crate::config::ConversationConfig;
use crate::error::AvatalkResult;
use crate::playback::player::VideoId;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Events streamed back from the remote proxy during a turn
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A text increment
    Delta(String),
    /// A structured directive: play this clip now
    TriggerVideo(VideoId),
    /// Terminal completion with the accumulated response text
    Done(String),
    /// Transport or proxy error; the turn is abandoned
    Error(String),
}

/// Cooperative cancellation handle for one streaming turn. Cancelling
/// stops the reader from acting on further data; it does not forcibly
/// abort the underlying connection.
#[derive(Debug, Clone, Default)]
pub struct TurnHandle {
    cancelled: Arc<AtomicBool>,
}

impl TurnHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

/// The remote chat/TTS proxy, seen from the client side
#[async_trait]
pub trait ConversationClient: Send {
    /// Start a streaming turn for the utterance. Events arrive on the
    /// channel the client was built with; the handle cancels the turn.
    fn send(&mut self, utterance: &str) -> AvatalkResult<TurnHandle>;

    /// Synthesize spoken audio for the final response text
    async fn synthesize(&self, text: &str) -> AvatalkResult<Vec<u8>>;
}

/// What an interrupt asks the controller to restore
#[derive(Debug, Clone, PartialEq)]
pub struct InterruptCleanup {
    pub restore_video: Option<VideoId>,
}

/// Arbitrates between command playback and conversation turns.
///
/// Owns the talking flag, the pre-conversation clip snapshot, and the
/// active turn handle. Playback and audio effects stay with the
/// controller; this component only decides and cancels.
#[derive(Debug, Default)]
pub struct ConversationBridge {
    cfg: Option<ConversationConfig>,
    talking: bool,
    pre_conversation_video: Option<VideoId>,
    active_turn: Option<TurnHandle>,
}

impl ConversationBridge {
    pub fn new(cfg: Option<ConversationConfig>) -> Self {
        Self {
            cfg,
            talking: false,
            pre_conversation_video: None,
            active_turn: None,
        }
    }

    /// Swap per-set configuration; any conversational state is dropped
    pub fn configure(&mut self, cfg: Option<ConversationConfig>) {
        if let Some(turn) = self.active_turn.take() {
            turn.cancel();
        }
        self.cfg = cfg;
        self.talking = false;
        self.pre_conversation_video = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.as_ref().map(|c| c.enabled).unwrap_or(false)
    }

    pub fn is_talking(&self) -> bool {
        self.talking
    }

    pub fn talking_video(&self) -> Option<&str> {
        self.cfg.as_ref().map(|c| c.talking_video.as_str())
    }

    /// Begin a turn for an unmatched utterance. Returns the talking clip
    /// to force into loop, or `None` when conversation cannot start
    /// (disabled, or a turn is already running).
    pub fn begin_turn(&mut self, current_video: &str) -> Option<VideoId> {
        if !self.is_enabled() || self.talking {
            return None;
        }
        let talking_video = self.cfg.as_ref()?.talking_video.clone();
        self.talking = true;
        self.pre_conversation_video = Some(current_video.to_string());
        info!("💬 Starting conversation turn (was showing '{}')", current_video);
        Some(talking_video)
    }

    /// Record the streaming handle for the turn just started
    pub fn set_turn(&mut self, handle: TurnHandle) {
        self.active_turn = Some(handle);
    }

    /// Normal completion: the synthesized speech finished playing
    pub fn end_turn(&mut self) -> Option<VideoId> {
        if !self.talking {
            return None;
        }
        self.talking = false;
        self.active_turn = None;
        let restore = self.pre_conversation_video.take();
        debug!("💬 Conversation turn finished, restoring {:?}", restore);
        restore
    }

    /// Interrupt the turn: cancel the stream and clear the talking flag.
    /// The caller stops spoken audio and applies the restore through the
    /// switch queue. Also used verbatim for transport-error cleanup so a
    /// failed turn can never leave the talking clip looping forever.
    pub fn interrupt(&mut self) -> InterruptCleanup {
        if let Some(turn) = self.active_turn.take() {
            turn.cancel();
        }
        let was_talking = self.talking;
        self.talking = false;
        let restore_video = self.pre_conversation_video.take();
        if was_talking {
            info!("✋ Conversation interrupted");
        }
        InterruptCleanup { restore_video }
    }
}
