//! Playback pipeline
//!
//! The switch queue, the dual-slot crossfade deck, and the end-of-clip
//! rules. The controller wires them to recognition and conversation.

pub mod player;
pub mod policy;
pub mod queue;
pub mod state;
pub mod transition;

pub use player::{PlayerEvent, PlayerEventKind, SlotId, SourceRef, VideoId, VideoPlayer};
pub use policy::{end_of_clip_action, EndedAction};
pub use queue::{QueueOutcome, SwitchOptions, SwitchQueue, SwitchRequest};
pub use state::PlaybackState;
pub use transition::{AbortReason, BeginOutcome, CrossfadeDeck, DeckConfig, DeckEvent};
