//! Video player abstraction
//!
//! One logical player slot per implementation. Commands are synchronous;
//! the asynchronous completions (ready, playback started, clip ended,
//! failures) arrive as [`PlayerEvent`]s on the controller's event channel,
//! tagged with the slot they came from.

pub type VideoId = String;

/// Resolved clip source (path or URL)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRef(pub String);

impl SourceRef {
    pub fn new(source: impl Into<String>) -> Self {
        Self(source.into())
    }
}

/// Which of the two deck slots an event came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotId {
    A,
    B,
}

impl SlotId {
    pub fn index(self) -> usize {
        match self {
            SlotId::A => 0,
            SlotId::B => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            SlotId::A
        } else {
            SlotId::B
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerEvent {
    pub slot: SlotId,
    pub kind: PlayerEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEventKind {
    /// The loaded source is ready to play
    Ready,
    /// Playback actually started
    Started,
    /// The clip reached its natural end
    Ended,
    /// The source failed to load
    LoadFailed(String),
    /// Playback start was refused (e.g. an autoplay policy)
    PlayRejected(String),
}

/// One player slot. Implementations hold the event channel sender and
/// their own [`SlotId`], handed over at construction.
pub trait VideoPlayer: Send {
    fn load(&mut self, source: &SourceRef);

    fn play(&mut self);

    fn pause(&mut self);

    fn seek_to_start(&mut self);

    fn duration(&self) -> Option<f64>;

    fn set_visible(&mut self, visible: bool);
}
