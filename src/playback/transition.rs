//! Crossfade deck
//!
//! Two player slots, one visible ("active") and one being prepared
//! ("inactive"). A commit walks the inactive slot through load → ready →
//! play → visibility flip → fade interval → pause/rewind the old slot →
//! role swap. The walk is driven by player events and a fade timer
//! message, so the controller loop stays responsive the whole way.
//!
//! Only one commit may be in flight; the phase value is the guard and it
//! returns to `Idle` on every exit path, success or failure. An aborted
//! commit leaves the prior slot showing and the request is gone — the
//! queue was already drained when the commit was decided.

use crate::playback::player::{
    PlayerEvent, PlayerEventKind, SlotId, SourceRef, VideoId, VideoPlayer,
};
use std::collections::HashMap;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Crossfade tuning
#[derive(Debug, Clone, Copy)]
pub struct DeckConfig {
    pub fade: Duration,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            fade: Duration::from_millis(400),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Loading { video: VideoId },
    Starting { video: VideoId },
    Fading { video: VideoId },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginOutcome {
    /// The commit started; player events will drive it forward
    Accepted,
    /// Another commit is in flight
    Busy,
}

/// Why an in-flight commit was dropped
#[derive(Debug, Clone, PartialEq)]
pub enum AbortReason {
    Load(String),
    PlayRejected(String),
}

/// What the controller should do after feeding the deck an event
#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    /// Internal progress (or a stale event); nothing to do
    Ignored,
    /// Start the fade timer; deliver `on_fade_elapsed(generation)` after it
    ScheduleFade { generation: u64, after: Duration },
    /// The transition fully committed; roles are swapped
    Committed { video: VideoId },
    /// The commit was dropped; the prior slot is still showing
    Aborted { video: VideoId, reason: AbortReason },
}

pub struct CrossfadeDeck {
    slots: [Box<dyn VideoPlayer>; 2],
    /// Slot-video bookkeeping for logs and the initial clip
    slot_videos: [Option<VideoId>; 2],
    active: usize,
    phase: Phase,
    generation: u64,
    preloaded: HashMap<VideoId, SourceRef>,
    cfg: DeckConfig,
}

impl CrossfadeDeck {
    pub fn new(slot_a: Box<dyn VideoPlayer>, slot_b: Box<dyn VideoPlayer>, cfg: DeckConfig) -> Self {
        Self {
            slots: [slot_a, slot_b],
            slot_videos: [None, None],
            active: 0,
            phase: Phase::Idle,
            generation: 0,
            preloaded: HashMap::new(),
            cfg,
        }
    }

    pub fn active_slot(&self) -> SlotId {
        SlotId::from_index(self.active)
    }

    pub fn is_active_slot(&self, slot: SlotId) -> bool {
        slot.index() == self.active
    }

    pub fn is_switching(&self) -> bool {
        self.phase != Phase::Idle
    }

    /// Cache a resolved source so a later commit skips the fresh fetch
    pub fn preload(&mut self, video: &str, source: SourceRef) {
        self.preloaded.insert(video.to_string(), source);
    }

    /// Drop all cached sources (configuration set switch)
    pub fn invalidate_preloads(&mut self) {
        self.preloaded.clear();
    }

    /// Put the first clip on the active slot without a crossfade
    pub fn start_with(&mut self, video: &str, source: SourceRef) {
        info!("▶️ Starting with '{}'", video);
        let slot = &mut self.slots[self.active];
        slot.load(&source);
        slot.seek_to_start();
        slot.play();
        slot.set_visible(true);
        self.slot_videos[self.active] = Some(video.to_string());
    }

    /// Begin a commit toward `video`. `fresh` is used when the clip was
    /// never preloaded.
    pub fn begin(&mut self, video: &str, fresh: SourceRef) -> BeginOutcome {
        if self.phase != Phase::Idle {
            debug!("Deck busy ({:?}), deferring '{}'", self.phase, video);
            return BeginOutcome::Busy;
        }

        let source = self.preloaded.get(video).cloned().unwrap_or(fresh);
        let inactive = 1 - self.active;
        self.slots[inactive].load(&source);
        self.slot_videos[inactive] = Some(video.to_string());
        self.phase = Phase::Loading {
            video: video.to_string(),
        };
        debug!("Loading '{}' into hidden slot", video);
        BeginOutcome::Accepted
    }

    /// Feed a player event through the in-flight commit, if any
    pub fn on_player_event(&mut self, ev: &PlayerEvent) -> DeckEvent {
        let inactive = 1 - self.active;
        if ev.slot.index() != inactive {
            return DeckEvent::Ignored;
        }

        match (&self.phase, &ev.kind) {
            (Phase::Loading { video }, PlayerEventKind::Ready) => {
                let video = video.clone();
                let slot = &mut self.slots[inactive];
                slot.seek_to_start();
                slot.play();
                self.phase = Phase::Starting { video };
                DeckEvent::Ignored
            }
            (Phase::Loading { video }, PlayerEventKind::LoadFailed(err)) => {
                let video = video.clone();
                warn!("❌ Load failed for '{}': {}", video, err);
                self.phase = Phase::Idle;
                DeckEvent::Aborted {
                    video,
                    reason: AbortReason::Load(err.clone()),
                }
            }
            (Phase::Starting { video }, PlayerEventKind::Started) => {
                let video = video.clone();
                self.slots[inactive].set_visible(true);
                self.slots[self.active].set_visible(false);
                self.generation += 1;
                self.phase = Phase::Fading { video };
                DeckEvent::ScheduleFade {
                    generation: self.generation,
                    after: self.cfg.fade,
                }
            }
            (Phase::Starting { video }, PlayerEventKind::PlayRejected(err)) => {
                let video = video.clone();
                warn!("❌ Play rejected for '{}': {}", video, err);
                // undo nothing: visibility was not flipped yet
                self.phase = Phase::Idle;
                DeckEvent::Aborted {
                    video,
                    reason: AbortReason::PlayRejected(err.clone()),
                }
            }
            _ => DeckEvent::Ignored,
        }
    }

    /// Whether an `Ended` from this slot belongs to an in-flight
    /// transition's outgoing clip and must not reach the end-of-clip rules.
    pub fn absorbs_ended(&self, slot: SlotId) -> bool {
        self.phase != Phase::Idle && slot.index() == self.active
    }

    /// Fade timer callback. Stale generations are ignored.
    pub fn on_fade_elapsed(&mut self, generation: u64) -> DeckEvent {
        if generation != self.generation {
            return DeckEvent::Ignored;
        }
        let video = match &self.phase {
            Phase::Fading { video } => video.clone(),
            _ => return DeckEvent::Ignored,
        };

        let old = self.active;
        self.slots[old].pause();
        self.slots[old].seek_to_start();
        self.active = 1 - old;
        self.phase = Phase::Idle;
        info!("✅ Now showing '{}'", video);
        DeckEvent::Committed { video }
    }

    /// Restart the active slot's clip in place (idle loop, talking loop)
    pub fn restart_active(&mut self) {
        let slot = &mut self.slots[self.active];
        slot.seek_to_start();
        slot.play();
    }
}
