//! Mock Video Player for Testing
//!
//! Records every call and auto-confirms load/play through the event
//! channel, with toggles to fail either stage.

use avatalk::playback::{PlayerEvent, PlayerEventKind, SlotId, SourceRef, VideoPlayer};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

/// Shared toggles and call log for a pair of mock slots
#[derive(Clone, Default)]
pub struct MockPlayerControls {
    pub calls: Arc<Mutex<Vec<String>>>,
    pub fail_load: Arc<AtomicBool>,
    pub fail_play: Arc<AtomicBool>,
}

impl MockPlayerControls {
    pub fn take_calls(&self) -> Vec<String> {
        std::mem::take(&mut *self.calls.lock().unwrap())
    }

    pub fn calls_snapshot(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn set_fail_load(&self, fail: bool) {
        self.fail_load.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_play(&self, fail: bool) {
        self.fail_play.store(fail, Ordering::SeqCst);
    }
}

pub struct MockPlayer {
    slot: SlotId,
    events: mpsc::UnboundedSender<PlayerEvent>,
    controls: MockPlayerControls,
}

impl MockPlayer {
    pub fn new(
        slot: SlotId,
        events: mpsc::UnboundedSender<PlayerEvent>,
        controls: MockPlayerControls,
    ) -> Self {
        Self {
            slot,
            events,
            controls,
        }
    }

    fn tag(&self) -> &'static str {
        match self.slot {
            SlotId::A => "a",
            SlotId::B => "b",
        }
    }

    fn record(&self, call: String) {
        self.controls.calls.lock().unwrap().push(call);
    }

    fn emit(&self, kind: PlayerEventKind) {
        let _ = self.events.send(PlayerEvent {
            slot: self.slot,
            kind,
        });
    }
}

impl VideoPlayer for MockPlayer {
    fn load(&mut self, source: &SourceRef) {
        self.record(format!("{}:load:{}", self.tag(), source.0));
        if self.controls.fail_load.load(Ordering::SeqCst) {
            self.emit(PlayerEventKind::LoadFailed("mock load failure".to_string()));
        } else {
            self.emit(PlayerEventKind::Ready);
        }
    }

    fn play(&mut self) {
        self.record(format!("{}:play", self.tag()));
        if self.controls.fail_play.load(Ordering::SeqCst) {
            self.emit(PlayerEventKind::PlayRejected("mock autoplay block".to_string()));
        } else {
            self.emit(PlayerEventKind::Started);
        }
    }

    fn pause(&mut self) {
        self.record(format!("{}:pause", self.tag()));
    }

    fn seek_to_start(&mut self) {
        self.record(format!("{}:seek0", self.tag()));
    }

    fn duration(&self) -> Option<f64> {
        Some(5.0)
    }

    fn set_visible(&mut self, visible: bool) {
        self.record(format!("{}:visible:{}", self.tag(), visible));
    }
}
