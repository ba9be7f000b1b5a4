//! Avatar controller
//!
//! The single logical thread of control: one event loop over player
//! events, recognition results, conversation stream events, audio
//! completions, and internal timer messages. Handlers are synchronous
//! methods so every path can be driven deterministically in tests; `run`
//! is a thin pump around them.

use crate::audio::{AckSounds, AudioEvent, AudioOut};
use crate::config::{VideoSet, VideoSetsFile};
use crate::conversation::{ChatEvent, ConversationBridge, ConversationClient};
use crate::error::AvatalkResult;
use crate::matcher::{CommandMatch, CommandTable};
use crate::playback::{
    end_of_clip_action, BeginOutcome, CrossfadeDeck, DeckEvent, EndedAction, PlaybackState,
    PlayerEvent, PlayerEventKind, QueueOutcome, SlotId, SourceRef, SwitchOptions, SwitchQueue,
    SwitchRequest,
};
use crate::recognition::{RecognitionEvent, SpeechRecognizer, StallWatchdog};
use crate::retry::RetryPolicy;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{debug, info, warn};

/// Timer messages the controller sends itself
#[derive(Debug, Clone, PartialEq)]
pub enum InternalMsg {
    /// The crossfade interval elapsed
    FadeElapsed(u64),
    /// Retry a commit that found the deck busy
    RetryCommit { attempt: u32, generation: u64 },
}

/// Receivers for every collaborator event stream
pub struct EventChannels {
    pub player_events: mpsc::UnboundedReceiver<PlayerEvent>,
    pub recognition_events: mpsc::UnboundedReceiver<RecognitionEvent>,
    pub chat_events: mpsc::UnboundedReceiver<ChatEvent>,
    pub audio_events: mpsc::UnboundedReceiver<AudioEvent>,
}

pub struct AvatarController {
    sets: VideoSetsFile,
    active_set: String,
    set: VideoSet,
    table: CommandTable,
    min_confidence: f32,

    state: PlaybackState,
    queue: SwitchQueue,
    deck: CrossfadeDeck,
    retry: RetryPolicy,
    retry_generation: u64,
    /// The showing clip was entered through a return-to-previous request
    /// (covers clips that carry the flag on the command or directive
    /// rather than on the video entry)
    entered_with_return: bool,

    bridge: ConversationBridge,
    chat: Option<Box<dyn ConversationClient>>,

    audio: Arc<dyn AudioOut>,
    acks: AckSounds,
    ack_dir: PathBuf,

    recognizer: Option<Box<dyn SpeechRecognizer>>,
    watchdog: StallWatchdog,

    channels: EventChannels,
    internal_tx: mpsc::UnboundedSender<InternalMsg>,
    internal_rx: mpsc::UnboundedReceiver<InternalMsg>,
}

impl AvatarController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        sets: VideoSetsFile,
        set_id: &str,
        deck: CrossfadeDeck,
        audio: Arc<dyn AudioOut>,
        chat: Option<Box<dyn ConversationClient>>,
        recognizer: Option<Box<dyn SpeechRecognizer>>,
        channels: EventChannels,
        ack_dir: PathBuf,
    ) -> AvatalkResult<Self> {
        let set = sets.set(set_id)?.clone();
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();

        let mut controller = Self {
            min_confidence: sets.recognition.min_confidence,
            watchdog: StallWatchdog::new(Duration::from_secs(sets.recognition.stall_timeout_secs)),
            retry: RetryPolicy::new(
                sets.transition.max_retries,
                Duration::from_millis(sets.transition.retry_delay_ms),
            ),
            retry_generation: 0,
            entered_with_return: false,
            state: PlaybackState::new(set.default_video.as_str(), set.idle_video.as_str()),
            table: CommandTable::from_set(&set),
            queue: SwitchQueue::new(),
            deck,
            bridge: ConversationBridge::new(set.conversation.clone()),
            chat,
            acks: AckSounds::new(set.audio_ack.clone(), &ack_dir),
            ack_dir,
            audio,
            recognizer,
            active_set: set_id.to_string(),
            set,
            sets,
            channels,
            internal_tx,
            internal_rx,
        };
        controller.enter_set();
        Ok(controller)
    }

    /// Switch to another configuration set: the table is replaced
    /// atomically, playback state is reset, and preloads are invalidated.
    pub fn select_set(&mut self, set_id: &str) -> AvatalkResult<()> {
        let set = self.sets.set(set_id)?.clone();
        info!("📦 Switching to video set '{}'", set_id);
        self.table = CommandTable::from_set(&set);
        self.state.reset(set.default_video.as_str(), set.idle_video.as_str());
        self.queue.clear();
        self.entered_with_return = false;
        self.bridge.configure(set.conversation.clone());
        self.audio.stop();
        self.acks = AckSounds::new(set.audio_ack.clone(), &self.ack_dir);
        self.active_set = set_id.to_string();
        self.set = set;
        self.enter_set();
        Ok(())
    }

    fn enter_set(&mut self) {
        self.deck.invalidate_preloads();
        for video in &self.set.videos {
            let source = SourceRef::new(self.set.source_for(&video.id));
            self.deck.preload(&video.id, source);
        }
        let default = self.set.default_video.clone();
        let source = SourceRef::new(self.set.source_for(&default));
        self.deck.start_with(&default, source);
        self.audio.set_volume(self.acks.volume());
    }

    // --- accessors used by the binary and tests ---

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn current_video(&self) -> &str {
        &self.state.current_video
    }

    pub fn queued(&self) -> Option<&SwitchRequest> {
        self.queue.peek()
    }

    pub fn is_talking(&self) -> bool {
        self.bridge.is_talking()
    }

    pub fn active_set(&self) -> &str {
        &self.active_set
    }

    pub fn active_slot(&self) -> SlotId {
        self.deck.active_slot()
    }

    /// File a manual switch request (UI buttons, external triggers).
    /// Deferred requests wait for the end of the showing clip.
    pub fn request_video(&mut self, video: &str, opts: SwitchOptions) {
        if self.queue.request(&self.state, video, opts) == QueueOutcome::CommitNow {
            self.try_commit_queued(0);
        }
    }

    // --- event handlers ---

    /// A slot event from either player
    pub fn handle_player_event(&mut self, ev: PlayerEvent) {
        if ev.kind == PlayerEventKind::Ended {
            if self.deck.absorbs_ended(ev.slot) {
                debug!("Outgoing clip tail ended mid-transition, absorbed");
                return;
            }
            if !self.deck.is_active_slot(ev.slot) {
                debug!("Stale ended event from hidden slot, ignored");
                return;
            }
            self.handle_clip_ended();
            return;
        }

        let out = self.deck.on_player_event(&ev);
        self.apply_deck_event(out);
    }

    /// A recognition result. Interim results only feed the watchdog;
    /// final results walk the ranked alternatives, skipping any below the
    /// confidence threshold, and the first matching alternative wins.
    pub fn handle_recognition(&mut self, ev: RecognitionEvent) {
        self.watchdog.note_activity();
        if !ev.is_final {
            return;
        }

        let mut fallback_text: Option<String> = None;
        let mut matched: Option<CommandMatch> = None;
        for alt in &ev.alternatives {
            if alt.confidence < self.min_confidence {
                debug!(
                    "Skipping low-confidence alternative '{}' ({:.2})",
                    alt.text, alt.confidence
                );
                continue;
            }
            if fallback_text.is_none() {
                fallback_text = Some(alt.text.clone());
            }
            if let Some(m) = self.table.match_text(&alt.text) {
                matched = Some(m);
                break;
            }
        }

        match matched {
            Some(m) => self.apply_command(m),
            None => {
                if let Some(text) = fallback_text {
                    self.handle_no_match(&text);
                }
            }
        }
    }

    /// A conversation stream event
    pub async fn handle_chat_event(&mut self, ev: ChatEvent) {
        match ev {
            ChatEvent::Delta(text) => {
                debug!("💬 {}", text);
            }
            ChatEvent::TriggerVideo(video) => {
                if !self.bridge.is_talking() {
                    return;
                }
                if !self.set.videos.iter().any(|v| v.id == video) {
                    warn!("⚠️ Ignoring directive for unknown clip '{}'", video);
                    return;
                }
                // play the directive clip, then come back to the talking loop
                let outcome = self.queue.request(
                    &self.state,
                    &video,
                    SwitchOptions::immediate().with_return(),
                );
                if outcome == QueueOutcome::CommitNow {
                    self.try_commit_queued(0);
                }
            }
            ChatEvent::Done(full_text) => {
                if !self.bridge.is_talking() {
                    return; // tail of a cancelled turn
                }
                let Some(chat) = self.chat.as_ref() else {
                    self.finish_turn();
                    return;
                };
                match chat.synthesize(&full_text).await {
                    Ok(bytes) if !bytes.is_empty() => self.audio.play_speech(bytes),
                    Ok(_) => self.finish_turn(),
                    Err(e) => self.handle_conversation_error(&e.to_string()),
                }
            }
            ChatEvent::Error(msg) => self.handle_conversation_error(&msg),
        }
    }

    /// An audio engine event
    pub fn handle_audio_event(&mut self, ev: AudioEvent) {
        match ev {
            AudioEvent::SpeechFinished => {
                if self.bridge.is_talking() {
                    self.finish_turn();
                }
            }
        }
    }

    /// An internal timer message
    pub fn handle_internal(&mut self, msg: InternalMsg) {
        match msg {
            InternalMsg::FadeElapsed(generation) => {
                let out = self.deck.on_fade_elapsed(generation);
                self.apply_deck_event(out);
            }
            InternalMsg::RetryCommit {
                attempt,
                generation,
            } => {
                if generation == self.retry_generation {
                    self.try_commit_queued(attempt);
                }
            }
        }
    }

    // --- command path ---

    fn apply_command(&mut self, m: CommandMatch) {
        info!(
            "🎯 Matched command '{}' (keyword '{}') -> {}",
            m.command_id, m.matched_keyword, m.video
        );

        // conversation and command playback are mutually exclusive: the
        // restore is queued but not committed, so the command request
        // below overwrites it and the queue holds only the new clip
        if self.bridge.is_talking() {
            self.interrupt_conversation(false);
        }

        if let Some(ack) = self.acks.pick_for(&m.video) {
            self.audio.play_file(&ack);
        }

        let mut opts = SwitchOptions::immediate();
        if m.return_to_previous {
            opts = opts.with_return();
        }
        if self.queue.request(&self.state, &m.video, opts) == QueueOutcome::CommitNow {
            self.try_commit_queued(0);
        }
    }

    fn handle_no_match(&mut self, text: &str) {
        debug!("No command matched for: '{}'", text);
        if self.chat.is_none() {
            return;
        }
        let Some(talking) = self.bridge.begin_turn(&self.state.current_video) else {
            return;
        };

        if self.queue.request(&self.state, &talking, SwitchOptions::immediate())
            == QueueOutcome::CommitNow
        {
            self.try_commit_queued(0);
        }

        if let Some(chat) = self.chat.as_mut() {
            match chat.send(text) {
                Ok(handle) => self.bridge.set_turn(handle),
                Err(e) => {
                    let msg = e.to_string();
                    self.handle_conversation_error(&msg);
                }
            }
        }
    }

    /// Full conversation teardown. `commit_restore` commits the restore
    /// right away (error/abandon paths); the match path leaves it queued
    /// so the command's own request can overwrite it.
    fn interrupt_conversation(&mut self, commit_restore: bool) {
        let cleanup = self.bridge.interrupt();
        self.audio.stop();
        if let Some(previous) = cleanup.restore_video {
            let outcome = self
                .queue
                .request(&self.state, &previous, SwitchOptions::immediate());
            if commit_restore && outcome == QueueOutcome::CommitNow {
                self.try_commit_queued(0);
            }
        }
    }

    fn finish_turn(&mut self) {
        if let Some(previous) = self.bridge.end_turn() {
            if self.queue.request(&self.state, &previous, SwitchOptions::immediate())
                == QueueOutcome::CommitNow
            {
                self.try_commit_queued(0);
            }
        }
    }

    fn handle_conversation_error(&mut self, msg: &str) {
        warn!("💬 Conversation turn failed: {}", msg);
        if let Some(sound) = self.acks.error_sound() {
            self.audio.play_file(&sound);
        }
        // same cleanup as an explicit interrupt so the talking clip can
        // never loop forever after a dead turn
        self.interrupt_conversation(true);
    }

    // --- playback path ---

    fn handle_clip_ended(&mut self) {
        let ended = self.state.current_video.clone();

        // forced talking loop while a conversation turn runs
        if self.bridge.is_talking() && self.bridge.talking_video() == Some(ended.as_str()) {
            self.deck.restart_active();
            return;
        }

        let returns = self.set.is_return_to_previous(&ended) || self.entered_with_return;
        match end_of_clip_action(&ended, returns, &self.state, &self.queue) {
            EndedAction::CommitQueued => self.try_commit_queued(0),
            EndedAction::ReturnToPrevious(previous) => {
                self.state.previous_video = None;
                if self.queue.request(&self.state, &previous, SwitchOptions::immediate())
                    == QueueOutcome::CommitNow
                {
                    self.try_commit_queued(0);
                }
            }
            EndedAction::RestartInPlace => {
                debug!("🔁 Looping '{}'", ended);
                self.deck.restart_active();
            }
            EndedAction::FallbackToIdle => {
                let idle = self.state.idle_video.clone();
                if self.queue.request(&self.state, &idle, SwitchOptions::immediate())
                    == QueueOutcome::CommitNow
                {
                    self.try_commit_queued(0);
                }
            }
        }
    }

    /// Commit whatever is queued, deferring with a bounded retry while a
    /// crossfade is in flight. The queued value stays put across retries
    /// (last-write-wins) and is only taken when a commit actually begins.
    fn try_commit_queued(&mut self, attempt: u32) {
        if self.deck.is_switching() {
            match self.retry.next_delay(attempt + 1) {
                Some(delay) => {
                    self.retry_generation += 1;
                    let generation = self.retry_generation;
                    let tx = self.internal_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = tx.send(InternalMsg::RetryCommit {
                            attempt: attempt + 1,
                            generation,
                        });
                    });
                }
                None => {
                    // out of retries: stop pushing, the end-of-clip
                    // handler will consume the queued request
                    debug!("Deck still busy after {} retries", attempt);
                }
            }
            return;
        }

        let Some(request) = self.queue.take() else {
            return;
        };

        // commit decision: previous snapshot and current update happen
        // now, not when the crossfade finishes
        if request.return_to_previous {
            self.state.previous_video = Some(self.state.current_video.clone());
        }
        self.entered_with_return = request.return_to_previous;
        self.state.current_video = request.video.clone();
        self.state.is_switching = true;

        let fresh = SourceRef::new(self.set.source_for(&request.video));
        match self.deck.begin(&request.video, fresh) {
            BeginOutcome::Accepted => {}
            BeginOutcome::Busy => {
                // raced with another begin; should not happen on one loop
                warn!("⚠️ Deck reported busy after guard check");
                self.state.is_switching = false;
            }
        }
    }

    fn apply_deck_event(&mut self, ev: DeckEvent) {
        match ev {
            DeckEvent::Ignored => {}
            DeckEvent::ScheduleFade { generation, after } => {
                let tx = self.internal_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(after).await;
                    let _ = tx.send(InternalMsg::FadeElapsed(generation));
                });
            }
            DeckEvent::Committed { video } => {
                self.state.is_switching = false;
                debug!("Transition to '{}' committed", video);
            }
            DeckEvent::Aborted { video, reason } => {
                // the request was already dequeued; the prior clip keeps
                // showing while current_video stays optimistically updated
                self.state.is_switching = false;
                warn!("⚠️ Switch to '{}' dropped: {:?}", video, reason);
            }
        }
    }

    // --- liveness ---

    /// Liveness tick: force-restart a recognition session that has gone
    /// quiet for longer than the watchdog window
    pub fn check_stall(&mut self) {
        if let Some(recognizer) = self.recognizer.as_mut() {
            if recognizer.can_stall() && self.watchdog.is_stalled() {
                warn!("⏱️ Recognition stalled, forcing a restart");
                if let Err(e) = recognizer.restart() {
                    warn!("❌ Recognition restart failed: {}", e);
                }
                self.watchdog.note_activity();
            }
        }
    }

    // --- pump ---

    /// Process one event, or report quiescence after `idle`
    pub async fn step(&mut self, idle: Duration) -> bool {
        tokio::select! {
            Some(ev) = self.channels.player_events.recv() => {
                self.handle_player_event(ev);
                true
            }
            Some(ev) = self.channels.recognition_events.recv() => {
                self.handle_recognition(ev);
                true
            }
            Some(ev) = self.channels.chat_events.recv() => {
                self.handle_chat_event(ev).await;
                true
            }
            Some(ev) = self.channels.audio_events.recv() => {
                self.handle_audio_event(ev);
                true
            }
            Some(msg) = self.internal_rx.recv() => {
                self.handle_internal(msg);
                true
            }
            _ = tokio::time::sleep(idle) => false,
        }
    }

    /// Process events until nothing is pending (timers included)
    pub async fn settle(&mut self) {
        let window = Duration::from_millis(
            self.sets.transition.fade_ms + self.sets.transition.retry_delay_ms + 200,
        );
        while self.step(window).await {}
    }

    /// Run forever: pump events and keep the stall watchdog honest
    pub async fn run(&mut self) -> AvatalkResult<()> {
        if let Some(recognizer) = self.recognizer.as_mut() {
            recognizer.start()?;
        }
        info!("✅ Avatalk ready on set '{}'", self.active_set);
        loop {
            self.step(Duration::from_millis(500)).await;
            self.check_stall();
        }
    }
}
