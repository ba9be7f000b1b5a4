//! Avatalk - Voice-Driven Talking Avatar
//!
//! Headless demo runner: a simulated dual-slot video deck, stdin lines as
//! recognized phrases, and the real conversation client when a set
//! enables it.

use anyhow::Result;
use avatalk::audio::RodioOut;
use avatalk::config::{self, VideoSetsFile};
use avatalk::controller::{AvatarController, EventChannels};
use avatalk::conversation::http::SseChatClient;
use avatalk::conversation::ConversationClient;
use avatalk::error::AvatalkResult;
use avatalk::playback::{
    CrossfadeDeck, DeckConfig, PlayerEvent, PlayerEventKind, SlotId, SourceRef, VideoPlayer,
};
use avatalk::recognition::{RecognitionEvent, SpeechRecognizer};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Path to the videosets.json document
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Video set to start with (defaults to the document's defaultSet)
    #[arg(short, long)]
    set: Option<String>,

    /// Disable the conversation fallback even if the set enables it
    #[arg(long)]
    no_conversation: bool,

    /// Simulated clip length in seconds
    #[arg(long, default_value_t = 5)]
    clip_secs: u64,

    /// Directory holding acknowledgement sounds
    #[arg(long)]
    audio_dir: Option<PathBuf>,
}

/// Simulated player slot: auto-confirms load and play, ends clips after a
/// fixed simulated length. Lets the whole pipeline run without a real
/// video surface.
struct SimPlayer {
    slot: SlotId,
    events: mpsc::UnboundedSender<PlayerEvent>,
    clip: Duration,
    source: Option<SourceRef>,
    /// bumped on play/pause so stale end timers go quiet
    generation: Arc<AtomicU64>,
}

impl SimPlayer {
    fn new(slot: SlotId, events: mpsc::UnboundedSender<PlayerEvent>, clip: Duration) -> Self {
        Self {
            slot,
            events,
            clip,
            source: None,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn emit(&self, kind: PlayerEventKind) {
        let _ = self.events.send(PlayerEvent {
            slot: self.slot,
            kind,
        });
    }
}

impl VideoPlayer for SimPlayer {
    fn load(&mut self, source: &SourceRef) {
        self.source = Some(source.clone());
        self.emit(PlayerEventKind::Ready);
    }

    fn play(&mut self) {
        self.emit(PlayerEventKind::Started);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let guard = Arc::clone(&self.generation);
        let events = self.events.clone();
        let slot = self.slot;
        let clip = self.clip;
        tokio::spawn(async move {
            tokio::time::sleep(clip).await;
            if guard.load(Ordering::SeqCst) == generation {
                let _ = events.send(PlayerEvent {
                    slot,
                    kind: PlayerEventKind::Ended,
                });
            }
        });
    }

    fn pause(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    fn seek_to_start(&mut self) {}

    fn duration(&self) -> Option<f64> {
        Some(self.clip.as_secs_f64())
    }

    fn set_visible(&mut self, visible: bool) {
        if visible {
            let source = self
                .source
                .as_ref()
                .map(|s| s.0.as_str())
                .unwrap_or("<none>");
            info!("🎬 [{:?}] showing {}", self.slot, source);
        }
    }
}

/// Each stdin line becomes one final recognition result
struct StdinRecognizer {
    events: mpsc::UnboundedSender<RecognitionEvent>,
    running: Arc<AtomicBool>,
}

impl StdinRecognizer {
    fn new(events: mpsc::UnboundedSender<RecognitionEvent>) -> Self {
        Self {
            events,
            running: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl SpeechRecognizer for StdinRecognizer {
    fn start(&mut self) -> AvatalkResult<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        let events = self.events.clone();
        let running = Arc::clone(&self.running);
        std::thread::spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.read_line(&mut line) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        if !running.load(Ordering::SeqCst) {
                            continue;
                        }
                        let text = line.trim();
                        if !text.is_empty() {
                            let _ = events.send(RecognitionEvent::final_text(text, 1.0));
                        }
                    }
                }
            }
        });
        Ok(())
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }

    fn restart(&mut self) -> AvatalkResult<()> {
        Ok(())
    }

    fn can_stall(&self) -> bool {
        false
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("🗣️ Avatalk v{} starting...", env!("CARGO_PKG_VERSION"));

    let config_path = args.config.unwrap_or_else(config::config_path);
    let sets = VideoSetsFile::load(&config_path)?;
    let set_id = args.set.unwrap_or_else(|| sets.default_set.clone());

    let (player_tx, player_rx) = mpsc::unbounded_channel();
    let (recognition_tx, recognition_rx) = mpsc::unbounded_channel();
    let (chat_tx, chat_rx) = mpsc::unbounded_channel();
    let (audio_tx, audio_rx) = mpsc::unbounded_channel();

    let clip = Duration::from_secs(args.clip_secs);
    let deck = CrossfadeDeck::new(
        Box::new(SimPlayer::new(SlotId::A, player_tx.clone(), clip)),
        Box::new(SimPlayer::new(SlotId::B, player_tx, clip)),
        DeckConfig {
            fade: Duration::from_millis(sets.transition.fade_ms),
        },
    );

    let audio = Arc::new(RodioOut::new(audio_tx)?);

    let chat: Option<Box<dyn ConversationClient>> = if args.no_conversation {
        None
    } else {
        sets.set(&set_id)?
            .conversation
            .as_ref()
            .filter(|c| c.enabled)
            .map(|c| {
                info!("💬 Conversation fallback via {}", c.endpoint);
                Box::new(SseChatClient::new(&c.endpoint, chat_tx)) as Box<dyn ConversationClient>
            })
    };

    let recognizer = StdinRecognizer::new(recognition_tx);

    let ack_dir = args.audio_dir.unwrap_or_else(|| {
        dirs::data_dir()
            .unwrap_or_default()
            .join("avatalk")
            .join("audio")
    });

    let mut controller = AvatarController::new(
        sets,
        &set_id,
        deck,
        audio,
        chat,
        Some(Box::new(recognizer)),
        EventChannels {
            player_events: player_rx,
            recognition_events: recognition_rx,
            chat_events: chat_rx,
            audio_events: audio_rx,
        },
        ack_dir,
    )?;

    info!("✅ Ready - type a phrase and press enter");

    tokio::select! {
        result = controller.run() => {
            if let Err(e) = result {
                warn!("❌ Controller stopped: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("👋 Shutting down");
        }
    }

    Ok(())
}
