#![allow(dead_code)]

pub mod mock_audio;
pub mod mock_chat;
pub mod mock_player;
pub mod mock_recognizer;

use avatalk::config::VideoSetsFile;
use avatalk::controller::{AvatarController, EventChannels};
use avatalk::conversation::ConversationClient;
use avatalk::playback::{CrossfadeDeck, DeckConfig, SlotId};
use avatalk::recognition::SpeechRecognizer;
use self::mock_audio::MockAudioOut;
use self::mock_chat::{MockChatClient, MockChatControls};
use self::mock_player::{MockPlayer, MockPlayerControls};
use self::mock_recognizer::{MockRecognizer, MockRecognizerControls};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Two sets: "demo" with the conversation fallback, "alt" without
pub const FIXTURE: &str = r#"{
    "version": "2.0",
    "defaultSet": "demo",
    "recognition": {"minConfidence": 0.5, "stallTimeoutSecs": 8},
    "transition": {"fadeMs": 40, "retryDelayMs": 10, "maxRetries": 3},
    "sets": {
        "demo": {
            "id": "demo",
            "name": "Demo",
            "videos": [
                {"id": "idle.mp4", "isIdle": true},
                {"id": "jump.mp4"},
                {"id": "circle.mp4"},
                {"id": "wave.mp4", "returnToPrevious": true},
                {"id": "talking.mp4"}
            ],
            "defaultVideo": "idle.mp4",
            "idleVideo": "idle.mp4",
            "commands": {
                "jump": {"keywords": ["jump", "跳"], "video": "jump.mp4"},
                "circle": {"keywords": ["circle", "转"], "video": "circle.mp4"},
                "wave": {"keywords": ["wave"], "video": "wave.mp4", "returnToPrevious": true},
                "stop": {"keywords": ["stop", "停"], "video": "idle.mp4"}
            },
            "buttons": [{"label": "Jump", "video": "jump.mp4"}],
            "audioAck": {
                "enabled": true,
                "volume": 0.7,
                "generic": ["ok.wav"],
                "specific": {"jump.mp4": ["jump.wav"]},
                "error": "err.wav"
            },
            "conversation": {
                "enabled": true,
                "endpoint": "http://localhost:5999",
                "talkingVideo": "talking.mp4"
            }
        },
        "alt": {
            "id": "alt",
            "name": "Alternate",
            "videos": [
                {"id": "rest.mp4", "isIdle": true},
                {"id": "spin.mp4"}
            ],
            "defaultVideo": "rest.mp4",
            "idleVideo": "rest.mp4",
            "commands": {
                "spin": {"keywords": ["spin"], "video": "spin.mp4"}
            }
        }
    }
}"#;

pub fn fixture_sets() -> VideoSetsFile {
    VideoSetsFile::parse(FIXTURE).expect("fixture must be valid")
}

/// Everything a pipeline test needs: the controller plus handles into the
/// mocked collaborators.
pub struct TestRig {
    pub controller: AvatarController,
    pub players: MockPlayerControls,
    pub audio: Arc<MockAudioOut>,
    pub chat: MockChatControls,
    pub recognizer: MockRecognizerControls,
}

impl TestRig {
    pub fn new() -> Self {
        Self::build(true)
    }

    pub fn without_chat() -> Self {
        Self::build(false)
    }

    fn build(with_chat: bool) -> Self {
        let sets = fixture_sets();

        let (player_tx, player_rx) = mpsc::unbounded_channel();
        let (_recognition_tx, recognition_rx) = mpsc::unbounded_channel();
        let (_chat_tx, chat_rx) = mpsc::unbounded_channel();
        let (_audio_tx, audio_rx) = mpsc::unbounded_channel();

        let players = MockPlayerControls::default();
        let deck = CrossfadeDeck::new(
            Box::new(MockPlayer::new(
                SlotId::A,
                player_tx.clone(),
                players.clone(),
            )),
            Box::new(MockPlayer::new(SlotId::B, player_tx, players.clone())),
            DeckConfig {
                fade: Duration::from_millis(sets.transition.fade_ms),
            },
        );

        let audio = Arc::new(MockAudioOut::default());
        let chat_controls = MockChatControls::default();
        let chat: Option<Box<dyn ConversationClient>> = if with_chat {
            Some(Box::new(MockChatClient::new(chat_controls.clone())))
        } else {
            None
        };
        let recognizer_controls = MockRecognizerControls::default();
        let recognizer: Option<Box<dyn SpeechRecognizer>> = Some(Box::new(MockRecognizer::new(
            recognizer_controls.clone(),
        )));

        let controller = AvatarController::new(
            sets,
            "demo",
            deck,
            audio.clone(),
            chat,
            recognizer,
            EventChannels {
                player_events: player_rx,
                recognition_events: recognition_rx,
                chat_events: chat_rx,
                audio_events: audio_rx,
            },
            PathBuf::from("/sounds"),
        )
        .expect("controller construction");

        Self {
            controller,
            players,
            audio,
            chat: chat_controls,
            recognizer: recognizer_controls,
        }
    }

    /// Let the startup clip's load/play confirmations drain and drop the
    /// recorded calls so tests start from a clean slate
    pub async fn settled(mut self) -> Self {
        self.controller.settle().await;
        self.players.take_calls();
        self
    }
}
