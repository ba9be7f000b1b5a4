//! Audio output
//!
//! Acknowledgement sounds and synthesized speech playback. Uses a
//! channel-based architecture to handle rodio's non-Send stream: a
//! dedicated audio thread owns the output stream and sink, and the rest
//! of the system talks to it through a command sender. Speech playback
//! reports back when the buffer drains so the controller can end the
//! conversation turn.

use crate::config::AudioAckConfig;
use crate::error::{AvatalkError, AvatalkResult};
use rand::seq::SliceRandom;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Events from the audio thread back to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioEvent {
    /// The current speech buffer finished playing
    SpeechFinished,
}

/// Commands sent to the audio thread
enum AudioCommand {
    PlayFile(PathBuf),
    PlaySpeech(Vec<u8>),
    Stop,
    SetVolume(f32),
}

/// Audio output surface. Mocked in tests; backed by rodio in the binary.
pub trait AudioOut: Send + Sync {
    fn play_file(&self, path: &Path);

    /// Play a synthesized speech buffer; emits [`AudioEvent::SpeechFinished`]
    /// when it drains
    fn play_speech(&self, bytes: Vec<u8>);

    /// Stop everything currently playing
    fn stop(&self);

    fn set_volume(&self, volume: f32);
}

/// Thread-safe handle to the rodio-backed engine
#[derive(Clone)]
pub struct RodioOut {
    sender: mpsc::Sender<AudioCommand>,
}

impl std::fmt::Debug for RodioOut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RodioOut").finish()
    }
}

impl RodioOut {
    pub fn new(events_tx: tokio::sync::mpsc::UnboundedSender<AudioEvent>) -> AvatalkResult<Self> {
        let (sender, receiver) = mpsc::channel::<AudioCommand>();

        thread::Builder::new()
            .name("avatalk-audio".into())
            .spawn(move || Self::audio_thread(receiver, events_tx))
            .map_err(|e| AvatalkError::Audio(e.to_string()))?;

        Ok(Self { sender })
    }

    fn audio_thread(
        receiver: mpsc::Receiver<AudioCommand>,
        events_tx: tokio::sync::mpsc::UnboundedSender<AudioEvent>,
    ) {
        use rodio::{Decoder, OutputStream, Sink};

        let (stream, stream_handle) = match OutputStream::try_default() {
            Ok(s) => s,
            Err(e) => {
                warn!("🔇 Failed to initialize audio output: {}", e);
                return;
            }
        };
        let _stream = stream;
        let sink = match Sink::try_new(&stream_handle) {
            Ok(s) => s,
            Err(e) => {
                error!("❌ Failed to create audio sink: {}", e);
                return;
            }
        };

        info!("🔊 Audio thread started");

        // speech currently draining; report when the sink empties
        let mut speech_pending = false;

        loop {
            let cmd = if speech_pending {
                match receiver.recv_timeout(Duration::from_millis(50)) {
                    Ok(cmd) => cmd,
                    Err(RecvTimeoutError::Timeout) => {
                        if sink.empty() {
                            speech_pending = false;
                            let _ = events_tx.send(AudioEvent::SpeechFinished);
                        }
                        continue;
                    }
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            } else {
                match receiver.recv() {
                    Ok(cmd) => cmd,
                    Err(_) => break,
                }
            };

            match cmd {
                AudioCommand::PlayFile(path) => {
                    debug!("🔊 Playing file: {:?}", path);
                    match std::fs::File::open(&path).map(Decoder::new) {
                        Ok(Ok(source)) => sink.append(source),
                        Ok(Err(e)) => error!("❌ Cannot decode {:?}: {}", path, e),
                        Err(e) => error!("❌ Cannot open {:?}: {}", path, e),
                    }
                }
                AudioCommand::PlaySpeech(bytes) => {
                    sink.stop();
                    sink.play();
                    match Decoder::new(Cursor::new(bytes)) {
                        Ok(source) => {
                            sink.append(source);
                            speech_pending = true;
                        }
                        Err(e) => {
                            error!("❌ Cannot decode speech buffer: {}", e);
                            let _ = events_tx.send(AudioEvent::SpeechFinished);
                        }
                    }
                }
                AudioCommand::Stop => {
                    debug!("🛑 Stopping audio playback");
                    sink.stop();
                    sink.play();
                    speech_pending = false;
                }
                AudioCommand::SetVolume(volume) => {
                    sink.set_volume(volume.clamp(0.0, 1.0));
                }
            }
        }
    }
}

impl AudioOut for RodioOut {
    fn play_file(&self, path: &Path) {
        let _ = self.sender.send(AudioCommand::PlayFile(path.to_path_buf()));
    }

    fn play_speech(&self, bytes: Vec<u8>) {
        let _ = self.sender.send(AudioCommand::PlaySpeech(bytes));
    }

    fn stop(&self) {
        let _ = self.sender.send(AudioCommand::Stop);
    }

    fn set_volume(&self, volume: f32) {
        let _ = self.sender.send(AudioCommand::SetVolume(volume));
    }
}

/// Per-set acknowledgement sound selection: a specific pool per target
/// clip when configured, the generic pool otherwise.
#[derive(Debug, Clone, Default)]
pub struct AckSounds {
    cfg: Option<AudioAckConfig>,
    base_dir: PathBuf,
}

impl AckSounds {
    pub fn new(cfg: Option<AudioAckConfig>, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            cfg,
            base_dir: base_dir.into(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.cfg.as_ref().map(|c| c.enabled).unwrap_or(false)
    }

    pub fn volume(&self) -> f32 {
        self.cfg.as_ref().map(|c| c.volume).unwrap_or(0.7)
    }

    /// Pick an acknowledgement sound for a matched command's clip
    pub fn pick_for(&self, video: &str) -> Option<PathBuf> {
        let cfg = self.cfg.as_ref().filter(|c| c.enabled)?;
        let pool = cfg
            .specific
            .get(video)
            .filter(|p| !p.is_empty())
            .unwrap_or(&cfg.generic);
        let file = pool.choose(&mut rand::thread_rng())?;
        Some(self.base_dir.join(file))
    }

    pub fn error_sound(&self) -> Option<PathBuf> {
        let cfg = self.cfg.as_ref().filter(|c| c.enabled)?;
        cfg.error.as_ref().map(|f| self.base_dir.join(f))
    }
}
