//! Speech recognition input
//!
//! The recognizer is an external collaborator: implementations push
//! [`RecognitionEvent`]s into the controller's channel and expose a small
//! lifecycle surface for the stall watchdog to force-restart a session
//! that has gone quiet.

use crate::error::AvatalkResult;
use tokio::time::{Duration, Instant};

/// Minimum confidence threshold. Alternatives below this are skipped
/// entirely when iterating a final result's ranked alternatives.
pub const MIN_CONFIDENCE: f32 = 0.5;

/// One ranked alternative of a recognition result
#[derive(Debug, Clone)]
pub struct RecognitionAlternative {
    pub text: String,
    pub confidence: f32,
}

/// A recognition result event: interim results update the transcript
/// display and feed the watchdog; final results drive command matching.
#[derive(Debug, Clone)]
pub struct RecognitionEvent {
    pub alternatives: Vec<RecognitionAlternative>,
    pub is_final: bool,
}

impl RecognitionEvent {
    pub fn final_text(text: &str, confidence: f32) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                text: text.to_string(),
                confidence,
            }],
            is_final: true,
        }
    }

    pub fn interim(text: &str) -> Self {
        Self {
            alternatives: vec![RecognitionAlternative {
                text: text.to_string(),
                confidence: 0.0,
            }],
            is_final: false,
        }
    }
}

/// Lifecycle handle for a recognition session. Events are delivered over
/// the channel given to the implementation at construction time.
pub trait SpeechRecognizer: Send {
    fn start(&mut self) -> AvatalkResult<()>;

    fn stop(&mut self);

    /// Tear down and start a fresh session. Used by the stall watchdog.
    fn restart(&mut self) -> AvatalkResult<()>;

    /// Whether silence can mean a stalled session for this backend.
    /// Default implementation returns true (backwards compatible).
    fn can_stall(&self) -> bool {
        true
    }
}

/// Liveness watchdog for the recognition session.
///
/// Reset on every interim or final result, so a long utterance that keeps
/// producing interim updates never trips it. Only a genuinely silent
/// session reaches the timeout and gets force-restarted.
#[derive(Debug)]
pub struct StallWatchdog {
    timeout: Duration,
    last_activity: Instant,
}

impl StallWatchdog {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            last_activity: Instant::now(),
        }
    }

    /// Record activity (any interim or final result)
    pub fn note_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn is_stalled(&self) -> bool {
        self.last_activity.elapsed() >= self.timeout
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}
