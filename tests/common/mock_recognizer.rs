//! Mock Speech Recognizer for Testing

use avatalk::error::AvatalkResult;
use avatalk::recognition::SpeechRecognizer;
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockRecognizerControls {
    pub lifecycle: Arc<Mutex<Vec<String>>>,
}

impl MockRecognizerControls {
    pub fn lifecycle_snapshot(&self) -> Vec<String> {
        self.lifecycle.lock().unwrap().clone()
    }
}

pub struct MockRecognizer {
    controls: MockRecognizerControls,
}

impl MockRecognizer {
    pub fn new(controls: MockRecognizerControls) -> Self {
        Self { controls }
    }

    fn record(&self, event: &str) {
        self.controls.lifecycle.lock().unwrap().push(event.to_string());
    }
}

impl SpeechRecognizer for MockRecognizer {
    fn start(&mut self) -> AvatalkResult<()> {
        self.record("start");
        Ok(())
    }

    fn stop(&mut self) {
        self.record("stop");
    }

    fn restart(&mut self) -> AvatalkResult<()> {
        self.record("restart");
        Ok(())
    }
}
