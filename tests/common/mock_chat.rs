//! Mock Conversation Client for Testing
//!
//! Records sent utterances and hands out inspectable turn handles. The
//! tests drive stream events straight into the controller.

use async_trait::async_trait;
use avatalk::conversation::{ConversationClient, TurnHandle};
use avatalk::error::{AvatalkError, AvatalkResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
pub struct MockChatControls {
    pub sent: Arc<Mutex<Vec<String>>>,
    pub handles: Arc<Mutex<Vec<TurnHandle>>>,
    pub fail_send: Arc<AtomicBool>,
    pub fail_synthesize: Arc<AtomicBool>,
    pub synthesized: Arc<Mutex<Vec<String>>>,
}

impl MockChatControls {
    pub fn last_handle(&self) -> TurnHandle {
        self.handles
            .lock()
            .unwrap()
            .last()
            .cloned()
            .expect("no turn was started")
    }

    pub fn sent_snapshot(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

pub struct MockChatClient {
    controls: MockChatControls,
    speech: Vec<u8>,
}

impl MockChatClient {
    pub fn new(controls: MockChatControls) -> Self {
        Self {
            controls,
            speech: b"RIFFmock".to_vec(),
        }
    }
}

#[async_trait]
impl ConversationClient for MockChatClient {
    fn send(&mut self, utterance: &str) -> AvatalkResult<TurnHandle> {
        if self.controls.fail_send.load(Ordering::SeqCst) {
            return Err(AvatalkError::Conversation("mock send failure".to_string()));
        }
        self.controls
            .sent
            .lock()
            .unwrap()
            .push(utterance.to_string());
        let handle = TurnHandle::new();
        self.controls.handles.lock().unwrap().push(handle.clone());
        Ok(handle)
    }

    async fn synthesize(&self, text: &str) -> AvatalkResult<Vec<u8>> {
        if self.controls.fail_synthesize.load(Ordering::SeqCst) {
            return Err(AvatalkError::Conversation(
                "mock synthesis failure".to_string(),
            ));
        }
        self.controls
            .synthesized
            .lock()
            .unwrap()
            .push(text.to_string());
        Ok(self.speech.clone())
    }
}
