//! Streaming chat/TTS proxy client
//!
//! POSTs the utterance to `{endpoint}/api/chat/stream` and consumes the
//! server-sent-event response line by line (`data: {...}` frames with a
//! `type` of `text`, `video`, `done`, or `error`). Synthesis is a plain
//! POST returning audio bytes. Cancellation is cooperative: the reader
//! checks the turn flag per chunk and simply stops consuming.

use crate::conversation::{ChatEvent, ConversationClient, TurnHandle};
use crate::error::{AvatalkError, AvatalkResult};
use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One `data:` frame from the stream
#[derive(Debug, Deserialize)]
struct SseFrame {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    content: String,
}

pub struct SseChatClient {
    endpoint: String,
    session_id: String,
    http: reqwest::Client,
    events_tx: mpsc::UnboundedSender<ChatEvent>,
}

impl SseChatClient {
    pub fn new(endpoint: &str, events_tx: mpsc::UnboundedSender<ChatEvent>) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            session_id: generate_session_id(),
            http: reqwest::Client::new(),
            events_tx,
        }
    }

    /// Start over with a fresh server-side history
    pub fn reset_session(&mut self) {
        self.session_id = generate_session_id();
        debug!("Session reset, new id: {}", self.session_id);
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

fn generate_session_id() -> String {
    format!("session_{:016x}", rand::random::<u64>())
}

#[async_trait]
impl ConversationClient for SseChatClient {
    fn send(&mut self, utterance: &str) -> AvatalkResult<TurnHandle> {
        let handle = TurnHandle::new();
        let turn = handle.clone();
        let tx = self.events_tx.clone();
        let http = self.http.clone();
        let url = format!("{}/api/chat/stream", self.endpoint);
        let body = serde_json::json!({
            "message": utterance,
            "session_id": self.session_id,
        });

        tokio::spawn(async move {
            if let Err(e) = stream_turn(http, url, body, turn.clone(), tx.clone()).await {
                if !turn.is_cancelled() {
                    let _ = tx.send(ChatEvent::Error(e.to_string()));
                }
            }
        });

        Ok(handle)
    }

    async fn synthesize(&self, text: &str) -> AvatalkResult<Vec<u8>> {
        let response = self
            .http
            .post(format!("{}/api/tts/synthesize", self.endpoint))
            .json(&serde_json::json!({ "text": text }))
            .send()
            .await
            .map_err(|e| AvatalkError::Conversation(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AvatalkError::Conversation(format!(
                "TTS error: {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AvatalkError::Conversation(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

async fn stream_turn(
    http: reqwest::Client,
    url: String,
    body: serde_json::Value,
    turn: TurnHandle,
    tx: mpsc::UnboundedSender<ChatEvent>,
) -> anyhow::Result<()> {
    let response = http.post(&url).json(&body).send().await?;
    if !response.status().is_success() {
        anyhow::bail!("chat stream error: {}", response.status());
    }

    let mut stream = response.bytes_stream();
    let mut buffer = String::new();
    let mut full_response = String::new();

    while let Some(chunk) = stream.next().await {
        if turn.is_cancelled() {
            debug!("Turn cancelled, dropping stream");
            return Ok(());
        }
        buffer.push_str(&String::from_utf8_lossy(&chunk?));

        while let Some(newline) = buffer.find('\n') {
            let line = buffer[..newline].trim().to_string();
            buffer.drain(..=newline);

            let Some(payload) = line.strip_prefix("data: ") else {
                continue;
            };
            let frame: SseFrame = match serde_json::from_str(payload) {
                Ok(frame) => frame,
                Err(e) => {
                    warn!("❌ Bad SSE frame ({}): {}", e, payload);
                    continue;
                }
            };

            match frame.kind.as_str() {
                "text" => {
                    full_response.push_str(&frame.content);
                    let _ = tx.send(ChatEvent::Delta(frame.content));
                }
                "video" => {
                    let _ = tx.send(ChatEvent::TriggerVideo(frame.content));
                }
                "done" => {
                    debug!("Stream completed ({} chars)", full_response.len());
                    let _ = tx.send(ChatEvent::Done(full_response));
                    return Ok(());
                }
                "error" => {
                    let _ = tx.send(ChatEvent::Error(frame.content));
                    return Ok(());
                }
                other => debug!("Ignoring SSE frame type '{}'", other),
            }
        }
    }

    // proxy closed without a done frame
    if full_response.is_empty() {
        anyhow::bail!("stream ended without completion");
    }
    let _ = tx.send(ChatEvent::Done(full_response));
    Ok(())
}
