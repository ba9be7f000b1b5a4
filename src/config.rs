//! Video set configuration
//!
//! Loads and validates the `videosets.json` document that defines, per set,
//! the clip roster, the keyword commands, and the optional acknowledgement
//! and conversation sections. Validation failures are fatal: a broken
//! document would leave the controller with dangling clip references.

use crate::error::{AvatalkError, AvatalkResult};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Top-level `videosets.json` document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSetsFile {
    pub version: String,
    pub default_set: String,
    pub sets: HashMap<String, VideoSet>,
    #[serde(default)]
    pub recognition: RecognitionTuning,
    #[serde(default)]
    pub transition: TransitionTuning,
}

/// One configuration set: clips, commands, UI buttons, optional extras
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSet {
    pub id: String,
    pub name: String,
    pub videos: Vec<VideoEntry>,
    pub default_video: String,
    pub idle_video: String,
    pub commands: CommandMap,
    #[serde(default)]
    pub buttons: Vec<ButtonEntry>,
    #[serde(default)]
    pub audio_ack: Option<AudioAckConfig>,
    #[serde(default)]
    pub conversation: Option<ConversationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: String,
    /// Clip source (path or URL). Falls back to the id when omitted.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub is_idle: bool,
    #[serde(default)]
    pub return_to_previous: bool,
}

/// A keyword command. The JSON key is the command id.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandEntry {
    pub keywords: Vec<String>,
    pub video: String,
    #[serde(default)]
    pub return_to_previous: bool,
}

/// Commands in declaration order. Order is a matching tie-break, so the
/// plain JSON object is kept as an ordered list of (id, entry) pairs.
#[derive(Debug, Clone, Default)]
pub struct CommandMap(pub Vec<(String, CommandEntry)>);

impl Serialize for CommandMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (id, entry) in &self.0 {
            map.serialize_entry(id, entry)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for CommandMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor;

        impl<'de> Visitor<'de> for OrderedVisitor {
            type Value = CommandMap;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a map of command id to command entry")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((id, entry)) = access.next_entry::<String, CommandEntry>()? {
                    entries.push((id, entry));
                }
                Ok(CommandMap(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor)
    }
}

/// UI affordance metadata; carried through but not interpreted here
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ButtonEntry {
    pub label: String,
    pub video: String,
}

/// Acknowledgement sound configuration for a set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AudioAckConfig {
    pub enabled: bool,
    #[serde(default = "default_ack_volume")]
    pub volume: f32,
    #[serde(default)]
    pub generic: Vec<String>,
    #[serde(default)]
    pub specific: HashMap<String, Vec<String>>,
    #[serde(default)]
    pub error: Option<String>,
}

fn default_ack_volume() -> f32 {
    0.7
}

/// Conversation fallback configuration for a set
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationConfig {
    pub enabled: bool,
    pub endpoint: String,
    pub talking_video: String,
}

/// Recognition tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecognitionTuning {
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
    #[serde(default = "default_stall_timeout")]
    pub stall_timeout_secs: u64,
}

fn default_min_confidence() -> f32 {
    crate::recognition::MIN_CONFIDENCE
}

fn default_stall_timeout() -> u64 {
    8
}

impl Default for RecognitionTuning {
    fn default() -> Self {
        Self {
            min_confidence: default_min_confidence(),
            stall_timeout_secs: default_stall_timeout(),
        }
    }
}

/// Crossfade tuning knobs (sub-second defaults)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionTuning {
    #[serde(default = "default_fade_ms")]
    pub fade_ms: u64,
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_fade_ms() -> u64 {
    400
}

fn default_retry_delay_ms() -> u64 {
    150
}

fn default_max_retries() -> u32 {
    3
}

impl Default for TransitionTuning {
    fn default() -> Self {
        Self {
            fade_ms: default_fade_ms(),
            retry_delay_ms: default_retry_delay_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl VideoSetsFile {
    /// Load and validate a videoset document from disk
    pub fn load(path: &Path) -> AvatalkResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AvatalkError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse and validate a videoset document
    pub fn parse(content: &str) -> AvatalkResult<Self> {
        let file: VideoSetsFile = serde_json::from_str(content)?;
        file.validate()?;
        Ok(file)
    }

    /// Structural validation. Any failure here is fatal to startup.
    pub fn validate(&self) -> AvatalkResult<()> {
        if self.version.is_empty() {
            return Err(AvatalkError::Config("version is missing".into()));
        }
        if self.sets.is_empty() {
            return Err(AvatalkError::Config("no video sets defined".into()));
        }
        if !self.sets.contains_key(&self.default_set) {
            return Err(AvatalkError::Config(format!(
                "default set '{}' not found",
                self.default_set
            )));
        }
        for (set_id, set) in &self.sets {
            set.validate(set_id)?;
        }
        Ok(())
    }

    /// Get a set by id
    pub fn set(&self, set_id: &str) -> AvatalkResult<&VideoSet> {
        self.sets
            .get(set_id)
            .ok_or_else(|| AvatalkError::Config(format!("video set '{}' not found", set_id)))
    }
}

impl VideoSet {
    fn validate(&self, set_id: &str) -> AvatalkResult<()> {
        if self.videos.is_empty() {
            return Err(AvatalkError::Config(format!("set '{}' has no videos", set_id)));
        }
        let ids: Vec<&str> = self.videos.iter().map(|v| v.id.as_str()).collect();

        let check = |what: &str, video: &str| -> AvatalkResult<()> {
            if ids.contains(&video) {
                Ok(())
            } else {
                Err(AvatalkError::Config(format!(
                    "set '{}': {} '{}' not found in videos",
                    set_id, what, video
                )))
            }
        };

        check("defaultVideo", &self.default_video)?;
        check("idleVideo", &self.idle_video)?;

        for (cmd_id, entry) in &self.commands.0 {
            if entry.keywords.is_empty() {
                return Err(AvatalkError::Config(format!(
                    "set '{}': command '{}' has no keywords",
                    set_id, cmd_id
                )));
            }
            check(&format!("command '{}' video", cmd_id), &entry.video)?;
        }

        if let Some(conv) = &self.conversation {
            check("talkingVideo", &conv.talking_video)?;
        }

        if !self.videos.iter().any(|v| v.is_idle) {
            tracing::warn!("⚠️ Set '{}' has no video tagged isIdle", set_id);
        }
        Ok(())
    }

    /// Whether a clip is tagged return-to-previous
    pub fn is_return_to_previous(&self, video: &str) -> bool {
        self.videos
            .iter()
            .any(|v| v.id == video && v.return_to_previous)
    }

    /// Clip source for a video id (path or URL; id itself as fallback)
    pub fn source_for(&self, video: &str) -> String {
        self.videos
            .iter()
            .find(|v| v.id == video)
            .and_then(|v| v.source.clone())
            .unwrap_or_else(|| video.to_string())
    }
}

/// Default document location
pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("avatalk")
        .join("videosets.json")
}
