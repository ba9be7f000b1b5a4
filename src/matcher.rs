//! Command matching
//!
//! Maps recognized text to a target video through the per-set keyword
//! table. Matching is pure: callers apply playback and audio effects.
//!
//! Three tiers are tried in priority order, first success wins:
//! 1. exact single-character keywords (logographic commands), leftmost
//!    occurrence in the input wins
//! 2. exact whitespace-delimited word equality, case-insensitive, command
//!    declaration order wins regardless of token position
//! 3. case-insensitive substring scan, smallest first-occurrence offset
//!    wins, declaration order breaks ties

use crate::config::VideoSet;
use tracing::debug;

/// A configured command: one or more keywords mapped to a clip
#[derive(Debug, Clone)]
pub struct Command {
    pub id: String,
    pub keywords: Vec<String>,
    pub video: String,
    pub return_to_previous: bool,
}

/// A successful keyword match
#[derive(Debug, Clone, PartialEq)]
pub struct CommandMatch {
    pub command_id: String,
    pub video: String,
    pub matched_keyword: String,
    pub return_to_previous: bool,
}

/// Keyword table for one configuration set, in declaration order
#[derive(Debug, Clone, Default)]
pub struct CommandTable {
    commands: Vec<Command>,
}

impl CommandTable {
    pub fn new(commands: Vec<Command>) -> Self {
        Self { commands }
    }

    /// Build the table from a configuration set, preserving declaration order
    pub fn from_set(set: &VideoSet) -> Self {
        let commands = set
            .commands
            .0
            .iter()
            .map(|(id, entry)| Command {
                id: id.clone(),
                keywords: entry.keywords.clone(),
                video: entry.video.clone(),
                return_to_previous: entry.return_to_previous,
            })
            .collect();
        Self { commands }
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Match recognized text against the table. `None` means no command
    /// claimed the text (the conversation fallback signal).
    pub fn match_text(&self, text: &str) -> Option<CommandMatch> {
        if text.trim().is_empty() {
            return None;
        }

        if let Some(m) = self.match_single_char(text) {
            debug!("🎯 Matched '{}' via character tier", m.matched_keyword);
            return Some(m);
        }
        if let Some(m) = self.match_exact_word(text) {
            debug!("🎯 Matched '{}' via word tier", m.matched_keyword);
            return Some(m);
        }
        if let Some(m) = self.match_substring(text) {
            debug!("🎯 Matched '{}' via substring tier", m.matched_keyword);
            return Some(m);
        }
        None
    }

    /// Tier 1: each input character against single-character keywords,
    /// exact equality only. Scanning the text left to right makes the
    /// leftmost occurrence win; declaration order settles a shared character.
    fn match_single_char(&self, text: &str) -> Option<CommandMatch> {
        for ch in text.chars() {
            for cmd in &self.commands {
                for keyword in &cmd.keywords {
                    let mut kw_chars = keyword.chars();
                    if kw_chars.next() == Some(ch) && kw_chars.next().is_none() {
                        return Some(self.hit(cmd, keyword));
                    }
                }
            }
        }
        None
    }

    /// Tier 2: whitespace tokens against keywords, case-folded equality.
    /// Declaration order wins; token position is not considered.
    fn match_exact_word(&self, text: &str) -> Option<CommandMatch> {
        let tokens: Vec<String> = text
            .split_whitespace()
            .map(|t| t.to_lowercase())
            .collect();
        for cmd in &self.commands {
            for keyword in &cmd.keywords {
                let folded = keyword.to_lowercase();
                if tokens.iter().any(|t| *t == folded) {
                    return Some(self.hit(cmd, keyword));
                }
            }
        }
        None
    }

    /// Tier 3: case-insensitive substring scan. The keyword whose first
    /// occurrence sits earliest in the text wins; offset ties fall back to
    /// declaration order (strictly-smaller comparison keeps the earliest
    /// declared candidate).
    fn match_substring(&self, text: &str) -> Option<CommandMatch> {
        let folded_text = text.to_lowercase();
        let mut best: Option<(usize, CommandMatch)> = None;
        for cmd in &self.commands {
            for keyword in &cmd.keywords {
                let folded = keyword.to_lowercase();
                if folded.is_empty() {
                    continue;
                }
                if let Some(offset) = folded_text.find(&folded) {
                    let better = match &best {
                        Some((best_offset, _)) => offset < *best_offset,
                        None => true,
                    };
                    if better {
                        best = Some((offset, self.hit(cmd, keyword)));
                    }
                }
            }
        }
        best.map(|(_, m)| m)
    }

    fn hit(&self, cmd: &Command, keyword: &str) -> CommandMatch {
        CommandMatch {
            command_id: cmd.id.clone(),
            video: cmd.video.clone(),
            matched_keyword: keyword.to_string(),
            return_to_previous: cmd.return_to_previous,
        }
    }
}
