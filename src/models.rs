//! Data models passed between pipeline stages.
//!
//! - [`NewsItem`]: one ingested headline
//! - [`KeyEvent`]: a notable happening extracted from the stage-1 overview
//! - [`SearchResult`]: an ephemeral web-search hit used to enrich a deep dive
//! - [`ChatMessage`]: one role-tagged message of a chat-completion request
//! - [`PipelineResult`]: the complete three-stage output of one run

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single news item as handed over by the ingestion side.
///
/// Only the title is consumed by the pipeline. Other fields present in the
/// input (content, source, url, ...) are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct NewsItem {
    pub title: String,
}

impl NewsItem {
    #[cfg(test)]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }
}

/// One-sentence description of a notable event in the overview.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct KeyEvent(String);

impl KeyEvent {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A web-search hit. Produced and consumed within a single deep dive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

/// Speaker of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A role-tagged message as sent to the chat-completion endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The complete output of one pipeline run.
///
/// Every field is always populated; a stage that could not produce real
/// output carries its fallback placeholder text instead.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct PipelineResult {
    /// The daily overview generated from all titles.
    pub stage_one: String,
    /// One deep-dive analysis per key event, at most three.
    pub stage_two: Vec<String>,
    /// The final synthesis of implications.
    pub stage_three: String,
}
