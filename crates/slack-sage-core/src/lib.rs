//! Core domain types and upstream traits for slack-sage.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnError};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    String,
    Number,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
        }
    }

    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            FieldKind::String => value.is_string(),
            FieldKind::Number => value.is_number(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct FieldContract {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
    pub description: &'static str,
}

/// Static description of a tool: its stable name, purpose and input contract.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_contract: &'static [FieldContract],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInvocation {
    pub tool_name: String,
    pub arguments: Map<String, Value>,
}

impl ToolInvocation {
    pub fn new(tool_name: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Content {
    Text { text: String },
}

/// Response envelope returned for every invocation, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<Content>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_error: bool,
}

impl ToolResult {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Self {
            content: vec![Content::Text {
                text: format!("Error: {message}"),
            }],
            is_error: true,
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.content.iter().find_map(|item| match item {
            Content::Text { text } => Some(text.as_str()),
        })
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Bearer token supplied with a single invocation. Never logged.
#[derive(Clone)]
pub struct UpstreamCredential(String);

impl UpstreamCredential {
    pub fn new(raw: impl Into<String>) -> Result<Self, SlackError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(SlackError::Validation("token cannot be empty".to_string()));
        }
        Ok(Self(raw))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for UpstreamCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("UpstreamCredential(<redacted>)")
    }
}

// Upstream response shapes. Every field is optional and a value of the wrong
// type reads as absent; the handlers own the defaulting.

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub messages: Option<SearchMessages>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMessages {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub total: Option<u64>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub matches: Option<Vec<SearchMatch>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub text: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub username: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ts: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub channel: Option<MatchChannel>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub permalink: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchChannel {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub id: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub name: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepliesResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub messages: Option<Vec<ThreadMessage>>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ThreadMessage {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub text: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub user: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ts: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub reply_count: Option<u64>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostMessageResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ok: bool,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub channel: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ts: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub messages: Option<Vec<HistoryMessage>>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub has_more: Option<bool>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub text: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub user: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ts: Option<String>,
    #[serde(rename = "type")]
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub kind: Option<String>,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub subtype: Option<String>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReminderResponse {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub ok: bool,
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub reminder: Option<Reminder>,
}

#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reminder {
    #[serde_as(deserialize_as = "DefaultOnError")]
    #[serde(default)]
    pub id: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum SlackError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("authentication error")]
    Authentication,
    #[error("rate limited")]
    RateLimited,
    #[error("Slack API error: {0}")]
    Api(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("internal error: {0}")]
    Internal(String),
}

/// The messaging-platform operations the tool handlers consume.
#[async_trait]
pub trait SlackApi: Send + Sync {
    async fn search_messages(&self, query: &str, count: u32)
        -> Result<SearchResponse, SlackError>;

    async fn fetch_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<RepliesResponse, SlackError>;

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostMessageResponse, SlackError>;

    async fn fetch_history(
        &self,
        channel: &str,
        limit: u32,
        oldest: Option<&str>,
    ) -> Result<HistoryResponse, SlackError>;

    async fn create_reminder(&self, text: &str, time: &str)
        -> Result<ReminderResponse, SlackError>;
}

/// Builds a fresh upstream handle bound to one invocation's credential.
pub trait SlackConnector: Send + Sync {
    fn connect(&self, credential: &UpstreamCredential) -> Result<Box<dyn SlackApi>, SlackError>;
}
