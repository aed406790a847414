//! Scripted stand-in for the Slack Web API. Answers each method from a
//! script and records every call it receives.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use slack_sage_core::{
    HistoryResponse, PostMessageResponse, ReminderResponse, RepliesResponse, SearchResponse,
    SlackApi, SlackConnector, SlackError, UpstreamCredential,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayEntry {
    pub method: String,
    pub response: ReplayResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReplayResponse {
    Body { body: Value },
    Failure { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedCall {
    pub method: String,
    pub token: String,
    pub params: Value,
}

#[derive(Debug, Default)]
struct ReplayState {
    script: HashMap<String, ReplayResponse>,
    calls: Vec<RecordedCall>,
}

#[derive(Debug, Clone, Default)]
pub struct ReplaySlack {
    state: Arc<Mutex<ReplayState>>,
}

impl ReplaySlack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: impl IntoIterator<Item = ReplayEntry>) -> Self {
        let replay = Self::new();
        {
            let mut state = replay.lock();
            for entry in entries {
                state.script.insert(entry.method, entry.response);
            }
        }
        replay
    }

    /// Answers `method` with `body`, as Slack would over HTTP.
    pub fn respond(self, method: &str, body: Value) -> Self {
        self.lock()
            .script
            .insert(method.to_string(), ReplayResponse::Body { body });
        self
    }

    /// Fails `method` as if the network call never completed.
    pub fn fail(self, method: &str, message: &str) -> Self {
        self.lock().script.insert(
            method.to_string(),
            ReplayResponse::Failure {
                message: message.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, ReplayState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl SlackConnector for ReplaySlack {
    fn connect(&self, credential: &UpstreamCredential) -> Result<Box<dyn SlackApi>, SlackError> {
        Ok(Box::new(ReplaySession {
            replay: self.clone(),
            token: credential.expose().to_string(),
        }))
    }
}

struct ReplaySession {
    replay: ReplaySlack,
    token: String,
}

impl ReplaySession {
    fn exchange<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, SlackError> {
        let response = {
            let mut state = self.replay.lock();
            state.calls.push(RecordedCall {
                method: method.to_string(),
                token: self.token.clone(),
                params,
            });
            state.script.get(method).cloned()
        };

        match response {
            None => Err(SlackError::Internal(format!(
                "no replay entry for {method}"
            ))),
            Some(ReplayResponse::Failure { message }) => Err(SlackError::Transport(message)),
            Some(ReplayResponse::Body { body }) => {
                if body.get("ok").and_then(Value::as_bool) == Some(false) {
                    let code = body
                        .get("error")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown_error");
                    return Err(SlackError::Api(code.to_string()));
                }
                serde_json::from_value(body)
                    .map_err(|e| SlackError::Api(format!("invalid json response: {e}")))
            }
        }
    }
}

#[async_trait]
impl SlackApi for ReplaySession {
    async fn search_messages(
        &self,
        query: &str,
        count: u32,
    ) -> Result<SearchResponse, SlackError> {
        self.exchange("search.messages", json!({"query": query, "count": count}))
    }

    async fn fetch_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<RepliesResponse, SlackError> {
        self.exchange(
            "conversations.replies",
            json!({"channel": channel, "ts": thread_ts}),
        )
    }

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostMessageResponse, SlackError> {
        self.exchange(
            "chat.postMessage",
            json!({"channel": channel, "text": text, "thread_ts": thread_ts}),
        )
    }

    async fn fetch_history(
        &self,
        channel: &str,
        limit: u32,
        oldest: Option<&str>,
    ) -> Result<HistoryResponse, SlackError> {
        self.exchange(
            "conversations.history",
            json!({"channel": channel, "limit": limit, "oldest": oldest}),
        )
    }

    async fn create_reminder(
        &self,
        text: &str,
        time: &str,
    ) -> Result<ReminderResponse, SlackError> {
        self.exchange("reminders.add", json!({"text": text, "time": time}))
    }
}
