//! Tool registry, argument validation and Slack tool handlers.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use slack_sage_core::{SlackConnector, SlackError, ToolDescriptor};
use tracing::debug;

pub mod handlers;
pub mod registry;
pub mod validate;

pub use registry::{list_tools, ToolName};
pub use validate::{validate, ValidatedArguments};

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Upstream(#[from] SlackError),
    #[error("failed to encode tool output: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn tools(&self) -> &[ToolDescriptor];

    async fn call(&self, name: &str, input: Map<String, Value>) -> Result<Value, ToolError>;
}

/// Executes the Slack tools, opening a fresh upstream handle for every call.
pub struct SlackTools<C> {
    connector: C,
}

impl<C: SlackConnector> SlackTools<C> {
    pub fn new(connector: C) -> Self {
        Self { connector }
    }
}

#[async_trait]
impl<C: SlackConnector> ToolExecutor for SlackTools<C> {
    fn tools(&self) -> &[ToolDescriptor] {
        list_tools()
    }

    async fn call(&self, name: &str, input: Map<String, Value>) -> Result<Value, ToolError> {
        let args = validate(name, input)?;
        let api = self.connector.connect(&args.credential()?)?;
        debug!(tool = name, "arguments validated, calling upstream");

        let api = api.as_ref();
        match args.tool() {
            ToolName::SearchMessages => encode(handlers::search_messages(api, args.parse()?).await?),
            ToolName::GetThread => encode(handlers::get_thread(api, args.parse()?).await?),
            ToolName::PostMessage => encode(handlers::post_message(api, args.parse()?).await?),
            ToolName::GetChannelHistory => {
                encode(handlers::get_channel_history(api, args.parse()?).await?)
            }
            ToolName::CreateReminder => {
                encode(handlers::create_reminder(api, args.parse()?).await?)
            }
        }
    }
}

fn encode<T: Serialize>(output: T) -> Result<Value, ToolError> {
    Ok(serde_json::to_value(output)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slack_sage_replay::ReplaySlack;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("test arguments must be an object"),
        }
    }

    #[tokio::test]
    async fn each_call_uses_its_own_token() {
        let replay = ReplaySlack::new().respond(
            "reminders.add",
            json!({"ok": true, "reminder": {"id": "Rm1"}}),
        );
        let tools = SlackTools::new(replay.clone());

        tools
            .call(
                "create_reminder",
                args(json!({"text": "a", "time": "in 1 minute", "token": "xoxb-one"})),
            )
            .await
            .unwrap();
        tools
            .call(
                "create_reminder",
                args(json!({"text": "b", "time": "in 2 minutes", "token": "xoxb-two"})),
            )
            .await
            .unwrap();

        let tokens: Vec<String> = replay.calls().into_iter().map(|c| c.token).collect();
        assert_eq!(tokens, vec!["xoxb-one", "xoxb-two"]);
    }

    #[tokio::test]
    async fn reminder_output_shape() {
        let replay = ReplaySlack::new().respond(
            "reminders.add",
            json!({"ok": true, "reminder": {"id": "Rm1"}}),
        );
        let output = SlackTools::new(replay)
            .call(
                "create_reminder",
                args(json!({"text": "standup", "time": "tomorrow at 9am", "token": "t"})),
            )
            .await
            .unwrap();

        assert_eq!(
            output,
            json!({
                "success": true,
                "reminderId": "Rm1",
                "text": "standup",
                "time": "tomorrow at 9am"
            })
        );
    }

    #[tokio::test]
    async fn invalid_arguments_never_reach_upstream() {
        let replay = ReplaySlack::new();
        let err = SlackTools::new(replay.clone())
            .call("search_messages", args(json!({"token": "t"})))
            .await
            .unwrap_err();

        assert!(matches!(err, ToolError::InvalidArgument(_)));
        assert!(replay.calls().is_empty());
    }

    #[tokio::test]
    async fn thread_output_counts_replies() {
        let replay = ReplaySlack::new().respond(
            "conversations.replies",
            json!({
                "ok": true,
                "messages": [
                    {"text": "parent", "user": "U1", "ts": "1.0", "reply_count": 1},
                    {"text": "child", "user": "U2", "ts": "1.1"}
                ]
            }),
        );
        let output = SlackTools::new(replay)
            .call(
                "get_thread",
                args(json!({"channel": "C1", "threadTs": "1.0", "token": "t"})),
            )
            .await
            .unwrap();

        assert_eq!(output["threadTs"], "1.0");
        assert_eq!(output["messageCount"], 2);
        assert_eq!(output["messages"][0]["replyCount"], 1);
        assert_eq!(output["messages"][1]["replyCount"], 0);
    }
}
