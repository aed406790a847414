//! High-level slack-sage dispatch.

use serde_json::Value;
use slack_sage_core::{SlackConnector, ToolDescriptor, ToolInvocation, ToolResult};
use slack_sage_tools::{SlackTools, ToolError, ToolExecutor};
use std::sync::Arc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

/// Routes invocations to the executor and turns every outcome into a
/// [`ToolResult`]. Failures never escape as errors.
#[derive(Clone)]
pub struct Dispatcher {
    executor: Arc<dyn ToolExecutor>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self { executor }
    }

    pub fn slack<C: SlackConnector + 'static>(connector: C) -> Self {
        Self::new(Arc::new(SlackTools::new(connector)))
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        self.executor.tools()
    }

    pub async fn dispatch(&self, invocation: ToolInvocation) -> ToolResult {
        let span = info_span!(
            "tool_call",
            invocation_id = %Uuid::new_v4(),
            tool = %invocation.tool_name
        );
        let executor = Arc::clone(&self.executor);

        async move {
            // Run on its own task so a panicking handler is reported like any
            // other failure.
            let outcome = tokio::spawn(
                async move {
                    executor
                        .call(&invocation.tool_name, invocation.arguments)
                        .await
                        .and_then(render)
                }
                .in_current_span(),
            )
            .await;

            match outcome {
                Ok(Ok(text)) => {
                    info!("tool call succeeded");
                    ToolResult::text(text)
                }
                Ok(Err(error)) => {
                    warn!(error = %error, "tool call failed");
                    ToolResult::error(error)
                }
                Err(join_error) => {
                    warn!(error = %join_error, "tool call aborted");
                    ToolResult::error("tool handler aborted unexpectedly")
                }
            }
        }
        .instrument(span)
        .await
    }
}

fn render(output: Value) -> Result<String, ToolError> {
    Ok(serde_json::to_string_pretty(&output)?)
}

pub use slack_sage_core;
pub use slack_sage_tools;

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{json, Map};
    use slack_sage_replay::ReplaySlack;

    fn invocation(name: &str, arguments: Value) -> ToolInvocation {
        let arguments = match arguments {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        ToolInvocation::new(name, arguments)
    }

    fn payload(result: &ToolResult) -> Value {
        serde_json::from_str(result.first_text().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn valid_invocation_yields_json_payload() {
        let replay = ReplaySlack::new().respond(
            "conversations.history",
            json!({
                "ok": true,
                "has_more": true,
                "messages": [{"type": "message", "text": "hello", "user": "U1", "ts": "1.0"}]
            }),
        );
        let dispatcher = Dispatcher::slack(replay);

        let result = dispatcher
            .dispatch(invocation(
                "get_channel_history",
                json!({"channel": "C1", "token": "t"}),
            ))
            .await;

        assert!(!result.is_error);
        assert_eq!(result.content.len(), 1);
        assert_eq!(
            payload(&result),
            json!({
                "channel": "C1",
                "messageCount": 1,
                "hasMore": true,
                "messages": [{
                    "text": "hello",
                    "user": "U1",
                    "timestamp": "1.0",
                    "type": "message",
                    "subtype": null
                }]
            })
        );
    }

    #[tokio::test]
    async fn unknown_tool_is_a_text_error() {
        let dispatcher = Dispatcher::slack(ReplaySlack::new());
        let result = dispatcher
            .dispatch(invocation("archive_channel", json!({})))
            .await;

        assert!(result.is_error);
        assert_eq!(result.first_text(), Some("Error: Unknown tool: archive_channel"));
    }

    #[tokio::test]
    async fn missing_required_field_is_a_text_error() {
        let dispatcher = Dispatcher::slack(ReplaySlack::new());
        let result = dispatcher
            .dispatch(invocation("post_message", json!({"channel": "C1", "token": "t"})))
            .await;

        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: Invalid argument: missing required field 'text'")
        );
    }

    #[tokio::test]
    async fn search_without_matches_defaults() {
        let replay = ReplaySlack::new().respond("search.messages", json!({"ok": true}));
        let result = Dispatcher::slack(replay)
            .dispatch(invocation(
                "search_messages",
                json!({"query": "nothing", "token": "t"}),
            ))
            .await;

        assert_eq!(payload(&result), json!({"total": 0, "messages": []}));
    }

    #[tokio::test]
    async fn post_message_echoes_input() {
        let replay = ReplaySlack::new().respond(
            "chat.postMessage",
            json!({"ok": true, "channel": "C1", "ts": "123.456"}),
        );
        let result = Dispatcher::slack(replay)
            .dispatch(invocation(
                "post_message",
                json!({"channel": "C1", "text": "hi", "token": "t"}),
            ))
            .await;

        assert_eq!(
            payload(&result),
            json!({"success": true, "channel": "C1", "timestamp": "123.456", "message": "hi"})
        );
    }

    #[tokio::test]
    async fn upstream_rejection_is_isolated() {
        let replay = ReplaySlack::new().fail("search.messages", "connection reset by peer");
        let result = Dispatcher::slack(replay)
            .dispatch(invocation("search_messages", json!({"query": "q", "token": "t"})))
            .await;

        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: transport error: connection reset by peer")
        );
    }

    #[tokio::test]
    async fn payload_is_pretty_printed() {
        let replay = ReplaySlack::new().respond(
            "reminders.add",
            json!({"ok": true, "reminder": {"id": "Rm1"}}),
        );
        let result = Dispatcher::slack(replay)
            .dispatch(invocation(
                "create_reminder",
                json!({"text": "stretch", "time": "in 1 hour", "token": "t"}),
            ))
            .await;

        assert!(result.first_text().unwrap().contains("\n  \"reminderId\": \"Rm1\""));
    }

    #[tokio::test]
    async fn listing_is_stable_across_calls() {
        let dispatcher = Dispatcher::slack(ReplaySlack::new());
        let first: Vec<&str> = dispatcher.list_tools().iter().map(|t| t.name).collect();
        let second: Vec<&str> = dispatcher.list_tools().iter().map(|t| t.name).collect();
        assert_eq!(first, second);
        assert_eq!(first.len(), 5);
    }

    struct PanickingTools;

    #[async_trait]
    impl ToolExecutor for PanickingTools {
        fn tools(&self) -> &[ToolDescriptor] {
            &[]
        }

        async fn call(&self, _name: &str, _input: Map<String, Value>) -> Result<Value, ToolError> {
            panic!("handler bug");
        }
    }

    #[tokio::test]
    async fn panicking_handler_still_yields_envelope() {
        let dispatcher = Dispatcher::new(Arc::new(PanickingTools));
        let result = dispatcher.dispatch(invocation("anything", json!({}))).await;

        assert!(result.is_error);
        assert_eq!(
            result.first_text(),
            Some("Error: tool handler aborted unexpectedly")
        );
    }
}
