//! The fixed set of tools this server exposes.

use slack_sage_core::{FieldContract, FieldKind, ToolDescriptor};

pub const DEFAULT_SEARCH_COUNT: u32 = 20;
pub const DEFAULT_HISTORY_LIMIT: u32 = 100;

const fn required(
    name: &'static str,
    kind: FieldKind,
    description: &'static str,
) -> FieldContract {
    FieldContract {
        name,
        kind,
        required: true,
        description,
    }
}

const fn optional(
    name: &'static str,
    kind: FieldKind,
    description: &'static str,
) -> FieldContract {
    FieldContract {
        name,
        kind,
        required: false,
        description,
    }
}

const TOKEN: FieldContract = required("token", FieldKind::String, "Slack bot token");

/// Registry order. `ToolName` indexes into this slice.
static TOOLS: &[ToolDescriptor] = &[
    ToolDescriptor {
        name: "search_messages",
        description: "Search for messages across all channels",
        input_contract: &[
            required(
                "query",
                FieldKind::String,
                "Search query (supports Slack search syntax)",
            ),
            optional(
                "count",
                FieldKind::Number,
                "Number of results to return (default: 20)",
            ),
            TOKEN,
        ],
    },
    ToolDescriptor {
        name: "get_thread",
        description: "Get all messages in a thread",
        input_contract: &[
            required("channel", FieldKind::String, "Channel ID"),
            required(
                "threadTs",
                FieldKind::String,
                "Thread timestamp (parent message timestamp)",
            ),
            TOKEN,
        ],
    },
    ToolDescriptor {
        name: "post_message",
        description: "Post a message to a channel or thread",
        input_contract: &[
            required("channel", FieldKind::String, "Channel ID or name"),
            required(
                "text",
                FieldKind::String,
                "Message text (supports Slack markdown)",
            ),
            optional(
                "threadTs",
                FieldKind::String,
                "Thread timestamp (to reply in thread)",
            ),
            TOKEN,
        ],
    },
    ToolDescriptor {
        name: "get_channel_history",
        description: "Get recent messages from a channel",
        input_contract: &[
            required("channel", FieldKind::String, "Channel ID"),
            optional(
                "limit",
                FieldKind::Number,
                "Number of messages to retrieve (default: 100)",
            ),
            optional(
                "oldest",
                FieldKind::String,
                "Timestamp to get messages after",
            ),
            TOKEN,
        ],
    },
    ToolDescriptor {
        name: "create_reminder",
        description: "Create a reminder for yourself or a user",
        input_contract: &[
            required("text", FieldKind::String, "Reminder text"),
            required(
                "time",
                FieldKind::String,
                "When to send reminder (Unix timestamp or natural language)",
            ),
            TOKEN,
        ],
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolName {
    SearchMessages,
    GetThread,
    PostMessage,
    GetChannelHistory,
    CreateReminder,
}

impl ToolName {
    pub const ALL: [ToolName; 5] = [
        ToolName::SearchMessages,
        ToolName::GetThread,
        ToolName::PostMessage,
        ToolName::GetChannelHistory,
        ToolName::CreateReminder,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ToolName::SearchMessages => "search_messages",
            ToolName::GetThread => "get_thread",
            ToolName::PostMessage => "post_message",
            ToolName::GetChannelHistory => "get_channel_history",
            ToolName::CreateReminder => "create_reminder",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|tool| tool.as_str() == name)
    }

    pub fn descriptor(&self) -> &'static ToolDescriptor {
        &TOOLS[*self as usize]
    }
}

/// Every tool descriptor, in stable registry order.
pub fn list_tools() -> &'static [ToolDescriptor] {
    TOOLS
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn listed_names_match_dispatchable_names() {
        let listed: Vec<&str> = list_tools().iter().map(|tool| tool.name).collect();
        let dispatchable: Vec<&str> = ToolName::ALL.iter().map(ToolName::as_str).collect();
        assert_eq!(listed, dispatchable);

        for tool in ToolName::ALL {
            assert_eq!(tool.descriptor().name, tool.as_str());
            assert_eq!(ToolName::parse(tool.as_str()), Some(tool));
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = list_tools().iter().map(|tool| tool.name).collect();
        assert_eq!(names.len(), list_tools().len());
    }

    #[test]
    fn listing_is_idempotent() {
        let first: Vec<&str> = list_tools().iter().map(|tool| tool.name).collect();
        let second: Vec<&str> = list_tools().iter().map(|tool| tool.name).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn every_tool_requires_a_token() {
        for tool in list_tools() {
            let token = tool
                .input_contract
                .iter()
                .find(|field| field.name == "token")
                .unwrap();
            assert!(token.required, "{} must require a token", tool.name);
        }
    }

    #[test]
    fn unknown_name_does_not_parse() {
        assert_eq!(ToolName::parse("delete_channel"), None);
        assert_eq!(ToolName::parse(""), None);
    }
}
