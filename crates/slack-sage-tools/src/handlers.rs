//! One handler per tool. Each makes exactly one upstream call and folds the
//! response into a fixed output shape; the `normalize_*` step is pure.

use crate::registry::{DEFAULT_HISTORY_LIMIT, DEFAULT_SEARCH_COUNT};
use serde::{Deserialize, Serialize};
use slack_sage_core::{
    HistoryResponse, PostMessageResponse, ReminderResponse, RepliesResponse, SearchResponse,
    SlackApi, SlackError,
};

#[derive(Debug, Clone, Deserialize)]
pub struct SearchMessagesArgs {
    pub query: String,
    pub count: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetThreadArgs {
    pub channel: String,
    pub thread_ts: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageArgs {
    pub channel: String,
    pub text: String,
    pub thread_ts: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GetChannelHistoryArgs {
    pub channel: String,
    pub limit: Option<f64>,
    pub oldest: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateReminderArgs {
    pub text: String,
    pub time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOutput {
    pub total: u64,
    pub messages: Vec<SearchHit>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub text: String,
    pub user: String,
    pub timestamp: String,
    pub channel: String,
    pub permalink: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadOutput {
    pub thread_ts: String,
    pub message_count: usize,
    pub messages: Vec<ThreadReply>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadReply {
    pub text: String,
    pub user: String,
    pub timestamp: String,
    pub reply_count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostOutput {
    pub success: bool,
    pub channel: String,
    pub timestamp: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryOutput {
    pub channel: String,
    pub message_count: usize,
    pub has_more: bool,
    pub messages: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub text: String,
    pub user: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub subtype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOutput {
    pub success: bool,
    pub reminder_id: String,
    pub text: String,
    pub time: String,
}

pub async fn search_messages(
    api: &dyn SlackApi,
    args: SearchMessagesArgs,
) -> Result<SearchOutput, SlackError> {
    let count = positive_or(args.count, DEFAULT_SEARCH_COUNT);
    let response = api.search_messages(&args.query, count).await?;
    Ok(normalize_search(response))
}

pub async fn get_thread(
    api: &dyn SlackApi,
    args: GetThreadArgs,
) -> Result<ThreadOutput, SlackError> {
    let response = api.fetch_replies(&args.channel, &args.thread_ts).await?;
    Ok(normalize_thread(args.thread_ts, response))
}

pub async fn post_message(
    api: &dyn SlackApi,
    args: PostMessageArgs,
) -> Result<PostOutput, SlackError> {
    let thread_ts = non_empty(args.thread_ts.as_deref());
    let response = api
        .post_message(&args.channel, &args.text, thread_ts)
        .await?;
    Ok(normalize_post(args.channel, args.text, response))
}

pub async fn get_channel_history(
    api: &dyn SlackApi,
    args: GetChannelHistoryArgs,
) -> Result<HistoryOutput, SlackError> {
    let limit = positive_or(args.limit, DEFAULT_HISTORY_LIMIT);
    let oldest = non_empty(args.oldest.as_deref());
    let response = api.fetch_history(&args.channel, limit, oldest).await?;
    Ok(normalize_history(args.channel, response))
}

pub async fn create_reminder(
    api: &dyn SlackApi,
    args: CreateReminderArgs,
) -> Result<ReminderOutput, SlackError> {
    let response = api.create_reminder(&args.text, &args.time).await?;
    Ok(normalize_reminder(args.text, args.time, response))
}

pub fn normalize_search(response: SearchResponse) -> SearchOutput {
    let Some(found) = response.messages else {
        return SearchOutput {
            total: 0,
            messages: vec![],
        };
    };
    let Some(matches) = found.matches else {
        return SearchOutput {
            total: 0,
            messages: vec![],
        };
    };

    let messages = matches
        .into_iter()
        .map(|hit| SearchHit {
            text: or_default(hit.text, ""),
            user: or_default(hit.username, "Unknown"),
            timestamp: or_default(hit.ts, ""),
            channel: or_default(hit.channel.and_then(|c| c.name), "Unknown"),
            permalink: or_default(hit.permalink, ""),
        })
        .collect();

    SearchOutput {
        total: found.total.unwrap_or(0),
        messages,
    }
}

pub fn normalize_thread(thread_ts: String, response: RepliesResponse) -> ThreadOutput {
    let messages: Vec<ThreadReply> = response
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|msg| ThreadReply {
            text: or_default(msg.text, ""),
            user: or_default(msg.user, "Unknown"),
            timestamp: or_default(msg.ts, ""),
            reply_count: msg.reply_count.unwrap_or(0),
        })
        .collect();

    ThreadOutput {
        thread_ts,
        message_count: messages.len(),
        messages,
    }
}

pub fn normalize_post(channel: String, text: String, response: PostMessageResponse) -> PostOutput {
    PostOutput {
        success: response.ok,
        channel: response
            .channel
            .filter(|posted| !posted.is_empty())
            .unwrap_or(channel),
        timestamp: or_default(response.ts, ""),
        message: text,
    }
}

pub fn normalize_history(channel: String, response: HistoryResponse) -> HistoryOutput {
    let messages: Vec<HistoryEntry> = response
        .messages
        .unwrap_or_default()
        .into_iter()
        .map(|msg| HistoryEntry {
            text: or_default(msg.text, ""),
            user: or_default(msg.user, "System"),
            timestamp: or_default(msg.ts, ""),
            kind: or_default(msg.kind, "message"),
            subtype: msg.subtype.filter(|subtype| !subtype.is_empty()),
        })
        .collect();

    HistoryOutput {
        channel,
        message_count: messages.len(),
        has_more: response.has_more.unwrap_or(false),
        messages,
    }
}

pub fn normalize_reminder(text: String, time: String, response: ReminderResponse) -> ReminderOutput {
    ReminderOutput {
        success: response.ok,
        reminder_id: or_default(response.reminder.and_then(|r| r.id), "unknown"),
        text,
        time,
    }
}

// Empty upstream strings count as absent.
fn or_default(value: Option<String>, default: &str) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn positive_or(value: Option<f64>, default: u32) -> u32 {
    match value {
        Some(n) if n.is_finite() && n >= 1.0 => n.min(f64::from(u32::MAX)) as u32,
        _ => default,
    }
}
