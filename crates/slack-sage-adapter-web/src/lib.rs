use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use slack_sage_core::{
    HistoryResponse, PostMessageResponse, ReminderResponse, RepliesResponse, SearchResponse,
    SlackApi, SlackConnector, SlackError, UpstreamCredential,
};
use tracing::{trace, warn};
use url::Url;

pub const SLACK_API_BASE: &str = "https://slack.com/api/";

/// Opens a new [`SlackWebClient`] per credential. Holds no tokens itself.
#[derive(Clone, Debug)]
pub struct SlackWebConnector {
    pub base_url: Url,
}

impl SlackWebConnector {
    pub fn with_base_url(base_url: Url) -> Self {
        Self {
            base_url: with_trailing_slash(base_url),
        }
    }
}

impl SlackConnector for SlackWebConnector {
    fn connect(&self, credential: &UpstreamCredential) -> Result<Box<dyn SlackApi>, SlackError> {
        let client = SlackWebClient::with_base_url(credential.clone(), self.base_url.clone())?;
        Ok(Box::new(client))
    }
}

#[derive(Clone, Debug)]
pub struct SlackWebClient {
    credential: UpstreamCredential,
    pub base_url: Url,
    client: HttpClient,
}

impl SlackWebClient {
    pub fn with_base_url(credential: UpstreamCredential, base_url: Url) -> Result<Self, SlackError> {
        let client = HttpClient::builder()
            .build()
            .map_err(|e| SlackError::Internal(format!("failed to build http client: {e}")))?;
        Ok(Self {
            credential,
            base_url: with_trailing_slash(base_url),
            client,
        })
    }

    fn endpoint_url(&self, method: &str) -> Result<Url, SlackError> {
        self.base_url
            .join(method)
            .map_err(|e| SlackError::Internal(format!("failed to construct endpoint url: {e}")))
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, SlackError> {
        let url = self.endpoint_url(method)?;
        trace!(method, "calling Slack Web API");

        let response = self
            .client
            .post(url)
            .bearer_auth(self.credential.expose())
            .form(params)
            .send()
            .await
            .map_err(|e| SlackError::Transport(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            warn!(method, status = %status, "Slack API returned an error status");
            return Err(parse_http_error(status, text));
        }

        let payload = response
            .json::<Value>()
            .await
            .map_err(|e| SlackError::Api(format!("invalid json response: {e}")))?;
        check_ok(&payload)?;
        serde_json::from_value(payload)
            .map_err(|e| SlackError::Api(format!("unexpected response shape: {e}")))
    }
}

#[async_trait]
impl SlackApi for SlackWebClient {
    async fn search_messages(
        &self,
        query: &str,
        count: u32,
    ) -> Result<SearchResponse, SlackError> {
        self.call(
            "search.messages",
            &[("query", query.to_string()), ("count", count.to_string())],
        )
        .await
    }

    async fn fetch_replies(
        &self,
        channel: &str,
        thread_ts: &str,
    ) -> Result<RepliesResponse, SlackError> {
        self.call(
            "conversations.replies",
            &[("channel", channel.to_string()), ("ts", thread_ts.to_string())],
        )
        .await
    }

    async fn post_message(
        &self,
        channel: &str,
        text: &str,
        thread_ts: Option<&str>,
    ) -> Result<PostMessageResponse, SlackError> {
        let mut params = vec![("channel", channel.to_string()), ("text", text.to_string())];
        if let Some(thread_ts) = thread_ts {
            params.push(("thread_ts", thread_ts.to_string()));
        }
        self.call("chat.postMessage", &params).await
    }

    async fn fetch_history(
        &self,
        channel: &str,
        limit: u32,
        oldest: Option<&str>,
    ) -> Result<HistoryResponse, SlackError> {
        let mut params = vec![("channel", channel.to_string()), ("limit", limit.to_string())];
        if let Some(oldest) = oldest {
            params.push(("oldest", oldest.to_string()));
        }
        self.call("conversations.history", &params).await
    }

    async fn create_reminder(
        &self,
        text: &str,
        time: &str,
    ) -> Result<ReminderResponse, SlackError> {
        self.call(
            "reminders.add",
            &[("text", text.to_string()), ("time", time.to_string())],
        )
        .await
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn parse_http_error(status: StatusCode, body: String) -> SlackError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => SlackError::Authentication,
        StatusCode::TOO_MANY_REQUESTS => SlackError::RateLimited,
        _ => SlackError::Api(extract_api_error(body)),
    }
}

fn extract_api_error(body: String) -> String {
    serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(ToString::to_string))
        .unwrap_or(body)
}

/// Slack reports most failures as HTTP 200 with `"ok": false`.
fn check_ok(payload: &Value) -> Result<(), SlackError> {
    if payload.get("ok").and_then(Value::as_bool) != Some(false) {
        return Ok(());
    }
    let code = payload
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or("unknown_error");
    Err(match code {
        "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked" => {
            SlackError::Authentication
        }
        "ratelimited" => SlackError::RateLimited,
        other => SlackError::Api(other.to_string()),
    })
}
