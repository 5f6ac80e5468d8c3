//! Chat API client
//!
//! Talks to the Slack Web API. A single `send` call covers new messages,
//! in-place updates and ephemeral messages; which endpoint is used depends on
//! the flags set on the [`Message`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use shipyard_core::domain::MessageRef;
use shipyard_core::dto::chat::Message;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{Timeouts, handle_response};

/// Sends chat messages
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Posts or updates a message
    ///
    /// # Returns
    /// Where the message now lives, for later updates or threaded replies
    async fn send(&self, message: &Message) -> Result<MessageRef>;
}

/// Which Web API method a message is sent through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatMethod {
    PostMessage,
    Update,
    PostEphemeral,
}

impl ChatMethod {
    pub fn for_message(message: &Message) -> Self {
        if message.update && !message.ts.is_empty() {
            ChatMethod::Update
        } else if message.ephemeral && !message.user.is_empty() {
            ChatMethod::PostEphemeral
        } else {
            ChatMethod::PostMessage
        }
    }

    pub fn path(&self) -> &'static str {
        match self {
            ChatMethod::PostMessage => "chat.postMessage",
            ChatMethod::Update => "chat.update",
            ChatMethod::PostEphemeral => "chat.postEphemeral",
        }
    }
}

/// Subset of the Web API envelope the orchestrator reads
#[derive(Debug, Deserialize)]
struct ChatResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    ts: Option<String>,
    #[serde(default)]
    message_ts: Option<String>,
}

/// HTTP implementation of ChatApi
#[derive(Clone)]
pub struct SlackClient {
    base_url: String,
    token: String,
    client: Client,
}

impl std::fmt::Debug for SlackClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SlackClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl SlackClient {
    /// Creates a new chat client
    ///
    /// # Arguments
    /// * `base_url` - Web API root (e.g., "https://slack.com/api")
    /// * `token` - Bot token sent as a bearer token
    /// * `timeouts` - Connect and request deadlines
    pub fn new(
        base_url: impl Into<String>,
        token: impl Into<String>,
        timeouts: Timeouts,
    ) -> Result<Self> {
        let client = timeouts.builder().build()?;
        Ok(Self::with_client(base_url, token, client))
    }

    /// Creates a new chat client with a custom HTTP client
    pub fn with_client(base_url: impl Into<String>, token: impl Into<String>, client: Client) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
            client,
        }
    }

    /// Get the base URL of the Web API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn endpoint(&self, method: ChatMethod) -> String {
        format!("{}/{}", self.base_url, method.path())
    }
}

#[async_trait]
impl ChatApi for SlackClient {
    async fn send(&self, message: &Message) -> Result<MessageRef> {
        let method = ChatMethod::for_message(message);
        debug!("Sending chat message via {} to {}", method.path(), message.channel);

        let response = self
            .client
            .post(self.endpoint(method))
            .bearer_auth(&self.token)
            .json(message)
            .send()
            .await?;

        let body: ChatResponse = handle_response(response).await?;
        into_message_ref(body, message)
    }
}

fn into_message_ref(body: ChatResponse, message: &Message) -> Result<MessageRef> {
    if !body.ok {
        return Err(ClientError::Chat(
            body.error.unwrap_or_else(|| "unknown_error".to_string()),
        ));
    }

    let channel = body.channel.unwrap_or_else(|| message.channel.clone());
    let ts = body
        .ts
        .or(body.message_ts)
        .unwrap_or_else(|| message.ts.clone());

    Ok(MessageRef::new(channel, ts))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> ChatResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_method_selection() {
        let post = Message::new("C1", "hi");
        assert_eq!(ChatMethod::for_message(&post), ChatMethod::PostMessage);

        let update = Message::new("C1", "hi").into_update("C1", "1.2");
        assert_eq!(ChatMethod::for_message(&update), ChatMethod::Update);

        // update without a timestamp falls back to a new post
        let mut dangling = Message::new("C1", "hi");
        dangling.update = true;
        assert_eq!(ChatMethod::for_message(&dangling), ChatMethod::PostMessage);

        let mut ephemeral = Message::new("C1", "hi");
        ephemeral.ephemeral = true;
        ephemeral.user = "U1".to_string();
        assert_eq!(ChatMethod::for_message(&ephemeral), ChatMethod::PostEphemeral);
    }

    #[test]
    fn test_endpoint() {
        let client = SlackClient::with_client("https://slack.com/api/", "t", Client::new());
        assert_eq!(client.base_url(), "https://slack.com/api");
        assert_eq!(
            client.endpoint(ChatMethod::Update),
            "https://slack.com/api/chat.update"
        );
    }

    #[test]
    fn test_ok_response_yields_reference() {
        let body = parse(r#"{"ok": true, "channel": "D42", "ts": "1700000000.000100"}"#);
        let sent = into_message_ref(body, &Message::new("U42", "hi")).unwrap();

        assert_eq!(sent, MessageRef::new("D42", "1700000000.000100"));
    }

    #[test]
    fn test_ephemeral_response_uses_message_ts() {
        let body = parse(r#"{"ok": true, "message_ts": "1.5"}"#);
        let sent = into_message_ref(body, &Message::new("C1", "hi")).unwrap();

        assert_eq!(sent, MessageRef::new("C1", "1.5"));
    }

    #[test]
    fn test_not_ok_response_is_error() {
        let body = parse(r#"{"ok": false, "error": "channel_not_found"}"#);
        let err = into_message_ref(body, &Message::new("C1", "hi")).unwrap_err();

        assert!(matches!(err, ClientError::Chat(ref e) if e == "channel_not_found"));
    }
}
