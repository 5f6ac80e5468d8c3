//! Chat delivery
//!
//! Thin layer over [`ChatApi`] that names the recipient in every error and
//! sends to many recipients at once.

use futures::future::join_all;
use shipyard_client::{ChatApi, ClientError};
use shipyard_core::domain::MessageRef;
use shipyard_core::dto::chat::Message;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
#[error("failed to notify {recipient}: {source}")]
pub struct NotificationError {
    pub recipient: String,
    #[source]
    pub source: ClientError,
}

/// Result of a fan-out, in recipient order
#[derive(Debug, Default)]
pub struct FanOut {
    pub delivered: Vec<(String, MessageRef)>,
    pub failed: Vec<NotificationError>,
}

#[derive(Clone)]
pub struct Notifier {
    chat: Arc<dyn ChatApi>,
}

impl Notifier {
    pub fn new(chat: Arc<dyn ChatApi>) -> Self {
        Self { chat }
    }

    /// Sends one message, addressed to `message.channel`
    pub async fn post(&self, message: &Message) -> Result<MessageRef, NotificationError> {
        self.chat
            .send(message)
            .await
            .map_err(|source| NotificationError {
                recipient: message.channel.clone(),
                source,
            })
    }

    /// Sends every message concurrently
    ///
    /// All sends are attempted even when some fail. Failures are logged and
    /// returned; they never cancel the other sends.
    ///
    /// # Arguments
    /// * `messages` - `(recipient, message)` pairs; the recipient labels the result
    pub async fn fan_out(&self, messages: Vec<(String, Message)>) -> FanOut {
        let sends = messages.into_iter().map(|(recipient, message)| async move {
            let result = self.chat.send(&message).await;
            (recipient, result)
        });

        let mut out = FanOut::default();
        for (recipient, result) in join_all(sends).await {
            match result {
                Ok(sent) => {
                    debug!("Notified {} in {}", recipient, sent.channel);
                    out.delivered.push((recipient, sent));
                }
                Err(source) => {
                    let error = NotificationError { recipient, source };
                    warn!("{}", error);
                    out.failed.push(error);
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::FakeChat;

    fn direct(user: &str) -> (String, Message) {
        (user.to_string(), Message::new(user, "hi"))
    }

    #[tokio::test]
    async fn test_fan_out_keeps_recipient_order() {
        let chat = Arc::new(FakeChat::default());
        let notifier = Notifier::new(chat.clone());

        let out = notifier
            .fan_out(vec![direct("UA"), direct("UB"), direct("UC")])
            .await;

        let recipients: Vec<&str> = out.delivered.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(recipients, vec!["UA", "UB", "UC"]);
        assert_eq!(out.delivered[0].1.channel, "DA");
        assert!(out.failed.is_empty());
    }

    #[tokio::test]
    async fn test_failed_recipient_does_not_stop_others() {
        let chat = Arc::new(FakeChat::failing_for(&["UA"]));
        let notifier = Notifier::new(chat.clone());

        let out = notifier.fan_out(vec![direct("UA"), direct("UB")]).await;

        assert_eq!(chat.sent().len(), 2);
        assert_eq!(out.delivered.len(), 1);
        assert_eq!(out.delivered[0].0, "UB");
        assert_eq!(out.failed.len(), 1);
        assert_eq!(out.failed[0].recipient, "UA");
        assert!(out.failed[0].to_string().contains("channel_not_found"));
    }

    #[tokio::test]
    async fn test_post_names_recipient() {
        let notifier = Notifier::new(Arc::new(FakeChat::failing_for(&["C0WEB"])));

        let err = notifier.post(&Message::new("C0WEB", "hi")).await.unwrap_err();
        assert_eq!(err.recipient, "C0WEB");
    }
}
