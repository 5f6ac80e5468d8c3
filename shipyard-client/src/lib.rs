//! Shipyard HTTP Clients
//!
//! Typed HTTP clients for the two external systems the orchestrator drives:
//!
//! - [`SlackClient`] posts and updates chat messages ([`ChatApi`])
//! - [`KubeClient`] reads and writes cluster objects ([`ClusterApi`])
//!
//! Both are used through their traits so the orchestrator can be tested
//! against in-memory fakes.
//!
//! # Example
//!
//! ```no_run
//! use shipyard_client::{ChatApi, SlackClient, Timeouts};
//! use shipyard_core::dto::chat::Message;
//!
//! # async fn example() -> shipyard_client::Result<()> {
//! let client = SlackClient::new("https://slack.com/api", "xoxb-token", Timeouts::default())?;
//! let sent = client.send(&Message::new("C0123", "hello")).await?;
//! println!("posted {} in {}", sent.ts, sent.channel);
//! # Ok(())
//! # }
//! ```

pub mod chat;
pub mod cluster;
pub mod error;
pub mod kubeconfig;

// Re-export commonly used types
pub use chat::{ChatApi, SlackClient};
pub use cluster::{ClusterApi, KubeClient};
pub use error::{ClientError, Result};
pub use kubeconfig::ClusterCredentials;

use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Fixed per-call network deadlines
///
/// There is no retry anywhere: a call that exceeds these fails and the task
/// that issued it gives up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// TCP connect and TLS handshake
    pub connect: Duration,
    /// Whole request, including reading the body
    pub request: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            request: Duration::from_secs(10),
        }
    }
}

impl Timeouts {
    pub(crate) fn builder(&self) -> reqwest::ClientBuilder {
        Client::builder()
            .connect_timeout(self.connect)
            .timeout(self.request)
    }
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// Checks the status code and returns an appropriate error if the request
/// failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response whose body is not needed
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}
