//! Orchestrator configuration
//!
//! Defines all configurable parameters for the orchestrator including the
//! listen address, where projects and cluster credentials live, chat access
//! and network deadlines. Loaded once at startup and read-only afterwards.

use std::path::PathBuf;
use std::time::Duration;

use shipyard_client::Timeouts;

/// Orchestrator configuration
#[derive(Clone)]
pub struct Config {
    /// Address the HTTP server binds to (e.g., "0.0.0.0:80")
    pub bind_addr: String,

    /// YAML file holding the project registry
    pub projects_path: PathBuf,

    /// Chat bot token
    pub slack_token: String,

    /// Chat Web API root
    pub slack_api_url: String,

    /// Kubeconfig used to reach the cluster
    pub kubeconfig_path: PathBuf,

    /// Key used to sign workflow payloads
    pub payload_secret: String,

    /// Capacity of the build and interaction queues
    pub queue_capacity: usize,

    /// TCP connect and TLS handshake deadline for outbound calls
    pub connect_timeout: Duration,

    /// Total deadline for a single outbound call
    pub request_timeout: Duration,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("bind_addr", &self.bind_addr)
            .field("projects_path", &self.projects_path)
            .field("slack_api_url", &self.slack_api_url)
            .field("kubeconfig_path", &self.kubeconfig_path)
            .field("queue_capacity", &self.queue_capacity)
            .field("connect_timeout", &self.connect_timeout)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Creates a new configuration with defaults
    pub fn new(slack_token: String, kubeconfig_path: PathBuf, payload_secret: String) -> Self {
        Self {
            bind_addr: "0.0.0.0:80".to_string(),
            projects_path: PathBuf::from("config.yml"),
            slack_token,
            slack_api_url: "https://slack.com/api".to_string(),
            kubeconfig_path,
            payload_secret,
            queue_capacity: 5,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
        }
    }

    /// Creates configuration from environment variables
    ///
    /// Expected environment variables:
    /// - SLACK_TOKEN (required)
    /// - KUBECONFIG_PATH (required)
    /// - PAYLOAD_SECRET (required)
    /// - BIND_ADDR (optional, default: 0.0.0.0:80)
    /// - PROJECTS_CONFIG (optional, default: config.yml)
    /// - SLACK_API_URL (optional, default: https://slack.com/api)
    /// - QUEUE_CAPACITY (optional, default: 5)
    /// - CONNECT_TIMEOUT_SECS (optional, default: 5)
    /// - REQUEST_TIMEOUT_SECS (optional, default: 10)
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Config::from_env`] with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| anyhow::anyhow!("{} environment variable not set", key))
        };

        let mut config = Self::new(
            required("SLACK_TOKEN")?,
            PathBuf::from(required("KUBECONFIG_PATH")?),
            required("PAYLOAD_SECRET")?,
        );

        if let Some(addr) = lookup("BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(path) = lookup("PROJECTS_CONFIG") {
            config.projects_path = PathBuf::from(path);
        }

        if let Some(url) = lookup("SLACK_API_URL") {
            config.slack_api_url = url;
        }

        config.queue_capacity = lookup("QUEUE_CAPACITY")
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or(config.queue_capacity);

        config.connect_timeout = lookup("CONNECT_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.connect_timeout);

        config.request_timeout = lookup("REQUEST_TIMEOUT_SECS")
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(config.request_timeout);

        Ok(config)
    }

    /// Network deadlines shared by the chat and cluster clients
    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            connect: self.connect_timeout,
            request: self.request_timeout,
        }
    }

    /// Validates the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.slack_token.is_empty() {
            anyhow::bail!("slack_token cannot be empty");
        }

        if self.payload_secret.len() < 16 {
            anyhow::bail!("payload_secret must be at least 16 bytes");
        }

        if !self.slack_api_url.starts_with("http://") && !self.slack_api_url.starts_with("https://")
        {
            anyhow::bail!("slack_api_url must start with http:// or https://");
        }

        if self.queue_capacity == 0 {
            anyhow::bail!("queue_capacity must be greater than 0");
        }

        if self.connect_timeout.is_zero() || self.request_timeout.is_zero() {
            anyhow::bail!("timeouts must be greater than 0");
        }

        Ok(())
    }
}
