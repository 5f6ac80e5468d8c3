//! Cluster credentials
//!
//! Reads the subset of a kubeconfig file the orchestrator needs: the current
//! context's API server, CA, bearer token and namespace.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::Deserialize;
use std::path::Path;

use crate::error::{ClientError, Result};

const DEFAULT_NAMESPACE: &str = "default";

/// Everything needed to reach the cluster API
#[derive(Clone, PartialEq, Eq)]
pub struct ClusterCredentials {
    /// API server URL (e.g., "https://10.0.0.1:6443")
    pub server: String,

    /// Bearer token, if the user authenticates with one
    pub token: Option<String>,

    /// Namespace every object is created in
    pub namespace: String,

    /// PEM encoded CA bundle for the API server
    pub ca_pem: Option<Vec<u8>>,

    /// Skip TLS verification entirely
    pub insecure_skip_tls_verify: bool,
}

impl std::fmt::Debug for ClusterCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterCredentials")
            .field("server", &self.server)
            .field("namespace", &self.namespace)
            .field("has_token", &self.token.is_some())
            .field("has_ca", &self.ca_pem.is_some())
            .finish()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct KubeConfig {
    #[serde(default)]
    current_context: String,
    #[serde(default)]
    contexts: Vec<Named<ContextEntry>>,
    #[serde(default)]
    clusters: Vec<Named<ClusterEntry>>,
    #[serde(default)]
    users: Vec<Named<UserEntry>>,
}

#[derive(Debug, Deserialize)]
struct Named<T> {
    name: String,
    #[serde(alias = "context", alias = "cluster", alias = "user")]
    value: T,
}

#[derive(Debug, Deserialize)]
struct ContextEntry {
    cluster: String,
    #[serde(default)]
    user: String,
    #[serde(default)]
    namespace: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ClusterEntry {
    server: String,
    #[serde(default)]
    certificate_authority_data: Option<String>,
    #[serde(default)]
    certificate_authority: Option<String>,
    #[serde(default)]
    insecure_skip_tls_verify: bool,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct UserEntry {
    #[serde(default)]
    token: Option<String>,
}

impl ClusterCredentials {
    /// Loads credentials from a kubeconfig file
    pub fn from_kubeconfig(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ClientError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;

        Self::from_kubeconfig_str(&raw, path.parent())
    }

    /// Parses kubeconfig YAML
    ///
    /// `base_dir` resolves a relative `certificate-authority` path.
    pub fn from_kubeconfig_str(raw: &str, base_dir: Option<&Path>) -> Result<Self> {
        let config: KubeConfig = serde_yaml::from_str(raw)
            .map_err(|e| ClientError::InvalidConfig(format!("invalid kubeconfig: {}", e)))?;

        let context = find(&config.contexts, &config.current_context, "context")?;
        let cluster = find(&config.clusters, &context.cluster, "cluster")?;
        let token = config
            .users
            .iter()
            .find(|u| u.name == context.user)
            .and_then(|u| u.value.token.clone());

        let ca_pem = match (&cluster.certificate_authority_data, &cluster.certificate_authority) {
            (Some(data), _) => Some(STANDARD.decode(data.trim()).map_err(|e| {
                ClientError::InvalidConfig(format!("invalid certificate-authority-data: {}", e))
            })?),
            (None, Some(file)) => {
                let path = match base_dir {
                    Some(dir) => dir.join(file),
                    None => Path::new(file).to_path_buf(),
                };
                Some(std::fs::read(&path).map_err(|e| {
                    ClientError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
                })?)
            }
            (None, None) => None,
        };

        Ok(Self {
            server: cluster.server.trim_end_matches('/').to_string(),
            token,
            namespace: context
                .namespace
                .clone()
                .unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
            ca_pem,
            insecure_skip_tls_verify: cluster.insecure_skip_tls_verify,
        })
    }
}

fn find<'a, T>(entries: &'a [Named<T>], name: &str, kind: &str) -> Result<&'a T> {
    entries
        .iter()
        .find(|e| e.name == name)
        .map(|e| &e.value)
        .ok_or_else(|| ClientError::InvalidConfig(format!("{} '{}' not found in kubeconfig", kind, name)))
}
