//! Deployment target derivation
//!
//! A deployment target is never stored. It is recomputed from a project and a
//! build every time something is deployed, which is what keeps staging and
//! production resources apart.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use thiserror::Error;
use url::Url;

use super::build::{Build, BuildType};
use super::project::Project;

/// Kubernetes object names and label values are limited to 63 characters
pub const MAX_NAME_LEN: usize = 63;

/// Length of the hash suffix appended to normalised names
const HASH_SUFFIX_LEN: usize = 8;

/// Environment a target lives in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Qa,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Qa => "qa",
            Environment::Production => "production",
        }
    }
}

/// Where and under which name a build gets deployed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeploymentTarget {
    /// Name shared by the service and the deployment
    pub identity: String,

    /// Public URL shown to humans
    pub url: String,

    /// Hostname routed to the service
    pub host: String,

    /// Selector and pod labels
    pub labels: BTreeMap<String, String>,

    pub environment: Environment,
}

#[derive(Debug, Error)]
pub enum TargetError {
    #[error("invalid project URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("invalid project id '{0}'")]
    InvalidProjectId(String),
}

impl DeploymentTarget {
    /// Target for a staging deploy
    ///
    /// The identity is `{project}-{type}-{target}` and the host is
    /// `{target}.{type}.{project host}`, so every branch and tag gets its own
    /// resource set.
    pub fn staging(project: &Project, build: &Build) -> Result<Self, TargetError> {
        check_project_id(project)?;
        let kind = build.kind.as_str();
        let budget = MAX_NAME_LEN.saturating_sub(project.id.len() + kind.len() + 2);
        let target = dns_label(&build.target, budget);

        let mut url = parse_url(&project.url)?;
        let base_host = url.host_str().unwrap_or_default().to_string();
        let host = format!("{}.{}.{}", target, kind, base_host);
        url.set_host(Some(&host))
            .map_err(|e| TargetError::InvalidUrl {
                url: project.url.clone(),
                reason: e.to_string(),
            })?;

        let mut labels = BTreeMap::new();
        labels.insert("project".to_string(), project.id.clone());
        labels.insert("target".to_string(), target.clone());
        labels.insert("type".to_string(), kind.to_string());
        labels.insert(
            "environment".to_string(),
            Environment::Qa.as_str().to_string(),
        );

        Ok(Self {
            identity: format!("{}-{}-{}", project.id, kind, target),
            url: render_url(&url, &project.url),
            host,
            labels,
            environment: Environment::Qa,
        })
    }

    /// Target for a production deploy
    ///
    /// Uses the bare project id and the project URL, so there is exactly one
    /// production resource set per project no matter which build is promoted.
    pub fn production(project: &Project) -> Result<Self, TargetError> {
        check_project_id(project)?;
        let url = parse_url(&project.url)?;
        let host = url.host_str().unwrap_or_default().to_string();

        let mut labels = BTreeMap::new();
        labels.insert("project".to_string(), project.id.clone());
        labels.insert(
            "environment".to_string(),
            Environment::Production.as_str().to_string(),
        );

        Ok(Self {
            identity: project.id.clone(),
            url: project.url.clone(),
            host,
            labels,
            environment: Environment::Production,
        })
    }
}

fn check_project_id(project: &Project) -> Result<(), TargetError> {
    if is_project_id(&project.id, MAX_NAME_LEN) {
        Ok(())
    } else {
        Err(TargetError::InvalidProjectId(project.id.clone()))
    }
}

fn parse_url(raw: &str) -> Result<Url, TargetError> {
    let url = Url::parse(raw).map_err(|e| TargetError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;

    if url.host_str().is_none_or(str::is_empty) {
        return Err(TargetError::InvalidUrl {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }

    Ok(url)
}

/// `Url` always renders a root path; keep the project's own spelling instead
fn render_url(url: &Url, original: &str) -> String {
    let rendered = url.to_string();
    if url.path() == "/" && !original.ends_with('/') && url.query().is_none() {
        rendered.trim_end_matches('/').to_string()
    } else {
        rendered
    }
}

/// Returns `true` if `s` can be used as-is as a DNS label
pub fn is_dns_label(s: &str, max: usize) -> bool {
    !s.is_empty()
        && s.len() <= max
        && s.bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        && !s.starts_with('-')
        && !s.ends_with('-')
}

/// Returns `true` if `id` can name a project
///
/// On top of being a DNS label, the id may neither contain `-branch-` or
/// `-tag-` nor end in `-branch` or `-tag`. The first such segment of a staging
/// identity then always sits right after the project id, so staging
/// identities of different projects never meet, and never equal a production
/// identity (which has no such segment at all).
pub fn is_project_id(id: &str, max: usize) -> bool {
    is_dns_label(id, max)
        && [BuildType::Branch, BuildType::Tag].iter().all(|kind| {
            let kind = kind.as_str();
            !id.contains(&format!("-{}-", kind)) && !id.ends_with(&format!("-{}", kind))
        })
}

/// Turns an arbitrary branch or tag name into a DNS label of at most `max`
/// characters.
///
/// Names that are already valid are returned unchanged. Anything else is
/// lowercased, has non-alphanumerics replaced by `-` and gets a short hash of
/// the raw name appended, so `feature/x` and `feature-x` stay distinct.
pub fn dns_label(raw: &str, max: usize) -> String {
    if is_dns_label(raw, max) {
        return raw.to_string();
    }

    let normalized: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect();

    let digest = hex::encode(Sha256::digest(raw.as_bytes()));
    let suffix = &digest[..HASH_SUFFIX_LEN];

    let room = max.saturating_sub(HASH_SUFFIX_LEN + 1);
    let head: String = normalized.trim_matches('-').chars().take(room).collect();
    let head = head.trim_end_matches('-');

    if head.is_empty() {
        suffix.to_string()
    } else {
        format!("{}-{}", head, suffix)
    }
}
