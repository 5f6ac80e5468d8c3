//! In-memory fakes for the chat and cluster clients

use async_trait::async_trait;
use shipyard_client::{ChatApi, ClientError, ClusterApi, Result};
use shipyard_core::domain::{Build, BuildType, MessageRef, Project};
use shipyard_core::dto::chat::Message;
use shipyard_core::dto::cluster::{Deployment, ObjectHeader, Service};
use shipyard_core::payload::PayloadCodec;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::registry::ProjectRegistry;

pub const SECRET: &str = "test-secret-0123456789";

pub fn project() -> Project {
    Project {
        id: "web".to_string(),
        name: "Web".to_string(),
        url: "https://web.example.com".to_string(),
        channel: "C0WEB".to_string(),
        qa: vec!["UC".to_string(), "UD".to_string()],
        owners: vec!["UA".to_string(), "UB".to_string()],
    }
}

pub fn build(target: &str, kind: BuildType) -> Build {
    Build {
        project: "web".to_string(),
        target: target.to_string(),
        image: format!("registry/web:{}", target),
        kind,
    }
}

pub fn registry() -> Arc<ProjectRegistry> {
    Arc::new(ProjectRegistry::from_projects(vec![project()]).unwrap())
}

pub fn codec() -> Arc<PayloadCodec> {
    Arc::new(PayloadCodec::new(SECRET))
}

// =============================================================================
// Cluster
// =============================================================================

/// Cluster holding objects in maps, optionally failing one step
#[derive(Default)]
pub struct FakeCluster {
    services: Mutex<BTreeMap<String, Service>>,
    deployments: Mutex<BTreeMap<String, Deployment>>,
    calls: Mutex<Vec<String>>,
    failure: Option<(&'static str, u16)>,
}

impl FakeCluster {
    /// Every call to `step` answers with `status`
    pub fn failing(step: &'static str, status: u16) -> Self {
        Self {
            failure: Some((step, status)),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn service(&self, name: &str) -> Option<Service> {
        self.services.lock().unwrap().get(name).cloned()
    }

    pub fn deployment(&self, name: &str) -> Option<Deployment> {
        self.deployments.lock().unwrap().get(name).cloned()
    }

    pub fn service_count(&self) -> usize {
        self.services.lock().unwrap().len()
    }

    pub fn deployment_count(&self) -> usize {
        self.deployments.lock().unwrap().len()
    }

    fn record(&self, step: &str, name: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{} {}", step, name));
        match self.failure {
            Some((failing, status)) if failing == step => {
                Err(ClientError::api_error(status, "injected failure"))
            }
            _ => Ok(()),
        }
    }
}

fn not_found(name: &str) -> ClientError {
    ClientError::api_error(404, format!("\"{}\" not found", name))
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn get_service(&self, name: &str) -> Result<ObjectHeader> {
        self.record("get service", name)?;
        self.services
            .lock()
            .unwrap()
            .get(name)
            .map(|s| ObjectHeader {
                metadata: s.metadata.clone(),
            })
            .ok_or_else(|| not_found(name))
    }

    async fn create_service(&self, service: &Service) -> Result<()> {
        self.record("create service", &service.metadata.name)?;
        self.services
            .lock()
            .unwrap()
            .insert(service.metadata.name.clone(), service.clone());
        Ok(())
    }

    async fn get_deployment(&self, name: &str) -> Result<ObjectHeader> {
        self.record("get deployment", name)?;
        self.deployments
            .lock()
            .unwrap()
            .get(name)
            .map(|d| ObjectHeader {
                metadata: d.metadata.clone(),
            })
            .ok_or_else(|| not_found(name))
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.record("create deployment", &deployment.metadata.name)?;
        let mut stored = deployment.clone();
        stored.metadata.resource_version = Some("1".to_string());
        self.deployments
            .lock()
            .unwrap()
            .insert(stored.metadata.name.clone(), stored);
        Ok(())
    }

    async fn replace_deployment(&self, deployment: &Deployment) -> Result<()> {
        self.record("replace deployment", &deployment.metadata.name)?;
        let mut deployments = self.deployments.lock().unwrap();
        if !deployments.contains_key(&deployment.metadata.name) {
            return Err(not_found(&deployment.metadata.name));
        }
        deployments.insert(deployment.metadata.name.clone(), deployment.clone());
        Ok(())
    }
}

// =============================================================================
// Chat
// =============================================================================

/// Chat that records every message, optionally rejecting some channels
#[derive(Default)]
pub struct FakeChat {
    sent: Mutex<Vec<Message>>,
    failing_channels: HashSet<String>,
    failing_updates: bool,
    counter: AtomicU64,
}

impl FakeChat {
    pub fn failing_for(channels: &[&str]) -> Self {
        Self {
            failing_channels: channels.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Posts succeed, in-place updates are rejected
    pub fn failing_updates() -> Self {
        Self {
            failing_updates: true,
            ..Default::default()
        }
    }

    /// Every message the chat was asked to send, in order
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().unwrap().clone()
    }

    pub fn posts(&self) -> Vec<Message> {
        self.sent().into_iter().filter(|m| !m.update).collect()
    }

    pub fn updates(&self) -> Vec<Message> {
        self.sent().into_iter().filter(|m| m.update).collect()
    }
}

#[async_trait]
impl ChatApi for FakeChat {
    async fn send(&self, message: &Message) -> Result<MessageRef> {
        self.sent.lock().unwrap().push(message.clone());

        if self.failing_channels.contains(&message.channel)
            || (message.update && self.failing_updates)
        {
            return Err(ClientError::Chat("channel_not_found".to_string()));
        }

        if message.update {
            return Ok(MessageRef::new(message.channel.clone(), message.ts.clone()));
        }

        // Posting to a user id lands in a direct message channel
        let channel = match message.channel.strip_prefix('U') {
            Some(rest) => format!("D{}", rest),
            None => message.channel.clone(),
        };
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;

        Ok(MessageRef::new(channel, format!("1700000000.{:06}", n)))
    }
}
