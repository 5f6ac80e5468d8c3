//! Cluster API client
//!
//! Reads and writes the two object kinds the orchestrator manages through the
//! Kubernetes REST API. A missing object surfaces as a 404 `ApiError`, which
//! callers detect with [`ClientError::is_not_found`].

use async_trait::async_trait;
use reqwest::{Certificate, Client, RequestBuilder};
use shipyard_core::dto::cluster::{Deployment, ObjectHeader, Service};
use tracing::debug;

use crate::error::Result;
use crate::kubeconfig::ClusterCredentials;
use crate::{Timeouts, handle_empty_response, handle_response};

/// Cluster scheduler operations used by reconciliation
#[async_trait]
pub trait ClusterApi: Send + Sync {
    /// Fetches a service by name
    async fn get_service(&self, name: &str) -> Result<ObjectHeader>;

    /// Creates a service
    async fn create_service(&self, service: &Service) -> Result<()>;

    /// Fetches a deployment by name
    async fn get_deployment(&self, name: &str) -> Result<ObjectHeader>;

    /// Creates a deployment
    async fn create_deployment(&self, deployment: &Deployment) -> Result<()>;

    /// Replaces an existing deployment with `deployment`
    async fn replace_deployment(&self, deployment: &Deployment) -> Result<()>;
}

/// HTTP implementation of ClusterApi
#[derive(Clone)]
pub struct KubeClient {
    server: String,
    namespace: String,
    token: Option<String>,
    client: Client,
}

impl std::fmt::Debug for KubeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeClient")
            .field("server", &self.server)
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl KubeClient {
    /// Creates a client for the cluster described by `credentials`
    pub fn new(credentials: &ClusterCredentials, timeouts: Timeouts) -> Result<Self> {
        let mut builder = timeouts.builder();

        if let Some(pem) = &credentials.ca_pem {
            builder = builder.add_root_certificate(Certificate::from_pem(pem)?);
        }
        if credentials.insecure_skip_tls_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            server: credentials.server.clone(),
            namespace: credentials.namespace.clone(),
            token: credentials.token.clone(),
            client: builder.build()?,
        })
    }

    /// Namespace all objects are read from and written to
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    fn services_url(&self) -> String {
        format!("{}/api/v1/namespaces/{}/services", self.server, self.namespace)
    }

    fn deployments_url(&self) -> String {
        format!(
            "{}/apis/apps/v1/namespaces/{}/deployments",
            self.server, self.namespace
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl ClusterApi for KubeClient {
    async fn get_service(&self, name: &str) -> Result<ObjectHeader> {
        let url = format!("{}/{}", self.services_url(), name);
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        handle_response(response).await
    }

    async fn create_service(&self, service: &Service) -> Result<()> {
        let url = self.services_url();
        debug!("POST {} ({})", url, service.metadata.name);
        let response = self
            .authorize(self.client.post(&url))
            .json(service)
            .send()
            .await?;

        handle_empty_response(response).await
    }

    async fn get_deployment(&self, name: &str) -> Result<ObjectHeader> {
        let url = format!("{}/{}", self.deployments_url(), name);
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(&url)).send().await?;

        handle_response(response).await
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<()> {
        let url = self.deployments_url();
        debug!("POST {} ({})", url, deployment.metadata.name);
        let response = self
            .authorize(self.client.post(&url))
            .json(deployment)
            .send()
            .await?;

        handle_empty_response(response).await
    }

    async fn replace_deployment(&self, deployment: &Deployment) -> Result<()> {
        let url = format!("{}/{}", self.deployments_url(), deployment.metadata.name);
        debug!("PUT {}", url);
        let response = self
            .authorize(self.client.put(&url))
            .json(deployment)
            .send()
            .await?;

        handle_empty_response(response).await
    }
}
