//! Resource reconciliation
//!
//! Brings the cluster to the desired state for one deployment identity: a
//! routed service that is created once and never touched again, and a
//! deployment that is created or fully replaced on every call.
//!
//! A "not found" answer is the only error that leads to a create. Anything
//! else aborts the reconciliation and is handed back to the caller.

use shipyard_client::{ClientError, ClusterApi};
use shipyard_core::domain::target::TargetError;
use shipyard_core::domain::{Build, DeploymentTarget, Project};
use shipyard_core::dto::cluster::{Deployment, Service};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("failed to {step} '{name}': {source}")]
    Cluster {
        step: &'static str,
        name: String,
        #[source]
        source: ClientError,
    },
}

impl ReconcileError {
    fn cluster<'a>(step: &'static str, name: &'a str) -> impl FnOnce(ClientError) -> Self + 'a {
        move |source| ReconcileError::Cluster {
            step,
            name: name.to_string(),
            source,
        }
    }
}

/// Applies deployment targets to the cluster
#[derive(Clone)]
pub struct Reconciler {
    cluster: Arc<dyn ClusterApi>,
}

impl Reconciler {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    /// Deploys a build to its own staging resource set
    pub async fn deploy_staging(
        &self,
        project: &Project,
        build: &Build,
    ) -> Result<DeploymentTarget, ReconcileError> {
        let target = DeploymentTarget::staging(project, build)?;
        self.apply(&build.image, &target).await?;
        Ok(target)
    }

    /// Deploys a build to the project's single production resource set
    pub async fn deploy_production(
        &self,
        project: &Project,
        build: &Build,
    ) -> Result<DeploymentTarget, ReconcileError> {
        let target = DeploymentTarget::production(project)?;
        self.apply(&build.image, &target).await?;
        Ok(target)
    }

    async fn apply(&self, image: &str, target: &DeploymentTarget) -> Result<(), ReconcileError> {
        info!(
            "Reconciling {} ({}) with image {}",
            target.identity,
            target.environment.as_str(),
            image
        );
        self.reconcile(image, &target.identity, &target.host, &target.labels)
            .await
    }

    /// Idempotently creates or updates the service and deployment named `id`
    ///
    /// # Arguments
    /// * `image` - Container image to run
    /// * `id` - Name of both objects
    /// * `host` - Public hostname routed to the service
    /// * `labels` - Service selector and pod labels
    pub async fn reconcile(
        &self,
        image: &str,
        id: &str,
        host: &str,
        labels: &BTreeMap<String, String>,
    ) -> Result<(), ReconcileError> {
        match self.cluster.get_service(id).await {
            Ok(_) => debug!("Service {} exists, leaving it untouched", id),
            Err(e) if e.is_not_found() => {
                info!("Creating service {} for host {}", id, host);
                self.cluster
                    .create_service(&Service::routed(id, host, labels))
                    .await
                    .map_err(ReconcileError::cluster("create service", id))?;
            }
            Err(e) => return Err(ReconcileError::cluster("get service", id)(e)),
        }

        let mut deployment = Deployment::single_replica(id, image, labels);

        match self.cluster.get_deployment(id).await {
            Ok(existing) => {
                info!("Replacing deployment {}", id);
                deployment.metadata.resource_version = existing.metadata.resource_version;
                self.cluster
                    .replace_deployment(&deployment)
                    .await
                    .map_err(ReconcileError::cluster("replace deployment", id))?;
            }
            Err(e) if e.is_not_found() => {
                info!("Creating deployment {}", id);
                self.cluster
                    .create_deployment(&deployment)
                    .await
                    .map_err(ReconcileError::cluster("create deployment", id))?;
            }
            Err(e) => return Err(ReconcileError::cluster("get deployment", id)(e)),
        }

        Ok(())
    }
}
