//! Deployment pipeline
//!
//! Takes one completed build through staging and hands it to humans:
//!
//! ```text
//! Queued -> AttemptNotified -> Deployed -> OwnersNotified -> QaNotified
//!                          \-> Failed
//! ```
//!
//! Every step runs at most once; nothing is retried. Only a failure to post
//! the first message, or an unknown project, ends the run with an error.
//! Later delivery failures are logged and collected in the report.

use shipyard_core::domain::{Build, OwnerMessage, Project, WorkflowPayload};
use shipyard_core::payload::{PayloadCodec, PayloadError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

use super::messages;
use super::notifier::{NotificationError, Notifier};
use super::reconciler::Reconciler;
use crate::registry::ProjectRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Queued,
    AttemptNotified,
    Deployed,
    OwnersNotified,
    QaNotified,
    Failed,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("project '{0}' is not registered")]
    UnknownProject(String),

    #[error("could not announce the deployment attempt: {0}")]
    AttemptNotification(#[source] NotificationError),

    #[error(transparent)]
    Payload(#[from] PayloadError),
}

/// What a run did
#[derive(Debug)]
pub struct PipelineReport {
    pub state: PipelineState,
    pub staging_url: Option<String>,
    pub owner_messages: Vec<OwnerMessage>,
    /// Reason the staging deploy failed
    pub failure: Option<String>,
    /// Deliveries that failed without stopping the run
    pub errors: Vec<NotificationError>,
}

impl PipelineReport {
    fn new() -> Self {
        Self {
            state: PipelineState::Queued,
            staging_url: None,
            owner_messages: Vec::new(),
            failure: None,
            errors: Vec::new(),
        }
    }
}

#[derive(Clone)]
pub struct DeploymentPipeline {
    registry: Arc<ProjectRegistry>,
    notifier: Notifier,
    reconciler: Reconciler,
    codec: Arc<PayloadCodec>,
}

impl DeploymentPipeline {
    pub fn new(
        registry: Arc<ProjectRegistry>,
        notifier: Notifier,
        reconciler: Reconciler,
        codec: Arc<PayloadCodec>,
    ) -> Self {
        Self {
            registry,
            notifier,
            reconciler,
            codec,
        }
    }

    /// Runs one build to completion
    pub async fn run(&self, build: Build) -> Result<PipelineReport, PipelineError> {
        let project = self
            .registry
            .get(&build.project)
            .ok_or_else(|| PipelineError::UnknownProject(build.project.clone()))?;
        let mut report = PipelineReport::new();

        info!(
            "Starting deployment of {} ({} {})",
            build.image, build.kind, build.target
        );

        let attempt = self
            .notifier
            .post(&messages::attempt(project, &build))
            .await
            .map_err(PipelineError::AttemptNotification)?;
        report.state = PipelineState::AttemptNotified;

        let target = match self.reconciler.deploy_staging(project, &build).await {
            Ok(target) => target,
            Err(e) => {
                error!("Staging deployment of {} failed: {}", build.image, e);
                let failed = messages::deploy_failed(project, &build, &e.to_string())
                    .into_update(&attempt.channel, &attempt.ts);
                if let Err(notify) = self.notifier.post(&failed).await {
                    warn!("{}", notify);
                    report.errors.push(notify);
                }
                report.state = PipelineState::Failed;
                report.failure = Some(e.to_string());
                return Ok(report);
            }
        };

        info!("Deployed {} to {}", build.image, target.url);
        report.state = PipelineState::Deployed;
        report.staging_url = Some(target.url.clone());

        let success = messages::deploy_success(project, &build, &target.url)
            .into_update(&attempt.channel, &attempt.ts);
        if let Err(e) = self.notifier.post(&success).await {
            warn!("{}", e);
            report.errors.push(e);
        }

        report.owner_messages = self
            .notify_owners(project, &build, &target.url, &mut report.errors)
            .await;
        report.state = PipelineState::OwnersNotified;

        let payload = self.codec.encode(&WorkflowPayload::new(
            build.clone(),
            report.owner_messages.clone(),
        ))?;

        let decision = messages::owner_decision(project, &build, &payload)
            .in_thread(&attempt.channel, &attempt.ts);
        if let Err(e) = self.notifier.post(&decision).await {
            warn!("{}", e);
            report.errors.push(e);
        }

        let requests = project
            .qa
            .iter()
            .map(|member| {
                let mut request = messages::qa_request(project, &build, &target.url, &payload);
                request.channel = member.clone();
                (member.clone(), request)
            })
            .collect();
        let qa = self.notifier.fan_out(requests).await;
        report.errors.extend(qa.failed);
        report.state = PipelineState::QaNotified;

        info!(
            "Build {} awaiting decision ({} owner, {} QA messages delivered)",
            build.image,
            report.owner_messages.len(),
            qa.delivered.len()
        );
        Ok(report)
    }

    async fn notify_owners(
        &self,
        project: &Project,
        build: &Build,
        url: &str,
        errors: &mut Vec<NotificationError>,
    ) -> Vec<OwnerMessage> {
        let messages = project
            .owners
            .iter()
            .map(|owner| {
                let mut message = messages::deploy_success(project, build, url);
                message.channel = owner.clone();
                (owner.clone(), message)
            })
            .collect();

        let out = self.notifier.fan_out(messages).await;
        errors.extend(out.failed);

        out.delivered
            .into_iter()
            .map(|(owner, sent)| OwnerMessage {
                owner,
                channel: sent.channel,
                ts: sent.ts,
            })
            .collect()
    }
}
