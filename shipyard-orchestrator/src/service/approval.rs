//! Approval workflow
//!
//! Handles button clicks on the messages sent by the deployment pipeline.
//! All state comes from the signed payload embedded in the clicked control;
//! the server remembers nothing between a build and its approval.
//!
//! - QA clicks record a verdict on the QA member's message and tell every
//!   owner about it.
//! - Owner clicks either promote the build to production or close it. Both
//!   freeze every owner message so no decision can be taken twice.

use shipyard_core::domain::target::TargetError;
use shipyard_core::domain::{DeploymentTarget, MessageRef, Project, WorkflowPayload};
use shipyard_core::dto::chat::{Attachment, Message};
use shipyard_core::dto::interaction::{Category, Interaction, OwnerDecision, QaVerdict};
use shipyard_core::payload::{PayloadCodec, PayloadError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::messages::{self, COLOR_DANGER, COLOR_GOOD};
use super::notifier::{NotificationError, Notifier};
use super::reconciler::Reconciler;
use crate::registry::ProjectRegistry;

const DEPLOYED_MARKER: &str = "Deployed to production";
const CLOSED_MARKER: &str = "Closed";

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("interaction carries no action")]
    MissingAction,

    #[error("rejected interaction payload: {0}")]
    Payload(#[from] PayloadError),

    #[error("project '{0}' is no longer registered")]
    UnknownProject(String),

    #[error(transparent)]
    Target(#[from] TargetError),

    #[error("could not record the decision: {0}")]
    Notification(#[source] NotificationError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    /// Nothing was done
    Ignored,
    QaRecorded { verdict: QaVerdict, failed_replies: usize },
    Promoted { url: String },
    /// Production reconciliation failed; no message was frozen
    PromotionFailed { reason: String },
    Closed,
}

#[derive(Clone)]
pub struct ApprovalWorkflow {
    registry: Arc<ProjectRegistry>,
    notifier: Notifier,
    reconciler: Reconciler,
    codec: Arc<PayloadCodec>,
}

impl ApprovalWorkflow {
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

    /// Routes one interaction to its handler
    ///
    /// Nothing is sent or deployed unless the payload verifies and its
    /// project is still registered. Deploy decisions are only taken from the
    /// project's owners.
    pub async fn handle(&self, interaction: Interaction) -> Result<ApprovalOutcome, ApprovalError> {
        let Some(category) = interaction.category() else {
            debug!(
                "Ignoring interaction with unknown category '{}'",
                interaction.callback_id
            );
            return Ok(ApprovalOutcome::Ignored);
        };
        let action = interaction.action().ok_or(ApprovalError::MissingAction)?;

        let payload = self.codec.decode(&action.value)?;
        let project = self
            .registry
            .get(&payload.build.project)
            .ok_or_else(|| ApprovalError::UnknownProject(payload.build.project.clone()))?;

        if category == Category::DeployDecision && !project.owners.contains(&interaction.user.id) {
            warn!(
                "Ignoring deploy decision from {}, not an owner of {}",
                interaction.user.id, project.id
            );
            return Ok(ApprovalOutcome::Ignored);
        }

        match category {
            Category::QaResponse => match QaVerdict::parse(&action.name) {
                Some(verdict) => self.record_qa(project, &payload, &interaction, verdict).await,
                None => {
                    warn!("Ignoring unknown QA action '{}'", action.name);
                    Ok(ApprovalOutcome::Ignored)
                }
            },
            Category::DeployDecision => match OwnerDecision::parse(&action.name) {
                Some(OwnerDecision::Deploy) => self.promote(project, &payload, &interaction).await,
                Some(OwnerDecision::Close) => self.close(project, &payload, &interaction).await,
                None => {
                    warn!("Ignoring unknown owner action '{}'", action.name);
                    Ok(ApprovalOutcome::Ignored)
                }
            },
        }
    }

    async fn record_qa(
        &self,
        project: &Project,
        payload: &WorkflowPayload,
        interaction: &Interaction,
        verdict: QaVerdict,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let user = &interaction.user.id;
        info!(
            "{} {} {} for project {}",
            user,
            verdict.label().to_lowercase(),
            payload.build.image,
            project.id
        );

        let color = match verdict {
            QaVerdict::Approve => COLOR_GOOD,
            QaVerdict::Reject => COLOR_DANGER,
        };
        let updated = messages::with_decision(
            interaction.original_message.clone(),
            messages::decision_marker(verdict.label(), color),
        )
        .into_update(&interaction.channel.id, &interaction.message_ts);

        // Owners only hear about verdicts that were visibly recorded
        self.notifier
            .post(&updated)
            .await
            .map_err(ApprovalError::Notification)?;

        let replies = payload
            .owner_messages
            .iter()
            .map(|owner| {
                let reply = messages::qa_verdict_reply(user, verdict).in_thread(&owner.channel, &owner.ts);
                (owner.owner.clone(), reply)
            })
            .collect();
        let out = self.notifier.fan_out(replies).await;

        Ok(ApprovalOutcome::QaRecorded {
            verdict,
            failed_replies: out.failed.len(),
        })
    }

    async fn promote(
        &self,
        project: &Project,
        payload: &WorkflowPayload,
        interaction: &Interaction,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let build = &payload.build;
        let staging = DeploymentTarget::staging(project, build)?;
        info!(
            "{} promoting {} to production for project {}",
            interaction.user.id, build.image, project.id
        );

        let production = match self.reconciler.deploy_production(project, build).await {
            Ok(target) => target,
            Err(e) => {
                error!("Production deployment of {} failed: {}", build.image, e);
                let reason = e.to_string();
                if let Err(notify) = self
                    .notifier
                    .post(&messages::production_failed(project, build, &reason))
                    .await
                {
                    warn!("{}", notify);
                }
                return Ok(ApprovalOutcome::PromotionFailed { reason });
            }
        };

        self.freeze(
            project,
            payload,
            &staging.url,
            interaction,
            messages::decision_marker(DEPLOYED_MARKER, COLOR_GOOD),
        )
        .await;

        let announcement =
            messages::production_success(project, build, &interaction.user.id, &production.url);
        if let Err(e) = self.notifier.post(&announcement).await {
            warn!("{}", e);
        }

        Ok(ApprovalOutcome::Promoted {
            url: production.url,
        })
    }

    async fn close(
        &self,
        project: &Project,
        payload: &WorkflowPayload,
        interaction: &Interaction,
    ) -> Result<ApprovalOutcome, ApprovalError> {
        let staging = DeploymentTarget::staging(project, &payload.build)?;
        info!(
            "{} closed {} for project {}",
            interaction.user.id, payload.build.image, project.id
        );

        self.freeze(
            project,
            payload,
            &staging.url,
            interaction,
            messages::decision_marker(CLOSED_MARKER, COLOR_DANGER),
        )
        .await;

        Ok(ApprovalOutcome::Closed)
    }

    /// Replaces the controls on every owner message and on the clicked
    /// message with `marker`
    async fn freeze(
        &self,
        project: &Project,
        payload: &WorkflowPayload,
        staging_url: &str,
        interaction: &Interaction,
        marker: Attachment,
    ) -> Vec<NotificationError> {
        let mut updates: Vec<(String, Message)> = payload
            .owner_messages
            .iter()
            .map(|owner| {
                let rebuilt = messages::with_decision(
                    messages::deploy_success(project, &payload.build, staging_url),
                    marker.clone(),
                )
                .into_update(&owner.channel, &owner.ts);
                (owner.owner.clone(), rebuilt)
            })
            .collect();

        let acting = MessageRef::new(&interaction.channel.id, &interaction.message_ts);
        if !payload.owner_messages.iter().any(|o| o.message_ref() == acting) {
            let acting = messages::with_decision(interaction.original_message.clone(), marker)
                .into_update(&interaction.channel.id, &interaction.message_ts);
            updates.push((interaction.user.id.clone(), acting));
        }

        self.notifier.fan_out(updates).await.failed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::testing::{FakeChat, FakeCluster, build, codec, project, registry};
    use shipyard_core::domain::{BuildType, OwnerMessage};
    use shipyard_core::dto::chat::Action;
    use shipyard_core::dto::interaction::{Entity, INTERACTIVE_MESSAGE};

    fn owner_messages() -> Vec<OwnerMessage> {
        ["A", "B"]
            .iter()
            .enumerate()
            .map(|(i, suffix)| OwnerMessage {
                owner: format!("U{}", suffix),
                channel: format!("D{}", suffix),
                ts: format!("1700000000.00000{}", i + 2),
            })
            .collect()
    }

    fn encoded_payload() -> String {
        codec()
            .encode(&WorkflowPayload::new(
                build("main", BuildType::Branch),
                owner_messages(),
            ))
            .unwrap()
    }

    fn click(category: Category, action: &str, value: String, original: Message) -> Interaction {
        Interaction {
            kind: INTERACTIVE_MESSAGE.to_string(),
            actions: vec![Action {
                name: action.to_string(),
                kind: "button".to_string(),
                value,
                ..Default::default()
            }],
            callback_id: category.as_str().to_string(),
            team: Entity::default(),
            channel: Entity {
                id: "C0WEB".to_string(),
                name: String::new(),
            },
            user: Entity {
                id: "UA".to_string(),
                name: "alice".to_string(),
            },
            message_ts: "1700000000.000004".to_string(),
            original_message: original,
        }
    }

    fn qa_click(action: &str, value: String) -> Interaction {
        let original = messages::qa_request(
            &project(),
            &build("main", BuildType::Branch),
            "https://main.branch.web.example.com",
            &value,
        );
        let mut interaction = click(Category::QaResponse, action, value, original);
        interaction.channel.id = "DC".to_string();
        interaction.user.id = "UC".to_string();
        interaction
    }

    fn owner_click(action: &str, value: String) -> Interaction {
        let original = messages::owner_decision(&project(), &build("main", BuildType::Branch), &value);
        click(Category::DeployDecision, action, value, original)
    }

    fn workflow(chat: Arc<FakeChat>, cluster: Arc<FakeCluster>) -> ApprovalWorkflow {
        ApprovalWorkflow::new(
            registry(),
            Notifier::new(chat),
            Reconciler::new(cluster),
            codec(),
        )
    }

    #[tokio::test]
    async fn test_qa_approve_updates_and_replies() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::default());
        let interaction = qa_click("approve", encoded_payload());
        let original = interaction.original_message.clone();

        let outcome = workflow(chat.clone(), cluster.clone())
            .handle(interaction)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApprovalOutcome::QaRecorded {
                verdict: QaVerdict::Approve,
                failed_replies: 0
            }
        );

        let updates = chat.updates();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].channel, "DC");
        assert_eq!(updates[0].ts, "1700000000.000004");
        // non-decision attachments survive untouched
        assert_eq!(updates[0].attachments[..2], original.attachments[..2]);
        assert_eq!(updates[0].attachments.len(), 3);
        assert_eq!(updates[0].attachments[2].title, "Approved");

        let replies = chat.posts();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].channel, "DA");
        assert_eq!(replies[0].thread_ts, "1700000000.000002");
        assert_eq!(replies[1].channel, "DB");
        assert_eq!(replies[1].text, "<@UC> has *Approved* this build");
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_qa_update_failure_sends_no_replies() {
        let chat = Arc::new(FakeChat::failing_for(&["DC"]));

        let err = workflow(chat.clone(), Arc::new(FakeCluster::default()))
            .handle(qa_click("reject", encoded_payload()))
            .await
            .unwrap_err();

        assert!(matches!(err, ApprovalError::Notification(_)));
        assert_eq!(chat.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_deploy_freezes_owner_messages_and_announces() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::default());

        let outcome = workflow(chat.clone(), cluster.clone())
            .handle(owner_click("deploy", encoded_payload()))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            ApprovalOutcome::Promoted {
                url: "https://web.example.com".to_string()
            }
        );
        assert!(cluster.deployment("web").is_some());

        let updates = chat.updates();
        let targets: Vec<(&str, &str)> = updates
            .iter()
            .map(|m| (m.channel.as_str(), m.ts.as_str()))
            .collect();
        assert_eq!(
            targets,
            vec![
                ("DA", "1700000000.000002"),
                ("DB", "1700000000.000003"),
                ("C0WEB", "1700000000.000004"),
            ]
        );
        for update in &updates {
            let marker = update.attachments.last().unwrap();
            assert_eq!(marker.title, "Deployed to production");
            assert_eq!(update.attachments.iter().filter(|a| a.is_decision()).count(), 1);
        }
        assert!(updates[0].text.contains("Deployment Successful"));

        let posts = chat.posts();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].channel, "C0WEB");
        assert!(posts[0].text.contains("<@UA>"));
    }

    #[tokio::test]
    async fn test_production_failure_reports_and_freezes_nothing() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::failing("get deployment", 500));

        let outcome = workflow(chat.clone(), cluster.clone())
            .handle(owner_click("deploy", encoded_payload()))
            .await
            .unwrap();

        assert!(matches!(outcome, ApprovalOutcome::PromotionFailed { reason } if reason.contains("500")));
        assert!(chat.updates().is_empty());
        let posts = chat.posts();
        assert_eq!(posts.len(), 1);
        assert!(posts[0].text.contains("failed"));
    }

    #[tokio::test]
    async fn test_close_never_touches_cluster() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::default());

        let outcome = workflow(chat.clone(), cluster.clone())
            .handle(owner_click("close", encoded_payload()))
            .await
            .unwrap();

        assert_eq!(outcome, ApprovalOutcome::Closed);
        assert!(cluster.calls().is_empty());
        assert!(chat.posts().is_empty());
        let updates = chat.updates();
        assert_eq!(updates.len(), 3);
        assert!(updates.iter().all(|m| m.attachments.last().unwrap().title == "Closed"));
    }

    #[tokio::test]
    async fn test_corrupted_payload_mutates_nothing() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::default());
        let mut value = encoded_payload();
        value.truncate(value.len() - 4);

        let err = workflow(chat.clone(), cluster.clone())
            .handle(owner_click("deploy", value))
            .await
            .unwrap_err();

        assert!(matches!(err, ApprovalError::Payload(_)));
        assert!(chat.sent().is_empty());
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unregistered_project_mutates_nothing() {
        let chat = Arc::new(FakeChat::default());
        let mut b = build("main", BuildType::Branch);
        b.project = "gone".to_string();
        let value = codec().encode(&WorkflowPayload::new(b, owner_messages())).unwrap();

        let err = workflow(chat.clone(), Arc::new(FakeCluster::default()))
            .handle(owner_click("close", value))
            .await
            .unwrap_err();

        assert!(matches!(err, ApprovalError::UnknownProject(id) if id == "gone"));
        assert!(chat.sent().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_category_and_action_are_ignored() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::default());
        let workflow = workflow(chat.clone(), cluster.clone());

        let mut unknown = owner_click("deploy", encoded_payload());
        unknown.callback_id = "Something Else".to_string();
        assert_eq!(workflow.handle(unknown).await.unwrap(), ApprovalOutcome::Ignored);

        let odd = owner_click("rollback", encoded_payload());
        assert_eq!(workflow.handle(odd).await.unwrap(), ApprovalOutcome::Ignored);

        let mut empty = owner_click("deploy", encoded_payload());
        empty.callback_id = "Something Else".to_string();
        empty.actions.clear();
        assert_eq!(workflow.handle(empty).await.unwrap(), ApprovalOutcome::Ignored);

        assert!(chat.sent().is_empty());
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_action_is_an_error() {
        let mut interaction = owner_click("deploy", encoded_payload());
        interaction.actions.clear();

        let err = workflow(Arc::new(FakeChat::default()), Arc::new(FakeCluster::default()))
            .handle(interaction)
            .await
            .unwrap_err();

        assert!(matches!(err, ApprovalError::MissingAction));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_deploy_or_close() {
        let chat = Arc::new(FakeChat::default());
        let cluster = Arc::new(FakeCluster::default());
        let workflow = workflow(chat.clone(), cluster.clone());

        for action in ["deploy", "close"] {
            let mut interaction = owner_click(action, encoded_payload());
            interaction.user.id = "UC".to_string();
            assert_eq!(
                workflow.handle(interaction).await.unwrap(),
                ApprovalOutcome::Ignored
            );
        }

        assert!(chat.sent().is_empty());
        assert!(cluster.calls().is_empty());
    }

    #[tokio::test]
    async fn test_decision_from_owner_message_is_updated_once() {
        let chat = Arc::new(FakeChat::default());
        let mut interaction = owner_click("close", encoded_payload());
        interaction.channel.id = "DA".to_string();
        interaction.message_ts = "1700000000.000002".to_string();

        let outcome = workflow(chat.clone(), Arc::new(FakeCluster::default()))
            .handle(interaction)
            .await
            .unwrap();

        assert_eq!(outcome, ApprovalOutcome::Closed);
        let targets: Vec<String> = chat.updates().iter().map(|m| m.channel.clone()).collect();
        assert_eq!(targets, vec!["DA", "DB"]);
    }
}
