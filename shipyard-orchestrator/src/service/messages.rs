//! Chat message builders
//!
//! Pure functions producing every message the orchestrator sends. Decision
//! controls and decision markers are tagged through `callback_id` so they can
//! later be found and replaced without relying on attachment positions.

use shipyard_core::domain::{Build, Project};
use shipyard_core::dto::chat::{Action, Attachment, Confirm, Field, Message};
use shipyard_core::dto::interaction::{Category, DECISION_MARKER_TAG, OwnerDecision, QaVerdict};

const BUILD_COMPLETE: &str = "New Build complete.";

pub const COLOR_GOOD: &str = "good";
pub const COLOR_DANGER: &str = "danger";

fn mention(user: &str) -> String {
    format!("<@{}>", user)
}

/// Project, image, type and target of a build
pub fn build_summary(project: &Project, build: &Build) -> Attachment {
    Attachment {
        fallback: format!(
            "Project: {} Type: {} Target: {} Image: {}",
            project.name, build.kind, build.target, build.image
        ),
        fields: vec![
            Field::new("Project", &project.name, false),
            Field::new("Docker Image", &build.image, false),
            Field::new("Type", build.kind.as_str(), true),
            Field::new("Target", &build.target, true),
        ],
        ..Default::default()
    }
}

/// Link button to a deployed URL
pub fn view_link(url: &str) -> Attachment {
    Attachment {
        fallback: format!("View project: {}", url),
        color: COLOR_GOOD.to_string(),
        actions: vec![Action {
            kind: "button".to_string(),
            text: "View project".to_string(),
            url: url.to_string(),
            ..Default::default()
        }],
        ..Default::default()
    }
}

fn failure_reason(reason: &str) -> Attachment {
    Attachment {
        fallback: format!("Failure Reason: {}", reason),
        color: COLOR_DANGER.to_string(),
        fields: vec![Field::new("Failure Reason", reason, false)],
        ..Default::default()
    }
}

/// Attachment recording a decision, replacing the controls that produced it
pub fn decision_marker(title: &str, color: &str) -> Attachment {
    Attachment {
        title: title.to_string(),
        fallback: title.to_string(),
        color: color.to_string(),
        callback_id: DECISION_MARKER_TAG.to_string(),
        ..Default::default()
    }
}

// =============================================================================
// Staging
// =============================================================================

/// Posted to the project channel before anything is deployed
pub fn attempt(project: &Project, build: &Build) -> Message {
    Message::new(
        &project.channel,
        format!("{}\nAttempting deployment...", BUILD_COMPLETE),
    )
    .with_attachment(build_summary(project, build))
}

/// Staging deploy succeeded; also the body of each owner's message
pub fn deploy_success(project: &Project, build: &Build, url: &str) -> Message {
    Message::new(
        &project.channel,
        format!("{}\nDeployment Successful! :sunglasses:", BUILD_COMPLETE),
    )
    .with_attachment(build_summary(project, build))
    .with_attachment(view_link(url))
}

/// Staging deploy failed
pub fn deploy_failed(project: &Project, build: &Build, reason: &str) -> Message {
    Message::new(
        &project.channel,
        format!("{}\nDeployment Failed :sob:", BUILD_COMPLETE),
    )
    .with_attachment(build_summary(project, build))
    .with_attachment(failure_reason(reason))
}

/// Read-only list of who will QA the build
pub fn qa_team(project: &Project) -> Attachment {
    Attachment {
        title: "QA to be done by:".to_string(),
        fallback: "QA to be done by:".to_string(),
        fields: project
            .qa
            .iter()
            .map(|user| Field::new("", mention(user), true))
            .collect(),
        ..Default::default()
    }
}

fn owner_controls(payload: &str) -> Attachment {
    let confirm = |text: &str, ok_text: &str| Confirm {
        title: "Are you sure?".to_string(),
        text: text.to_string(),
        ok_text: ok_text.to_string(),
        dismiss_text: "Cancel".to_string(),
    };

    Attachment {
        fallback: "Deploy to Production.".to_string(),
        callback_id: Category::DeployDecision.as_str().to_string(),
        actions: vec![
            Action {
                name: OwnerDecision::Deploy.name().to_string(),
                text: "Deploy to Production".to_string(),
                kind: "button".to_string(),
                value: payload.to_string(),
                style: "primary".to_string(),
                confirm: Some(confirm(
                    "This will deploy to production. The process cannot be reversed.",
                    "Deploy",
                )),
                ..Default::default()
            },
            Action {
                name: OwnerDecision::Close.name().to_string(),
                text: "Close".to_string(),
                kind: "button".to_string(),
                value: payload.to_string(),
                style: COLOR_DANGER.to_string(),
                confirm: Some(confirm(
                    "This will close this deployment. The process cannot be reversed.",
                    "Close",
                )),
                ..Default::default()
            },
        ],
        ..Default::default()
    }
}

/// Decision message for the owners, carrying the signed payload
///
/// Channel and thread are set by the caller.
pub fn owner_decision(project: &Project, build: &Build, payload: &str) -> Message {
    let owners: Vec<String> = project.owners.iter().map(|o| mention(o)).collect();

    Message {
        text: format!(
            "{} `{}` is on staging. Promote it to production?",
            owners.join(" "),
            build.image
        ),
        ..Default::default()
    }
    .with_attachment(qa_team(project))
    .with_attachment(owner_controls(payload))
}

fn qa_controls(payload: &str) -> Attachment {
    let button = |verdict: QaVerdict, style: &str| Action {
        name: verdict.name().to_string(),
        text: verdict.name()[..1].to_uppercase() + &verdict.name()[1..],
        kind: "button".to_string(),
        value: payload.to_string(),
        style: style.to_string(),
        ..Default::default()
    };

    Attachment {
        title: "Kindly perform QA for this project.".to_string(),
        fallback: "Kindly perform QA for this project.".to_string(),
        callback_id: Category::QaResponse.as_str().to_string(),
        actions: vec![
            button(QaVerdict::Approve, "primary"),
            button(QaVerdict::Reject, COLOR_DANGER),
        ],
        ..Default::default()
    }
}

/// QA request sent to each QA member, carrying the signed payload
pub fn qa_request(project: &Project, build: &Build, url: &str, payload: &str) -> Message {
    deploy_success(project, build, url).with_attachment(qa_controls(payload))
}

// =============================================================================
// Decisions
// =============================================================================

/// Threaded reply telling an owner what QA decided
pub fn qa_verdict_reply(user: &str, verdict: QaVerdict) -> Message {
    Message {
        text: format!("{} has *{}* this build", mention(user), verdict.label()),
        ..Default::default()
    }
}

/// Public announcement of a production deploy
pub fn production_success(project: &Project, build: &Build, user: &str, url: &str) -> Message {
    Message::new(
        &project.channel,
        format!(
            "New production deployment for project {} by {}",
            project.name,
            mention(user)
        ),
    )
    .with_attachment(Attachment {
        fallback: format!(
            "Project: {} Image: {} By: {}",
            project.name,
            build.image,
            mention(user)
        ),
        fields: vec![
            Field::new("Project", &project.name, false),
            Field::new("Docker Image", &build.image, false),
            Field::new("By", mention(user), true),
        ],
        ..Default::default()
    })
    .with_attachment(view_link(url))
}

/// Production deploy failed
pub fn production_failed(project: &Project, build: &Build, reason: &str) -> Message {
    Message::new(
        &project.channel,
        format!("Production deployment failed for project {}", project.name),
    )
    .with_attachment(Attachment {
        fallback: format!("Project: {} Image: {}", project.name, build.image),
        fields: vec![
            Field::new("Project", &project.name, false),
            Field::new("Docker Image", &build.image, false),
        ],
        ..Default::default()
    })
    .with_attachment(failure_reason(reason))
}

/// `message` with its decision attachments swapped for `marker`
pub fn with_decision(mut message: Message, marker: Attachment) -> Message {
    message.strip_decisions();
    message.with_attachment(marker)
}
