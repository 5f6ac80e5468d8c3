//! Chat interaction DTOs
//!
//! An interaction is what the chat provider posts back when someone clicks a
//! button the orchestrator sent earlier.

use serde::{Deserialize, Serialize};

use super::chat::{Action, Message};

/// The only interaction type the orchestrator handles
pub const INTERACTIVE_MESSAGE: &str = "interactive_message";

/// Tag of the attachment that records a decision that was already taken
pub const DECISION_MARKER_TAG: &str = "Decision Marker";

/// Every `callback_id` that marks an attachment as decision related
pub const DECISION_TAGS: [&str; 3] = [
    Category::QA_RESPONSE,
    Category::DEPLOY_DECISION,
    DECISION_MARKER_TAG,
];

/// Callback payload posted by the chat provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Interaction {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default)]
    pub actions: Vec<Action>,

    #[serde(default)]
    pub callback_id: String,

    #[serde(default)]
    pub team: Entity,

    #[serde(default)]
    pub channel: Entity,

    #[serde(default)]
    pub user: Entity,

    #[serde(default)]
    pub message_ts: String,

    #[serde(default)]
    pub original_message: Message,
}

impl Interaction {
    /// The single action that was clicked
    pub fn action(&self) -> Option<&Action> {
        self.actions.first()
    }

    pub fn category(&self) -> Option<Category> {
        Category::parse(&self.callback_id)
    }

    pub fn is_interactive_message(&self) -> bool {
        self.kind == INTERACTIVE_MESSAGE
    }
}

/// A `{id, name}` reference to a user, channel or team
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub id: String,

    #[serde(default, alias = "domain", skip_serializing_if = "String::is_empty")]
    pub name: String,
}

/// Which handler an interaction belongs to
///
/// Set as the attachment `callback_id` when the controls are built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    QaResponse,
    DeployDecision,
}

impl Category {
    const QA_RESPONSE: &'static str = "QA Response";
    const DEPLOY_DECISION: &'static str = "Deploy Decision";

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::QaResponse => Self::QA_RESPONSE,
            Category::DeployDecision => Self::DEPLOY_DECISION,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            Self::QA_RESPONSE => Some(Category::QaResponse),
            Self::DEPLOY_DECISION => Some(Category::DeployDecision),
            _ => None,
        }
    }
}

/// QA button names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QaVerdict {
    Approve,
    Reject,
}

impl QaVerdict {
    pub fn name(&self) -> &'static str {
        match self {
            QaVerdict::Approve => "approve",
            QaVerdict::Reject => "reject",
        }
    }

    /// Past tense label shown once the verdict is recorded
    pub fn label(&self) -> &'static str {
        match self {
            QaVerdict::Approve => "Approved",
            QaVerdict::Reject => "Rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "approve" => Some(QaVerdict::Approve),
            "reject" => Some(QaVerdict::Reject),
            _ => None,
        }
    }
}

/// Owner button names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnerDecision {
    Deploy,
    Close,
}

impl OwnerDecision {
    pub fn name(&self) -> &'static str {
        match self {
            OwnerDecision::Deploy => "deploy",
            OwnerDecision::Close => "close",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deploy" => Some(OwnerDecision::Deploy),
            "close" => Some(OwnerDecision::Close),
            _ => None,
        }
    }
}
