//! Workflow state carried through chat

use serde::{Deserialize, Serialize};

use super::build::Build;

/// Location of a message previously sent through chat
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageRef {
    pub channel: String,
    pub ts: String,
}

impl MessageRef {
    pub fn new(channel: impl Into<String>, ts: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            ts: ts.into(),
        }
    }
}

/// The success message an owner received for a build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnerMessage {
    pub owner: String,
    pub channel: String,
    pub ts: String,
}

impl OwnerMessage {
    pub fn message_ref(&self) -> MessageRef {
        MessageRef::new(self.channel.clone(), self.ts.clone())
    }
}

/// Everything the approval handlers need to resume a workflow
///
/// Written once, after the staging deploy succeeded, and embedded in every
/// interactive control sent for the build. The server keeps no copy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowPayload {
    pub build: Build,

    #[serde(default)]
    pub owner_messages: Vec<OwnerMessage>,
}

impl WorkflowPayload {
    pub fn new(build: Build, owner_messages: Vec<OwnerMessage>) -> Self {
        Self {
            build,
            owner_messages,
        }
    }
}
