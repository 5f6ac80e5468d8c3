//! Chat message DTOs

use serde::{Deserialize, Serialize};

use super::interaction::DECISION_TAGS;

/// A chat message, either new or an update of an existing one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub channel: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,

    /// Recipient of an ephemeral message
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user: String,

    /// Timestamp of the message to update
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub ts: String,

    /// Timestamp of the thread root to reply to
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thread_ts: String,

    /// Send as an in-place update of `ts`
    #[serde(skip)]
    pub update: bool,

    /// Send as an ephemeral message visible to `user` only
    #[serde(skip)]
    pub ephemeral: bool,
}

impl Message {
    pub fn new(channel: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_attachment(mut self, attachment: Attachment) -> Self {
        self.attachments.push(attachment);
        self
    }

    /// Turns this message into an in-place update of `channel`/`ts`
    pub fn into_update(mut self, channel: impl Into<String>, ts: impl Into<String>) -> Self {
        self.channel = channel.into();
        self.ts = ts.into();
        self.update = true;
        self
    }

    /// Turns this message into a threaded reply
    pub fn in_thread(mut self, channel: impl Into<String>, thread_ts: impl Into<String>) -> Self {
        self.channel = channel.into();
        self.thread_ts = thread_ts.into();
        self
    }

    /// Removes every attachment tagged as a decision control or marker
    ///
    /// Returns the number of attachments removed.
    pub fn strip_decisions(&mut self) -> usize {
        let before = self.attachments.len();
        self.attachments.retain(|a| !a.is_decision());
        before - self.attachments.len()
    }
}

/// A message attachment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fallback: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,

    /// Routes clicks on `actions` back to a handler; also used as a tag
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub callback_id: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub color: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl Attachment {
    pub fn is_decision(&self) -> bool {
        DECISION_TAGS.contains(&self.callback_id.as_str())
    }
}

/// A field inside an attachment
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Field {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub title: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub short: bool,
}

impl Field {
    pub fn new(title: impl Into<String>, value: impl Into<String>, short: bool) -> Self {
        Self {
            title: title.into(),
            value: value.into(),
            short,
        }
    }
}

/// An interactive control (button)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Action {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub text: String,

    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,

    /// Opaque value echoed back on click
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm: Option<Confirm>,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub style: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub url: String,
}

/// Confirmation dialog shown before an action fires
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Confirm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub ok_text: String,
    #[serde(default)]
    pub dismiss_text: String,
}
