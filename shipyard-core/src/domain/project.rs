//! Project domain types

use serde::{Deserialize, Serialize};

/// A deployable project
///
/// Loaded once from configuration and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    /// Stable identifier, also the production resource name
    pub id: String,

    /// Human readable name used in chat messages
    pub name: String,

    /// Production URL; staging hosts are derived from it
    pub url: String,

    /// Channel that receives attempt/result notifications
    pub channel: String,

    /// Chat user ids asked to QA each staging deploy
    #[serde(default)]
    pub qa: Vec<String>,

    /// Chat user ids allowed to promote to production
    #[serde(default)]
    pub owners: Vec<String>,
}
