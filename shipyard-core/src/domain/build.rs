//! Build domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A completed build, ready to be deployed
///
/// Created when the build-complete webhook fires and consumed by exactly one
/// pipeline run. It is also embedded in the workflow payload so the approval
/// handlers can promote the same image later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Build {
    /// Id of the project this build belongs to
    pub project: String,

    /// Branch or tag name
    pub target: String,

    /// Container image reference, already pushed
    pub image: String,

    #[serde(rename = "type")]
    pub kind: BuildType,
}

/// Whether the build was produced from a branch or a tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Branch,
    Tag,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Branch => "branch",
            BuildType::Tag => "tag",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "branch" => Ok(BuildType::Branch),
            "tag" => Ok(BuildType::Tag),
            other => Err(format!("unknown build type '{}'", other)),
        }
    }
}
