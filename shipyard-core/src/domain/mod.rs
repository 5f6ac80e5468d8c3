//! Core domain types
//!
//! This module contains the business entities the orchestrator reasons about.
//! Projects are static configuration, builds are transient, deployment targets
//! are derived per call and the workflow payload is the only state that
//! outlives a single task.

pub mod build;
pub mod project;
pub mod target;
pub mod workflow;

pub use build::{Build, BuildType};
pub use project::Project;
pub use target::{DeploymentTarget, Environment};
pub use workflow::{MessageRef, OwnerMessage, WorkflowPayload};
