//! Service Module
//!
//! Business logic layer for the orchestrator.
//! Services drive the chat and cluster clients and contain the workflow logic.

pub mod approval;
pub mod messages;
pub mod notifier;
pub mod pipeline;
pub mod queue;
pub mod reconciler;

#[cfg(test)]
pub mod testing;

// Re-export for convenience
pub use approval::{ApprovalOutcome, ApprovalWorkflow};
pub use notifier::Notifier;
pub use pipeline::{DeploymentPipeline, PipelineReport, PipelineState};
pub use queue::WorkQueue;
pub use reconciler::Reconciler;
