//! Shipyard Core
//!
//! Core types and abstractions for the Shipyard release orchestrator.
//!
//! This crate contains:
//! - Domain types: projects, builds, deployment targets and the workflow payload
//! - DTOs: chat wire messages, chat interactions and cluster manifests
//! - The payload codec used to carry workflow state through chat controls
//!
//! Nothing in here performs I/O.

pub mod domain;
pub mod dto;
pub mod payload;
