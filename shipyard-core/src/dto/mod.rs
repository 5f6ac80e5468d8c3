//! Data Transfer Objects for external systems
//!
//! This module contains the wire representations the orchestrator exchanges
//! with the chat provider and the cluster scheduler. Only the fields the
//! workflow actually touches are modelled; unknown fields are ignored when
//! deserializing.

pub mod chat;
pub mod cluster;
pub mod interaction;
