//! Agent Admin Clients
//!
//! Typed access to the three agents' administrative HTTP APIs:
//! - [`AgentApi`] trait, one method per admin endpoint
//! - [`AgentClient`] over reqwest
//! - Request and record payloads
//!
//! Every failure surfaces as a network, agent or protocol [`crate::Error`].

pub mod api;
pub mod client;
pub mod config;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use api::{AgentApi, AgentSet};
pub use client::AgentClient;
pub use config::{AgentConfig, AgentEndpoints};
pub use types::*;
