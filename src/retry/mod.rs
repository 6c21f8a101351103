//! Retry and Polling
//!
//! Resilience primitives shared by every orchestrator:
//! - Exponential backoff with jitter and configurable fault classes
//! - Bounded fixed-interval polling

pub mod policy;
pub mod poll;

pub use poll::PollConfig;
pub use policy::{RetryOn, RetryPolicy};
