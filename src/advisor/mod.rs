//! The optional AI advisory feature: context document assembly and the
//! streaming client for the chat completion endpoint.

pub mod client;
pub mod context;

pub use client::{AdvisorClient, AdvisoryService, ReplyStream};
pub use context::{build_context, NO_POSITIONS_MARKER};
