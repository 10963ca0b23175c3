//! # Infrastructure Layer
//!
//! Handles interactions with external systems and services.
//! Implements the traits defined in the Domain layer (ChatGateway,
//! GenerationBackend).

pub mod discord;
pub mod gemini;
