//! # Domain Traits
//!
//! Abstract interfaces for the external services the bot talks to.
//! Allows for pluggable implementations in the Infrastructure layer and
//! in-process fakes under test.

use async_trait::async_trait;

use crate::domain::types::{ChannelInfo, GenerationError, IncomingMessage, SelfAccount};

/// Abstract interface to the chat service (fetch, post, delete).
#[async_trait]
pub trait ChatGateway: Send + Sync {
    /// Resolve the account this gateway is authenticated as
    async fn self_account(&self) -> Result<SelfAccount, String>;

    /// Look up a channel's metadata (name, guild, slow-mode interval)
    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, String>;

    /// Look up a guild's display name
    async fn guild_name(&self, guild_id: &str) -> Result<String, String>;

    /// Fetch the most recent message in a channel, if any
    async fn latest_message(&self, channel_id: &str) -> Result<Option<IncomingMessage>, String>;

    /// Post a message, optionally as a threaded reply to `reply_to`.
    /// Returns the id the remote service assigned to the new message.
    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<String, String>;

    /// Delete a previously posted message
    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), String>;
}

/// Abstract interface to the text-generation service
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Generate a completion for the prompt using the given API key
    async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, GenerationError>;
}
