//! # Domain Types
//!
//! Common data structures used across the application logic.

/// A message fetched from a channel. Transient: it lives for one poll
/// cycle and is dropped after the dedup check.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub id: String,
    pub author_id: String,
    pub content: String,
    pub has_attachments: bool,
    pub type_code: u8,
}

/// Channel metadata, used for startup logging and slow-mode queries.
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub name: String,
    pub guild_id: Option<String>,
    /// The channel's slow-mode interval in seconds (0 = off)
    pub rate_limit_per_user: u64,
}

/// The account a chat token authenticates as.
#[derive(Debug, Clone)]
pub struct SelfAccount {
    pub id: String,
    pub username: String,
}

/// Failure modes of the generation endpoint that callers branch on.
#[derive(Debug)]
pub enum GenerationError {
    /// HTTP 429: the API key is spent until the next pool reset
    RateLimited,
    /// Anything else: network failure, non-429 error status, malformed body
    Transient(String),
}

impl std::fmt::Display for GenerationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GenerationError::RateLimited => write!(f, "rate limited (429)"),
            GenerationError::Transient(msg) => write!(f, "{}", msg),
        }
    }
}
