//! # Application Configuration
//!
//! Matches the layout of `data/config.yaml`, plus loaders for the
//! channel-list file and the environment-supplied secrets referenced
//! from it.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;

/// Main application configuration structure.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub chat: ChatServiceConfig,
    #[serde(default)]
    pub generation: GenerationServiceConfig,
    #[serde(default)]
    pub channels: ChannelSourceConfig,
    /// Settings applied to every channel without an override entry
    #[serde(default)]
    pub defaults: ChannelSettings,
    /// Per-channel settings, keyed by channel id
    #[serde(default)]
    pub overrides: HashMap<String, ChannelSettings>,
}

impl AppConfig {
    pub fn load(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse {}", path))
    }

    /// The effective settings for one channel.
    pub fn settings_for(&self, channel_id: &str) -> ChannelSettings {
        self.overrides
            .get(channel_id)
            .cloned()
            .unwrap_or_else(|| self.defaults.clone())
    }
}

/// Connection details for the chat service.
#[derive(Debug, Deserialize, Clone)]
pub struct ChatServiceConfig {
    #[serde(default = "default_chat_api_base")]
    pub api_base: String,
    /// Environment variable holding the comma-separated account tokens
    #[serde(default = "default_tokens_env")]
    pub tokens_env: String,
}

impl Default for ChatServiceConfig {
    fn default() -> Self {
        Self {
            api_base: default_chat_api_base(),
            tokens_env: default_tokens_env(),
        }
    }
}

/// Connection details for the text-generation service.
#[derive(Debug, Deserialize, Clone)]
pub struct GenerationServiceConfig {
    #[serde(default = "default_generation_api_base")]
    pub api_base: String,
    #[serde(default = "default_generation_model")]
    pub model: String,
    /// Environment variable holding the comma-separated API keys
    #[serde(default = "default_keys_env")]
    pub keys_env: String,
    /// How long the key pool sleeps once every key is rate limited
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u64,
}

impl Default for GenerationServiceConfig {
    fn default() -> Self {
        Self {
            api_base: default_generation_api_base(),
            model: default_generation_model(),
            keys_env: default_keys_env(),
            cooldown_seconds: default_cooldown_seconds(),
        }
    }
}

/// Where the channel list and the reply corpus live on disk.
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelSourceConfig {
    /// One channel id per line
    #[serde(default = "default_list_file")]
    pub list_file: String,
    /// One canned reply per line, used when generation is disabled
    #[serde(default = "default_corpus_file")]
    pub corpus_file: String,
}

impl Default for ChannelSourceConfig {
    fn default() -> Self {
        Self {
            list_file: default_list_file(),
            corpus_file: default_corpus_file(),
        }
    }
}

/// Per-channel behavior. One copy per worker, immutable after startup.
#[derive(Debug, Deserialize, Clone)]
pub struct ChannelSettings {
    #[serde(default = "default_language")]
    pub language: String,
    /// Generate replies with the generation service; otherwise post
    /// corpus lines on a fixed interval
    #[serde(default = "default_true")]
    pub use_generation: bool,
    #[serde(default = "default_read_delay")]
    pub read_delay_seconds: u64,
    #[serde(default = "default_reply_interval")]
    pub reply_interval_seconds: u64,
    /// Honor the channel's own slow-mode interval before replying
    #[serde(default = "default_true")]
    pub use_slow_mode: bool,
    /// Send replies threaded onto the message being answered
    #[serde(default = "default_true")]
    pub reply_in_thread: bool,
    #[serde(default)]
    pub delete_after_seconds: Option<u64>,
    #[serde(default)]
    pub delete_immediately: bool,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            language: default_language(),
            use_generation: true,
            read_delay_seconds: default_read_delay(),
            reply_interval_seconds: default_reply_interval(),
            use_slow_mode: true,
            reply_in_thread: true,
            delete_after_seconds: None,
            delete_immediately: false,
        }
    }
}

fn default_chat_api_base() -> String {
    "https://discord.com/api/v9".to_string()
}

fn default_tokens_env() -> String {
    "DISCORD_TOKENS".to_string()
}

fn default_generation_api_base() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_generation_model() -> String {
    "gemini-1.5-flash-latest".to_string()
}

fn default_keys_env() -> String {
    "GOOGLE_API_KEYS".to_string()
}

fn default_cooldown_seconds() -> u64 {
    86_400
}

fn default_list_file() -> String {
    "data/channels.txt".to_string()
}

fn default_corpus_file() -> String {
    "data/chats.txt".to_string()
}

fn default_language() -> String {
    "en".to_string()
}

fn default_true() -> bool {
    true
}

fn default_read_delay() -> u64 {
    15
}

fn default_reply_interval() -> u64 {
    20
}

/// Read a comma-separated secret list from the environment.
pub fn env_list(var: &str) -> Result<Vec<String>> {
    let raw = std::env::var(var).with_context(|| format!("{} is not set", var))?;
    let values: Vec<String> = raw
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    if values.is_empty() {
        bail!("{} is set but contains no values", var);
    }
    Ok(values)
}

/// Read channel ids from the list file, one per line. Blank lines are
/// ignored; an empty list is a startup error.
pub fn load_channel_ids(path: &str) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path))?;
    let ids: Vec<String> = content
        .lines()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if ids.is_empty() {
        bail!("No channel ids found in {}", path);
    }
    Ok(ids)
}
