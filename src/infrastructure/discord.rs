//! # Discord REST Gateway
//!
//! Implements `ChatGateway` against the Discord v9 REST API with plain
//! `reqwest` calls. One gateway exists per account token; the API base is
//! configurable so tests can point the client at a local server.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::traits::ChatGateway;
use crate::domain::types::{ChannelInfo, IncomingMessage, SelfAccount};

#[derive(Clone)]
pub struct DiscordGateway {
    http: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Debug, Deserialize)]
struct UserPayload {
    id: String,
    #[serde(default)]
    username: String,
}

#[derive(Debug, Deserialize)]
struct ChannelPayload {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    guild_id: Option<String>,
    #[serde(default)]
    rate_limit_per_user: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GuildPayload {
    #[serde(default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    id: String,
    author: AuthorPayload,
    #[serde(default)]
    content: String,
    #[serde(rename = "type", default)]
    type_code: u8,
    #[serde(default)]
    attachments: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct AuthorPayload {
    id: String,
}

#[derive(Debug, Serialize)]
struct OutgoingMessage<'a> {
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    message_reference: Option<MessageReference<'a>>,
}

#[derive(Debug, Serialize)]
struct MessageReference<'a> {
    message_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    id: String,
}

impl DiscordGateway {
    pub fn new(api_base: &str, token: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T, String> {
        let resp = self
            .http
            .get(url)
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }
        resp.json::<T>().await.map_err(|e| e.to_string())
    }
}

#[async_trait]
impl ChatGateway for DiscordGateway {
    async fn self_account(&self) -> Result<SelfAccount, String> {
        let user: UserPayload = self
            .get_json(&format!("{}/users/@me", self.api_base))
            .await?;
        Ok(SelfAccount {
            id: user.id,
            username: user.username,
        })
    }

    async fn channel_info(&self, channel_id: &str) -> Result<ChannelInfo, String> {
        let channel: ChannelPayload = self
            .get_json(&format!("{}/channels/{}", self.api_base, channel_id))
            .await?;
        Ok(ChannelInfo {
            name: channel.name.unwrap_or_else(|| "Unknown Channel".to_string()),
            guild_id: channel.guild_id,
            rate_limit_per_user: channel.rate_limit_per_user.unwrap_or(0),
        })
    }

    async fn guild_name(&self, guild_id: &str) -> Result<String, String> {
        let guild: GuildPayload = self
            .get_json(&format!("{}/guilds/{}", self.api_base, guild_id))
            .await?;
        Ok(guild.name.unwrap_or_else(|| "Unknown Server".to_string()))
    }

    async fn latest_message(&self, channel_id: &str) -> Result<Option<IncomingMessage>, String> {
        let messages: Vec<MessagePayload> = self
            .get_json(&format!(
                "{}/channels/{}/messages",
                self.api_base, channel_id
            ))
            .await?;
        // The list arrives most-recent-first
        Ok(messages.into_iter().next().map(|m| IncomingMessage {
            id: m.id,
            author_id: m.author.id,
            content: m.content,
            has_attachments: !m.attachments.is_empty(),
            type_code: m.type_code,
        }))
    }

    async fn send_message(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Result<String, String> {
        let payload = OutgoingMessage {
            content,
            message_reference: reply_to.map(|message_id| MessageReference { message_id }),
        };
        let resp = self
            .http
            .post(format!("{}/channels/{}/messages", self.api_base, channel_id))
            .header("Authorization", &self.token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            // Channel or account rate limit, kept distinct from generic failure
            return Err("rate limited (429)".to_string());
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(format!("HTTP {}: {}", status, body));
        }
        let sent: SentMessage = resp.json().await.map_err(|e| e.to_string())?;
        Ok(sent.id)
    }

    async fn delete_message(&self, channel_id: &str, message_id: &str) -> Result<(), String> {
        let resp = self
            .http
            .delete(format!(
                "{}/channels/{}/messages/{}",
                self.api_base, channel_id, message_id
            ))
            .header("Authorization", &self.token)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if resp.status() == StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(format!("HTTP {}", resp.status()))
        }
    }
}
