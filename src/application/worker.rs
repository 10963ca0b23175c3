//! # Channel Worker
//!
//! The poll → generate → send → (delete) loop for a single channel. One
//! worker task runs per configured channel. Workers share the dedup set,
//! the key pool and the last-generated-text guard, but never each
//! other's cycle state: within a channel, cycles are strictly
//! sequential.

use regex::Regex;
use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::application::dispatcher::Dispatcher;
use crate::application::generator::ReplyGenerator;
use crate::domain::config::ChannelSettings;
use crate::domain::traits::ChatGateway;
use crate::domain::types::IncomingMessage;

/// Message ids answered by any worker, for the lifetime of the process.
pub type ProcessedIds = Arc<Mutex<HashSet<String>>>;

/// Message type code the chat service uses for system/deleted-reply
/// markers, which are never answered.
const SYSTEM_REPLY_TYPE: u8 = 8;

/// Seconds to wait when the slow-mode lookup itself fails.
const SLOW_MODE_FALLBACK_SECS: u64 = 5;

/// Sent in place of a generated reply that came back empty.
const EMPTY_REPLY_FALLBACK: &str = "Sorry, cannot reply to message.";

fn word_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\w").expect("valid pattern"))
}

pub struct ChannelWorker {
    channel_id: String,
    settings: ChannelSettings,
    /// Our own account id, so we never answer ourselves
    self_id: String,
    gateway: Arc<dyn ChatGateway>,
    generator: Arc<ReplyGenerator>,
    dispatcher: Dispatcher,
    processed: ProcessedIds,
}

impl ChannelWorker {
    pub fn new(
        channel_id: String,
        settings: ChannelSettings,
        self_id: String,
        gateway: Arc<dyn ChatGateway>,
        generator: Arc<ReplyGenerator>,
        dispatcher: Dispatcher,
        processed: ProcessedIds,
    ) -> Self {
        Self {
            channel_id,
            settings,
            self_id,
            gateway,
            generator,
            dispatcher,
            processed,
        }
    }

    /// Drive the channel forever. Nothing stops the loop but process
    /// termination; every per-cycle failure is logged and absorbed.
    pub async fn run(self) {
        if self.settings.use_generation {
            self.run_polling().await;
        } else {
            self.run_corpus().await;
        }
    }

    async fn run_polling(&self) {
        loop {
            tracing::info!(
                "[channel {}] Waiting {}s before reading messages",
                self.channel_id,
                self.settings.read_delay_seconds
            );
            sleep(Duration::from_secs(self.settings.read_delay_seconds)).await;

            if let Some(message) = self.next_candidate().await {
                self.reply_to(&message).await;
            }

            tracing::info!(
                "[channel {}] Waiting {}s before the next cycle",
                self.channel_id,
                self.settings.reply_interval_seconds
            );
            sleep(Duration::from_secs(self.settings.reply_interval_seconds)).await;
        }
    }

    /// Corpus mode never reads the channel: it posts a random corpus
    /// line once per interval.
    async fn run_corpus(&self) {
        loop {
            tracing::info!(
                "[channel {}] Waiting {}s before sending a corpus line",
                self.channel_id,
                self.settings.reply_interval_seconds
            );
            sleep(Duration::from_secs(self.settings.reply_interval_seconds)).await;

            match self.generator.generate("", &self.settings).await {
                Ok(text) => {
                    if let Some(sent_id) = self.dispatcher.send(&self.channel_id, &text, None).await
                    {
                        self.queue_delete(&sent_id);
                    }
                }
                Err(err) => {
                    tracing::warn!("[channel {}] {}; nothing sent", self.channel_id, err);
                }
            }
        }
    }

    /// Fetch the newest message and run the acceptance filter. Accepted
    /// ids are marked processed before generation starts, so an
    /// overlapping fetch of the same message cannot be answered twice.
    async fn next_candidate(&self) -> Option<IncomingMessage> {
        let message = match self.gateway.latest_message(&self.channel_id).await {
            Ok(Some(message)) => message,
            Ok(None) => {
                tracing::info!("[channel {}] No messages in channel", self.channel_id);
                return None;
            }
            Err(e) => {
                tracing::error!("[channel {}] Failed to fetch messages: {}", self.channel_id, e);
                return None;
            }
        };

        if message.author_id == self.self_id || message.type_code == SYSTEM_REPLY_TYPE {
            return None;
        }

        {
            let mut processed = self.processed.lock().await;
            if processed.contains(&message.id) {
                return None;
            }
            if message.has_attachments || !word_pattern().is_match(&message.content) {
                tracing::warn!(
                    "[channel {}] Message {} skipped (not plain text)",
                    self.channel_id,
                    message.id
                );
                return None;
            }
            processed.insert(message.id.clone());
        }

        tracing::info!("[channel {}] Received: {}", self.channel_id, message.content);
        Some(message)
    }

    async fn reply_to(&self, message: &IncomingMessage) {
        if self.settings.use_slow_mode {
            let delay = self.slow_mode_delay().await;
            if delay > 0 {
                tracing::info!(
                    "[channel {}] Slow mode active, waiting {}s",
                    self.channel_id,
                    delay
                );
                sleep(Duration::from_secs(delay)).await;
            }
        }

        let prompt = message.content.trim();
        let reply = match self.generator.generate(prompt, &self.settings).await {
            Ok(text) if text.trim().is_empty() => EMPTY_REPLY_FALLBACK.to_string(),
            Ok(text) => text,
            Err(err) => {
                tracing::warn!("[channel {}] {}; reply skipped", self.channel_id, err);
                return;
            }
        };

        // Never echo the message straight back
        if reply.trim().to_lowercase() == prompt.to_lowercase() {
            tracing::warn!(
                "[channel {}] Generated reply matches the received message, not sending",
                self.channel_id
            );
            return;
        }

        let reply_to = self
            .settings
            .reply_in_thread
            .then_some(message.id.as_str());
        if let Some(sent_id) = self.dispatcher.send(&self.channel_id, &reply, reply_to).await {
            self.queue_delete(&sent_id);
        }
    }

    /// The channel's current slow-mode interval, queried per message
    /// because moderators change it at runtime.
    async fn slow_mode_delay(&self) -> u64 {
        match self.gateway.channel_info(&self.channel_id).await {
            Ok(info) => info.rate_limit_per_user,
            Err(e) => {
                tracing::error!(
                    "[channel {}] Failed to fetch slow mode delay: {}",
                    self.channel_id,
                    e
                );
                SLOW_MODE_FALLBACK_SECS
            }
        }
    }

    fn queue_delete(&self, message_id: &str) {
        if self.settings.delete_immediately {
            tracing::info!(
                "[channel {}] Deleting reply {} immediately",
                self.channel_id,
                message_id
            );
            self.dispatcher
                .schedule_delete(&self.channel_id, message_id, Duration::ZERO);
        } else if let Some(secs) = self.settings.delete_after_seconds {
            if secs > 0 {
                tracing::info!(
                    "[channel {}] Reply {} will be deleted in {}s",
                    self.channel_id,
                    message_id,
                    secs
                );
                self.dispatcher
                    .schedule_delete(&self.channel_id, message_id, Duration::from_secs(secs));
            }
        }
    }
}
