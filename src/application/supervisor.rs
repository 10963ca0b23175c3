//! # Supervisor
//!
//! Resolves the account behind every chat token, assigns tokens to
//! channels round-robin, spawns one detached worker task per channel
//! and then keeps the process alive. Workers are never joined: there is
//! no graceful shutdown, an interrupt simply ends the process.

use anyhow::{Result, anyhow};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::application::dispatcher::Dispatcher;
use crate::application::generator::ReplyGenerator;
use crate::application::worker::{ChannelWorker, ProcessedIds};
use crate::domain::config::{AppConfig, ChannelSettings};
use crate::domain::traits::ChatGateway;

pub struct Supervisor {
    config: AppConfig,
    channel_ids: Vec<String>,
    gateways: Vec<Arc<dyn ChatGateway>>,
    generator: Arc<ReplyGenerator>,
}

impl Supervisor {
    pub fn new(
        config: AppConfig,
        channel_ids: Vec<String>,
        gateways: Vec<Arc<dyn ChatGateway>>,
        generator: Arc<ReplyGenerator>,
    ) -> Self {
        Self {
            config,
            channel_ids,
            gateways,
            generator,
        }
    }

    /// Start one worker per channel and run until the process is killed.
    ///
    /// Account resolution happens first and is the only fatal step:
    /// without its own account id a worker cannot recognize (and would
    /// answer) its own messages.
    pub async fn run(self) -> Result<()> {
        let mut accounts = Vec::new();
        for gateway in &self.gateways {
            let account = gateway
                .self_account()
                .await
                .map_err(|e| anyhow!("Failed to resolve bot account: {}", e))?;
            tracing::info!("Bot account: {} (id {})", account.username, account.id);
            accounts.push(account);
        }

        let processed: ProcessedIds = Arc::new(Mutex::new(HashSet::new()));

        for (index, channel_id) in self.channel_ids.iter().enumerate() {
            let slot = index % self.gateways.len();
            let gateway = self.gateways[slot].clone();
            let settings = self.config.settings_for(channel_id);

            self.announce(&gateway, channel_id, &settings).await;

            let worker = ChannelWorker::new(
                channel_id.clone(),
                settings,
                accounts[slot].id.clone(),
                gateway.clone(),
                self.generator.clone(),
                Dispatcher::new(gateway),
                processed.clone(),
            );
            tokio::spawn(worker.run());
            tracing::info!(
                "[channel {}] Worker started as {}",
                channel_id,
                accounts[slot].username
            );
        }

        tracing::info!(
            "{} workers running, press Ctrl+C to stop",
            self.channel_ids.len()
        );
        loop {
            sleep(Duration::from_secs(60)).await;
        }
    }

    /// Log where a worker is about to operate and with which settings.
    /// Lookup failures are not fatal: the worker runs without names.
    async fn announce(
        &self,
        gateway: &Arc<dyn ChatGateway>,
        channel_id: &str,
        settings: &ChannelSettings,
    ) {
        match gateway.channel_info(channel_id).await {
            Ok(info) => {
                let server = match &info.guild_id {
                    Some(guild_id) => gateway.guild_name(guild_id).await.unwrap_or_else(|e| {
                        tracing::error!("Failed to look up guild {}: {}", guild_id, e);
                        "Unknown Server".to_string()
                    }),
                    None => "Direct Message".to_string(),
                };
                tracing::info!(
                    "[channel {}] Connected to {} / {}",
                    channel_id,
                    server,
                    info.name
                );
            }
            Err(e) => {
                tracing::error!(
                    "[channel {}] Failed to look up channel info: {}",
                    channel_id,
                    e
                );
            }
        }

        let delete = if settings.delete_immediately {
            "immediately".to_string()
        } else {
            match settings.delete_after_seconds {
                Some(secs) if secs > 0 => format!("after {}s", secs),
                _ => "no".to_string(),
            }
        };
        tracing::info!(
            "[channel {}] Settings: generation={}, language={}, read_delay={}s, interval={}s, slow_mode={}, thread_reply={}, delete={}",
            channel_id,
            settings.use_generation,
            settings.language,
            settings.read_delay_seconds,
            settings.reply_interval_seconds,
            settings.use_slow_mode,
            settings.reply_in_thread,
            delete
        );
    }
}
