//! # Dispatcher
//!
//! Posts replies through the chat gateway and spawns detached deletion
//! tasks for replies with a configured lifetime.

use std::sync::Arc;
use std::time::Duration;

use crate::domain::traits::ChatGateway;

#[derive(Clone)]
pub struct Dispatcher {
    gateway: Arc<dyn ChatGateway>,
}

impl Dispatcher {
    pub fn new(gateway: Arc<dyn ChatGateway>) -> Self {
        Self { gateway }
    }

    /// Post a message, optionally threaded onto `reply_to`. Returns the
    /// remote-assigned id, or None when the send failed (already logged).
    pub async fn send(
        &self,
        channel_id: &str,
        content: &str,
        reply_to: Option<&str>,
    ) -> Option<String> {
        match self.gateway.send_message(channel_id, content, reply_to).await {
            Ok(id) => {
                tracing::info!("[channel {}] Sent reply (id {}): {}", channel_id, id, content);
                Some(id)
            }
            Err(e) => {
                tracing::error!("[channel {}] Failed to send reply: {}", channel_id, e);
                None
            }
        }
    }

    /// Queue a detached deletion of a posted message. Fire-and-forget:
    /// no handle is kept, failures are only logged, and the caller's
    /// loop is never blocked.
    pub fn schedule_delete(&self, channel_id: &str, message_id: &str, delay: Duration) {
        let gateway = self.gateway.clone();
        let channel_id = channel_id.to_string();
        let message_id = message_id.to_string();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            match gateway.delete_message(&channel_id, &message_id).await {
                Ok(()) => {
                    tracing::info!("[channel {}] Deleted message {}", channel_id, message_id);
                }
                Err(e) => {
                    tracing::error!(
                        "[channel {}] Failed to delete message {}: {}",
                        channel_id,
                        message_id,
                        e
                    );
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::sync::Mutex;
    use tokio::time::Instant;

    use crate::domain::types::{ChannelInfo, IncomingMessage, SelfAccount};

    #[derive(Default)]
    struct RecordingGateway {
        send_ok: bool,
        deletes: Mutex<Vec<(String, Instant)>>,
    }

    #[async_trait]
    impl ChatGateway for RecordingGateway {
        async fn self_account(&self) -> Result<SelfAccount, String> {
            Err("not used".to_string())
        }

        async fn channel_info(&self, _channel_id: &str) -> Result<ChannelInfo, String> {
            Err("not used".to_string())
        }

        async fn guild_name(&self, _guild_id: &str) -> Result<String, String> {
            Err("not used".to_string())
        }

        async fn latest_message(
            &self,
            _channel_id: &str,
        ) -> Result<Option<IncomingMessage>, String> {
            Ok(None)
        }

        async fn send_message(
            &self,
            _channel_id: &str,
            _content: &str,
            _reply_to: Option<&str>,
        ) -> Result<String, String> {
            if self.send_ok {
                Ok("321".to_string())
            } else {
                Err("HTTP 500".to_string())
            }
        }

        async fn delete_message(&self, _channel_id: &str, message_id: &str) -> Result<(), String> {
            self.deletes
                .lock()
                .await
                .push((message_id.to_string(), Instant::now()));
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_send_returns_remote_id() {
        let gateway = Arc::new(RecordingGateway {
            send_ok: true,
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(gateway);

        assert_eq!(
            dispatcher.send("5", "hello", None).await,
            Some("321".to_string())
        );
    }

    #[tokio::test]
    async fn test_send_failure_yields_none() {
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = Dispatcher::new(gateway);

        assert_eq!(dispatcher.send("5", "hello", None).await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_delete_waits_without_blocking_caller() {
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = Dispatcher::new(gateway.clone());

        let queued_at = Instant::now();
        dispatcher.schedule_delete("5", "321", Duration::from_secs(5));
        // schedule_delete returned immediately; nothing has fired yet
        assert_eq!(queued_at.elapsed(), Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(4)).await;
        assert!(gateway.deletes.lock().await.is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        let deletes = gateway.deletes.lock().await;
        assert_eq!(deletes.len(), 1);
        let (id, fired_at) = &deletes[0];
        assert_eq!(id, "321");
        assert!(fired_at.duration_since(queued_at) >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_immediate_delete_fires_without_delay() {
        let gateway = Arc::new(RecordingGateway::default());
        let dispatcher = Dispatcher::new(gateway.clone());

        dispatcher.schedule_delete("5", "321", Duration::ZERO);
        tokio::task::yield_now().await;

        let deletes = gateway.deletes.lock().await;
        assert_eq!(deletes.len(), 1);
    }
}
