//! # Credential Pool
//!
//! Rotates generation API keys across workers. A key that hits the rate
//! limit is parked until every key is exhausted, at which point the pool
//! sleeps through a cooldown and clears the whole set.

use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::time::Duration;
use tokio::sync::Mutex;

pub struct KeyPool {
    keys: Vec<String>,
    exhausted: Mutex<HashSet<String>>,
    cooldown: Duration,
}

impl KeyPool {
    pub fn new(keys: Vec<String>, cooldown: Duration) -> Self {
        Self {
            keys,
            exhausted: Mutex::new(HashSet::new()),
            cooldown,
        }
    }

    /// Hand out a key that has not hit the rate limit, chosen uniformly
    /// among the available ones. When every key is exhausted the calling
    /// worker sleeps through the cooldown, then the set is cleared and
    /// acquisition retried. Never fails.
    pub async fn acquire(&self) -> String {
        loop {
            {
                let exhausted = self.exhausted.lock().await;
                let available: Vec<&String> = self
                    .keys
                    .iter()
                    .filter(|key| !exhausted.contains(*key))
                    .collect();
                if let Some(key) = available.choose(&mut rand::thread_rng()) {
                    return (*key).clone();
                }
            }
            tracing::error!(
                "All {} generation keys are rate limited, cooling down for {}s",
                self.keys.len(),
                self.cooldown.as_secs()
            );
            tokio::time::sleep(self.cooldown).await;
            self.exhausted.lock().await.clear();
        }
    }

    /// Park a key until the next pool-wide reset. Idempotent.
    pub async fn mark_exhausted(&self, key: &str) {
        self.exhausted.lock().await.insert(key.to_string());
    }
}
