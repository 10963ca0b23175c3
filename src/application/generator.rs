//! # Reply Generator
//!
//! Produces the text for a reply: either a completion from the generation
//! service, with key rotation and duplicate suppression, or a random line
//! from the corpus file.

use rand::seq::SliceRandom;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use crate::application::keys::KeyPool;
use crate::domain::config::ChannelSettings;
use crate::domain::traits::GenerationBackend;
use crate::domain::types::GenerationError;

/// Returned when the corpus file is missing or has no usable lines.
const EMPTY_CORPUS_PLACEHOLDER: &str = "No messages available in file.";

const TRANSIENT_RETRY_DELAY: Duration = Duration::from_secs(2);

/// The only generation failure surfaced to workers; every transport
/// failure is retried internally.
#[derive(Debug, PartialEq, Eq)]
pub struct UnsupportedLanguage(pub String);

impl std::fmt::Display for UnsupportedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported reply language '{}'", self.0)
    }
}

pub struct ReplyGenerator {
    backend: Arc<dyn GenerationBackend>,
    keys: Arc<KeyPool>,
    corpus_path: String,
    /// Most recent text produced for ANY channel, for duplicate
    /// suppression of stale backend responses
    last_text: Mutex<Option<String>>,
}

impl ReplyGenerator {
    pub fn new(backend: Arc<dyn GenerationBackend>, keys: Arc<KeyPool>, corpus_path: String) -> Self {
        Self {
            backend,
            keys,
            corpus_path,
            last_text: Mutex::new(None),
        }
    }

    /// Produce reply text for `prompt` under the channel's settings.
    ///
    /// In generation mode this retries until it has a usable completion:
    /// a rate-limited key is parked and a fresh one acquired, transient
    /// failures back off briefly, and a completion identical to the
    /// previous one (any channel) is discarded and regenerated.
    pub async fn generate(
        &self,
        prompt: &str,
        settings: &ChannelSettings,
    ) -> Result<String, UnsupportedLanguage> {
        if !settings.use_generation {
            return Ok(self.random_corpus_line());
        }

        let instruction = build_instruction(prompt, &settings.language)
            .ok_or_else(|| UnsupportedLanguage(settings.language.clone()))?;

        loop {
            let key = self.keys.acquire().await;
            match self.backend.generate(&instruction, &key).await {
                Ok(text) => {
                    let mut last = self.last_text.lock().await;
                    if last.as_deref() == Some(text.as_str()) {
                        tracing::info!(
                            "Generation returned the previous text again, requesting a fresh one"
                        );
                        continue;
                    }
                    *last = Some(text.clone());
                    return Ok(text);
                }
                Err(GenerationError::RateLimited) => {
                    tracing::warn!("Generation key hit the rate limit, rotating to another key");
                    self.keys.mark_exhausted(&key).await;
                }
                Err(GenerationError::Transient(msg)) => {
                    tracing::error!("Generation request failed: {}", msg);
                    tokio::time::sleep(TRANSIENT_RETRY_DELAY).await;
                }
            }
        }
    }

    /// One uniformly-random line from the corpus file. The file is
    /// re-read on every call so it can be edited while the bot runs.
    fn random_corpus_line(&self) -> String {
        let Ok(raw) = std::fs::read_to_string(&self.corpus_path) else {
            return EMPTY_CORPUS_PLACEHOLDER.to_string();
        };
        let lines: Vec<&str> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect();
        match lines.choose(&mut rand::thread_rng()) {
            Some(line) => line.to_string(),
            None => EMPTY_CORPUS_PLACEHOLDER.to_string(),
        }
    }
}

/// Wrap the user's message in a single-sentence casual-register reply
/// instruction for the configured language. Unknown languages produce no
/// instruction; the set is an exact string match.
fn build_instruction(message: &str, language: &str) -> Option<String> {
    let lead = match language {
        "en" => format!("Reply to the following message in English: {}", message),
        "hi" => format!("Reply to the following message in Hindi: {}", message),
        _ => return None,
    };
    Some(format!(
        "{}\n\nMake it one sentence using everyday human language.",
        lead
    ))
}
