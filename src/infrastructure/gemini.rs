//! # Generation Endpoint Client
//!
//! Raw `reqwest` wrapper around the Gemini `generateContent` endpoint.
//! The API key travels as a query parameter. HTTP 429 is surfaced as its
//! own error variant so the caller can rotate keys.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::traits::GenerationBackend;
use crate::domain::types::GenerationError;

#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_base: String,
    model: String,
}

/// Request format of the `generateContent` endpoint
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiClient {
    pub fn new(api_base: &str, model: &str) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");
        Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl GenerationBackend for GeminiClient {
    async fn generate(&self, prompt: &str, api_key: &str) -> Result<String, GenerationError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base, self.model, api_key
        );
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
        };

        let resp = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| GenerationError::Transient(format!("Request failed: {}", e)))?;

        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GenerationError::RateLimited);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(GenerationError::Transient(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let body: GeminiResponse = resp
            .json()
            .await
            .map_err(|e| GenerationError::Transient(format!("Failed to parse response: {}", e)))?;

        body.candidates
            .first()
            .and_then(|candidate| candidate.content.parts.first())
            .map(|part| part.text.clone())
            .ok_or_else(|| GenerationError::Transient("Empty or invalid response".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::Method::POST;
    use httpmock::MockServer;

    #[tokio::test]
    async fn test_generate_extracts_first_part() {
        let server = MockServer::start();
        let called = server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/test-model:generateContent")
                .query_param("key", "key-a");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"candidates":[{"content":{"parts":[{"text":"hi there"},{"text":"ignored"}]}}]}"#);
        });

        let client = GeminiClient::new(&server.base_url(), "test-model");
        let text = client.generate("hello", "key-a").await.unwrap();
        assert_eq!(text, "hi there");
        called.assert();
    }

    #[tokio::test]
    async fn test_generate_maps_429_to_rate_limited() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/test-model:generateContent");
            then.status(429).body("quota exceeded");
        });

        let client = GeminiClient::new(&server.base_url(), "test-model");
        match client.generate("hello", "key-a").await {
            Err(GenerationError::RateLimited) => {}
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_other_errors_are_transient() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/test-model:generateContent");
            then.status(500).body("boom");
        });

        let client = GeminiClient::new(&server.base_url(), "test-model");
        match client.generate("hello", "key-a").await {
            Err(GenerationError::Transient(msg)) => assert!(msg.contains("500")),
            other => panic!("expected Transient, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_empty_candidates_is_transient() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST)
                .path("/v1beta/models/test-model:generateContent");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"candidates":[]}"#);
        });

        let client = GeminiClient::new(&server.base_url(), "test-model");
        assert!(matches!(
            client.generate("hello", "key-a").await,
            Err(GenerationError::Transient(_))
        ));
    }
}
