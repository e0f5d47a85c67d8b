//! Ollama `/api/generate` client.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::GenerationBackend;
use crate::error::BackendError;

const BACKEND: &str = "ollama";

static THINK_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<think>.*?(?:</think>|$)").unwrap());
static JAVA_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:java|Java)[ \t]*\r?\n(.*?)```").unwrap());
static ANY_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```[\w+-]*[ \t]*\r?\n(.*?)```").unwrap());

#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// e.g. `http://localhost:11434`
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
    pub temperature: f32,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5-coder:7b".to_string(),
            timeout: Duration::from_secs(300),
            temperature: 0.2,
        }
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

/// Generation backend backed by a local or remote Ollama server.
pub struct OllamaBackend {
    config: OllamaConfig,
    client: reqwest::Client,
}

impl OllamaBackend {
    pub fn new(config: OllamaConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BackendError::unavailable(BACKEND, format!("failed to create HTTP client: {e}")))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.base_url.trim_end_matches('/'))
    }

    fn map_send_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::timeout(BACKEND, self.config.timeout)
        } else {
            BackendError::unavailable(BACKEND, e.to_string())
        }
    }
}

#[async_trait]
impl GenerationBackend for OllamaBackend {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let start = std::time::Instant::now();
        let body = GenerateRequest {
            model: &self.config.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                temperature: self.config.temperature,
            },
        };

        let response = self
            .client
            .post(self.endpoint())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = format!("HTTP {status}: {text}");
            return Err(if status.is_server_error() {
                BackendError::unavailable(BACKEND, message)
            } else {
                BackendError::protocol(BACKEND, message)
            });
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::timeout(BACKEND, self.config.timeout)
            } else {
                BackendError::protocol(BACKEND, format!("invalid response body: {e}"))
            }
        })?;

        let code = extract_code(&parsed.response);
        if code.is_empty() {
            return Err(BackendError::protocol(BACKEND, "model returned no code"));
        }

        debug!(
            model = %self.config.model,
            prompt_chars = prompt.len(),
            code_chars = code.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Generation finished"
        );
        Ok(code)
    }
}

/// Strip reasoning blocks and markdown fences from a model response.
///
/// The first ```java block wins, then the first fenced block of any
/// language, then the whole remaining text.
pub fn extract_code(raw: &str) -> String {
    let cleaned = THINK_BLOCK.replace_all(raw, "");

    if let Some(caps) = JAVA_FENCE.captures(&cleaned) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = ANY_FENCE.captures(&cleaned) {
        return caps[1].trim().to_string();
    }
    cleaned.trim().to_string()
}
