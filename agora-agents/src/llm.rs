//! The external generation capability.
//!
//! Agents never talk to a model directly; they go through [`Generator`],
//! which hides the provider behind a blocking text-in/text-out call. Output
//! is untrusted: callers must tolerate prose, malformed JSON, and empty
//! replies.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::error::GenerationError;

/// Sampling parameters threaded explicitly from the orchestrator down to
/// each agent; there is no process-wide default that endpoints mutate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub model: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub repeat_penalty: f64,
    pub num_ctx: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        // Tuned for instruction-following code models.
        Self {
            model: "codellama:7b-instruct".to_string(),
            temperature: 0.3,
            top_p: 0.9,
            top_k: 40,
            repeat_penalty: 1.1,
            num_ctx: 4096,
            max_tokens: None,
        }
    }
}

impl GenerationConfig {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Black-box text generation. Synchronous from the caller's perspective.
pub trait Generator: Send + Sync {
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GenerationError>;
}

/// Generators are shared across every agent on a bus.
pub type SharedGenerator = std::sync::Arc<dyn Generator>;

/// Blocking client for a local Ollama instance.
pub struct OllamaGenerator {
    base_url: String,
    timeout: Duration,
}

impl Default for OllamaGenerator {
    fn default() -> Self {
        Self::new("http://localhost:11434")
    }
}

impl OllamaGenerator {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Generator for OllamaGenerator {
    fn generate(&self, prompt: &str, config: &GenerationConfig) -> Result<String, GenerationError> {
        let url = format!("{}/api/generate", self.base_url);
        let mut options = json!({
            "temperature": config.temperature,
            "top_p": config.top_p,
            "top_k": config.top_k,
            "repeat_penalty": config.repeat_penalty,
            "num_ctx": config.num_ctx,
        });
        if let Some(max_tokens) = config.max_tokens {
            options["num_predict"] = json!(max_tokens);
        }

        debug!(model = %config.model, prompt_len = prompt.len(), "sending generation request");
        let response = ureq::post(&url)
            .timeout(self.timeout)
            .send_json(json!({
                "model": config.model,
                "prompt": prompt,
                "stream": false,
                "options": options,
            }))
            .map_err(|e| GenerationError::Transport(e.to_string()))?;

        let body: serde_json::Value = response
            .into_json()
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        body.get("response")
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .ok_or_else(|| GenerationError::Malformed("missing `response` field".to_string()))
    }
}

/// Generator fed from a queue of canned replies; once the queue is empty it
/// returns an empty string, exercising downstream fallback paths.
#[derive(Default)]
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

impl Generator for ScriptedGenerator {
    fn generate(&self, _prompt: &str, _config: &GenerationConfig) -> Result<String, GenerationError> {
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| GenerationError::Transport("scripted generator poisoned".to_string()))?;
        Ok(replies.pop_front().unwrap_or_default())
    }
}
