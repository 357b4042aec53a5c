//! Core types for the provider gateway.

use std::fmt;
use std::time::Duration;

/// Which backend a model runs on.
///
/// The two providers have the same external contract but different wire
/// shapes; everything above the gateway is provider-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    /// Chat-completions API: true system channel, flat string content.
    OpenAi,
    /// Messages API: role goes in an auxiliary assistant turn, content comes
    /// back as a sequence of typed blocks, output-token ceiling is mandatory.
    Anthropic,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Chat model specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatModel {
    /// OpenAI model, e.g. "gpt-4o"
    OpenAi(String),
    /// Anthropic model, e.g. "claude-3-7-sonnet-20250219"
    Anthropic(String),
}

impl ChatModel {
    pub fn openai(model_id: impl Into<String>) -> Self {
        ChatModel::OpenAi(model_id.into())
    }

    pub fn anthropic(model_id: impl Into<String>) -> Self {
        ChatModel::Anthropic(model_id.into())
    }

    pub fn model_id(&self) -> &str {
        match self {
            ChatModel::OpenAi(id) | ChatModel::Anthropic(id) => id,
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            ChatModel::OpenAi(_) => Provider::OpenAi,
            ChatModel::Anthropic(_) => Provider::Anthropic,
        }
    }
}

/// Request for one completion.
///
/// `role` is the persona/system text for the call. How it reaches the model
/// is the adapter's business: OpenAI gets it as a system message, Anthropic
/// as an auxiliary assistant turn.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Model to use.
    pub model: ChatModel,
    /// Role/system text describing the caller's persona and responsibility.
    pub role: String,
    /// User prompt.
    pub prompt: String,
    /// Output-token ceiling. Sent only by the Anthropic adapter; the OpenAI
    /// adapter imposes no explicit cap.
    pub max_tokens: Option<u32>,
    /// Which code path made this call, for usage records and debugging.
    /// Use a static string like "pipeline::perception" or "naming".
    pub caller: &'static str,
}

impl CompletionRequest {
    pub fn new(
        model: ChatModel,
        role: impl Into<String>,
        prompt: impl Into<String>,
        caller: &'static str,
    ) -> Self {
        Self {
            model,
            role: role.into(),
            prompt: prompt.into(),
            max_tokens: None,
            caller,
        }
    }

    pub fn max_tokens(mut self, max: u32) -> Self {
        self.max_tokens = Some(max);
        self
    }
}

/// Response from a completion.
///
/// `text` is already normalized: provider-specific content encodings are
/// flattened to a single trimmed string before it leaves the gateway.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    /// Normalized, trimmed output text.
    pub text: String,
    /// Input tokens consumed, when the provider reports them.
    pub input_tokens: u32,
    /// Output tokens generated, when the provider reports them.
    pub output_tokens: u32,
    /// Time taken for the request.
    pub latency: Duration,
}
