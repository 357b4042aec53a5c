//! Provider gateway for completion calls.
//!
//! Two heterogeneous backends, one contract: callers hand over a role, a
//! prompt and a model, and get back a single trimmed string. All wire-shape
//! differences (system channel vs auxiliary turn, flat string vs content
//! blocks) stay behind this module so nothing above it ever branches on
//! provider identity.

pub mod anthropic;
pub mod error;
pub mod openai;
pub mod types;
pub mod usage;

use std::sync::Arc;

use anthropic::AnthropicAdapter;
use openai::OpenAiAdapter;
use usage::{ProviderCallRecord, UsageSink as UsageSinkTrait};

pub use error::{ErrorContext, ProviderError};
pub use types::{ChatModel, CompletionRequest, CompletionResponse, Provider};
pub use usage::{CallStatus, NoopUsageSink, StderrUsageSink, TracingUsageSink, UsageSink};

/// Uniform completion contract over both providers.
#[async_trait::async_trait]
pub trait CompletionGateway: Send + Sync {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, ProviderError>;
}

/// Production gateway holding one long-lived client per provider.
///
/// Both adapters are constructed once at process start and the gateway is
/// passed into the executor by reference; nothing downstream constructs its
/// own provider clients. One invocation means exactly one outbound call -
/// there is deliberately no retry loop here.
pub struct ProviderGateway<U: UsageSinkTrait> {
    openai: OpenAiAdapter,
    anthropic: AnthropicAdapter,
    usage_sink: Arc<U>,
}

#[async_trait::async_trait]
impl<U: UsageSinkTrait> CompletionGateway for ProviderGateway<U> {
    async fn complete(&self, req: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        ProviderGateway::complete(self, req).await
    }
}

impl<U: UsageSinkTrait> ProviderGateway<U> {
    pub fn from_env(usage_sink: Arc<U>) -> Result<Self, ProviderError> {
        Ok(Self {
            openai: OpenAiAdapter::from_env()?,
            anthropic: AnthropicAdapter::from_env()?,
            usage_sink,
        })
    }

    pub fn with_adapters(
        openai: OpenAiAdapter,
        anthropic: AnthropicAdapter,
        usage_sink: Arc<U>,
    ) -> Self {
        Self {
            openai,
            anthropic,
            usage_sink,
        }
    }

    pub async fn complete(
        &self,
        req: CompletionRequest,
    ) -> Result<CompletionResponse, ProviderError> {
        let result = match req.model.provider() {
            Provider::OpenAi => self.openai.complete(&req).await,
            Provider::Anthropic => self.anthropic.complete(&req).await,
        };

        match &result {
            Ok(resp) => {
                self.record_usage(&req, Some(resp), None).await;
            }
            Err(err) => {
                self.record_usage(&req, None, Some(err.code().to_string()))
                    .await;
            }
        }

        result
    }

    async fn record_usage(
        &self,
        req: &CompletionRequest,
        resp: Option<&CompletionResponse>,
        error_code: Option<String>,
    ) {
        let endpoint = match req.model.provider() {
            Provider::OpenAi => "chat/completions",
            Provider::Anthropic => "messages",
        };

        let mut record = ProviderCallRecord::new(
            req.model.provider().as_str(),
            endpoint,
            req.model.model_id(),
            req.caller,
        );

        if let Some(resp) = resp {
            record = record
                .tokens(resp.input_tokens, resp.output_tokens)
                .latency(resp.latency.as_millis() as u64);
        }

        if let Some(code) = error_code {
            record = record.error(code);
        }

        self.usage_sink.record(record).await;
    }
}
