#![forbid(unsafe_code)]

//! # neuroforge
//!
//! A nine-stage "cognitive" pipeline that turns a single free-text game
//! request into a complete, playable HTML document.
//!
//! Each stage is a call to a large-language-model provider with a distinct
//! role prompt and an explicitly declared subset of earlier stage outputs as
//! context. The interesting part is the orchestration, not any single call:
//! a static stage registry declares the dependency wiring, a provider gateway
//! normalizes two heterogeneous backends into plain trimmed strings, and a
//! strictly sequential executor walks the registry, failing the whole run on
//! the first error.

pub mod gateway;
pub mod naming;
pub mod pipeline;
pub mod server;
pub mod stages;

pub use gateway::{
    ChatModel, CompletionGateway, CompletionRequest, CompletionResponse, NoopUsageSink, Provider,
    ProviderError, ProviderGateway, TracingUsageSink, UsageSink,
};
pub use pipeline::{
    run_pipeline, GenerationOutcome, NoopObserver, PipelineError, StageObserver, StageReport,
};
pub use stages::{registry, StageId, StageSpec};
