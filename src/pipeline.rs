//! Sequential executor for the nine-stage pipeline.
//!
//! One run per task: stages execute strictly in registry order, each blocking
//! on a single outbound call, each consuming the task plus its declared
//! upstream artifacts. The first failed invocation aborts the run; artifacts
//! produced so far are discarded, never returned. The dependency graph would
//! permit some fan-out, but the run stays sequential so prompt ordering and
//! visible progress remain deterministic.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::gateway::{CompletionGateway, CompletionRequest, ProviderError};
use crate::stages::{self, StageId, StageSpec};

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// Errors surfaced by a pipeline run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A specific stage's provider call failed. Carries the stage and the
    /// underlying cause; no later stage ran.
    #[error("stage {stage} failed: {source}")]
    Stage {
        stage: StageId,
        source: ProviderError,
    },
}

impl PipelineError {
    /// The stage at which the run halted.
    pub fn stage(&self) -> StageId {
        match self {
            PipelineError::Stage { stage, .. } => *stage,
        }
    }
}

/// Advisory observer notified as stages complete.
///
/// Purely informational: the executor never lets an observer affect control
/// flow, and a run with `NoopObserver` behaves identically.
pub trait StageObserver: Send + Sync {
    /// Called after stage `index` (0-based registry position) has produced
    /// its artifact.
    fn on_stage_complete(&self, stage: StageId, index: usize, latency: Duration);
}

/// Observer that discards all progress events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl StageObserver for NoopObserver {
    fn on_stage_complete(&self, _stage: StageId, _index: usize, _latency: Duration) {}
}

/// Per-stage timing of a successful run.
#[derive(Debug, Clone)]
pub struct StageReport {
    pub stage: StageId,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub latency_ms: u64,
}

/// Outcome of a successful run: the terminal stage's artifact, verbatim.
///
/// The terminal artifact is never post-processed or validated here - the role
/// prompt is trusted to enforce the document markers, and consumers must
/// tolerate malformed output.
#[derive(Debug, Clone)]
pub struct GenerationOutcome {
    pub run_id: Uuid,
    pub created_at: DateTime<Utc>,
    /// The renderable document produced by the terminal stage.
    pub html: String,
    pub stages: Vec<StageReport>,
}

/// Transient state for one run. Owned exclusively by the executor invocation
/// that created it; concurrent runs never share artifacts.
struct RunState {
    artifacts: BTreeMap<StageId, String>,
    status: RunStatus,
}

impl RunState {
    fn new() -> Self {
        Self {
            artifacts: BTreeMap::new(),
            status: RunStatus::Running,
        }
    }

    /// Record a stage artifact. Written exactly once per stage, immediately
    /// after its invocation returns, and never mutated afterwards.
    fn record(&mut self, stage: StageId, artifact: String) {
        debug_assert_eq!(self.status, RunStatus::Running);
        let prev = self.artifacts.insert(stage, artifact);
        debug_assert!(prev.is_none(), "artifact for {stage} recorded twice");
    }

    fn fail(&mut self) {
        self.status = RunStatus::Failed;
    }

    fn succeed(&mut self) {
        self.status = RunStatus::Succeeded;
    }
}

fn stage_request(spec: &StageSpec, prompt: String) -> CompletionRequest {
    let mut req = CompletionRequest::new(spec.chat_model(), spec.role, prompt, spec.caller());
    if let Some(max) = spec.max_output_tokens {
        req = req.max_tokens(max);
    }
    req
}

/// Run the full pipeline for one task.
///
/// Walks the registry in declaration order. For stage `i`: build the prompt
/// from the task and the artifacts named by `requires`, invoke the gateway,
/// record the trimmed artifact, notify the observer, advance. Any invocation
/// error halts the run immediately with that stage's id attached.
pub async fn run_pipeline(
    gateway: &dyn CompletionGateway,
    task: &str,
    observer: &dyn StageObserver,
) -> Result<GenerationOutcome, PipelineError> {
    let run_id = Uuid::new_v4();
    let created_at = Utc::now();
    let mut state = RunState::new();
    let mut reports = Vec::with_capacity(stages::registry().len());

    tracing::info!(%run_id, "pipeline run started");

    for (index, spec) in stages::registry().iter().enumerate() {
        let prompt = stages::build_prompt(spec, task, &state.artifacts);
        let started = Instant::now();

        let response = match gateway.complete(stage_request(spec, prompt)).await {
            Ok(resp) => resp,
            Err(source) => {
                state.fail();
                tracing::warn!(%run_id, stage = %spec.id, error = %source, "pipeline run failed");
                return Err(PipelineError::Stage {
                    stage: spec.id,
                    source,
                });
            }
        };

        reports.push(StageReport {
            stage: spec.id,
            input_tokens: response.input_tokens,
            output_tokens: response.output_tokens,
            latency_ms: response.latency.as_millis() as u64,
        });
        state.record(spec.id, response.text);

        tracing::info!(%run_id, stage = %spec.id, index, "stage complete");
        observer.on_stage_complete(spec.id, index, started.elapsed());
    }

    state.succeed();

    // Terminal artifact, verbatim. The registry guarantees Action ran last.
    let html = state
        .artifacts
        .remove(&StageId::Action)
        .unwrap_or_else(|| unreachable!("terminal stage produced no artifact"));

    tracing::info!(%run_id, "pipeline run succeeded");

    Ok(GenerationOutcome {
        run_id,
        created_at,
        html,
        stages: reports,
    })
}
