//! The nine-stage cognitive registry.
//!
//! Each stage is a role prompt, a declared set of upstream artifacts its
//! prompt may read, and a provider/model binding. The registry is static and
//! its declaration order is the execution order; it must be a valid
//! topological order of the `requires` graph. The executor trusts that order
//! rather than sorting at runtime, so the invariant is enforced here by test.
//!
//! The `requires` sets are an information diet, not an accident of wiring:
//! `WorldModel` deliberately sees only the plan, so its feasibility check is
//! grounded in the concrete plan instead of re-litigating earlier framing.

use std::collections::BTreeMap;
use std::fmt;

use crate::gateway::{ChatModel, Provider};

/// Identifier of one pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StageId {
    Perception,
    Attention,
    Memory,
    Emotion,
    Context,
    Planning,
    WorldModel,
    Decision,
    Action,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Perception => "perception",
            StageId::Attention => "attention",
            StageId::Memory => "memory",
            StageId::Emotion => "emotion",
            StageId::Context => "context",
            StageId::Planning => "planning",
            StageId::WorldModel => "world_model",
            StageId::Decision => "decision",
            StageId::Action => "action",
        }
    }

    /// Label used when this stage's artifact is quoted in a downstream prompt.
    pub fn prompt_label(&self) -> &'static str {
        match self {
            StageId::Perception => "Perception Output",
            StageId::Attention => "Attention Output",
            StageId::Memory => "Memory Output",
            StageId::Emotion => "Emotion Output",
            StageId::Context => "Context Output",
            StageId::Planning => "Planning Output",
            StageId::WorldModel => "World Model Output",
            StageId::Decision => "Decision",
            StageId::Action => "Action Output",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static definition of one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageSpec {
    pub id: StageId,
    /// Role/system text describing the stage's persona and responsibility.
    pub role: &'static str,
    /// Upstream artifacts this stage's prompt is built from, in prompt order.
    /// Never the full history; only what is declared here reaches the model.
    pub requires: &'static [StageId],
    pub provider: Provider,
    pub model: &'static str,
    /// Output-token ceiling, Anthropic stages only.
    pub max_output_tokens: Option<u32>,
}

impl StageSpec {
    pub fn chat_model(&self) -> ChatModel {
        match self.provider {
            Provider::OpenAi => ChatModel::openai(self.model),
            Provider::Anthropic => ChatModel::anthropic(self.model),
        }
    }

    /// Attribution string for usage records.
    pub fn caller(&self) -> &'static str {
        match self.id {
            StageId::Perception => "pipeline::perception",
            StageId::Attention => "pipeline::attention",
            StageId::Memory => "pipeline::memory",
            StageId::Emotion => "pipeline::emotion",
            StageId::Context => "pipeline::context",
            StageId::Planning => "pipeline::planning",
            StageId::WorldModel => "pipeline::world_model",
            StageId::Decision => "pipeline::decision",
            StageId::Action => "pipeline::action",
        }
    }
}

// =============================================================================
// Role prompts
// =============================================================================

const PERCEPTION_ROLE: &str = "You are the sensory perception module, modeled after the \
primary sensory cortex. You receive the raw game design request and restructure it into a \
clear, organized game concept covering core mechanics, theme, and the intended user \
experience.";

const ATTENTION_ROLE: &str = "You are the attention and relevance filter, akin to the \
parietal cortex. Analyze the structured game concept and extract its most critical \
elements - mechanics, control scheme, theme, visual style - as a concise, prioritized \
list.";

const MEMORY_ROLE: &str = "You are the memory recall system, comparable to the hippocampus. \
Retrieve relevant background knowledge, design patterns, tutorials, and successful \
browser-game examples related to the identified elements, and summarize them in support of \
the concept.";

const EMOTION_ROLE: &str = "You are the emotion and reward processing module, similar to \
the amygdala and ventral striatum. Evaluate the emotional impact and engagement potential \
of the game concept, highlighting how the design might evoke positive feelings and player \
satisfaction.";

const CONTEXT_ROLE: &str = "You are the narrative and context synthesis module, modeled \
after the medial prefrontal cortex and default mode network. Integrate the game concept \
with broader context - market trends, long-term engagement, societal values - into a \
comprehensive narrative that sets the stage for the game.";

const PLANNING_ROLE: &str = "You are the planning module, analogous to the prefrontal \
cortex. Develop multiple viable, clearly actionable implementation strategies for building \
the game, each as a detailed step-by-step plan.";

const WORLD_MODEL_ROLE: &str = "You are the world model evaluator, analogous to the \
cerebellum integrating sensorimotor feedback. Assess the real-world feasibility of the \
proposed plan against practical constraints, platform limitations, and UI requirements, \
and provide a comprehensive evaluation.";

const DECISION_ROLE: &str = "You are the decision-making evaluator, similar to the \
orbitofrontal cortex. Review the strategies and the feasibility evaluation, weigh their \
pros and cons, select the most optimal plan, and justify your choice in detail.";

const ACTION_ROLE: &str = "You are the motor execution system, modeled after the motor \
cortex. Generate a complete, ready-to-run HTML file implementing the game according to the \
selected plan, including the game area, controls, and all embedded styles and scripts. \
Double-check for bugs before returning the final code. Your response must be ONLY the \
complete HTML file, starting with <!DOCTYPE html> and ending with </html>.";

// =============================================================================
// Registry
// =============================================================================

static REGISTRY: &[StageSpec] = &[
    StageSpec {
        id: StageId::Perception,
        role: PERCEPTION_ROLE,
        requires: &[],
        provider: Provider::OpenAi,
        model: "gpt-4o",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Attention,
        role: ATTENTION_ROLE,
        requires: &[StageId::Perception],
        provider: Provider::OpenAi,
        model: "gpt-4o",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Memory,
        role: MEMORY_ROLE,
        requires: &[StageId::Perception, StageId::Attention],
        provider: Provider::OpenAi,
        model: "gpt-4o-search-preview",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Emotion,
        role: EMOTION_ROLE,
        requires: &[StageId::Perception, StageId::Attention, StageId::Memory],
        provider: Provider::OpenAi,
        model: "gpt-4.5-preview",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Context,
        role: CONTEXT_ROLE,
        requires: &[
            StageId::Perception,
            StageId::Attention,
            StageId::Memory,
            StageId::Emotion,
        ],
        provider: Provider::OpenAi,
        model: "gpt-4.5-preview",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Planning,
        role: PLANNING_ROLE,
        requires: &[
            StageId::Perception,
            StageId::Attention,
            StageId::Memory,
            StageId::Emotion,
            StageId::Context,
        ],
        provider: Provider::OpenAi,
        model: "o3-mini",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::WorldModel,
        role: WORLD_MODEL_ROLE,
        // Only the plan: earlier artifacts are dropped on purpose.
        requires: &[StageId::Planning],
        provider: Provider::OpenAi,
        model: "o3-mini",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Decision,
        role: DECISION_ROLE,
        requires: &[StageId::Planning, StageId::WorldModel],
        provider: Provider::OpenAi,
        model: "o1",
        max_output_tokens: None,
    },
    StageSpec {
        id: StageId::Action,
        role: ACTION_ROLE,
        requires: &[StageId::Decision],
        provider: Provider::Anthropic,
        model: "claude-3-7-sonnet-20250219",
        max_output_tokens: Some(16_384),
    },
];

/// The stage table, in execution order.
pub fn registry() -> &'static [StageSpec] {
    REGISTRY
}

/// Look up a stage definition by id.
pub fn spec(id: StageId) -> &'static StageSpec {
    REGISTRY
        .iter()
        .find(|s| s.id == id)
        .unwrap_or_else(|| unreachable!("stage {id} missing from registry"))
}

/// Assemble a stage's user prompt from the task and its declared upstream
/// artifacts: `Task: {task}` followed by one labeled line per required
/// artifact, in `requires` order. Artifacts outside the `requires` set never
/// appear, no matter what has accumulated in the store.
pub fn build_prompt(spec: &StageSpec, task: &str, artifacts: &BTreeMap<StageId, String>) -> String {
    let mut prompt = format!("Task: {task}");
    for dep in spec.requires {
        debug_assert!(artifacts.contains_key(dep), "missing artifact {dep}");
        if let Some(artifact) = artifacts.get(dep) {
            prompt.push('\n');
            prompt.push_str(dep.prompt_label());
            prompt.push_str(": ");
            prompt.push_str(artifact);
        }
    }
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_nine_unique_stages() {
        assert_eq!(registry().len(), 9);
        let mut ids: Vec<StageId> = registry().iter().map(|s| s.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 9);
    }

    #[test]
    fn declaration_order_is_topological() {
        for (i, stage) in registry().iter().enumerate() {
            for dep in stage.requires {
                let dep_pos = registry()
                    .iter()
                    .position(|s| s.id == *dep)
                    .unwrap_or_else(|| panic!("{dep} not in registry"));
                assert!(
                    dep_pos < i,
                    "{} requires {} which is declared later",
                    stage.id,
                    dep
                );
            }
        }
    }

    #[test]
    fn action_is_terminal_and_the_only_anthropic_stage() {
        let last = registry().last().unwrap();
        assert_eq!(last.id, StageId::Action);
        assert_eq!(last.provider, Provider::Anthropic);
        assert_eq!(last.max_output_tokens, Some(16_384));

        for stage in &registry()[..registry().len() - 1] {
            assert_eq!(stage.provider, Provider::OpenAi);
            assert!(stage.max_output_tokens.is_none());
        }
    }

    #[test]
    fn world_model_reads_only_the_plan() {
        assert_eq!(spec(StageId::WorldModel).requires, &[StageId::Planning]);
    }

    #[test]
    fn prompt_assembly_matches_contract() {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(StageId::Perception, "a structured concept".to_string());
        artifacts.insert(StageId::Attention, "a priority list".to_string());

        let prompt = build_prompt(spec(StageId::Memory), "a ninja cat game", &artifacts);
        assert_eq!(
            prompt,
            "Task: a ninja cat game\n\
             Perception Output: a structured concept\n\
             Attention Output: a priority list"
        );
    }

    #[test]
    fn prompt_for_stage_without_requires_is_task_only() {
        let artifacts = BTreeMap::new();
        let prompt = build_prompt(spec(StageId::Perception), "pong", &artifacts);
        assert_eq!(prompt, "Task: pong");
    }

    #[test]
    fn prompt_excludes_undeclared_artifacts() {
        let mut artifacts = BTreeMap::new();
        for stage in registry() {
            artifacts.insert(stage.id, format!("{} artifact", stage.id));
        }

        let prompt = build_prompt(spec(StageId::WorldModel), "pong", &artifacts);
        assert!(prompt.contains("Planning Output: planning artifact"));
        assert!(!prompt.contains("context artifact"));
        assert!(!prompt.contains("emotion artifact"));
        assert!(!prompt.contains("Perception Output"));
    }
}
