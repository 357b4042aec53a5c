//! Single-shot naming call.
//!
//! Classifies/titles the same task string the pipeline consumes. Independent
//! of the pipeline: no shared state, and it may run before, after, or never
//! without affecting pipeline correctness.

use crate::gateway::{ChatModel, CompletionGateway, CompletionRequest, ProviderError};

const NAMING_MODEL: &str = "gpt-4o-mini";

const NAMING_ROLE: &str =
    "Your goal is to name the game the user is requesting. Only output the name, nothing else.";

/// Ask the fast model for a title for the requested game.
pub async fn name_game(
    gateway: &dyn CompletionGateway,
    task: &str,
) -> Result<String, ProviderError> {
    let req = CompletionRequest::new(ChatModel::openai(NAMING_MODEL), NAMING_ROLE, task, "naming");
    let resp = gateway.complete(req).await?;
    Ok(resp.text)
}
