//! Chat interaction webhook
//!
//! The chat provider posts a form with a single `payload` field holding the
//! interaction as JSON. The answer is always an empty 200: there is nothing
//! useful to tell the provider, and a non-200 only triggers its retries.

use axum::{body::Bytes, extract::State, http::StatusCode};
use serde::Deserialize;
use shipyard_core::dto::interaction::Interaction;

use super::AppState;

#[derive(Debug, Deserialize)]
struct InteractionForm {
    #[serde(default)]
    payload: String,
}

/// POST /slack-interactions
pub async fn slack_interactions(State(state): State<AppState>, body: Bytes) -> StatusCode {
    let form: InteractionForm = match serde_urlencoded::from_bytes(&body) {
        Ok(form) => form,
        Err(e) => {
            tracing::warn!("Dropping interaction with invalid form body: {}", e);
            return StatusCode::OK;
        }
    };

    let interaction: Interaction = match serde_json::from_str(&form.payload) {
        Ok(interaction) => interaction,
        Err(e) => {
            tracing::warn!("Dropping malformed interaction: {}", e);
            return StatusCode::OK;
        }
    };

    if !interaction.is_interactive_message() {
        tracing::info!("Dropping interaction of type '{}'", interaction.kind);
        return StatusCode::OK;
    }

    tracing::debug!(
        "Interaction '{}' from {}",
        interaction.callback_id,
        interaction.user.id
    );
    if let Err(e) = state.interactions.submit(interaction).await {
        tracing::error!("{}", e);
    }

    StatusCode::OK
}
