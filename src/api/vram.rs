//! VRAM estimate handler.

use super::types::ApiError;
use super::AppState;
use crate::upstream::ModelDescriptor;
use crate::vram::{
    estimate as estimate_vram, CalculationInput, CalculationResult, Precision,
    DEFAULT_CONTEXT_LENGTH, DEFAULT_FRAMEWORK_OVERHEAD_MB, MAX_CONTEXT_LENGTH,
};
use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// The model is given either inline (`model`) or by `modelName` plus
/// `sizeBytes`. With only a name, its size is looked up on the server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VramRequest {
    #[serde(default)]
    pub server_url: Option<String>,
    pub model: Option<ModelDescriptor>,
    pub model_name: Option<String>,
    pub size_bytes: Option<u64>,
    /// Signed so out-of-range input is clamped rather than rejected
    pub context_length: Option<i64>,
    pub precision: Option<Precision>,
    pub batch_size: Option<i64>,
    #[serde(rename = "frameworkOverheadMB")]
    pub framework_overhead_mb: Option<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VramResponse {
    pub model: String,
    #[serde(flatten)]
    pub result: CalculationResult,
}

/// POST /api/vram/estimate
pub async fn estimate(
    State(state): State<Arc<AppState>>,
    Json(req): Json<VramRequest>,
) -> Result<Json<VramResponse>, ApiError> {
    let model = resolve_model(&state, &req).await?;

    let input = CalculationInput {
        model,
        context_length: req
            .context_length
            .map_or(DEFAULT_CONTEXT_LENGTH, |c| {
                c.clamp(1, MAX_CONTEXT_LENGTH as i64) as u32
            }),
        precision: req.precision.unwrap_or_default(),
        batch_size: req
            .batch_size
            .map_or(1, |b| b.clamp(1, u32::MAX as i64) as u32),
        framework_overhead_mb: req
            .framework_overhead_mb
            .unwrap_or(DEFAULT_FRAMEWORK_OVERHEAD_MB),
    }
    .clamped();

    let result = estimate_vram(&input);
    tracing::debug!(
        model = %input.model.name,
        total_vram_gb = result.total_vram_gb,
        "VRAM estimated"
    );
    Ok(Json(VramResponse {
        model: input.model.name,
        result,
    }))
}

async fn resolve_model(state: &AppState, req: &VramRequest) -> Result<ModelDescriptor, ApiError> {
    if let Some(model) = &req.model {
        return Ok(model.clone());
    }
    let name = super::types::required(&req.model_name, "modelName")?;
    if let Some(size) = req.size_bytes {
        return Ok(ModelDescriptor::sized(name, size));
    }

    let installed = state
        .server(req.server_url.as_deref())
        .list_models()
        .await?;
    let names: Vec<String> = installed.iter().map(|m| m.name.clone()).collect();
    installed
        .into_iter()
        .find(|m| m.name == name)
        .ok_or_else(|| {
            ApiError::not_found(&format!(
                "Model '{}' not found. Available: {}",
                name,
                names.join(", ")
            ))
        })
}
