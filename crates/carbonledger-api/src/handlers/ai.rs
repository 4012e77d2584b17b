use axum::{extract::State, response::Json};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::SessionUser;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use carbonledger_core::AppError;
use carbonledger_services::{EmissionAnalysis, EmissionPrediction};

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub file_content: Option<String>,
    pub file_type: Option<String>,
}

/// Extract emission activities from uploaded file content. One completion
/// call; a malformed model reply fails the whole request.
#[utoipa::path(
    post,
    path = "/api/ai-analysis",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Extraction result"),
        (status = 400, description = "Missing fileContent"),
        (status = 500, description = "Model call or parse failure")
    ),
    tag = "ai"
)]
#[tracing::instrument(skip(state, body))]
pub async fn analyze_emissions(
    _user: SessionUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<AnalyzeRequest>,
) -> Result<Json<EmissionAnalysis>, HttpAppError> {
    let Some(file_content) = body.file_content.filter(|c| !c.trim().is_empty()) else {
        return Err(AppError::InvalidInput("fileContent is required".to_string()).into());
    };
    let file_type = body.file_type.unwrap_or_else(|| "text".to_string());

    let analysis = state
        .services
        .analysis
        .as_ref()
        .ok_or_else(|| AppError::AiService("AI analysis is not configured".to_string()))?;

    let result = analysis.analyze_emissions(&file_content, &file_type).await?;
    Ok(Json(result))
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PredictRequest {
    pub historical_data: Option<serde_json::Value>,
    pub timeframe: Option<String>,
}

/// Project emissions forward from historical data.
#[utoipa::path(
    post,
    path = "/api/predict-emissions",
    request_body = PredictRequest,
    responses(
        (status = 200, description = "Prediction result"),
        (status = 400, description = "Missing historicalData"),
        (status = 500, description = "Model call or parse failure")
    ),
    tag = "ai"
)]
#[tracing::instrument(skip(state, body))]
pub async fn predict_emissions(
    _user: SessionUser,
    State(state): State<Arc<AppState>>,
    ValidatedJson(body): ValidatedJson<PredictRequest>,
) -> Result<Json<EmissionPrediction>, HttpAppError> {
    let Some(historical_data) = body.historical_data else {
        return Err(AppError::InvalidInput("historicalData is required".to_string()).into());
    };
    let timeframe = body.timeframe.unwrap_or_else(|| "quarter".to_string());

    let analysis = state
        .services
        .analysis
        .as_ref()
        .ok_or_else(|| AppError::AiService("AI analysis is not configured".to_string()))?;

    let result = analysis
        .predict_emissions(&historical_data, &timeframe)
        .await?;
    Ok(Json(result))
}
