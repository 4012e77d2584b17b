//! AI-assisted emission analysis and prediction.
//!
//! Each operation is one completion call whose reply must be a strict JSON
//! document. The reply is deserialized into typed results and range-checked
//! at the boundary, so malformed model output becomes a typed
//! `AiResponseInvalid` error instead of an unhandled parse failure.

use std::sync::Arc;

use carbonledger_core::AppError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::completion::CompletionProvider;

/// One extracted emission activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionActivity {
    pub activity: String,
    pub category: String,
    pub quantity: Decimal,
    pub unit: String,
    /// tCO2e for this activity.
    pub emissions: Decimal,
}

/// Result of analyzing an uploaded file's content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionAnalysis {
    pub emissions: Vec<EmissionActivity>,
    /// tCO2e across all activities.
    pub total_emissions: Decimal,
    /// Model confidence in [0, 1].
    pub confidence: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictionPoint {
    pub period: String,
    /// Predicted tCO2e for the period.
    pub emissions: Decimal,
}

/// Result of projecting emissions from historical data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EmissionPrediction {
    pub predictions: Vec<PredictionPoint>,
    /// "increasing", "decreasing", or "stable".
    pub trend: String,
    /// Model confidence in [0, 1].
    pub confidence_level: f64,
    pub factors: Vec<String>,
    pub recommendations: Vec<String>,
}

#[derive(Clone)]
pub struct AnalysisService {
    provider: Arc<dyn CompletionProvider>,
}

impl AnalysisService {
    pub fn new(provider: Arc<dyn CompletionProvider>) -> Self {
        Self { provider }
    }

    /// Extract emission activities from file content and compute tCO2e
    /// using standard factors.
    pub async fn analyze_emissions(
        &self,
        file_content: &str,
        file_type: &str,
    ) -> Result<EmissionAnalysis, AppError> {
        let prompt = format!(
            "You are a carbon accounting assistant. Extract emission-generating \
             activities from the following {file_type} file content. For each \
             activity compute tonnes of CO2 equivalent (tCO2e) using standard \
             emission factors.\n\n\
             Reply with ONLY a JSON object of this exact shape:\n\
             {{\"emissions\": [{{\"activity\": string, \"category\": string, \
             \"quantity\": number, \"unit\": string, \"emissions\": number}}], \
             \"total_emissions\": number, \"confidence\": number, \
             \"recommendations\": [string]}}\n\n\
             File content:\n{file_content}"
        );

        let reply = self
            .provider
            .complete(&prompt)
            .await
            .map_err(|e| AppError::AiService(e.to_string()))?;

        let analysis: EmissionAnalysis = serde_json::from_str(reply.trim())
            .map_err(|e| AppError::AiResponseInvalid(e.to_string()))?;

        validate_analysis(&analysis)?;
        tracing::info!(
            activities = analysis.emissions.len(),
            total_emissions = %analysis.total_emissions,
            "Emission analysis completed"
        );
        Ok(analysis)
    }

    /// Project future emissions from historical data over a timeframe.
    pub async fn predict_emissions(
        &self,
        historical_data: &serde_json::Value,
        timeframe: &str,
    ) -> Result<EmissionPrediction, AppError> {
        let prompt = format!(
            "You are a carbon accounting assistant. Given the historical \
             emissions data below, predict emissions for the next {timeframe}.\n\n\
             Reply with ONLY a JSON object of this exact shape:\n\
             {{\"predictions\": [{{\"period\": string, \"emissions\": number}}], \
             \"trend\": string, \"confidence_level\": number, \
             \"factors\": [string], \"recommendations\": [string]}}\n\n\
             Historical data:\n{historical_data}"
        );

        let reply = self
            .provider
            .complete(&prompt)
            .await
            .map_err(|e| AppError::AiService(e.to_string()))?;

        let prediction: EmissionPrediction = serde_json::from_str(reply.trim())
            .map_err(|e| AppError::AiResponseInvalid(e.to_string()))?;

        validate_prediction(&prediction)?;
        Ok(prediction)
    }
}

fn validate_confidence(value: f64, field: &str) -> Result<(), AppError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(AppError::AiResponseInvalid(format!(
            "{} {} outside [0, 1]",
            field, value
        )));
    }
    Ok(())
}

fn validate_analysis(analysis: &EmissionAnalysis) -> Result<(), AppError> {
    validate_confidence(analysis.confidence, "confidence")?;
    if analysis.total_emissions < Decimal::ZERO {
        return Err(AppError::AiResponseInvalid(
            "total_emissions is negative".to_string(),
        ));
    }
    for activity in &analysis.emissions {
        if activity.emissions < Decimal::ZERO || activity.quantity < Decimal::ZERO {
            return Err(AppError::AiResponseInvalid(format!(
                "negative quantity for activity '{}'",
                activity.activity
            )));
        }
    }
    Ok(())
}

fn validate_prediction(prediction: &EmissionPrediction) -> Result<(), AppError> {
    validate_confidence(prediction.confidence_level, "confidence_level")?;
    for point in &prediction.predictions {
        if point.emissions < Decimal::ZERO {
            return Err(AppError::AiResponseInvalid(format!(
                "negative prediction for period '{}'",
                point.period
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;

    struct CannedProvider {
        reply: Result<String, String>,
    }

    impl CannedProvider {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
            })
        }

        fn err(message: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(message.to_string()),
            })
        }
    }

    #[async_trait]
    impl CompletionProvider for CannedProvider {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(msg) => Err(anyhow!("{msg}")),
            }
        }
    }

    const VALID_ANALYSIS: &str = r#"{
        "emissions": [
            {"activity": "Diesel fleet fuel", "category": "mobile-combustion",
             "quantity": 1200, "unit": "L", "emissions": 3.2}
        ],
        "total_emissions": 3.2,
        "confidence": 0.82,
        "recommendations": ["Switch delivery fleet to electric vehicles"]
    }"#;

    #[tokio::test]
    async fn test_analyze_parses_valid_reply() {
        let svc = AnalysisService::new(CannedProvider::ok(VALID_ANALYSIS));
        let analysis = svc.analyze_emissions("fuel report", "csv").await.unwrap();
        assert_eq!(analysis.emissions.len(), 1);
        assert_eq!(analysis.emissions[0].activity, "Diesel fleet fuel");
        assert_eq!(analysis.confidence, 0.82);
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_json_reply() {
        let svc = AnalysisService::new(CannedProvider::ok("Sure! Here are the emissions..."));
        let err = svc.analyze_emissions("fuel report", "csv").await.unwrap_err();
        assert!(matches!(err, AppError::AiResponseInvalid(_)));
    }

    #[tokio::test]
    async fn test_analyze_rejects_out_of_range_confidence() {
        let reply = VALID_ANALYSIS.replace("0.82", "1.5");
        let svc = AnalysisService::new(CannedProvider::ok(&reply));
        let err = svc.analyze_emissions("fuel report", "csv").await.unwrap_err();
        assert!(matches!(err, AppError::AiResponseInvalid(_)));
    }

    #[tokio::test]
    async fn test_analyze_surfaces_upstream_failure() {
        let svc = AnalysisService::new(CannedProvider::err("connection refused"));
        let err = svc.analyze_emissions("fuel report", "csv").await.unwrap_err();
        assert!(matches!(err, AppError::AiService(_)));
    }

    #[tokio::test]
    async fn test_predict_parses_valid_reply() {
        let reply = r#"{
            "predictions": [{"period": "2026-Q4", "emissions": 41.7}],
            "trend": "decreasing",
            "confidence_level": 0.7,
            "factors": ["Seasonal heating demand"],
            "recommendations": ["Continue electrification program"]
        }"#;
        let svc = AnalysisService::new(CannedProvider::ok(reply));
        let prediction = svc
            .predict_emissions(&serde_json::json!([{"period": "2026-Q3", "emissions": 44.0}]), "quarter")
            .await
            .unwrap();
        assert_eq!(prediction.trend, "decreasing");
        assert_eq!(prediction.predictions.len(), 1);
    }

    #[tokio::test]
    async fn test_predict_rejects_negative_emissions() {
        let reply = r#"{
            "predictions": [{"period": "2026-Q4", "emissions": -1}],
            "trend": "stable",
            "confidence_level": 0.5,
            "factors": [],
            "recommendations": []
        }"#;
        let svc = AnalysisService::new(CannedProvider::ok(reply));
        let err = svc
            .predict_emissions(&serde_json::json!([]), "quarter")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::AiResponseInvalid(_)));
    }
}
