//! Public analyze entry point
//!
//! Validates the inbound contract, makes sure the registry is loaded, then
//! runs preprocess → inference → recommendations and stamps the result.

use agrotwin_common::SoilFeatures;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::error::AnalysisError;
use crate::models::analysis::round_to;
use crate::models::{AnalysisMode, AnalysisResult, SoilDataInput};
use crate::registry::ModelRegistry;
use crate::services::inference::{InferenceOutcome, InferencePipeline};
use crate::services::preprocessor::FeaturePreprocessor;
use crate::services::recommendations::RecommendationEngine;

#[derive(Clone)]
pub struct SoilAnalyzer {
    registry: Arc<ModelRegistry>,
    pipeline: Arc<InferencePipeline>,
    engine: RecommendationEngine,
}

impl SoilAnalyzer {
    pub fn new(registry: Arc<ModelRegistry>, engine: RecommendationEngine) -> Self {
        Self {
            pipeline: Arc::new(InferencePipeline::new(Arc::clone(&registry))),
            registry,
            engine,
        }
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    /// Analyze one request
    ///
    /// Rejects out-of-range values, unknown modes and, in validation mode,
    /// crops without a registered validator before any inference runs.
    pub async fn analyze(&self, input: &SoilDataInput) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let mode = input.validate()?;

        let models = self.registry.load().await?;
        let selected_crop = match mode {
            AnalysisMode::Validation => {
                let crop = input.selected_crop.as_deref().map(str::trim).unwrap_or_default();
                if models.validator(crop).is_none() {
                    return Err(AnalysisError::Validation(format!(
                        "Unknown crop '{}'. Available: {}",
                        crop,
                        models.validator_crops().join(", ")
                    )));
                }
                Some(crop)
            }
            AnalysisMode::Discovery => None,
        };

        info!(mode = %mode, crop = ?selected_crop, "Analyzing soil sample");
        let vector = FeaturePreprocessor::vectorize_with(&models, &input.features);
        let outcome = self.pipeline.analyze(vector, mode, selected_crop).await?;
        Ok(self.assemble(&input.features, mode, outcome, started))
    }

    /// Discovery-mode analysis of an aggregate, without range validation
    pub async fn analyze_aggregate(
        &self,
        features: &SoilFeatures,
    ) -> Result<AnalysisResult, AnalysisError> {
        let started = Instant::now();
        let models = self.registry.load().await?;

        let vector = FeaturePreprocessor::vectorize_with(&models, features);
        let outcome = self
            .pipeline
            .analyze(vector, AnalysisMode::Discovery, None)
            .await?;
        Ok(self.assemble(features, AnalysisMode::Discovery, outcome, started))
    }

    fn assemble(
        &self,
        features: &SoilFeatures,
        mode: AnalysisMode,
        outcome: InferenceOutcome,
        started: Instant,
    ) -> AnalysisResult {
        let recommendations = self.engine.generate(features, &outcome);
        let processing_time_ms = round_to(started.elapsed().as_secs_f64() * 1000.0, 2);

        debug!(
            recommendations = recommendations.len(),
            processing_time_ms, "Analysis assembled"
        );

        AnalysisResult {
            mode,
            crop_recommendation: outcome.crop_recommendation,
            soil_health: outcome.soil_health,
            crop_validation: outcome.crop_validation,
            anomaly_detection: outcome.anomaly,
            recommendations,
            timestamp: agrotwin_common::time::now().to_rfc3339(),
            processing_time_ms,
        }
    }
}
