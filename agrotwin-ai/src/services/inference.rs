//! Inference pipeline
//!
//! Runs the crop classifier, soil-health scorer, optional crop validator and
//! anomaly detector against one prepared vector. The calls are independent,
//! so they fan out onto blocking threads and join all-or-nothing: any failed
//! call fails the whole analysis.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::AnalysisError;
use crate::models::analysis::round_to;
use crate::models::{
    AnalysisMode, AnomalyAssessment, CropProbability, CropRecommendation, CropValidation,
    SoilHealthAssessment,
};
use crate::registry::{FeatureArray, LoadedModels, ModelRegistry};
use crate::services::preprocessor::FeatureVector;

/// Number of ranked crop candidates reported
pub const TOP_N: usize = 3;

/// Typed outputs of the four predictors
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceOutcome {
    pub crop_recommendation: CropRecommendation,
    pub soil_health: SoilHealthAssessment,
    pub crop_validation: Option<CropValidation>,
    pub anomaly: AnomalyAssessment,
}

impl InferenceOutcome {
    /// Crop whose requirements drive the advisories: the validated crop if
    /// any, otherwise the recommended one
    pub fn resolved_crop(&self) -> &str {
        self.crop_validation
            .as_ref()
            .map(|v| v.crop.as_str())
            .unwrap_or(&self.crop_recommendation.best_crop)
    }
}

pub struct InferencePipeline {
    registry: Arc<ModelRegistry>,
}

impl InferencePipeline {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Run every predictor for one vector
    ///
    /// In validation mode an unresolvable `selected_crop` skips validation
    /// rather than failing; the public entry point rejects such crops first.
    pub async fn analyze(
        &self,
        vector: FeatureVector,
        mode: AnalysisMode,
        selected_crop: Option<&str>,
    ) -> Result<InferenceOutcome, AnalysisError> {
        let models = self.registry.get().ok_or_else(|| {
            AnalysisError::Precondition("model registry is not loaded".to_string())
        })?;
        let x = *vector.values();

        let validation_crop = match (mode, selected_crop) {
            (AnalysisMode::Validation, Some(crop)) if models.validator(crop).is_some() => {
                Some(crop.to_string())
            }
            (AnalysisMode::Validation, Some(crop)) => {
                warn!(crop, "No validator registered for crop, skipping validation");
                None
            }
            _ => None,
        };

        let classify = run_blocking(Arc::clone(&models), move |m| recommend_crop(m, &x));
        let health = run_blocking(Arc::clone(&models), move |m| score_soil_health(m, &x));
        let anomaly = run_blocking(Arc::clone(&models), move |m| detect_anomaly(m, &x));
        let validate = async {
            match validation_crop {
                Some(crop) => run_blocking(Arc::clone(&models), move |m| {
                    validate_crop(m, &crop, &x)
                })
                .await
                .map(Some),
                None => Ok(None),
            }
        };

        let (crop_recommendation, soil_health, crop_validation, anomaly) =
            tokio::try_join!(classify, health, validate, anomaly)?;

        debug!(
            best_crop = %crop_recommendation.best_crop,
            soil_health = soil_health.overall_score,
            is_anomaly = anomaly.is_anomaly,
            "Inference complete"
        );

        Ok(InferenceOutcome {
            crop_recommendation,
            soil_health,
            crop_validation,
            anomaly,
        })
    }
}

async fn run_blocking<T, F>(models: Arc<LoadedModels>, f: F) -> Result<T, AnalysisError>
where
    F: FnOnce(&LoadedModels) -> Result<T, AnalysisError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&models))
        .await
        .map_err(|e| AnalysisError::Inference(format!("predictor task failed: {}", e)))?
}

/// Class indices by descending probability
///
/// Stable sort, so equal probabilities keep the lower class index first.
pub fn rank_classes(probabilities: &[f64]) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..probabilities.len()).collect();
    indices.sort_by(|&a, &b| probabilities[b].total_cmp(&probabilities[a]));
    indices
}

pub fn recommend_crop(
    models: &LoadedModels,
    x: &FeatureArray,
) -> Result<CropRecommendation, AnalysisError> {
    let probabilities = models.classifier().predict_proba(x)?;
    let decoder = models.decoder();
    if probabilities.len() != decoder.len() {
        return Err(AnalysisError::Inference(format!(
            "classifier returned {} probabilities for {} classes",
            probabilities.len(),
            decoder.len()
        )));
    }

    let ranked = rank_classes(&probabilities);
    let candidate = |index: usize| -> Result<CropProbability, AnalysisError> {
        let crop = decoder.decode(index).ok_or_else(|| {
            AnalysisError::Inference(format!("class index {} has no label", index))
        })?;
        Ok(CropProbability {
            crop: crop.to_string(),
            probability: round_to(probabilities[index], 4),
        })
    };

    let best = ranked
        .first()
        .copied()
        .ok_or_else(|| AnalysisError::Inference("classifier returned no classes".to_string()))?;
    let best = candidate(best)?;
    let top_3 = ranked
        .iter()
        .take(TOP_N)
        .map(|&i| candidate(i))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CropRecommendation {
        best_crop: best.crop,
        confidence: best.probability,
        top_3,
    })
}

pub fn score_soil_health(
    models: &LoadedModels,
    x: &FeatureArray,
) -> Result<SoilHealthAssessment, AnalysisError> {
    let raw = models.soil_health().predict(x)?;
    Ok(SoilHealthAssessment::from_raw(raw))
}

pub fn validate_crop(
    models: &LoadedModels,
    crop: &str,
    x: &FeatureArray,
) -> Result<CropValidation, AnalysisError> {
    let validator = models.validator(crop).ok_or_else(|| {
        AnalysisError::Inference(format!("no validator registered for crop '{}'", crop))
    })?;
    let raw = validator.predict(x)?;
    Ok(CropValidation::from_raw(crop, raw))
}

pub fn detect_anomaly(
    models: &LoadedModels,
    x: &FeatureArray,
) -> Result<AnomalyAssessment, AnalysisError> {
    let verdict = models.anomaly().detect(x)?;
    Ok(AnomalyAssessment::new(verdict.is_anomaly, verdict.score))
}
