//! Feature preprocessor
//!
//! Maps the 11 raw measurements into the canonical-order vector and applies
//! the registry's fitted scaler.

use agrotwin_common::{SoilFeatures, FEATURE_COUNT};
use std::sync::Arc;

use crate::error::AnalysisError;
use crate::registry::{FeatureArray, LoadedModels, ModelRegistry};

/// Scaled model input, always [`FEATURE_COUNT`] values in canonical order
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureVector(FeatureArray);

impl FeatureVector {
    pub fn values(&self) -> &FeatureArray {
        &self.0
    }

    pub const fn len(&self) -> usize {
        FEATURE_COUNT
    }

    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Raw features → scaled [`FeatureVector`]
pub struct FeaturePreprocessor {
    registry: Arc<ModelRegistry>,
}

impl FeaturePreprocessor {
    pub fn new(registry: Arc<ModelRegistry>) -> Self {
        Self { registry }
    }

    /// Fails with a precondition error until the registry is loaded
    pub fn vectorize(&self, features: &SoilFeatures) -> Result<FeatureVector, AnalysisError> {
        let models = self.registry.get().ok_or_else(|| {
            AnalysisError::Precondition("model registry is not loaded".to_string())
        })?;
        Ok(Self::vectorize_with(&models, features))
    }

    pub fn vectorize_with(models: &LoadedModels, features: &SoilFeatures) -> FeatureVector {
        FeatureVector(models.scaler().transform(&features.canonical_values()))
    }
}
