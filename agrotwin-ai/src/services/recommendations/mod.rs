//! Recommendation engine
//!
//! Severity logic ([`rules`]) is kept apart from wording ([`render`]), so the
//! same findings can be rendered by any [`AdviceRenderer`].

pub mod render;
pub mod requirements;
pub mod rules;

pub use render::{AdviceRenderer, TemplateRenderer};
pub use requirements::{requirement_for, Band, CropRequirement};
pub use rules::{evaluate, Advice, Finding, RuleInput};

use agrotwin_common::SoilFeatures;
use std::sync::Arc;

use crate::models::Recommendation;
use crate::services::inference::InferenceOutcome;

#[derive(Clone)]
pub struct RecommendationEngine {
    renderer: Arc<dyn AdviceRenderer>,
}

impl RecommendationEngine {
    pub fn new(renderer: Arc<dyn AdviceRenderer>) -> Self {
        Self { renderer }
    }

    /// Ordered advisories for raw (unscaled) features
    ///
    /// Requirements come from the validated crop when present, otherwise
    /// from the recommended crop.
    pub fn generate(
        &self,
        features: &SoilFeatures,
        outcome: &InferenceOutcome,
    ) -> Vec<Recommendation> {
        let findings = evaluate(&RuleInput {
            features,
            crop: outcome.resolved_crop(),
            soil_health: &outcome.soil_health,
            anomaly: &outcome.anomaly,
        });

        findings
            .iter()
            .map(|finding| Recommendation {
                priority: finding.priority,
                message: self.renderer.render(finding),
            })
            .collect()
    }
}

impl Default for RecommendationEngine {
    fn default() -> Self {
        Self::new(Arc::new(TemplateRenderer::builtin()))
    }
}
