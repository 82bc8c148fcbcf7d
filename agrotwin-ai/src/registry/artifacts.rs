//! Predictor interfaces and their JSON-backed artifact implementations
//!
//! Every predictor works on a scaled, canonical-order feature array. The
//! registry holds trait objects, so other model families can be swapped in
//! without touching the inference pipeline.

use agrotwin_common::FEATURE_COUNT;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Canonical-order feature values
pub type FeatureArray = [f64; FEATURE_COUNT];

/// Errors raised by a single predictor call
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictError {
    /// Model produced NaN or infinite output
    #[error("{0} produced a non-finite output")]
    NonFinite(&'static str),

    /// Model output does not match its declared shape
    #[error("{model}: {detail}")]
    Shape { model: &'static str, detail: String },
}

/// Fitted scaling transform
pub trait FeatureScaler: Send + Sync {
    fn transform(&self, raw: &FeatureArray) -> FeatureArray;
}

/// Multi-class crop classifier
pub trait CropClassifier: Send + Sync {
    /// Number of classes the classifier emits
    fn class_count(&self) -> usize;

    /// One probability per class index
    fn predict_proba(&self, x: &FeatureArray) -> Result<Vec<f64>, PredictError>;
}

/// Single-output regressor (soil health scorer, per-crop validators)
pub trait ScoredPredictor: Send + Sync {
    fn predict(&self, x: &FeatureArray) -> Result<f64, PredictError>;
}

/// Binary label plus continuous decision score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyVerdict {
    pub is_anomaly: bool,
    /// Lower is more anomalous
    pub score: f64,
}

/// Outlier detector
pub trait AnomalyDetector: Send + Sync {
    fn detect(&self, x: &FeatureArray) -> Result<AnomalyVerdict, PredictError>;
}

/// Check that a slice holds exactly the canonical feature count of finite values
fn check_features(name: &str, values: &[f64]) -> Result<(), String> {
    if values.len() != FEATURE_COUNT {
        return Err(format!(
            "{} has {} values, expected {}",
            name,
            values.len(),
            FEATURE_COUNT
        ));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(format!("{} contains non-finite values", name));
    }
    Ok(())
}

fn dot(weights: &[f64], x: &FeatureArray) -> f64 {
    weights.iter().zip(x.iter()).map(|(w, v)| w * v).sum()
}

/// Standardization: `(x - mean) / scale`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
}

impl StandardScaler {
    pub fn validate(&self) -> Result<(), String> {
        check_features("mean", &self.mean)?;
        check_features("scale", &self.scale)?;
        if self.scale.iter().any(|s| *s <= 0.0) {
            return Err("scale values must be positive".to_string());
        }
        Ok(())
    }
}

impl FeatureScaler for StandardScaler {
    fn transform(&self, raw: &FeatureArray) -> FeatureArray {
        let mut scaled = [0.0; FEATURE_COUNT];
        for (i, value) in raw.iter().enumerate() {
            scaled[i] = (value - self.mean[i]) / self.scale[i];
        }
        scaled
    }
}

/// Class index → crop name
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelDecoder {
    pub classes: Vec<String>,
}

impl LabelDecoder {
    pub fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("label set is empty".to_string());
        }
        if self.classes.iter().any(|c| c.trim().is_empty()) {
            return Err("label set contains an empty name".to_string());
        }
        Ok(())
    }

    pub fn decode(&self, index: usize) -> Option<&str> {
        self.classes.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }
}

/// Multinomial logistic regression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    /// One weight row per class
    pub coefficients: Vec<Vec<f64>>,
    pub intercepts: Vec<f64>,
}

impl SoftmaxClassifier {
    pub fn validate(&self) -> Result<(), String> {
        if self.coefficients.is_empty() {
            return Err("classifier has no classes".to_string());
        }
        if self.coefficients.len() != self.intercepts.len() {
            return Err(format!(
                "{} coefficient rows but {} intercepts",
                self.coefficients.len(),
                self.intercepts.len()
            ));
        }
        for row in &self.coefficients {
            check_features("coefficient row", row)?;
        }
        if self.intercepts.iter().any(|v| !v.is_finite()) {
            return Err("intercepts contain non-finite values".to_string());
        }
        Ok(())
    }
}

impl CropClassifier for SoftmaxClassifier {
    fn class_count(&self) -> usize {
        self.intercepts.len()
    }

    fn predict_proba(&self, x: &FeatureArray) -> Result<Vec<f64>, PredictError> {
        let logits: Vec<f64> = self
            .coefficients
            .iter()
            .zip(&self.intercepts)
            .map(|(row, b)| dot(row, x) + b)
            .collect();

        let max = logits.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        if !max.is_finite() {
            return Err(PredictError::NonFinite("crop classifier"));
        }

        let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
        let total: f64 = exps.iter().sum();
        let probabilities: Vec<f64> = exps.iter().map(|e| e / total).collect();

        if probabilities.iter().any(|p| !p.is_finite()) {
            return Err(PredictError::NonFinite("crop classifier"));
        }
        Ok(probabilities)
    }
}

/// Linear regression: `w · x + b`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinearRegressor {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegressor {
    pub fn validate(&self) -> Result<(), String> {
        check_features("coefficients", &self.coefficients)?;
        if !self.intercept.is_finite() {
            return Err("intercept is not finite".to_string());
        }
        Ok(())
    }
}

impl ScoredPredictor for LinearRegressor {
    fn predict(&self, x: &FeatureArray) -> Result<f64, PredictError> {
        let value = dot(&self.coefficients, x) + self.intercept;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(PredictError::NonFinite("regressor"))
        }
    }
}

/// Distance-from-centroid outlier detector
///
/// Score is the negated RMS of per-feature z-distances from the training
/// centroid; samples scoring below `threshold` are anomalies.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CentroidAnomalyDetector {
    pub center: Vec<f64>,
    pub spread: Vec<f64>,
    pub threshold: f64,
}

impl CentroidAnomalyDetector {
    pub fn validate(&self) -> Result<(), String> {
        check_features("center", &self.center)?;
        check_features("spread", &self.spread)?;
        if self.spread.iter().any(|s| *s <= 0.0) {
            return Err("spread values must be positive".to_string());
        }
        if !self.threshold.is_finite() {
            return Err("threshold is not finite".to_string());
        }
        Ok(())
    }
}

impl AnomalyDetector for CentroidAnomalyDetector {
    fn detect(&self, x: &FeatureArray) -> Result<AnomalyVerdict, PredictError> {
        let sum_sq: f64 = x
            .iter()
            .enumerate()
            .map(|(i, v)| {
                let z = (v - self.center[i]) / self.spread[i];
                z * z
            })
            .sum();
        let score = -(sum_sq / FEATURE_COUNT as f64).sqrt();

        if !score.is_finite() {
            return Err(PredictError::NonFinite("anomaly detector"));
        }
        Ok(AnomalyVerdict {
            is_anomaly: score < self.threshold,
            score,
        })
    }
}

/// `crop_validators/model_list.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorManifest {
    pub crops: Vec<String>,
}
