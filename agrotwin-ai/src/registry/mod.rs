//! Model registry
//!
//! Owns the predictor artifacts: feature scaler, label decoder, crop
//! classifier, soil-health scorer, anomaly detector and one validator per
//! crop listed in the validator manifest.
//!
//! Loading is lazy and guarded by a single-initialization cell. Concurrent
//! first callers wait for one load; artifacts are staged into a fresh
//! [`LoadedModels`] and published only when every artifact loaded, so a
//! failed load leaves the registry "not loaded" and the next call retries.

pub mod artifacts;

pub use artifacts::{
    AnomalyDetector, AnomalyVerdict, CentroidAnomalyDetector, CropClassifier, FeatureArray,
    FeatureScaler, LabelDecoder, LinearRegressor, PredictError, ScoredPredictor,
    SoftmaxClassifier, StandardScaler, ValidatorManifest,
};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Artifact loading errors
#[derive(Debug, Error)]
pub enum LoadError {
    /// Registry was built without artifact locations
    #[error("No model artifact location configured")]
    NotConfigured,

    /// Artifact file does not exist
    #[error("Model artifact not found: {}", .0.display())]
    Missing(PathBuf),

    /// Artifact file exists but could not be read
    #[error("Failed to read model artifact {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Artifact content is not a valid model
    #[error("Malformed model artifact {}: {detail}", path.display())]
    Malformed { path: PathBuf, detail: String },

    /// Background loading task panicked or was cancelled
    #[error("Model loading task failed: {0}")]
    Task(String),
}

/// Locations of every predictor artifact
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub models_dir: PathBuf,
    pub scaler_path: PathBuf,
    pub encoder_path: PathBuf,
}

impl ArtifactPaths {
    /// Standard layout with every artifact inside `models_dir`
    pub fn in_dir(models_dir: impl Into<PathBuf>) -> Self {
        let models_dir = models_dir.into();
        Self {
            scaler_path: models_dir.join("feature_scaler.json"),
            encoder_path: models_dir.join("label_encoder.json"),
            models_dir,
        }
    }

    pub fn classifier(&self) -> PathBuf {
        self.models_dir.join("crop_classifier.json")
    }

    pub fn soil_health_scorer(&self) -> PathBuf {
        self.models_dir.join("soil_health_scorer.json")
    }

    pub fn anomaly_detector(&self) -> PathBuf {
        self.models_dir.join("anomaly_detector.json")
    }

    pub fn validators_dir(&self) -> PathBuf {
        self.models_dir.join("crop_validators")
    }

    pub fn validator_manifest(&self) -> PathBuf {
        self.validators_dir().join("model_list.json")
    }

    pub fn validator(&self, crop: &str) -> PathBuf {
        self.validators_dir().join(format!("{}_validator.json", crop))
    }
}

fn read_artifact<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    if !path.exists() {
        return Err(LoadError::Missing(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|e| LoadError::Malformed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn check(path: &Path, result: Result<(), String>) -> Result<(), LoadError> {
    result.map_err(|detail| LoadError::Malformed {
        path: path.to_path_buf(),
        detail,
    })
}

/// A complete, immutable set of predictors
pub struct LoadedModels {
    scaler: Box<dyn FeatureScaler>,
    decoder: LabelDecoder,
    classifier: Box<dyn CropClassifier>,
    soil_health: Box<dyn ScoredPredictor>,
    anomaly: Box<dyn AnomalyDetector>,
    validators: HashMap<String, Box<dyn ScoredPredictor>>,
    manifest: Vec<String>,
}

impl LoadedModels {
    /// Assemble from already-built predictors
    ///
    /// Validator crop names are kept in the given order. A set is complete by
    /// construction: [`LoadedModels::load_from`] fails on the first manifest
    /// crop whose validator is missing or malformed.
    pub fn new(
        scaler: Box<dyn FeatureScaler>,
        decoder: LabelDecoder,
        classifier: Box<dyn CropClassifier>,
        soil_health: Box<dyn ScoredPredictor>,
        anomaly: Box<dyn AnomalyDetector>,
        validators: Vec<(String, Box<dyn ScoredPredictor>)>,
    ) -> Self {
        let manifest = validators.iter().map(|(crop, _)| crop.clone()).collect();
        Self {
            scaler,
            decoder,
            classifier,
            soil_health,
            anomaly,
            validators: validators.into_iter().collect(),
            manifest,
        }
    }

    /// Load and validate every artifact
    ///
    /// Blocking file I/O; run on a blocking thread.
    pub fn load_from(paths: &ArtifactPaths) -> Result<Self, LoadError> {
        debug!("Loading feature scaler from {}", paths.scaler_path.display());
        let scaler: StandardScaler = read_artifact(&paths.scaler_path)?;
        check(&paths.scaler_path, scaler.validate())?;

        debug!("Loading label encoder from {}", paths.encoder_path.display());
        let decoder: LabelDecoder = read_artifact(&paths.encoder_path)?;
        check(&paths.encoder_path, decoder.validate())?;
        info!("Label encoder loaded ({} classes)", decoder.len());

        let classifier_path = paths.classifier();
        let classifier: SoftmaxClassifier = read_artifact(&classifier_path)?;
        check(&classifier_path, classifier.validate())?;
        if classifier.class_count() != decoder.len() {
            return Err(LoadError::Malformed {
                path: classifier_path,
                detail: format!(
                    "classifier emits {} classes but label encoder has {}",
                    classifier.class_count(),
                    decoder.len()
                ),
            });
        }

        let scorer_path = paths.soil_health_scorer();
        let soil_health: LinearRegressor = read_artifact(&scorer_path)?;
        check(&scorer_path, soil_health.validate())?;

        let anomaly_path = paths.anomaly_detector();
        let anomaly: CentroidAnomalyDetector = read_artifact(&anomaly_path)?;
        check(&anomaly_path, anomaly.validate())?;

        let manifest_path = paths.validator_manifest();
        let manifest: ValidatorManifest = read_artifact(&manifest_path)?;
        info!("Found {} crop validators to load", manifest.crops.len());

        let mut validators: Vec<(String, Box<dyn ScoredPredictor>)> =
            Vec::with_capacity(manifest.crops.len());
        for crop in &manifest.crops {
            let path = paths.validator(crop);
            let validator: LinearRegressor = read_artifact(&path)?;
            check(&path, validator.validate())?;
            validators.push((crop.clone(), Box::new(validator)));
        }

        Ok(Self::new(
            Box::new(scaler),
            decoder,
            Box::new(classifier),
            Box::new(soil_health),
            Box::new(anomaly),
            validators,
        ))
    }

    pub fn scaler(&self) -> &dyn FeatureScaler {
        self.scaler.as_ref()
    }

    pub fn decoder(&self) -> &LabelDecoder {
        &self.decoder
    }

    pub fn classifier(&self) -> &dyn CropClassifier {
        self.classifier.as_ref()
    }

    pub fn soil_health(&self) -> &dyn ScoredPredictor {
        self.soil_health.as_ref()
    }

    pub fn anomaly(&self) -> &dyn AnomalyDetector {
        self.anomaly.as_ref()
    }

    /// Validator registered for `crop`, if any
    pub fn validator(&self, crop: &str) -> Option<&dyn ScoredPredictor> {
        self.validators.get(crop).map(|v| &**v)
    }

    /// Crop names known to the label decoder
    pub fn crop_names(&self) -> &[String] {
        &self.decoder.classes
    }

    /// Crop names listed in the validator manifest
    pub fn validator_crops(&self) -> &[String] {
        &self.manifest
    }

    pub fn validator_count(&self) -> usize {
        self.validators.len()
    }
}

/// Registry status for health and info endpoints
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub models_loaded: bool,
    pub crop_classifier: bool,
    pub soil_health_scorer: bool,
    pub anomaly_detector: bool,
    pub feature_scaler: bool,
    pub label_encoder: bool,
    pub crop_validators_count: usize,
    pub available_crops: Vec<String>,
}

/// Shared, lazily-loaded model registry
pub struct ModelRegistry {
    paths: Option<ArtifactPaths>,
    models: OnceCell<Arc<LoadedModels>>,
}

impl ModelRegistry {
    /// Registry that loads from `paths` on first use
    pub fn new(paths: ArtifactPaths) -> Self {
        Self {
            paths: Some(paths),
            models: OnceCell::new(),
        }
    }

    /// Registry that is ready from the start
    pub fn preloaded(models: LoadedModels) -> Self {
        Self {
            paths: None,
            models: OnceCell::from(Arc::new(models)),
        }
    }

    /// Load all artifacts once; later calls return the loaded set
    pub async fn load(&self) -> Result<Arc<LoadedModels>, LoadError> {
        self.models
            .get_or_try_init(|| async {
                let paths = self.paths.clone().ok_or(LoadError::NotConfigured)?;
                info!("Loading AI models from {}", paths.models_dir.display());
                let started = Instant::now();

                let loaded = tokio::task::spawn_blocking(move || LoadedModels::load_from(&paths))
                    .await
                    .map_err(|e| LoadError::Task(e.to_string()))?;

                match loaded {
                    Ok(models) => {
                        info!(
                            classes = models.crop_names().len(),
                            validators = models.validator_count(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "All models loaded"
                        );
                        Ok(Arc::new(models))
                    }
                    Err(e) => {
                        error!("Model loading failed: {}", e);
                        Err(e)
                    }
                }
            })
            .await
            .cloned()
    }

    /// Loaded model set, if loading already succeeded
    pub fn get(&self) -> Option<Arc<LoadedModels>> {
        self.models.get().cloned()
    }

    /// True iff every predictor and every manifest-listed validator is loaded
    pub fn is_ready(&self) -> bool {
        self.get().is_some()
    }

    /// Crop names from the label decoder (empty until loaded)
    pub fn crop_names(&self) -> Vec<String> {
        self.get()
            .map(|m| m.crop_names().to_vec())
            .unwrap_or_default()
    }

    pub fn info(&self) -> ModelInfo {
        match self.get() {
            Some(models) => ModelInfo {
                models_loaded: true,
                crop_classifier: true,
                soil_health_scorer: true,
                anomaly_detector: true,
                feature_scaler: true,
                label_encoder: true,
                crop_validators_count: models.validator_count(),
                available_crops: models.crop_names().to_vec(),
            },
            None => ModelInfo {
                models_loaded: false,
                crop_classifier: false,
                soil_health_scorer: false,
                anomaly_detector: false,
                feature_scaler: false,
                label_encoder: false,
                crop_validators_count: 0,
                available_crops: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Artifact sets for tests

    use super::*;
    use agrotwin_common::FEATURE_COUNT;
    use serde_json::json;

    pub const CROPS: [&str; 4] = ["coffee", "cotton", "maize", "rice"];

    /// Write a consistent artifact set: identity scaler, coffee favoured,
    /// soil health 78, nothing anomalous
    pub fn write_artifacts(dir: &Path) {
        let write = |path: PathBuf, value: serde_json::Value| {
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
        };
        let paths = ArtifactPaths::in_dir(dir);
        let zeros = vec![0.0; FEATURE_COUNT];

        write(
            paths.scaler_path.clone(),
            json!({ "mean": zeros, "scale": vec![1.0; FEATURE_COUNT] }),
        );
        write(paths.encoder_path.clone(), json!({ "classes": CROPS }));
        write(
            paths.classifier(),
            json!({ "coefficients": vec![zeros.clone(); 4], "intercepts": [3.0, 0.0, 0.5, 1.0] }),
        );
        write(
            paths.soil_health_scorer(),
            json!({ "coefficients": zeros, "intercept": 78.0 }),
        );
        write(
            paths.anomaly_detector(),
            json!({ "center": zeros, "spread": vec![10_000.0; FEATURE_COUNT], "threshold": -5.0 }),
        );
        write(paths.validator_manifest(), json!({ "crops": CROPS }));
        for (i, crop) in CROPS.iter().enumerate() {
            write(
                paths.validator(crop),
                json!({ "coefficients": zeros, "intercept": 90.0 - 10.0 * i as f64 }),
            );
        }
    }

    pub struct IdentityScaler;

    impl FeatureScaler for IdentityScaler {
        fn transform(&self, raw: &FeatureArray) -> FeatureArray {
            *raw
        }
    }

    pub struct FixedClassifier(pub Vec<f64>);

    impl CropClassifier for FixedClassifier {
        fn class_count(&self) -> usize {
            self.0.len()
        }

        fn predict_proba(&self, _x: &FeatureArray) -> Result<Vec<f64>, PredictError> {
            Ok(self.0.clone())
        }
    }

    pub struct FixedScore(pub f64);

    impl ScoredPredictor for FixedScore {
        fn predict(&self, _x: &FeatureArray) -> Result<f64, PredictError> {
            Ok(self.0)
        }
    }

    pub struct FailingPredictor;

    impl ScoredPredictor for FailingPredictor {
        fn predict(&self, _x: &FeatureArray) -> Result<f64, PredictError> {
            Err(PredictError::NonFinite("failing predictor"))
        }
    }

    pub struct FixedAnomaly(pub AnomalyVerdict);

    impl AnomalyDetector for FixedAnomaly {
        fn detect(&self, _x: &FeatureArray) -> Result<AnomalyVerdict, PredictError> {
            Ok(self.0)
        }
    }

    pub const NORMAL: AnomalyVerdict = AnomalyVerdict {
        is_anomaly: false,
        score: 0.05,
    };

    /// In-memory model set over [`CROPS`]; validators score 90/80/70/60
    pub fn fake_models(
        probabilities: Vec<f64>,
        soil_health: Box<dyn ScoredPredictor>,
        anomaly: AnomalyVerdict,
    ) -> LoadedModels {
        let validators: Vec<(String, Box<dyn ScoredPredictor>)> = CROPS
            .iter()
            .enumerate()
            .map(|(i, crop)| {
                let score: Box<dyn ScoredPredictor> = Box::new(FixedScore(90.0 - 10.0 * i as f64));
                (crop.to_string(), score)
            })
            .collect();

        LoadedModels::new(
            Box::new(IdentityScaler),
            LabelDecoder {
                classes: CROPS.iter().map(|c| c.to_string()).collect(),
            },
            Box::new(FixedClassifier(probabilities)),
            soil_health,
            Box::new(FixedAnomaly(anomaly)),
            validators,
        )
    }
}
