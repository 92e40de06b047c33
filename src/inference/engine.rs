//! Match scorer backed by a serialized linear model artifact

use crate::error::{Result, TalentMatchError};
use crate::inference::InferenceConfig;
use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

/// Serialized model: logistic weights over the named features plus the
/// validation metrics recorded at training time.
///
/// The validation metrics double as the drift monitor's baseline
/// performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub name: String,
    pub feature_names: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
    #[serde(default)]
    pub validation_metrics: BTreeMap<String, f64>,
}

/// Scores candidate-vacancy feature vectors against the loaded model
#[derive(Debug, Clone)]
pub struct MatchScorer {
    config: InferenceConfig,
    artifact: ModelArtifact,
    weights: Array1<f64>,
}

impl MatchScorer {
    /// Build a scorer from an in-memory artifact
    pub fn from_artifact(config: InferenceConfig, artifact: ModelArtifact) -> Result<Self> {
        if artifact.weights.len() != artifact.feature_names.len() {
            return Err(TalentMatchError::ShapeError {
                expected: format!("{} weights", artifact.feature_names.len()),
                actual: format!("{} weights", artifact.weights.len()),
            });
        }
        if artifact.weights.is_empty() {
            return Err(TalentMatchError::ValidationError(
                "model artifact has no features".to_string(),
            ));
        }

        let weights = Array1::from(artifact.weights.clone());
        Ok(Self {
            config,
            artifact,
            weights,
        })
    }

    /// Load a scorer from a JSON artifact on disk
    pub fn load(config: InferenceConfig, path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let artifact: ModelArtifact = serde_json::from_reader(BufReader::new(file))?;
        info!(
            model = %artifact.name,
            features = artifact.feature_names.len(),
            path = %path.as_ref().display(),
            "model artifact loaded"
        );
        Self::from_artifact(config, artifact)
    }

    pub fn n_features(&self) -> usize {
        self.weights.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.artifact.feature_names
    }

    pub fn model_name(&self) -> &str {
        &self.artifact.name
    }

    /// Metrics recorded when the model was validated (baseline for concept
    /// drift)
    pub fn validation_metrics(&self) -> &BTreeMap<String, f64> {
        &self.artifact.validation_metrics
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Match probability for one feature vector
    pub fn predict_proba(&self, features: &Array1<f64>) -> Result<f64> {
        self.check_dims(features.len())?;
        Ok(sigmoid(self.weights.dot(features) + self.artifact.bias))
    }

    /// Match label (1 = match) for one feature vector
    pub fn predict(&self, features: &Array1<f64>) -> Result<i64> {
        let proba = self.predict_proba(features)?;
        Ok(i64::from(proba >= self.config.classification_threshold))
    }

    /// Match probabilities for a batch, one row per pair
    pub fn score_batch(&self, features: &Array2<f64>) -> Result<Array1<f64>> {
        self.check_dims(features.ncols())?;
        let scores = features
            .rows()
            .into_iter()
            .map(|row| sigmoid(self.weights.dot(&row) + self.artifact.bias))
            .collect();
        Ok(Array1::from_vec(scores))
    }

    fn check_dims(&self, got: usize) -> Result<()> {
        if got != self.weights.len() {
            return Err(TalentMatchError::ShapeError {
                expected: format!("{} features", self.weights.len()),
                actual: format!("{got} features"),
            });
        }
        Ok(())
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn artifact() -> ModelArtifact {
        ModelArtifact {
            name: "match-lr-v1".to_string(),
            feature_names: vec!["a".to_string(), "b".to_string()],
            weights: vec![1.0, -1.0],
            bias: 0.0,
            validation_metrics: BTreeMap::from([
                ("accuracy".to_string(), 0.87),
                ("precision".to_string(), 0.84),
            ]),
        }
    }

    #[test]
    fn test_from_artifact_validates_shape() {
        let mut bad = artifact();
        bad.weights.pop();
        assert!(MatchScorer::from_artifact(InferenceConfig::new(), bad).is_err());
    }

    #[test]
    fn test_predict_proba_and_label() {
        let scorer = MatchScorer::from_artifact(InferenceConfig::new(), artifact()).unwrap();

        let positive = Array1::from(vec![3.0, 0.0]);
        let proba = scorer.predict_proba(&positive).unwrap();
        assert!(proba > 0.9);
        assert_eq!(scorer.predict(&positive).unwrap(), 1);

        let negative = Array1::from(vec![0.0, 3.0]);
        assert_eq!(scorer.predict(&negative).unwrap(), 0);
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let scorer = MatchScorer::from_artifact(InferenceConfig::new(), artifact()).unwrap();
        let wrong = Array1::from(vec![1.0]);
        assert!(scorer.predict_proba(&wrong).is_err());
    }

    #[test]
    fn test_score_batch() {
        let scorer = MatchScorer::from_artifact(InferenceConfig::new(), artifact()).unwrap();
        let x = Array2::from_shape_vec((2, 2), vec![3.0, 0.0, 0.0, 3.0]).unwrap();
        let scores = scorer.score_batch(&x).unwrap();
        assert_eq!(scores.len(), 2);
        assert!(scores[0] > 0.5 && scores[1] < 0.5);
    }

    #[test]
    fn test_artifact_json_round_trip() {
        let json = serde_json::to_string(&artifact()).unwrap();
        let back: ModelArtifact = serde_json::from_str(&json).unwrap();
        assert_eq!(back.feature_names.len(), 2);
        assert_eq!(back.validation_metrics["accuracy"], 0.87);
    }
}
