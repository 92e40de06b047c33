//! Inference configuration

use serde::{Deserialize, Serialize};

/// Configuration for match scoring
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Probability cutoff for the positive (match) label
    pub classification_threshold: f64,

    /// Whether responses include the raw probability
    pub output_probabilities: bool,
}

impl InferenceConfig {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            classification_threshold: 0.5,
            output_probabilities: true,
        }
    }
}
