//! Match scoring inference
//!
//! Loads a serialized model artifact and scores candidate-vacancy feature
//! vectors. The model is opaque to the rest of the system: anything that
//! maps a feature vector to a match probability fits behind [`MatchScorer`].

mod config;
mod engine;

pub use config::InferenceConfig;
pub use engine::{MatchScorer, ModelArtifact};
