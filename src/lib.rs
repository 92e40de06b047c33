//! talentmatch - Candidate-vacancy match scoring with drift monitoring
//!
//! This crate serves a candidate-vacancy matching model over HTTP and
//! monitors it in production:
//! - [`drift`] - Data and concept drift detection with alerting
//! - [`features`] - Feature engineering for candidate/vacancy records
//! - [`inference`] - Match scoring against a serialized model artifact
//! - [`monitoring`] - Service-level counters and gauges
//! - [`server`] - HTTP server with REST API
//! - [`cli`] - Command-line interface
//!
//! The drift subsystem is the heart of the crate: a [`drift::DriftMonitor`]
//! is held by the serving layer and called inline on every prediction. Its
//! detectors own bounded windows and alert lists, so monitoring never grows
//! without bound and a monitoring failure never fails a request.

// Core error handling
pub mod error;

// Drift detection and monitoring
pub mod drift;
pub mod monitoring;

// Scoring pipeline
pub mod features;
pub mod inference;

// Services
pub mod cli;
pub mod server;

pub use error::{Result, TalentMatchError};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{Result, TalentMatchError};

    // Drift monitoring
    pub use crate::drift::{
        ConceptDriftDetector, DataDriftDetector, DriftAlert, DriftMonitor, DriftType,
        MonitorConfig, MonitoringResult, Severity,
    };

    // Feature engineering
    pub use crate::features::{CandidateInput, FeatureExtractor, FeatureValue, VacancyInput};

    // Inference
    pub use crate::inference::{InferenceConfig, MatchScorer, ModelArtifact};

    // Serving
    pub use crate::server::{create_router, AppState, ServerConfig};
}
