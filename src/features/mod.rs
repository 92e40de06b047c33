//! Feature engineering for candidate-vacancy matching
//!
//! Turns raw candidate and vacancy records into the model-ready numeric
//! vector, and into the small monitored-feature map the drift monitor
//! consumes on every prediction.

use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Seniority hash buckets
const SENIORITY_BUCKETS: u64 = 16;

/// A feature value at the monitoring boundary: a single number or an
/// ordered numeric sample, normalized before reaching the detectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Scalar(f64),
    Series(Vec<f64>),
}

impl FeatureValue {
    /// The value as a numeric sample
    pub fn to_sample(&self) -> Vec<f64> {
        match self {
            FeatureValue::Scalar(v) => vec![*v],
            FeatureValue::Series(vs) => vs.clone(),
        }
    }
}

impl From<f64> for FeatureValue {
    fn from(value: f64) -> Self {
        FeatureValue::Scalar(value)
    }
}

impl From<Vec<f64>> for FeatureValue {
    fn from(values: Vec<f64>) -> Self {
        FeatureValue::Series(values)
    }
}

/// Candidate record as received by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CandidateInput {
    /// Free-form CV / resume text
    pub cv_text: String,
    /// Listed skills
    pub skills: Vec<String>,
    /// Seniority label (e.g. "junior", "pleno", "senior")
    pub seniority: Option<String>,
}

/// Vacancy record as received by the API
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VacancyInput {
    pub title: String,
    pub description: String,
    pub requirements: String,
    pub seniority: Option<String>,
}

/// Builds the model input vector and the monitored-feature map.
///
/// Feature order is fixed and exposed through `feature_names`; the scorer
/// validates its artifact against it at load time.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    feature_names: Vec<String>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        let feature_names = [
            "candidate_text_len",
            "vacancy_text_len",
            "requirements_len",
            "skill_overlap",
            "seniority_match",
            "candidate_seniority",
            "vacancy_seniority",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        Self { feature_names }
    }

    /// Names of the model input features, in vector order
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Names of the features fed to the drift monitor per prediction
    pub fn monitored_feature_names(&self) -> [&'static str; 5] {
        [
            "candidate_text_len",
            "vacancy_text_len",
            "seniority_hash",
            "prediction",
            "confidence",
        ]
    }

    /// Build the model-ready vector for one candidate-vacancy pair
    pub fn extract(&self, candidate: &CandidateInput, vacancy: &VacancyInput) -> Array1<f64> {
        let candidate_text = candidate_text(candidate);
        let vacancy_text = format!("{} {}", vacancy.title, vacancy.description);

        let candidate_len = candidate_text.chars().count() as f64;
        let vacancy_len = vacancy_text.chars().count() as f64;
        let requirements_len = vacancy.requirements.chars().count() as f64;

        let candidate_tokens = tokenize(&candidate_text);
        let vacancy_tokens = tokenize(&format!("{} {}", vacancy.description, vacancy.requirements));
        let overlap = jaccard(&candidate_tokens, &vacancy_tokens);

        let candidate_seniority = seniority_bucket(candidate.seniority.as_deref());
        let vacancy_seniority = seniority_bucket(vacancy.seniority.as_deref());
        let seniority_match = match (&candidate.seniority, &vacancy.seniority) {
            (Some(a), Some(b)) if normalize(a) == normalize(b) => 1.0,
            _ => 0.0,
        };

        // Log-scale the length features so a long CV does not dominate
        Array1::from(vec![
            candidate_len.ln_1p(),
            vacancy_len.ln_1p(),
            requirements_len.ln_1p(),
            overlap,
            seniority_match,
            candidate_seniority,
            vacancy_seniority,
        ])
    }

    /// The monitored-feature map for one scored prediction: text lengths,
    /// the candidate's hashed seniority, the prediction, and a derived
    /// confidence.
    pub fn monitor_features(
        &self,
        candidate: &CandidateInput,
        vacancy: &VacancyInput,
        prediction: i64,
        probability: f64,
    ) -> BTreeMap<String, FeatureValue> {
        let candidate_len = candidate_text(candidate).chars().count() as f64;
        let vacancy_len = format!(
            "{} {} {}",
            vacancy.title, vacancy.description, vacancy.requirements
        )
        .chars()
        .count() as f64;
        let confidence = probability.max(1.0 - probability);

        BTreeMap::from([
            ("candidate_text_len".to_string(), candidate_len.into()),
            ("vacancy_text_len".to_string(), vacancy_len.into()),
            (
                "seniority_hash".to_string(),
                seniority_bucket(candidate.seniority.as_deref()).into(),
            ),
            ("prediction".to_string(), (prediction as f64).into()),
            ("confidence".to_string(), confidence.into()),
        ])
    }
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        Self::new()
    }
}

fn candidate_text(candidate: &CandidateInput) -> String {
    if candidate.skills.is_empty() {
        candidate.cv_text.clone()
    } else {
        format!("{} {}", candidate.cv_text, candidate.skills.join(" "))
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() > 2)
        .map(|t| t.to_string())
        .collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    if a.is_empty() && b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Stable categorical encoding: FNV-1a hash of the normalized label, folded
/// into a small bucket range. Missing labels map to bucket 0.
fn seniority_bucket(label: Option<&str>) -> f64 {
    match label {
        Some(label) if !label.trim().is_empty() => {
            (fnv1a(normalize(label).as_bytes()) % SENIORITY_BUCKETS) as f64
        }
        _ => 0.0,
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

    let mut hash = FNV_OFFSET;
    for &byte in bytes {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_pair() -> (CandidateInput, VacancyInput) {
        let candidate = CandidateInput {
            cv_text: "Experienced Rust engineer building distributed systems".to_string(),
            skills: vec!["rust".to_string(), "kubernetes".to_string()],
            seniority: Some("Senior".to_string()),
        };
        let vacancy = VacancyInput {
            title: "Backend Engineer".to_string(),
            description: "Rust services for distributed data pipelines".to_string(),
            requirements: "rust, kubernetes, postgres".to_string(),
            seniority: Some("senior".to_string()),
        };
        (candidate, vacancy)
    }

    #[test]
    fn test_feature_value_untagged_json() {
        let scalar: FeatureValue = serde_json::from_str("1.5").unwrap();
        assert_eq!(scalar, FeatureValue::Scalar(1.5));

        let series: FeatureValue = serde_json::from_str("[1.0, 2.0]").unwrap();
        assert_eq!(series, FeatureValue::Series(vec![1.0, 2.0]));

        assert_eq!(scalar.to_sample(), vec![1.5]);
        assert_eq!(series.to_sample(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_extract_matches_feature_names() {
        let extractor = FeatureExtractor::new();
        let (candidate, vacancy) = sample_pair();
        let vector = extractor.extract(&candidate, &vacancy);
        assert_eq!(vector.len(), extractor.feature_names().len());
    }

    #[test]
    fn test_seniority_match_is_case_insensitive() {
        let extractor = FeatureExtractor::new();
        let (candidate, vacancy) = sample_pair();
        let vector = extractor.extract(&candidate, &vacancy);
        let idx = extractor
            .feature_names()
            .iter()
            .position(|n| n == "seniority_match")
            .unwrap();
        assert_eq!(vector[idx], 1.0);
    }

    #[test]
    fn test_skill_overlap_positive_for_shared_tokens() {
        let extractor = FeatureExtractor::new();
        let (candidate, vacancy) = sample_pair();
        let vector = extractor.extract(&candidate, &vacancy);
        let idx = extractor
            .feature_names()
            .iter()
            .position(|n| n == "skill_overlap")
            .unwrap();
        assert!(vector[idx] > 0.0);
    }

    #[test]
    fn test_seniority_bucket_stable_and_bounded() {
        let a = seniority_bucket(Some("senior"));
        let b = seniority_bucket(Some("SENIOR "));
        assert_eq!(a, b);
        assert!(a >= 0.0 && a < SENIORITY_BUCKETS as f64);
        assert_eq!(seniority_bucket(None), 0.0);
    }

    #[test]
    fn test_monitor_features_shape() {
        let extractor = FeatureExtractor::new();
        let (candidate, vacancy) = sample_pair();
        let features = extractor.monitor_features(&candidate, &vacancy, 1, 0.25);

        assert_eq!(features.len(), 5);
        for name in extractor.monitored_feature_names() {
            assert!(features.contains_key(name), "missing {name}");
        }
        // Confidence is distance from the decision boundary, not the raw
        // probability.
        assert_eq!(features["confidence"], FeatureValue::Scalar(0.75));
    }

    #[test]
    fn test_empty_inputs_extract_without_panicking() {
        let extractor = FeatureExtractor::new();
        let vector = extractor.extract(&CandidateInput::default(), &VacancyInput::default());
        assert_eq!(vector.len(), extractor.feature_names().len());
        assert!(vector.iter().all(|v| v.is_finite()));
    }
}
