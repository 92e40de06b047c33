//! Service monitoring module
//!
//! Request-level counters and gauges the serving layer feeds from each
//! prediction and monitoring result. The drift detectors themselves live in
//! [`crate::drift`]; this module is the observability sink around them.

mod metrics;

pub use metrics::{MetricsSnapshot, ServiceMetrics};
