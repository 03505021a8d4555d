//! Submission boundary: normalize the authoring tree, then validate it.

use crate::domain::config::RuleformConfig;
use crate::domain::normalizer::normalize;
use crate::domain::rule::Strategy;
use crate::domain::validator::validate;
use crate::domain::violation::{Constraint, NodePath, ViolationReport};
use serde_json::Value;
use tracing::{debug, info};

/// An accepted strategy with its canonical JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub strategy: Strategy,
    pub canonical: Value,
}

/// Normalizes `ui` and validates the result. Normalization and validation
/// failures come back through the same report.
pub fn submit(ui: &Value, config: &RuleformConfig) -> Result<Submission, ViolationReport> {
    let normalized = normalize(ui, config)?;
    let strategy = validate(&normalized, config)?;
    let canonical = canonical_value(&strategy)?;
    info!(
        conditions = strategy.condition_count(),
        indicators = strategy.indicator_names().len(),
        "strategy accepted"
    );
    Ok(Submission {
        strategy,
        canonical,
    })
}

pub fn submit_json_text(text: &str, config: &RuleformConfig) -> Result<Submission, ViolationReport> {
    submit(&parse_json(text)?, config)
}

pub fn validate_json_text(text: &str, config: &RuleformConfig) -> Result<Strategy, ViolationReport> {
    validate(&parse_json(text)?, config)
}

pub fn normalize_json_text(text: &str, config: &RuleformConfig) -> Result<Value, ViolationReport> {
    normalize(&parse_json(text)?, config)
}

fn parse_json(text: &str) -> Result<Value, ViolationReport> {
    serde_json::from_str(text).map_err(|e| {
        debug!(error = %e, "rejected malformed JSON");
        single(Constraint::MalformedJson, format!("Malformed JSON: {e}"))
    })
}

fn canonical_value(strategy: &Strategy) -> Result<Value, ViolationReport> {
    strategy.to_canonical_json().map_err(|e| {
        single(
            Constraint::CanonicalEncoding,
            format!("Cannot serialize strategy: {e}"),
        )
    })
}

fn single(constraint: Constraint, message: String) -> ViolationReport {
    let mut report = ViolationReport::new();
    report.push(NodePath::root(), constraint, message);
    report
}
