//! Constraint-based robot ranking.

use crate::requirement::{ConstraintKey, Constraints};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// One entry of the robot specification database.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RobotSpec {
    pub manufacturer: String,
    pub model: String,
    /// Rated payload in kilograms.
    pub payload_kg: f64,
    /// Maximum reach in meters.
    pub reach_m: f64,
    /// Every other field of the record, kept verbatim and not interpreted.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl RobotSpec {
    pub fn capability(&self, key: ConstraintKey) -> f64 {
        match key {
            ConstraintKey::PayloadKg => self.payload_kg,
            ConstraintKey::ReachM => self.reach_m,
        }
    }
}

/// A constraint a robot does not meet.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Violation {
    pub key: ConstraintKey,
    pub required: f64,
    pub capability: f64,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requires {} but robot provides {}",
            self.key, self.required, self.capability
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RankedCandidate {
    pub spec: RobotSpec,
    pub eligible: bool,
    /// Mean normalized capability margin in `[0, 1]`.
    pub score: f64,
    /// Empty when `eligible`.
    pub violations: Vec<Violation>,
}

#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("reading robot database {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing robot database {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Loads a JSON array of [`RobotSpec`] records.
pub fn load_robot_specs(path: &Path) -> Result<Vec<RobotSpec>, SelectorError> {
    let data = fs::read_to_string(path).map_err(|source| SelectorError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| SelectorError::Parse {
        path: path.display().to_string(),
        source,
    })
}

/// Ranks every spec against `constraints`.
///
/// Eligible candidates come first, then ineligible ones; within each group by descending
/// score, ties broken by `(manufacturer, model)`. Every input spec appears exactly once.
pub fn select(constraints: &Constraints, specs: &[RobotSpec]) -> Vec<RankedCandidate> {
    let mut ranked: Vec<RankedCandidate> =
        specs.iter().map(|spec| evaluate(constraints, spec)).collect();
    ranked.sort_by(compare);
    debug!(
        candidates = ranked.len(),
        eligible = ranked.iter().filter(|c| c.eligible).count(),
        "ranked robot candidates"
    );
    ranked
}

/// One-line verdict over a ranking, `None` when there was nothing to rank.
pub fn selection_note(ranking: &[RankedCandidate]) -> Option<&'static str> {
    if ranking.is_empty() {
        None
    } else if ranking.iter().any(|c| c.eligible) {
        Some("At least one robot satisfies payload and reach requirements.")
    } else {
        Some("No robot satisfies the mandatory constraints.")
    }
}

fn evaluate(constraints: &Constraints, spec: &RobotSpec) -> RankedCandidate {
    let mut violations = Vec::new();
    let mut margins = Vec::with_capacity(constraints.len());
    for (&key, &required) in constraints {
        let capability = spec.capability(key);
        if capability < required || capability.is_nan() {
            violations.push(Violation {
                key,
                required,
                capability,
            });
        }
        margins.push(margin(capability, required));
    }
    let score = if margins.is_empty() {
        1.0
    } else {
        margins.iter().sum::<f64>() / margins.len() as f64
    };
    debug!(
        manufacturer = %spec.manufacturer,
        model = %spec.model,
        score,
        violations = violations.len(),
        "evaluated robot"
    );
    RankedCandidate {
        spec: spec.clone(),
        eligible: violations.is_empty(),
        score,
        violations,
    }
}

/// `(capability - required) / capability`, clamped to `[0, 1]`.
fn margin(capability: f64, required: f64) -> f64 {
    if capability.is_nan() || capability <= 0.0 {
        return 0.0;
    }
    let m = (capability - required.max(0.0)) / capability;
    if m.is_nan() { 0.0 } else { m.clamp(0.0, 1.0) }
}

fn compare(a: &RankedCandidate, b: &RankedCandidate) -> Ordering {
    b.eligible
        .cmp(&a.eligible)
        .then_with(|| b.score.total_cmp(&a.score))
        .then_with(|| a.spec.manufacturer.cmp(&b.spec.manufacturer))
        .then_with(|| a.spec.model.cmp(&b.spec.model))
}
