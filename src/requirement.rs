//! The structured requirement extracted from a natural-language instruction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Canonical robot actions.
///
/// Composite verbs such as "transfer" have no variant of their own; analysis expands them
/// into [`Action::Pick`], [`Action::Move`] and [`Action::Place`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Pick,
    Place,
    Move,
    Wait,
}

impl Action {
    pub const ALL: [Action; 4] = [Action::Pick, Action::Place, Action::Move, Action::Wait];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Pick => "pick",
            Action::Place => "place",
            Action::Move => "move",
            Action::Wait => "wait",
        }
    }

    /// Actions that drive the arm somewhere and therefore need a resolvable pose.
    pub fn is_motion(self) -> bool {
        !matches!(self, Action::Wait)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == lower)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}

/// Numeric constraints understood by the robot selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConstraintKey {
    /// Minimum payload in kilograms.
    #[serde(rename = "payload_kg")]
    PayloadKg,
    /// Minimum reach in meters.
    #[serde(rename = "reach_m")]
    ReachM,
}

impl ConstraintKey {
    pub fn as_str(self) -> &'static str {
        match self {
            ConstraintKey::PayloadKg => "payload_kg",
            ConstraintKey::ReachM => "reach_m",
        }
    }

    /// Maps a wire name to a key; anything other than `payload_kg`/`reach_m` is `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "payload_kg" => Some(ConstraintKey::PayloadKg),
            "reach_m" => Some(ConstraintKey::ReachM),
            _ => None,
        }
    }
}

impl fmt::Display for ConstraintKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint values keyed by [`ConstraintKey`], iterated in key order.
pub type Constraints = BTreeMap<ConstraintKey, f64>;

/// Everything the pipeline knows about one instruction.
///
/// Built once per input text by an analyzer and treated as read-only afterwards; both the
/// synthesizer and the selector consume the same value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Requirement {
    /// The instruction as given, trimmed.
    pub source_text: String,
    /// Canonical actions in first-detection order, without duplicates.
    pub actions: Vec<Action>,
    /// Object surface forms in encounter order, deduplicated by normalized form.
    pub objects: Vec<String>,
    pub source_location: Option<String>,
    pub target_location: Option<String>,
    pub constraints: Constraints,
    /// Remarks produced during analysis.
    #[serde(default)]
    pub notes: Vec<String>,
}

impl Requirement {
    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    /// True when at least one action moves the arm.
    pub fn has_motion(&self) -> bool {
        self.actions.iter().any(|a| a.is_motion())
    }

    /// Appends pick, move, place for any of the three not already present.
    ///
    /// Actions already in the list keep their position.
    pub fn expand_transfer(&mut self) {
        for action in [Action::Pick, Action::Move, Action::Place] {
            push_unique(&mut self.actions, action);
        }
    }
}

pub(crate) fn push_unique<T: PartialEq>(list: &mut Vec<T>, item: T) {
    if !list.contains(&item) {
        list.push(item);
    }
}
