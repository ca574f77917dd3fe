//! Pod phase classification

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConditionError;

/// A coarse reduction of the lifecycle phase Kubernetes reports for a pod.
///
/// Pods that are still starting or executing are `Running`; every other phase,
/// including ones this crate does not know about, is `Completed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseClass {
    /// The pod is pending, creating its containers, or running.
    Running,
    /// The pod is in any other phase.
    Completed,
}

impl PhaseClass {
    /// Every class, in the order they are offered to users.
    pub const ALL: [PhaseClass; 2] = [PhaseClass::Running, PhaseClass::Completed];

    /// Classify a raw phase string as printed by `kubectl`.
    ///
    /// The comparison ignores case but not surrounding whitespace.
    pub fn classify(raw: &str) -> Self {
        match raw.to_lowercase().as_str() {
            "pending" | "running" | "containercreating" => PhaseClass::Running,
            _ => PhaseClass::Completed,
        }
    }

    /// The configuration value of this class.
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseClass::Running => "RUNNING",
            PhaseClass::Completed => "COMPLETED",
        }
    }

    /// The human readable label of this class.
    pub fn label(&self) -> &'static str {
        match self {
            PhaseClass::Running => "Running",
            PhaseClass::Completed => "Completed",
        }
    }

    /// `(label, value)` pairs for presenting the choice of expected status.
    pub fn options() -> Vec<(&'static str, &'static str)> {
        Self::ALL.iter().map(|c| (c.label(), c.as_str())).collect()
    }
}

impl fmt::Display for PhaseClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PhaseClass {
    type Err = ConditionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "RUNNING" => Ok(PhaseClass::Running),
            "COMPLETED" => Ok(PhaseClass::Completed),
            other => Err(ConditionError::UnknownStatus(other.to_owned())),
        }
    }
}
