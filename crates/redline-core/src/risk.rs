//! Severity levels and the hybrid risk combiner.
//!
//! Rule-derived and model-derived verdicts are merged conservatively: the
//! higher severity wins. Labels that are missing or not recognised count as
//! [`Severity::Medium`], never Low, so a misbehaving model cannot silently
//! downgrade a clause.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Ordered risk level: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }

    /// Parse a label case-insensitively (`"high"`, `" Medium "`, `"LOW"`).
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }

    /// Parse an optional label, defaulting missing or unrecognised values
    /// to Medium.
    pub fn from_label(label: Option<&str>) -> Self {
        label.and_then(Self::parse).unwrap_or(Self::Medium)
    }

    /// Promote Low to Medium; used for verdicts produced without the model.
    pub fn at_least_medium(self) -> Self {
        self.max(Self::Medium)
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Combine a model severity with a rule severity: the higher one wins.
pub fn combine(model: Severity, rules: Severity) -> Severity {
    model.max(rules)
}

/// Combine two raw labels, each defaulting to Medium when missing or
/// unrecognised.
pub fn combine_labels(model: Option<&str>, rules: Option<&str>) -> Severity {
    combine(Severity::from_label(model), Severity::from_label(rules))
}
