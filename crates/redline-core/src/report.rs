//! Report types: per-clause verdicts, the contract verdict and the final
//! JSON artifact.
//!
//! The top-level keys (`summary`, `clauses`, `anonymisation_map`,
//! `analysis_timestamp`, `schema_version`) are a stable contract with
//! report renderers and UIs. New keys may be added; existing ones keep
//! their shape.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::anonymise::AnonymisationMap;
use crate::risk::Severity;
use crate::rules::{RULESET_VERSION, RuleMatch};

pub const SCHEMA_VERSION: &str = "1.0.0";

/// How a verdict was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    /// Model answer parsed and combined with the rules.
    Hybrid,
    /// Model answered but the response could not be decoded; the static
    /// fallback payload was combined with the rules.
    FallbackPayload,
    /// No usable model answer; rules only, Low promoted to Medium.
    RulesOnly,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hybrid => "hybrid",
            Self::FallbackPayload => "fallback_payload",
            Self::RulesOnly => "rules_only",
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, Self::Hybrid)
    }
}

/// Hybrid assessment of a single clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClauseVerdict {
    pub clause_index: usize,
    pub original_text: String,
    pub anonymised_text: String,
    pub plain_english_explanation: String,
    pub risk_level_llm: Severity,
    pub risk_level_rules: Severity,
    pub risk_level_final: Severity,
    pub risk_reason_llm: String,
    #[serde(default)]
    pub rule_hits: Vec<RuleMatch>,
    #[serde(default)]
    pub suggested_alternative_clause: String,
    #[serde(default = "unclear")]
    pub affected_party: String,
    #[serde(default)]
    pub negotiation_insight: String,
    pub analysis_mode: AnalysisMode,
}

fn unclear() -> String {
    "Unclear".to_string()
}

/// Document-level assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractVerdict {
    pub business_summary: String,
    pub overall_risk_llm: Severity,
    /// Highest rule severity across all clauses.
    pub overall_risk_rules: Severity,
    pub overall_risk_final: Severity,
    #[serde(default)]
    pub top_risks: Vec<String>,
    #[serde(default)]
    pub missing_critical_clauses: Vec<String>,
    /// 0..=100.
    pub contract_completeness_score: u8,
    #[serde(default)]
    pub conflicting_clauses: Vec<String>,
    #[serde(default)]
    pub duplicate_or_ambiguous_terms: Vec<String>,
    #[serde(default)]
    pub negotiation_insights: Vec<String>,
    pub document_length_words: usize,
    pub analysis_mode: AnalysisMode,
}

/// The terminal output of one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub summary: ContractVerdict,
    pub clauses: Vec<ClauseVerdict>,
    pub anonymisation_map: AnonymisationMap,
    /// RFC 3339, UTC.
    pub analysis_timestamp: String,
    pub schema_version: String,
    #[serde(default)]
    pub ruleset_version: String,
}

impl Report {
    /// Assemble a report stamped with the current UTC time.
    pub fn new(
        summary: ContractVerdict,
        clauses: Vec<ClauseVerdict>,
        anonymisation_map: AnonymisationMap,
    ) -> Self {
        Self {
            summary,
            clauses,
            anonymisation_map,
            analysis_timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            schema_version: SCHEMA_VERSION.to_string(),
            ruleset_version: RULESET_VERSION.to_string(),
        }
    }

    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Number of clauses whose verdict did not come from a full hybrid
    /// assessment.
    pub fn degraded_clauses(&self) -> usize {
        self.clauses
            .iter()
            .filter(|c| c.analysis_mode.is_degraded())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::evaluate_rules;

    fn sample_clause() -> ClauseVerdict {
        ClauseVerdict {
            clause_index: 1,
            original_text: "1. Acme Ltd has unlimited liability.".into(),
            anonymised_text: "1. ORG_1 has unlimited liability.".into(),
            plain_english_explanation: "ORG_1 pays for everything.".into(),
            risk_level_llm: Severity::Medium,
            risk_level_rules: Severity::High,
            risk_level_final: Severity::High,
            risk_reason_llm: "Uncapped exposure.".into(),
            rule_hits: evaluate_rules("unlimited liability"),
            suggested_alternative_clause: "Cap liability at fees paid.".into(),
            affected_party: "Vendor".into(),
            negotiation_insight: "Ask for a cap.".into(),
            analysis_mode: AnalysisMode::Hybrid,
        }
    }

    fn sample_summary() -> ContractVerdict {
        ContractVerdict {
            business_summary: "Supply agreement.".into(),
            overall_risk_llm: Severity::Medium,
            overall_risk_rules: Severity::High,
            overall_risk_final: Severity::High,
            top_risks: vec!["Uncapped liability".into()],
            missing_critical_clauses: vec![],
            contract_completeness_score: 70,
            conflicting_clauses: vec![],
            duplicate_or_ambiguous_terms: vec![],
            negotiation_insights: vec!["Cap liability".into()],
            document_length_words: 6,
            analysis_mode: AnalysisMode::Hybrid,
        }
    }

    fn sample_report() -> Report {
        let map = AnonymisationMap::build(vec![], vec!["Acme Ltd".into()]);
        Report::new(sample_summary(), vec![sample_clause()], map)
    }

    #[test]
    fn stable_top_level_keys() {
        let json = serde_json::to_value(sample_report()).unwrap();
        for key in [
            "summary",
            "clauses",
            "anonymisation_map",
            "analysis_timestamp",
            "schema_version",
        ] {
            assert!(json.get(key).is_some(), "missing key {key}");
        }
        assert!(json["clauses"].is_array());
        assert_eq!(json["anonymisation_map"]["ORG_1"], "Acme Ltd");
        assert_eq!(json["schema_version"], SCHEMA_VERSION);
        assert_eq!(json["ruleset_version"], RULESET_VERSION);
    }

    #[test]
    fn clause_fields_serialize_flat() {
        let json = serde_json::to_value(sample_clause()).unwrap();
        assert_eq!(json["clause_index"], 1);
        assert_eq!(json["risk_level_final"], "High");
        assert_eq!(json["analysis_mode"], "hybrid");
        assert_eq!(json["rule_hits"][0]["rule_id"], "unlimited_liability");
    }

    #[test]
    fn timestamp_is_utc_rfc3339() {
        let report = sample_report();
        assert!(report.analysis_timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&report.analysis_timestamp).is_ok());
    }

    #[test]
    fn json_roundtrip() {
        let report = sample_report();
        let text = report.to_json_pretty().unwrap();
        let parsed: Report = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed, report);
    }

    #[test]
    fn tolerates_additive_keys() {
        let mut json = serde_json::to_value(sample_report()).unwrap();
        json["renderer_hint"] = serde_json::json!("compact");
        json["clauses"][0]["new_field"] = serde_json::json!(true);
        let parsed: Report = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.clauses.len(), 1);
    }

    #[test]
    fn degraded_count() {
        let mut report = sample_report();
        let mut fallback = sample_clause();
        fallback.clause_index = 2;
        fallback.analysis_mode = AnalysisMode::RulesOnly;
        report.clauses.push(fallback);
        assert_eq!(report.degraded_clauses(), 1);
    }
}
