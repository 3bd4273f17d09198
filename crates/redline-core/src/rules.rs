//! Deterministic risk rules.
//!
//! A fixed, versioned registry of case-insensitive patterns. Rules inspect
//! contractual substance only (liability, termination, renewal, payment,
//! IP, confidentiality) and never personal or demographic attributes.
//! There is no weighting: a clause's rule severity is the maximum severity
//! among the rules that fire, so every High is traceable to a named rule.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::risk::Severity;

/// Bumped whenever a pattern, severity or rule is added or removed.
pub const RULESET_VERSION: &str = "1.0.0";

/// One entry of the rule registry.
pub struct Rule {
    pub id: &'static str,
    pub description: &'static str,
    pub severity: Severity,
    pattern: Regex,
}

impl Rule {
    fn new(id: &'static str, severity: Severity, description: &'static str, pattern: &str) -> Self {
        let pattern = Regex::new(&format!("(?i){pattern}"))
            .unwrap_or_else(|e| panic!("invalid pattern for rule {id}: {e}"));
        Self {
            id,
            description,
            severity,
            pattern,
        }
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

/// A rule that fired against a clause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub rule_id: String,
    pub description: String,
    pub risk_level: Severity,
}

impl From<&Rule> for RuleMatch {
    fn from(rule: &Rule) -> Self {
        Self {
            rule_id: rule.id.to_string(),
            description: rule.description.to_string(),
            risk_level: rule.severity,
        }
    }
}

static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    use Severity::{High, Medium};
    vec![
        Rule::new(
            "unlimited_liability",
            High,
            "Unlimited or unbounded liability for one party.",
            r"\bunlimited liability\b|\bwithout limit of liability\b|\bliable for all damages\b",
        ),
        Rule::new(
            "one_sided_indemnity",
            High,
            "Strong one-sided indemnity in favour of one party.",
            r"shall indemnify.+(and hold harmless|from and against all claims)",
        ),
        Rule::new(
            "no_termination_clause",
            High,
            "Explicitly removes right to terminate the agreement.",
            r"may not terminate|no right to terminate",
        ),
        Rule::new(
            "automatic_renewal",
            Medium,
            "Automatic renewal without explicit opt-in.",
            r"automatically renews|auto-renew|shall be renewed automatically",
        ),
        Rule::new(
            "broad_ip_assignment",
            Medium,
            "Very broad assignment of intellectual property rights.",
            r"assigns all intellectual property|all rights, title and interest",
        ),
        Rule::new(
            "vague_payment_terms",
            Medium,
            "Unclear or vague payment terms.",
            r"payment.*(as mutually agreed|from time to time)",
        ),
        Rule::new(
            "penalty_interest_high",
            Medium,
            "Very high interest/penalty rates.",
            r"interest rate.*(3[0-9]|[4-9][0-9])\s?%",
        ),
        Rule::new(
            "ambiguous_terms",
            Medium,
            "Ambiguous or subjective obligation wording, which may weaken enforceability or expectations.",
            r"\breasonable efforts\b|\bcommercially reasonable\b|\bbest efforts\b|\bto the extent possible\b",
        ),
        Rule::new(
            "unilateral_termination",
            High,
            "Termination rights granted to only one party, creating imbalance and business risk.",
            r"may terminate (this )?agreement at any time( without notice)?",
        ),
        Rule::new(
            "broad_confidentiality",
            Medium,
            "Overly broad confidentiality obligations that may restrict future business operations.",
            r"\bperpetual confidentiality\b|\bin perpetuity\b|\bwithout time limitation\b",
        ),
    ]
});

/// The rule registry, in evaluation order.
pub fn rules() -> &'static [Rule] {
    &RULES
}

/// Evaluate every rule against a clause; matches come back in registry order.
///
/// Blank input yields no matches.
pub fn evaluate_rules(clause_text: &str) -> Vec<RuleMatch> {
    let text = clause_text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    RULES
        .iter()
        .filter(|rule| rule.is_match(text))
        .map(RuleMatch::from)
        .collect()
}

/// Collapse matches into one severity: Low when nothing fired, otherwise
/// the highest severity among the matches.
pub fn aggregate_risk_from_rules(matches: &[RuleMatch]) -> Severity {
    matches
        .iter()
        .map(|m| m.risk_level)
        .max()
        .unwrap_or(Severity::Low)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(matches: &[RuleMatch]) -> Vec<&str> {
        matches.iter().map(|m| m.rule_id.as_str()).collect()
    }

    #[test]
    fn registry_compiles_and_ids_are_unique() {
        let all = rules();
        assert_eq!(all.len(), 10);
        let mut seen: Vec<&str> = all.iter().map(|r| r.id).collect();
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), all.len());
    }

    #[test]
    fn unlimited_liability_is_high() {
        let m = evaluate_rules("The Vendor shall have unlimited liability for all damages.");
        assert_eq!(ids(&m), vec!["unlimited_liability"]);
        assert_eq!(m[0].risk_level, Severity::High);
    }

    #[test]
    fn automatic_renewal_is_medium() {
        let m = evaluate_rules("This agreement automatically renews each year unless cancelled.");
        assert_eq!(ids(&m), vec!["automatic_renewal"]);
        assert_eq!(aggregate_risk_from_rules(&m), Severity::Medium);
    }

    #[test]
    fn case_insensitive() {
        let m = evaluate_rules("THE CUSTOMER SHALL USE COMMERCIALLY REASONABLE EFFORTS.");
        assert_eq!(ids(&m), vec!["ambiguous_terms"]);
    }

    #[test]
    fn multiple_matches_in_registry_order() {
        let text = "The Supplier may terminate this agreement at any time. \
                    The Customer shall use best efforts and this agreement automatically renews.";
        let m = evaluate_rules(text);
        assert_eq!(
            ids(&m),
            vec!["automatic_renewal", "ambiguous_terms", "unilateral_termination"]
        );
        assert_eq!(aggregate_risk_from_rules(&m), Severity::High);
    }

    #[test]
    fn indemnity_requires_hold_harmless_or_all_claims() {
        assert!(evaluate_rules("The Client shall indemnify the Vendor.").is_empty());
        let m = evaluate_rules("The Client shall indemnify and hold harmless the Vendor.");
        assert_eq!(ids(&m), vec!["one_sided_indemnity"]);
    }

    #[test]
    fn high_interest_rate() {
        let m = evaluate_rules("Late amounts accrue at an interest rate of 36% per annum.");
        assert_eq!(ids(&m), vec!["penalty_interest_high"]);
        assert!(evaluate_rules("Late amounts accrue at an interest rate of 8% per annum.").is_empty());
    }

    #[test]
    fn word_boundaries_respected() {
        // "unlimited liabilityx" is not the phrase.
        assert!(evaluate_rules("unlimited liabilityx").is_empty());
    }

    #[test]
    fn blank_input_yields_nothing() {
        assert!(evaluate_rules("").is_empty());
        assert!(evaluate_rules("   \n").is_empty());
    }

    #[test]
    fn aggregate_empty_is_low() {
        assert_eq!(aggregate_risk_from_rules(&[]), Severity::Low);
    }

    #[test]
    fn aggregate_is_monotonic() {
        let pool: Vec<RuleMatch> = rules().iter().map(RuleMatch::from).collect();
        let mut acc: Vec<RuleMatch> = Vec::new();
        let mut prev = aggregate_risk_from_rules(&acc);
        // Grow the set one match at a time, in both directions.
        for m in pool.iter().chain(pool.iter().rev()) {
            acc.push(m.clone());
            let next = aggregate_risk_from_rules(&acc);
            assert!(next >= prev, "adding {} lowered severity", m.rule_id);
            prev = next;
        }
        assert_eq!(prev, Severity::High);
    }

    #[test]
    fn rule_match_serializes_with_risk_level() {
        let m = evaluate_rules("no right to terminate");
        let json = serde_json::to_value(&m[0]).unwrap();
        assert_eq!(json["rule_id"], "no_termination_clause");
        assert_eq!(json["risk_level"], "High");
    }
}
