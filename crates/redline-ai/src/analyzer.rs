//! Clause and contract analysis: model judgment merged with the rules.
//!
//! Per clause the flow is model request → model outcome → rule evaluation
//! → combination. The final severity is always `combine(model, rules)`, so
//! the model can raise a verdict but never lower one below what the rules
//! found. Failures degrade the verdict (see [`AnalysisMode`]) and never
//! abort the run.

use std::time::Duration;

use redline_core::normalize::word_count;
use redline_core::{
    AnalysisMode, ClauseVerdict, ContractVerdict, PreparedClause, PreparedContract, Report,
    RuleMatch, Severity, aggregate_risk_from_rules, combine, evaluate_rules,
};
use tracing::{debug, info, warn};

use crate::client::{GenerateRequest, ModelClient};
use crate::parse::{ClauseAssessment, ContractAssessment, decode};
use crate::prompt;
use crate::retry::{RetryPolicy, generate_with_retry};

/// Clauses with fewer trimmed characters than this never reach the model.
pub const MIN_CLAUSE_CHARS: usize = 10;

const DEFAULT_COMPLETENESS: u8 = 60;

/// Immutable analyzer settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub retry: RetryPolicy,
    /// Per-call bound, connect included.
    pub request_timeout: Duration,
    /// Pause after every `throttle_every` clauses. Zero disables it.
    pub throttle_every: usize,
    pub throttle_pause: Duration,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.15,
            max_tokens: 2000,
            retry: RetryPolicy::default(),
            request_timeout: Duration::from_secs(60),
            throttle_every: 5,
            throttle_pause: Duration::from_secs(1),
        }
    }
}

pub struct Analyzer<C> {
    client: C,
    config: AnalyzerConfig,
}

impl<C: ModelClient> Analyzer<C> {
    pub fn new(client: C, config: AnalyzerConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Full run: every clause, then the contract summary.
    pub async fn analyze_contract(&self, prepared: &PreparedContract) -> Report {
        info!(clauses = prepared.clauses.len(), model = %self.config.model, "starting analysis");

        let mut verdicts = Vec::with_capacity(prepared.clauses.len());
        self.analyze_clauses_into(&prepared.clauses, &mut verdicts)
            .await;

        let rules_risk = overall_rules_risk(&verdicts);
        info!("generating contract summary");
        let summary = self.summarize_contract(prepared, rules_risk).await;

        let report = Report::new(summary, verdicts, prepared.anonymisation_map.clone());
        info!(
            degraded = report.degraded_clauses(),
            overall = %report.summary.overall_risk_final,
            "analysis complete"
        );
        report
    }

    /// Analyze `clauses` in order, pushing each verdict onto `out` once it
    /// is complete.
    ///
    /// Dropping the future mid-run leaves `out` holding every finished
    /// verdict; only the in-flight clause is lost.
    pub async fn analyze_clauses_into(&self, clauses: &[PreparedClause], out: &mut Vec<ClauseVerdict>) {
        let total = clauses.len();
        for (n, clause) in clauses.iter().enumerate() {
            info!(clause = clause.clause.index, total, "analyzing clause");
            out.push(self.analyze_clause(clause).await);

            let done = n + 1;
            if self.config.throttle_every > 0 && done % self.config.throttle_every == 0 && done < total {
                info!(
                    after = done,
                    pause_ms = self.config.throttle_pause.as_millis() as u64,
                    "throttling model calls"
                );
                tokio::time::sleep(self.config.throttle_pause).await;
            }
        }
    }

    /// Hybrid verdict for one clause. Never fails: an unavailable model
    /// yields a rules-only verdict, an undecodable answer the fallback
    /// payload.
    pub async fn analyze_clause(&self, prepared: &PreparedClause) -> ClauseVerdict {
        let index = prepared.clause.index;

        if prepared.clause.text.trim().chars().count() < MIN_CLAUSE_CHARS {
            warn!(clause = index, "clause too short for model analysis; rules only");
            return rules_only_verdict(prepared, evaluate_rules(&prepared.clause.text));
        }

        debug!(clause = index, stage = "model_requested");
        let request = self.request(
            prompt::clause_system_prompt(),
            prompt::build_clause_prompt(&prepared.anonymised_text),
        );
        let raw = match generate_with_retry(&self.client, &request, &self.config.retry).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(clause = index, error = %e, "model unavailable; rules-only verdict");
                return rules_only_verdict(prepared, evaluate_rules(&prepared.clause.text));
            }
        };
        debug!(clause = index, stage = "model_succeeded");

        let (assessment, mode) = match decode::<ClauseAssessment>(&raw) {
            Ok(a) => (a, AnalysisMode::Hybrid),
            Err(e) => {
                warn!(clause = index, error = %e, raw = %e.excerpt, "using fallback payload");
                (prompt::clause_fallback(), AnalysisMode::FallbackPayload)
            }
        };

        let rule_hits = evaluate_rules(&prepared.clause.text);
        let rules_risk = aggregate_risk_from_rules(&rule_hits);
        debug!(clause = index, stage = "rule_evaluated", hits = rule_hits.len());

        let llm_risk = Severity::from_label(assessment.risk_level.as_deref());
        let final_risk = combine(llm_risk, rules_risk);
        debug!(clause = index, stage = "combined", llm = %llm_risk, rules = %rules_risk, combined = %final_risk);

        ClauseVerdict {
            clause_index: index,
            original_text: prepared.clause.text.clone(),
            anonymised_text: prepared.anonymised_text.clone(),
            plain_english_explanation: assessment.plain_english_explanation,
            risk_level_llm: llm_risk,
            risk_level_rules: rules_risk,
            risk_level_final: final_risk,
            risk_reason_llm: assessment.risk_reason,
            rule_hits,
            suggested_alternative_clause: assessment.suggested_alternative_clause,
            affected_party: assessment
                .affected_party
                .unwrap_or_else(|| "Unclear".to_string()),
            negotiation_insight: assessment.negotiation_insight,
            analysis_mode: mode,
        }
    }

    /// Document-level verdict over the anonymised text. `rules_risk` is the
    /// highest rule severity across the clause verdicts.
    pub async fn summarize_contract(&self, prepared: &PreparedContract, rules_risk: Severity) -> ContractVerdict {
        let request = self.request(
            prompt::summary_system_prompt(),
            prompt::build_summary_prompt(&prepared.anonymised_text),
        );

        let (assessment, mode) = match generate_with_retry(&self.client, &request, &self.config.retry).await {
            Ok(raw) => match decode::<ContractAssessment>(&raw) {
                Ok(a) => (a, AnalysisMode::Hybrid),
                Err(e) => {
                    warn!(error = %e, raw = %e.excerpt, "summary unparseable; using fallback payload");
                    (prompt::summary_fallback(rules_risk), AnalysisMode::FallbackPayload)
                }
            },
            Err(e) => {
                warn!(error = %e, "model unavailable; fallback summary");
                (prompt::summary_fallback(rules_risk), AnalysisMode::RulesOnly)
            }
        };

        let llm_risk = Severity::from_label(assessment.overall_risk.as_deref());
        ContractVerdict {
            business_summary: assessment.business_summary,
            overall_risk_llm: llm_risk,
            overall_risk_rules: rules_risk,
            overall_risk_final: combine(llm_risk, rules_risk),
            top_risks: assessment.top_risks,
            missing_critical_clauses: assessment.missing_critical_clauses,
            contract_completeness_score: assessment
                .contract_completeness_score
                .unwrap_or(DEFAULT_COMPLETENESS),
            conflicting_clauses: assessment.conflicting_clauses,
            duplicate_or_ambiguous_terms: assessment.duplicate_or_ambiguous_terms,
            negotiation_insights: assessment.negotiation_insights,
            document_length_words: word_count(&prepared.normalized_text),
            analysis_mode: mode,
        }
    }

    fn request(&self, system: String, user: String) -> GenerateRequest {
        GenerateRequest {
            model: self.config.model.clone(),
            system,
            user,
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            timeout: self.config.request_timeout,
        }
    }
}

/// Highest rule severity across `verdicts`, `Low` when there are none.
pub fn overall_rules_risk(verdicts: &[ClauseVerdict]) -> Severity {
    verdicts
        .iter()
        .map(|v| v.risk_level_rules)
        .max()
        .unwrap_or(Severity::Low)
}

/// Verdict from the rules alone. The model side counts as `Medium`, so a
/// clause nobody could assess is never reported as `Low`.
fn rules_only_verdict(prepared: &PreparedClause, rule_hits: Vec<RuleMatch>) -> ClauseVerdict {
    let rules_risk = aggregate_risk_from_rules(&rule_hits);
    let llm_risk = Severity::Medium;
    ClauseVerdict {
        clause_index: prepared.clause.index,
        original_text: prepared.clause.text.clone(),
        anonymised_text: prepared.anonymised_text.clone(),
        plain_english_explanation: "This clause requires manual review. Please consult with a legal \
            professional for detailed analysis."
            .to_string(),
        risk_level_llm: llm_risk,
        risk_level_rules: rules_risk,
        risk_level_final: rules_risk.at_least_medium(),
        risk_reason_llm: "Automated analysis unavailable for this clause.".to_string(),
        rule_hits,
        suggested_alternative_clause: "Seek legal advice for alternative wording.".to_string(),
        affected_party: "Unclear".to_string(),
        negotiation_insight: String::new(),
        analysis_mode: AnalysisMode::RulesOnly,
    }
}
