//! Terminal rendering for reports, clauses and the rule registry.

use std::fmt::Write;

use redline_core::rules::Rule;
use redline_core::{Clause, Report, RuleMatch, Severity, aggregate_risk_from_rules};

const PREVIEW_CHARS: usize = 100;
const MAX_LIST_ITEMS: usize = 5;

// ── Public API ──

/// Render a report as a vertical card: contract summary first, then one
/// block per clause.
pub fn render_report_card(report: &Report) -> String {
    let mut out = String::new();
    let s = &report.summary;

    let _ = writeln!(out, "=== Contract report ===");
    let _ = writeln!(
        out,
        "schema {} · rules {} · {}",
        report.schema_version, report.ruleset_version, report.analysis_timestamp
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "Summary");
    field(&mut out, "overall_risk", &risk_line(s.overall_risk_final, s.overall_risk_llm, s.overall_risk_rules));
    field(&mut out, "completeness", &format!("{}/100", s.contract_completeness_score));
    field(&mut out, "words", &s.document_length_words.to_string());
    field(&mut out, "analysis_mode", s.analysis_mode.as_str());
    if !s.business_summary.is_empty() {
        field(&mut out, "business_summary", &s.business_summary);
    }
    list(&mut out, "top_risks", &s.top_risks);
    list(&mut out, "missing_clauses", &s.missing_critical_clauses);
    list(&mut out, "conflicts", &s.conflicting_clauses);
    list(&mut out, "ambiguous_terms", &s.duplicate_or_ambiguous_terms);
    list(&mut out, "negotiation", &s.negotiation_insights);
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "Clauses ({} total, {} degraded, {} high risk)",
        report.clauses.len(),
        report.degraded_clauses(),
        report
            .clauses
            .iter()
            .filter(|c| c.risk_level_final == Severity::High)
            .count()
    );
    for c in &report.clauses {
        let _ = writeln!(
            out,
            "  [{:>3}] {:<6} {}",
            c.clause_index,
            c.risk_level_final.as_str(),
            preview(&c.original_text)
        );
        if c.analysis_mode.is_degraded() {
            let _ = writeln!(out, "        mode: {}", c.analysis_mode.as_str());
        }
        if !c.plain_english_explanation.is_empty() {
            let _ = writeln!(out, "        {}", preview(&c.plain_english_explanation));
        }
        for hit in &c.rule_hits {
            let _ = writeln!(out, "        rule {} ({})", hit.rule_id, hit.risk_level);
        }
    }

    if !report.anonymisation_map.is_empty() {
        let _ = writeln!(out);
        let _ = writeln!(out, "Anonymised parties");
        for (placeholder, original) in report.anonymisation_map.iter() {
            field(&mut out, placeholder, original);
        }
    }

    out
}

/// One line per clause with its heading label and a text preview.
pub fn render_clauses(clauses: &[Clause]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} clauses", clauses.len());
    for c in clauses {
        let label = c.label.as_deref().unwrap_or("-");
        let _ = writeln!(out, "  [{:>3}] {:<8} {}", c.index, label, preview(&c.text));
    }
    out
}

/// Rules-only scan: per clause, the aggregate rule severity and every hit.
pub fn render_rule_scan(scan: &[(Clause, Vec<RuleMatch>)]) -> String {
    let mut out = String::new();
    let flagged = scan.iter().filter(|(_, hits)| !hits.is_empty()).count();
    let overall = scan
        .iter()
        .map(|(_, hits)| aggregate_risk_from_rules(hits))
        .max()
        .unwrap_or(Severity::Low);
    let _ = writeln!(out, "{flagged}/{} clauses flagged, overall {overall}", scan.len());

    for (clause, hits) in scan.iter().filter(|(_, hits)| !hits.is_empty()) {
        let _ = writeln!(
            out,
            "  [{:>3}] {:<6} {}",
            clause.index,
            aggregate_risk_from_rules(hits).as_str(),
            preview(&clause.text)
        );
        for hit in hits {
            let _ = writeln!(out, "        {:<24} {}", hit.rule_id, hit.description);
        }
    }
    out
}

pub fn render_rule_registry(rules: &[Rule]) -> String {
    let mut out = String::new();
    for rule in rules {
        let _ = writeln!(out, "{:<24} {:<6} {}", rule.id, rule.severity.as_str(), rule.description);
        let _ = writeln!(out, "{:<24} {:<6} /{}/", "", "", rule.pattern());
    }
    out
}

// ── Helpers ──

fn field(out: &mut String, name: &str, value: &str) {
    let _ = writeln!(out, "  {name:<26} {value}");
}

fn list(out: &mut String, name: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(out, "  {name}");
    for item in items.iter().take(MAX_LIST_ITEMS) {
        let _ = writeln!(out, "    - {item}");
    }
    if items.len() > MAX_LIST_ITEMS {
        let _ = writeln!(out, "    ... and {} more", items.len() - MAX_LIST_ITEMS);
    }
}

fn risk_line(final_risk: Severity, llm: Severity, rules: Severity) -> String {
    format!("{final_risk} (model {llm}, rules {rules})")
}

fn preview(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
