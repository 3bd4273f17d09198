//! Prompt templates and the static fallback payloads.

use redline_core::Severity;

use crate::parse::{ClauseAssessment, ContractAssessment};

/// Characters of anonymised document text sent for the contract summary.
pub const SUMMARY_SAMPLE_CHARS: usize = 8000;

// ── Prompt templates ──

const BIAS_SAFETY: &str = "\
You MUST avoid any form of discrimination or bias.
Base your assessment ONLY on the contractual content:
- obligations
- rights
- liabilities
- payment terms
- termination conditions
- intellectual property
- dispute resolution

NEVER allow parties' names, nationalities, genders, ethnicities, \
or other demographic hints to influence the risk assessment.
Party names have been replaced with placeholders such as PARTY_1 or ORG_1; \
treat them as neutral.";

pub fn clause_system_prompt() -> String {
    format!(
        "You are an expert contract lawyer helping small and medium businesses \
         understand contracts.\n\
         Always respond with VALID JSON only. No markdown fences, no explanation, just raw JSON.\n\
         \n\
         {BIAS_SAFETY}"
    )
}

pub fn build_clause_prompt(clause_text: &str) -> String {
    format!(
        "Analyze this contract clause:\n\
         \n\
         \"\"\"{clause_text}\"\"\"\n\
         \n\
         Return ONLY a JSON object:\n\
         {{\n  \
           \"plain_english_explanation\": \"what this clause means in simple business terms\",\n  \
           \"risk_level\": \"Low | Medium | High\",\n  \
           \"risk_reason\": \"specific reason for the rating: obligations, penalties, liability or ambiguity\",\n  \
           \"suggested_alternative_clause\": \"a safer, fairer version of this clause\",\n  \
           \"affected_party\": \"Buyer | Seller | Vendor | Service Provider | Client | Both Parties | Unclear\",\n  \
           \"negotiation_insight\": \"practical advice on negotiating this clause\"\n\
         }}\n\
         \n\
         Focus on: obligations, liabilities, payment terms, termination, IP rights, warranties, indemnity."
    )
}

pub fn summary_system_prompt() -> String {
    format!(
        "You are a senior contract analyst. Produce a concise business summary.\n\
         Respond ONLY with VALID JSON. No markdown fences, no explanation, just raw JSON.\n\
         \n\
         {BIAS_SAFETY}"
    )
}

/// `text` is truncated to [`SUMMARY_SAMPLE_CHARS`] characters.
pub fn build_summary_prompt(text: &str) -> String {
    let sample = crate::parse::excerpt(text, SUMMARY_SAMPLE_CHARS);
    format!(
        "Analyze this contract:\n\
         \n\
         \"\"\"{sample}\"\"\"\n\
         \n\
         Return ONLY a JSON object:\n\
         {{\n  \
           \"business_summary\": \"150-250 words covering purpose, parties, obligations, payment, duration, liability, IP, termination, disputes\",\n  \
           \"overall_risk\": \"Low | Medium | High\",\n  \
           \"top_risks\": [\"risk 1\", \"risk 2\", \"risk 3\"],\n  \
           \"negotiation_insights\": [\"tip 1\", \"tip 2\", \"tip 3\"],\n  \
           \"missing_critical_clauses\": [\"clause a typical contract of this kind would include\"],\n  \
           \"contract_completeness_score\": 75,\n  \
           \"conflicting_clauses\": [\"conflict description\"],\n  \
           \"duplicate_or_ambiguous_terms\": [\"term\"]\n\
         }}\n\
         \n\
         Rate completeness 0-100 based on: parties, obligations, payment, duration, termination, liability, IP, disputes.\n\
         Use empty lists where nothing applies."
    )
}

// ── Fallback payloads ──

/// Used when the model answered but the answer could not be decoded.
pub fn clause_fallback() -> ClauseAssessment {
    ClauseAssessment {
        plain_english_explanation: "This clause outlines terms related to the agreement. It should be \
            reviewed carefully for any obligations, deadlines, or potential liabilities it may create."
            .into(),
        risk_level: Some(Severity::Medium.as_str().into()),
        risk_reason: "Standard contractual clause requiring careful review of obligations and terms."
            .into(),
        suggested_alternative_clause: "Ensure all terms are clearly defined with specific timelines \
            and responsibilities for each party."
            .into(),
        affected_party: Some("Both Parties".into()),
        negotiation_insight: "Review this clause carefully and ensure all terms are acceptable \
            before signing."
            .into(),
    }
}

/// Used when no usable summary came back. `rules_risk` becomes the
/// overall model-side risk so the fallback never understates the rules.
pub fn summary_fallback(rules_risk: Severity) -> ContractAssessment {
    ContractAssessment {
        business_summary: "This is a business contract that outlines terms between parties. Key \
            areas include obligations, payment terms, duration, and termination conditions. \
            Please review all clauses carefully with legal counsel."
            .into(),
        overall_risk: Some(rules_risk.as_str().into()),
        top_risks: vec![
            "Potential liability exposure".into(),
            "Unclear termination conditions".into(),
            "Payment terms should be reviewed".into(),
        ],
        negotiation_insights: vec![
            "Clarify all obligations and timelines".into(),
            "Review liability limitations".into(),
            "Ensure termination rights are balanced".into(),
        ],
        missing_critical_clauses: Vec::new(),
        contract_completeness_score: Some(60),
        conflicting_clauses: Vec::new(),
        duplicate_or_ambiguous_terms: Vec::new(),
    }
}
