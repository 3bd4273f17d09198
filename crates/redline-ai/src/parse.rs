//! Tolerant decoding of model responses.
//!
//! Models asked for "JSON only" still wrap answers in code fences, prepend
//! a sentence, or send a score as `"75"`. Decoding goes through three
//! stages (fence strip, direct parse, salvage of the outermost `{...}`)
//! into typed structs whose fields accept whatever JSON shape is close
//! enough. Missing fields take defaults; the caller decides what a default
//! means.

use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// The response could not be decoded into the expected shape.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("unparseable model response: {reason}")]
pub struct ResponseUnparseable {
    pub reason: String,
    /// First 200 characters of the raw response.
    pub excerpt: String,
}

/// Clause-level answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ClauseAssessment {
    #[serde(deserialize_with = "text")]
    pub plain_english_explanation: String,
    #[serde(deserialize_with = "optional_text")]
    pub risk_level: Option<String>,
    #[serde(deserialize_with = "text")]
    pub risk_reason: String,
    #[serde(deserialize_with = "text")]
    pub suggested_alternative_clause: String,
    #[serde(deserialize_with = "optional_text")]
    pub affected_party: Option<String>,
    #[serde(deserialize_with = "text")]
    pub negotiation_insight: String,
}

/// Document-level answer.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ContractAssessment {
    #[serde(deserialize_with = "text")]
    pub business_summary: String,
    #[serde(deserialize_with = "optional_text")]
    pub overall_risk: Option<String>,
    #[serde(alias = "top_3_business_risks", deserialize_with = "text_list")]
    pub top_risks: Vec<String>,
    #[serde(alias = "negotiation_recommendations", deserialize_with = "text_list")]
    pub negotiation_insights: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub missing_critical_clauses: Vec<String>,
    #[serde(deserialize_with = "score")]
    pub contract_completeness_score: Option<u8>,
    #[serde(deserialize_with = "text_list")]
    pub conflicting_clauses: Vec<String>,
    #[serde(deserialize_with = "text_list")]
    pub duplicate_or_ambiguous_terms: Vec<String>,
}

/// Decode a raw model response into `T`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, ResponseUnparseable> {
    let unparseable = |reason: String| ResponseUnparseable {
        reason,
        excerpt: excerpt(raw, 200).to_string(),
    };

    let cleaned = strip_code_fences(raw);
    if cleaned.is_empty() {
        return Err(unparseable("empty response".into()));
    }

    let direct_err = match object::<T>(cleaned) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}'))
        && start < end
        && let Ok(v) = object::<T>(&cleaned[start..=end])
    {
        return Ok(v);
    }

    Err(unparseable(direct_err))
}

/// Parse `s` as a JSON object and only then into `T`. Derived struct
/// impls would otherwise accept an array and fill fields by position.
fn object<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    match serde_json::from_str::<Value>(s).map_err(|e| e.to_string())? {
        v @ Value::Object(_) => T::deserialize(v).map_err(|e| e.to_string()),
        Value::Array(_) => Err("expected a JSON object, found an array".into()),
        _ => Err("expected a JSON object, found a scalar".into()),
    }
}

/// Remove a surrounding Markdown code fence (with or without a language
/// tag) or single backticks.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut s = raw.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // Drop the info string ("json", "JSON", ...), whether a newline or
        // the payload itself follows it.
        let tag = rest
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(rest.len());
        s = rest[tag..].strip_prefix('\n').unwrap_or(&rest[tag..]);
        s = s.trim_end();
        s = s.strip_suffix("```").unwrap_or(s).trim();
    } else if s.len() >= 2 && s.starts_with('`') && s.ends_with('`') {
        s = s[1..s.len() - 1].trim();
    }
    s
}

/// Longest prefix of `s` with at most `max_chars` characters.
pub fn excerpt(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

// ── Lenient field decoders ──

fn value_to_text(v: Value) -> Option<String> {
    match v {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Array(items) => {
            let parts: Vec<String> = items.into_iter().filter_map(value_to_text).collect();
            Some(parts.join(" "))
        }
        other => Some(other.to_string()),
    }
}

fn text<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    Ok(value_to_text(Value::deserialize(d)?).unwrap_or_default())
}

fn optional_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(value_to_text(Value::deserialize(d)?).filter(|s| !s.trim().is_empty()))
}

fn text_list<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let items = match Value::deserialize(d)? {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };
    Ok(items
        .into_iter()
        .filter_map(value_to_text)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

fn score<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u8>, D::Error> {
    let n = match Value::deserialize(d)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(n.filter(|n| n.is_finite())
        .map(|n| n.round().clamp(0.0, 100.0) as u8))
}
