//! Party anonymisation.
//!
//! Person and organisation names are replaced with neutral placeholders
//! (`PARTY_1`, `ORG_1`, ...) before any text reaches the model, so names,
//! nationalities or gender cues cannot colour the risk judgment. The
//! placeholder → original map travels with the report for consumers that
//! want to display real names again.
//!
//! Placeholders are assigned per category in order of decreasing name
//! length: "Acme Holdings Ltd" is substituted before "Acme Ltd" could ever
//! eat part of it. Substitution is whole-word only.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::{NoExpand, Regex};
use serde::de::Deserializer;
use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub const PERSON_PREFIX: &str = "PARTY";
pub const ORG_PREFIX: &str = "ORG";

/// Entity category reported by a recognizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityLabel {
    Person,
    Organization,
}

/// A recognised entity span (byte offsets into the input).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySpan {
    pub text: String,
    pub label: EntityLabel,
    pub start: usize,
    pub end: usize,
}

/// Named-entity recognition capability.
pub trait EntityRecognizer {
    fn recognize(&self, text: &str) -> Vec<EntitySpan>;
}

/// Recognizer that finds nothing. Used when entity recognition is
/// unavailable or switched off; anonymisation degrades to a no-op.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopRecognizer;

impl EntityRecognizer for NoopRecognizer {
    fn recognize(&self, _text: &str) -> Vec<EntitySpan> {
        Vec::new()
    }
}

static PERSON_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:Mr|Mrs|Ms|Miss|Mx|Dr|Prof)\.?[ \t]+(\p{Lu}[\p{L}'-]+(?:[ \t]+\p{Lu}[\p{L}'-]+){0,2})")
        .unwrap()
});
static ORG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b((?:\p{Lu}[\p{L}\p{N}&'.-]*[ \t]+){1,4}(?:Inc|Incorporated|Ltd|Limited|LLC|LLP|PLC|Corp|Corporation|GmbH|Company|Holdings|Group))\b",
    )
    .unwrap()
});

/// Leading words that start a capitalised run without being part of a name.
const LEADING_STOPWORDS: &[&str] = &[
    "The", "This", "That", "These", "Each", "Such", "Any", "All", "And", "Between", "By", "With",
    "Of", "For", "If", "Whereas", "Where",
];

/// Rule-based recognizer for contract text.
///
/// - Persons: names introduced by an honorific (`Mr`, `Ms`, `Dr`, ...)
/// - Organisations: up to four capitalised words ending in a corporate
///   suffix (`Ltd`, `Inc`, `LLC`, `GmbH`, ...)
///
/// Existing placeholders are never reported.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicRecognizer;

impl EntityRecognizer for HeuristicRecognizer {
    fn recognize(&self, text: &str) -> Vec<EntitySpan> {
        let mut spans = Vec::new();

        for caps in PERSON_RE.captures_iter(text) {
            if let Some(name) = caps.get(1) {
                push_span(&mut spans, text, name.start(), name.end(), EntityLabel::Person);
            }
        }

        for caps in ORG_RE.captures_iter(text) {
            let Some(m) = caps.get(1) else { continue };
            let mut start = m.start();
            let mut rest = m.as_str();
            while let Some((first, tail)) = rest.split_once(char::is_whitespace) {
                if !LEADING_STOPWORDS.contains(&first) {
                    break;
                }
                let tail = tail.trim_start();
                start += rest.len() - tail.len();
                rest = tail;
            }
            // A bare suffix ("the Company") is a defined term, not a name.
            if !rest.contains(char::is_whitespace) {
                continue;
            }
            push_span(&mut spans, text, start, m.end(), EntityLabel::Organization);
        }

        spans.sort_by_key(|s| s.start);
        spans
    }
}

fn push_span(spans: &mut Vec<EntitySpan>, text: &str, start: usize, end: usize, label: EntityLabel) {
    let surface = text[start..end].trim();
    if surface.is_empty() || is_placeholder_fragment(text, start, end) {
        return;
    }
    spans.push(EntitySpan {
        text: surface.to_string(),
        label,
        start,
        end,
    });
}

/// True when the span is (part of) an existing `PARTY_n` / `ORG_n` token.
fn is_placeholder_fragment(text: &str, start: usize, end: usize) -> bool {
    let surface = &text[start..end];
    surface.contains("PARTY_") || surface.contains("ORG_") || text[end..].starts_with('_')
}

/// One placeholder substitution.
#[derive(Debug, Clone)]
struct Substitution {
    placeholder: String,
    original: String,
    pattern: Option<Regex>,
}

impl Substitution {
    fn new(placeholder: String, original: String) -> Self {
        let pattern = match Regex::new(&word_bounded(&original)) {
            Ok(re) => Some(re),
            Err(e) => {
                warn!(entity = %original, error = %e, "entity pattern rejected; not substituted");
                None
            }
        };
        Self {
            placeholder,
            original,
            pattern,
        }
    }
}

/// `\b`-anchor an escaped literal, but only on edges that are word
/// characters (a trailing `\b` after "Inc." would never match).
fn word_bounded(literal: &str) -> String {
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let lead = if literal.chars().next().is_some_and(is_word) { r"\b" } else { "" };
    let trail = if literal.chars().last().is_some_and(is_word) { r"\b" } else { "" };
    format!("{lead}{}{trail}", regex::escape(literal))
}

/// Placeholder → original entity mapping, in assignment order.
///
/// Serialised as a JSON object (`{"PARTY_1": "Jane Doe", ...}`).
#[derive(Debug, Clone, Default)]
pub struct AnonymisationMap {
    entries: Vec<Substitution>,
    /// Indices into `entries`, longest original first across categories.
    apply_order: Vec<usize>,
}

impl AnonymisationMap {
    /// Build the map from de-duplicated per-category names. Each list is
    /// sorted by length descending (stable) before numbering.
    pub fn build(persons: Vec<String>, organizations: Vec<String>) -> Self {
        let mut entries = Vec::with_capacity(persons.len() + organizations.len());
        for (prefix, mut names) in [(PERSON_PREFIX, persons), (ORG_PREFIX, organizations)] {
            names.sort_by_key(|n| std::cmp::Reverse(n.chars().count()));
            for (i, name) in names.into_iter().enumerate() {
                entries.push(Substitution::new(format!("{prefix}_{}", i + 1), name));
            }
        }
        Self::from_entries(entries)
    }

    fn from_entries(entries: Vec<Substitution>) -> Self {
        let mut apply_order: Vec<usize> = (0..entries.len()).collect();
        apply_order.sort_by_key(|&i| std::cmp::Reverse(entries[i].original.chars().count()));
        Self {
            entries,
            apply_order,
        }
    }

    /// Replace every mapped entity in `text` with its placeholder.
    ///
    /// Applying the map to its own output changes nothing.
    pub fn apply(&self, text: &str) -> String {
        let mut out = text.to_string();
        for sub in self.apply_order.iter().map(|&i| &self.entries[i]) {
            if let Some(re) = &sub.pattern
                && re.is_match(&out)
            {
                out = re.replace_all(&out, NoExpand(&sub.placeholder)).into_owned();
            }
        }
        out
    }

    pub fn get(&self, placeholder: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|s| s.placeholder == placeholder)
            .map(|s| s.original.as_str())
    }

    /// `(placeholder, original)` pairs in assignment order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|s| (s.placeholder.as_str(), s.original.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl PartialEq for AnonymisationMap {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl Serialize for AnonymisationMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (placeholder, original) in self.iter() {
            map.serialize_entry(placeholder, original)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for AnonymisationMap {
    /// JSON objects carry no order, so assignment order is rebuilt from the
    /// placeholder names: persons by number, then organisations by number.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, String>::deserialize(deserializer)?;
        let mut pairs: Vec<(u8, usize, String, String)> = raw
            .into_iter()
            .map(|(placeholder, original)| {
                let (rank, n) = placeholder_rank(&placeholder);
                (rank, n, placeholder, original)
            })
            .collect();
        pairs.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        Ok(Self::from_entries(
            pairs
                .into_iter()
                .map(|(_, _, p, o)| Substitution::new(p, o))
                .collect(),
        ))
    }
}

fn placeholder_rank(placeholder: &str) -> (u8, usize) {
    let Some((prefix, n)) = placeholder.rsplit_once('_') else {
        return (2, 0);
    };
    let n = n.parse().unwrap_or(usize::MAX);
    match prefix {
        PERSON_PREFIX => (0, n),
        ORG_PREFIX => (1, n),
        _ => (2, n),
    }
}

/// Result of anonymising one document.
#[derive(Debug, Clone)]
pub struct Anonymised {
    pub text: String,
    pub map: AnonymisationMap,
}

/// Replaces recognised persons and organisations with placeholders.
pub struct Anonymiser {
    recognizer: Box<dyn EntityRecognizer + Send + Sync>,
}

impl Default for Anonymiser {
    fn default() -> Self {
        Self::new(HeuristicRecognizer)
    }
}

impl Anonymiser {
    pub fn new(recognizer: impl EntityRecognizer + Send + Sync + 'static) -> Self {
        Self {
            recognizer: Box::new(recognizer),
        }
    }

    /// An anonymiser that recognises nothing.
    pub fn disabled() -> Self {
        Self::new(NoopRecognizer)
    }

    /// Anonymise `text`, returning the substituted text and the map.
    pub fn anonymise(&self, text: &str) -> Anonymised {
        // Phase 1: collect every span before deriving anything from them.
        let spans = self.recognizer.recognize(text);

        // Phase 2: ordered, de-duplicated names per category.
        let persons = distinct_names(&spans, EntityLabel::Person);
        let organizations = distinct_names(&spans, EntityLabel::Organization);
        debug!(
            persons = persons.len(),
            organizations = organizations.len(),
            "entities recognised"
        );

        let map = AnonymisationMap::build(persons, organizations);
        Anonymised {
            text: map.apply(text),
            map,
        }
    }
}

fn distinct_names(spans: &[EntitySpan], label: EntityLabel) -> Vec<String> {
    let mut seen = HashSet::new();
    spans
        .iter()
        .filter(|s| s.label == label)
        .filter(|s| seen.insert(s.text.as_str()))
        .map(|s| s.text.clone())
        .collect()
}
