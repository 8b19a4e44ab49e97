use serde::{Deserialize, Serialize};

use crate::normalize::normalize_header_name;

/// One compiled ignore pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternKind {
    /// `*` (or `**`): any non-empty candidate.
    Any,
    /// `*text*` or bare `text`.
    Contains(String),
    /// `text*`
    StartsWith(String),
    /// `*text`
    EndsWith(String),
}

impl PatternKind {
    fn compile(pattern: &str) -> Self {
        let (body, leading) = match pattern.strip_prefix('*') {
            Some(rest) => (rest, true),
            None => (pattern, false),
        };
        let (body, trailing) = match body.strip_suffix('*') {
            Some(rest) => (rest, true),
            None => (body, false),
        };

        if body.is_empty() {
            return PatternKind::Any;
        }
        match (leading, trailing) {
            (true, false) => PatternKind::EndsWith(body.to_string()),
            (false, true) => PatternKind::StartsWith(body.to_string()),
            _ => PatternKind::Contains(body.to_string()),
        }
    }

    fn matches(&self, candidate: &str) -> bool {
        match self {
            PatternKind::Any => true,
            PatternKind::Contains(text) => candidate.contains(text.as_str()),
            PatternKind::StartsWith(text) => candidate.starts_with(text.as_str()),
            PatternKind::EndsWith(text) => candidate.ends_with(text.as_str()),
        }
    }
}

/// Ordered set of lowercase glob-like exclusion patterns.
///
/// Supported forms: `*text*` (contains), `*text` (ends with), `text*` (starts
/// with) and bare `text`, which also means "contains". An empty rule set
/// never matches, and neither does an empty candidate.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct IgnoreRules {
    patterns: Vec<String>,
    compiled: Vec<PatternKind>,
}

impl IgnoreRules {
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let patterns: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_lowercase())
            .filter(|p| !p.is_empty())
            .collect();
        let compiled = patterns.iter().map(|p| PatternKind::compile(p)).collect();
        Self { patterns, compiled }
    }

    /// Parse free-form user input: tokens separated by `,`, `;` or newlines.
    pub fn parse(text: &str) -> Self {
        Self::new(text.split([',', ';', '\n']))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Match a candidate after trimming and lowercasing it.
    pub fn matches(&self, candidate: &str) -> bool {
        if self.compiled.is_empty() {
            return false;
        }
        let candidate = candidate.trim().to_lowercase();
        self.matches_folded(&candidate)
    }

    /// Match a column label, both as typed and canonicalized, so that
    /// `Temp_Column` is caught by `temp column` as well as by `*_column`.
    pub fn matches_header(&self, header: &str) -> bool {
        if self.compiled.is_empty() {
            return false;
        }
        self.matches_folded(&normalize_header_name(header))
            || self.matches_folded(&header.trim().to_lowercase())
    }

    /// Match a cell value.
    pub fn matches_value(&self, value: &str) -> bool {
        self.matches(value)
    }

    fn matches_folded(&self, candidate: &str) -> bool {
        if candidate.is_empty() {
            return false;
        }
        self.compiled.iter().any(|p| p.matches(candidate))
    }
}

impl From<Vec<String>> for IgnoreRules {
    fn from(patterns: Vec<String>) -> Self {
        Self::new(patterns)
    }
}

impl From<IgnoreRules> for Vec<String> {
    fn from(rules: IgnoreRules) -> Self {
        rules.patterns
    }
}
