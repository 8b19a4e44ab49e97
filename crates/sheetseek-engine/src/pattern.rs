use regex::{Regex, RegexBuilder};

use crate::normalize::{
    contains_digit, extract_numeric_tokens, normalize_numeric_string, strip_leading_zeros,
};

#[derive(Debug, Clone)]
enum Mode {
    Regex(Regex),
    /// The regex failed to compile; nothing matches.
    InvalidRegex,
    Literal { needle: String, case_sensitive: bool },
}

/// Decides whether one cell's text matches the active query.
///
/// Strategies are tried in order, first success wins:
/// 1. regex search, or literal substring containment;
/// 2. numeric: when both sides contain a digit, the normalized query is a
///    substring of the normalized cell (`38 960` finds `38960,00`);
/// 3. URL tokens: when the cell looks like a link, any digit run in it equals
///    or contains the query's digits (`.../order/038960` finds `38960`).
#[derive(Debug, Clone)]
pub struct QueryMatcher {
    mode: Mode,
    /// Query in numeric-normalized form; empty when the query has no digit.
    numeric_query: String,
    /// Query digits with leading zeros stripped, for URL token matching.
    token_query: String,
}

impl QueryMatcher {
    /// Build a matcher. A malformed regex is logged once and then never matches.
    pub fn new(query: &str, regex: bool, case_sensitive: bool) -> Self {
        let mode = if regex {
            match RegexBuilder::new(query)
                .case_insensitive(!case_sensitive)
                .build()
            {
                Ok(re) => Mode::Regex(re),
                Err(err) => {
                    log::warn!("invalid search pattern {query:?}, nothing will match: {err}");
                    Mode::InvalidRegex
                }
            }
        } else {
            let needle = if case_sensitive {
                query.to_string()
            } else {
                query.to_lowercase()
            };
            Mode::Literal {
                needle,
                case_sensitive,
            }
        };

        let (numeric_query, token_query) = if contains_digit(query) {
            let digits: String = query.chars().filter(char::is_ascii_digit).collect();
            (normalize_numeric_string(query), strip_leading_zeros(&digits))
        } else {
            (String::new(), String::new())
        };

        Self {
            mode,
            numeric_query,
            token_query,
        }
    }

    pub fn is_match(&self, cell_text: &str) -> bool {
        match &self.mode {
            Mode::InvalidRegex => return false,
            Mode::Regex(re) => {
                if re.is_match(cell_text) {
                    return true;
                }
            }
            Mode::Literal {
                needle,
                case_sensitive,
            } => {
                let hit = if *case_sensitive {
                    cell_text.contains(needle.as_str())
                } else {
                    cell_text.to_lowercase().contains(needle.as_str())
                };
                if hit {
                    return true;
                }
            }
        }

        self.numeric_match(cell_text) || self.url_token_match(cell_text)
    }

    fn numeric_match(&self, cell_text: &str) -> bool {
        if self.numeric_query.is_empty() || !contains_digit(cell_text) {
            return false;
        }
        normalize_numeric_string(cell_text).contains(self.numeric_query.as_str())
    }

    fn url_token_match(&self, cell_text: &str) -> bool {
        if self.token_query.is_empty() || !looks_like_url(cell_text) {
            return false;
        }
        extract_numeric_tokens(cell_text)
            .iter()
            .any(|token| token.contains(self.token_query.as_str()))
    }
}

fn looks_like_url(text: &str) -> bool {
    let lower = text.to_ascii_lowercase();
    lower.contains("http://") || lower.contains("https://") || lower.contains("www.")
}
