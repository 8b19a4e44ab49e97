//! Pure normalization helpers shared by every stage of a scan.
//!
//! All functions here are total, deterministic and idempotent:
//! `f(f(x)) == f(x)` for every input.

use std::borrow::Cow;

/// Canonical form of a column label.
///
/// `_` becomes a space, whitespace runs collapse to one space, the result is
/// trimmed and lowercased, so `Numer_Zlecenia`, `Numer  zlecenia` and
/// `NUMER ZLECENIA` all read `numer zlecenia`.
pub fn normalize_header_name(raw: &str) -> String {
    let spaced = raw.replace('_', " ");
    let mut out = String::with_capacity(spaced.len());
    for word in spaced.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out.to_lowercase()
}

/// Canonical form of a number-like string, for locale-tolerant comparison.
///
/// Grouping spaces (plain, NBSP, narrow NBSP) are removed and the decimal
/// separator is unified to `.`:
/// - with both `,` and `.` present, whichever comes last is the decimal separator;
/// - with only `,` present, it is a grouping separator when every comma is
///   followed by exactly three digits (`38,960`), otherwise a decimal one (`280,50`).
///
/// Everything except ASCII digits, `.` and `-` is then dropped; digits are
/// never removed, so `280.00` stays `280.00`. Returns `""` when no digit
/// remains.
pub fn normalize_numeric_string(raw: &str) -> String {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{00A0}' | '\u{202F}'))
        .collect();
    let resolved = resolve_decimal_separator(&compact);

    let out: String = resolved
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '.' | '-'))
        .collect();

    if !contains_digit(&out) {
        return String::new();
    }
    out
}

fn resolve_decimal_separator(s: &str) -> Cow<'_, str> {
    match (s.rfind(','), s.rfind('.')) {
        (None, _) => Cow::Borrowed(s),
        (Some(comma), Some(dot)) if comma > dot => {
            Cow::Owned(s.replace('.', "").replace(',', "."))
        }
        (Some(_), Some(_)) => Cow::Owned(s.replace(',', "")),
        (Some(_), None) if commas_are_grouping(s) => Cow::Owned(s.replace(',', "")),
        (Some(_), None) => Cow::Owned(s.replace(',', ".")),
    }
}

fn commas_are_grouping(s: &str) -> bool {
    let bytes = s.as_bytes();
    s.match_indices(',').all(|(idx, _)| {
        let after_digit = idx > 0 && bytes[idx - 1].is_ascii_digit();
        let group = bytes[idx + 1..]
            .iter()
            .take_while(|b| b.is_ascii_digit())
            .count();
        after_digit && group == 3
    })
}

fn trim_zero_fraction(s: &mut String) {
    if s.matches('.').count() != 1 {
        return;
    }
    let Some(dot) = s.find('.') else {
        return;
    };
    let fraction = &s[dot + 1..];
    if !fraction.bytes().all(|b| b.is_ascii_digit()) {
        return;
    }
    let keep = fraction.trim_end_matches('0').len();
    if keep == 0 {
        s.truncate(dot);
    } else {
        s.truncate(dot + 1 + keep);
    }
}

/// Every maximal run of ASCII digits, with leading zeros stripped.
///
/// Used to pull an order number out of free text such as
/// `https://shop.example/order/038960` (yields `["038960"]` → `["38960"]`).
pub fn extract_numeric_tokens(raw: &str) -> Vec<String> {
    raw.split(|c: char| !c.is_ascii_digit())
        .filter(|run| !run.is_empty())
        .map(strip_leading_zeros)
        .collect()
}

pub(crate) fn strip_leading_zeros(digits: &str) -> String {
    let stripped = digits.trim_start_matches('0');
    if stripped.is_empty() && !digits.is_empty() {
        "0".to_string()
    } else {
        stripped.to_string()
    }
}

/// Key used to decide whether two cell values are "the same" entry.
///
/// Numeric-looking text (digits with grouping/decimal separators and an
/// optional sign) compares by [`normalize_numeric_string`] with trailing
/// fraction zeros dropped, so `280,00` and `280` are the same entry; anything
/// else by its trimmed, lowercased text.
pub fn comparison_key(raw: &str) -> String {
    let trimmed = raw.trim();
    if looks_numeric(trimmed) {
        let mut key = normalize_numeric_string(trimmed);
        trim_zero_fraction(&mut key);
        if contains_digit(&key) {
            key
        } else {
            String::new()
        }
    } else {
        trimmed.to_lowercase()
    }
}

/// True if `s` is a number written with optional grouping and a sign.
pub fn looks_numeric(s: &str) -> bool {
    contains_digit(s)
        && s.chars().all(|c| {
            c.is_ascii_digit() || matches!(c, ' ' | '\u{00A0}' | '\u{202F}' | ',' | '.' | '-' | '+')
        })
}

/// True if `s` has at least one ASCII digit.
pub fn contains_digit(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit())
}
