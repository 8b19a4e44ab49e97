use serde::{Deserialize, Serialize};

use crate::normalize::normalize_header_name;

/// Column-name vocabulary used by the resolvers.
///
/// Both sides of every lookup are compared in [`normalize_header_name`] form,
/// so `Nr_Zlecenia` in a sheet matches a `nr zlecenia` synonym and a
/// hand-built `"Stawka"` entry matches a `stawka` header. Loaded from JSON
/// with any missing list falling back to the built-in one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Vocabulary {
    /// Headers that identify the canonical "order number" column in strict mode.
    pub order_number_headers: Vec<String>,
    /// Headers that identify the companion ("rate") column.
    pub rate_headers: Vec<String>,
    /// Neighbouring columns whose values are never used as a positional companion.
    pub companion_blacklist: Vec<String>,
    /// Column queries that mean "every column".
    pub all_columns_aliases: Vec<String>,
}

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self {
            order_number_headers: owned(&[
                "numer zlecenia",
                "nr zlecenia",
                "nr. zlecenia",
                "zlecenie",
                "numer zamówienia",
                "nr zamówienia",
                "order number",
                "order no",
            ]),
            rate_headers: owned(&[
                "stawka",
                "stawka netto",
                "cena",
                "kwota",
                "rate",
                "price",
            ]),
            companion_blacklist: owned(&[
                "transport",
                "uwagi",
                "komentarz",
                "opis",
                "notes",
                "comment",
            ]),
            all_columns_aliases: owned(&["all", "wszystkie", "*"]),
        }
    }
}

impl Vocabulary {
    /// Canonicalize every entry; call after deserializing user-supplied lists.
    pub fn normalized(mut self) -> Self {
        for list in [
            &mut self.order_number_headers,
            &mut self.rate_headers,
            &mut self.companion_blacklist,
            &mut self.all_columns_aliases,
        ] {
            for entry in list.iter_mut() {
                *entry = normalize_header_name(entry);
            }
            list.retain(|entry| !entry.is_empty());
        }
        self
    }

    pub fn is_order_number_header(&self, header: &str) -> bool {
        contains_header(&self.order_number_headers, header)
    }

    pub fn is_rate_header(&self, header: &str) -> bool {
        contains_header(&self.rate_headers, header)
    }

    pub fn is_blacklisted_companion(&self, header: &str) -> bool {
        contains_header(&self.companion_blacklist, header)
    }

    pub fn is_all_columns_alias(&self, query: &str) -> bool {
        contains_header(&self.all_columns_aliases, query)
    }
}

fn contains_header(list: &[String], header: &str) -> bool {
    let header = normalize_header_name(header);
    !header.is_empty()
        && list
            .iter()
            .any(|entry| *entry == header || normalize_header_name(entry) == header)
}
