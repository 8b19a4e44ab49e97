use serde::{Deserialize, Serialize};

use crate::header::ResolvedHeader;
use crate::ignore::IgnoreRules;
use crate::normalize::normalize_header_name;
use crate::vocab::Vocabulary;

/// Which column(s) a scan looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum ColumnQuery {
    /// Every column not excluded by the ignore rules.
    All,
    /// Every column whose normalized header equals the normalized name.
    Named(String),
    /// The canonical order-number column, or nothing.
    #[default]
    Strict,
}

impl ColumnQuery {
    /// Interpret user input: blank means strict mode, an "all columns" alias
    /// (`all`, `wszystkie`, `*`) means every column, anything else is a name.
    pub fn parse(input: Option<&str>, vocabulary: &Vocabulary) -> Self {
        match input.map(str::trim) {
            None | Some("") => ColumnQuery::Strict,
            Some(name) if vocabulary.is_all_columns_alias(name) => ColumnQuery::All,
            Some(name) => ColumnQuery::Named(name.to_string()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        ColumnQuery::Named(name.into())
    }

    /// Whether a candidate header row contains what this query is looking for.
    pub fn header_has_target(&self, labels: &[String], vocabulary: &Vocabulary) -> bool {
        match self {
            ColumnQuery::All => true,
            ColumnQuery::Named(name) => {
                let wanted = normalize_header_name(name);
                !wanted.is_empty() && labels.iter().any(|label| *label == wanted)
            }
            ColumnQuery::Strict => labels
                .iter()
                .any(|label| vocabulary.is_order_number_header(label)),
        }
    }
}

/// Every column index whose label equals `name` once normalized, ascending,
/// minus the columns whose label matches `ignore`.
///
/// ```
/// use sheetseek_engine::{find_all_column_indices_by_name, IgnoreRules};
///
/// let labels: Vec<String> = ["zlecenie", "stawka", "zlecenie", "uwagi", "zlecenie"]
///     .iter()
///     .map(|s| s.to_string())
///     .collect();
/// let cols = find_all_column_indices_by_name(&labels, "Zlecenie", &IgnoreRules::default());
/// assert_eq!(cols, vec![0, 2, 4]);
/// ```
pub fn find_all_column_indices_by_name(
    labels: &[String],
    name: &str,
    ignore: &IgnoreRules,
) -> Vec<usize> {
    let wanted = normalize_header_name(name);
    if wanted.is_empty() {
        return Vec::new();
    }
    labels
        .iter()
        .enumerate()
        .filter(|(_, label)| normalize_header_name(label) == wanted)
        .filter(|(_, label)| !ignore.matches_header(label))
        .map(|(idx, _)| idx)
        .collect()
}

/// Maps a [`ColumnQuery`] onto physical column indices of one sheet.
#[derive(Debug, Clone, Copy)]
pub struct ColumnResolver<'a> {
    vocabulary: &'a Vocabulary,
    ignore: &'a IgnoreRules,
}

impl<'a> ColumnResolver<'a> {
    pub fn new(vocabulary: &'a Vocabulary, ignore: &'a IgnoreRules) -> Self {
        Self { vocabulary, ignore }
    }

    /// Resolve `query` against `header`. `grid_width` is the widest row of the
    /// sheet; header-less sheets expose every column up to it.
    pub fn resolve(
        &self,
        header: &ResolvedHeader,
        query: &ColumnQuery,
        grid_width: usize,
    ) -> Vec<usize> {
        if !header.has_header() {
            return match query {
                ColumnQuery::All | ColumnQuery::Named(_) => (0..grid_width).collect(),
                ColumnQuery::Strict => Vec::new(),
            };
        }

        let labels = header.labels();
        match query {
            ColumnQuery::All => {
                let width = grid_width.max(labels.len());
                (0..width)
                    .filter(|col| !self.ignore.matches_header(header.label(*col)))
                    .collect()
            }
            ColumnQuery::Named(name) => find_all_column_indices_by_name(labels, name, self.ignore),
            ColumnQuery::Strict => labels
                .iter()
                .enumerate()
                .filter(|(_, label)| self.vocabulary.is_order_number_header(label))
                .filter(|(_, label)| !self.ignore.matches_header(label))
                .map(|(idx, _)| idx)
                .collect(),
        }
    }

    /// First column whose label is a rate synonym.
    ///
    /// The target's ignore rules do not apply here; `blacklist`, when given,
    /// does.
    pub fn rate_column(
        &self,
        header: &ResolvedHeader,
        blacklist: Option<&IgnoreRules>,
    ) -> Option<usize> {
        header.labels().iter().position(|label| {
            self.vocabulary.is_rate_header(label)
                && !blacklist.is_some_and(|rules| rules.matches_header(label))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::HeaderSpec;
    use pretty_assertions::assert_eq;
    use sheetseek_model::Grid;

    fn header_of(labels: &[&str]) -> ResolvedHeader {
        let grid = Grid::from_rows(vec![labels.to_vec()]);
        ResolvedHeader::from_spec(&grid, &HeaderSpec::default())
    }

    #[test]
    fn parse_column_query() {
        let vocab = Vocabulary::default();
        assert_eq!(ColumnQuery::parse(None, &vocab), ColumnQuery::Strict);
        assert_eq!(ColumnQuery::parse(Some("  "), &vocab), ColumnQuery::Strict);
        assert_eq!(ColumnQuery::parse(Some("ALL"), &vocab), ColumnQuery::All);
        assert_eq!(ColumnQuery::parse(Some("Wszystkie"), &vocab), ColumnQuery::All);
        assert_eq!(ColumnQuery::parse(Some("*"), &vocab), ColumnQuery::All);
        assert_eq!(
            ColumnQuery::parse(Some(" Zlecenie "), &vocab),
            ColumnQuery::named("Zlecenie")
        );
    }

    #[test]
    fn duplicate_named_columns_all_resolve() {
        let vocab = Vocabulary::default();
        let ignore = IgnoreRules::default();
        let resolver = ColumnResolver::new(&vocab, &ignore);
        let header = header_of(&["Zlecenie", "Stawka", "Zlecenie", "Uwagi", "zlecenie"]);
        assert_eq!(
            resolver.resolve(&header, &ColumnQuery::named("Zlecenie"), 5),
            vec![0, 2, 4]
        );
    }

    #[test]
    fn ignored_columns_drop_out() {
        let vocab = Vocabulary::default();
        let ignore = IgnoreRules::parse("*old");
        let resolver = ColumnResolver::new(&vocab, &ignore);
        let header = header_of(&["X", "X_old"]);
        assert_eq!(resolver.resolve(&header, &ColumnQuery::All, 2), vec![0]);

        let header = header_of(&["Numer", "Numer_old"]);
        assert!(resolver
            .resolve(&header_of(&["Numer_old"]), &ColumnQuery::named("Numer_old"), 1)
            .is_empty());
        assert_eq!(resolver.resolve(&header, &ColumnQuery::named("numer"), 2), vec![0]);
    }

    #[test]
    fn strict_mode_uses_order_number_synonyms() {
        let vocab = Vocabulary::default();
        let ignore = IgnoreRules::default();
        let resolver = ColumnResolver::new(&vocab, &ignore);
        let header = header_of(&["Data", "Nr_Zlecenia", "Stawka"]);
        assert_eq!(resolver.resolve(&header, &ColumnQuery::Strict, 3), vec![1]);
        assert!(resolver
            .resolve(&header_of(&["Data", "Kwota"]), &ColumnQuery::Strict, 2)
            .is_empty());
    }

    #[test]
    fn strict_mode_with_ignored_sole_match_yields_nothing() {
        let vocab = Vocabulary::default();
        let ignore = IgnoreRules::parse("zlecenie");
        let resolver = ColumnResolver::new(&vocab, &ignore);
        let header = header_of(&["Zlecenie", "Stawka"]);
        assert!(resolver.resolve(&header, &ColumnQuery::Strict, 2).is_empty());
    }

    #[test]
    fn headerless_sheet_exposes_every_column_except_in_strict_mode() {
        let vocab = Vocabulary::default();
        let ignore = IgnoreRules::parse("*");
        let resolver = ColumnResolver::new(&vocab, &ignore);
        let header = ResolvedHeader::none();
        assert_eq!(resolver.resolve(&header, &ColumnQuery::All, 3), vec![0, 1, 2]);
        assert_eq!(
            resolver.resolve(&header, &ColumnQuery::named("x"), 2),
            vec![0, 1]
        );
        assert!(resolver.resolve(&header, &ColumnQuery::Strict, 3).is_empty());
    }

    #[test]
    fn rate_column_ignores_target_rules_but_honors_blacklist() {
        let vocab = Vocabulary::default();
        let ignore = IgnoreRules::parse("stawka");
        let resolver = ColumnResolver::new(&vocab, &ignore);
        let header = header_of(&["Zlecenie", "Stawka", "Cena"]);
        assert_eq!(resolver.rate_column(&header, None), Some(1));
        let blacklist = IgnoreRules::parse("stawka");
        assert_eq!(resolver.rate_column(&header, Some(&blacklist)), Some(2));
        assert_eq!(resolver.rate_column(&header_of(&["A", "B"]), None), None);
    }

    #[test]
    fn header_target_checks() {
        let vocab = Vocabulary::default();
        let labels = vec!["numer zlecenia".to_string(), "stawka".to_string()];
        assert!(ColumnQuery::Strict.header_has_target(&labels, &vocab));
        assert!(ColumnQuery::named("Stawka").header_has_target(&labels, &vocab));
        assert!(!ColumnQuery::named("Kwota").header_has_target(&labels, &vocab));
        assert!(ColumnQuery::All.header_has_target(&[], &vocab));
    }
}
