use pretty_assertions::assert_eq;

use sheetseek_engine::source::SourceCall;
use sheetseek_engine::{
    find_duplicates, search, CancellationToken, ColumnQuery, DuplicateOptions, Grid,
    IgnoreRules, MatchRecord, MemorySource, ScanIssue, ScanState, ScanTarget, SearchOptions,
    SpreadsheetInfo, Step,
};

fn zlecenia() -> SpreadsheetInfo {
    SpreadsheetInfo::new("s1", "Zlecenia 2025")
}

fn archiwum() -> SpreadsheetInfo {
    SpreadsheetInfo::new("s2", "Archiwum")
}

fn drain<I: Iterator<Item = MatchRecord>>(records: I) -> Vec<(String, String, String)> {
    records
        .map(|r| (r.sheet_name.clone(), r.cell_address(), r.companion_value))
        .collect()
}

/// Three sheets with two matching order numbers each.
fn three_sheets() -> MemorySource {
    let mut src = MemorySource::new();
    for (sheet, base) in [("Styczeń", 100), ("Luty", 200), ("Marzec", 300)] {
        src = src.with_sheet(
            zlecenia(),
            sheet,
            Grid::from_rows(vec![
                vec!["Numer zlecenia".to_string(), "Stawka".to_string()],
                vec![format!("38960/{base}"), format!("{base},00")],
                vec!["inne".to_string(), "0".to_string()],
                vec![format!("38960/{}", base + 1), format!("{},00", base + 1)],
            ]),
        );
    }
    src
}

#[test]
fn basic_search_reports_rate_as_companion() {
    let src = MemorySource::new().with_sheet(
        zlecenia(),
        "Arkusz1",
        Grid::from_rows(vec![vec!["Numer zlecenia", "Stawka"], vec!["38960", "280.00"]]),
    );
    let records: Vec<_> = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions::default(),
        CancellationToken::new(),
    )
    .collect();

    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert_eq!(record.spreadsheet_name, "Zlecenia 2025");
    assert_eq!(record.cell_address(), "A2");
    assert_eq!(record.column_label, "numer zlecenia");
    assert_eq!(record.matched_value, "38960");
    assert_eq!(record.companion_value, "280.00");
}

#[test]
fn order_number_inside_url_is_found() {
    let src = MemorySource::new().with_sheet(
        zlecenia(),
        "Linki",
        Grid::from_rows(vec![
            vec!["Link", "Stawka"],
            vec!["https://x.com/order/38960", "150"],
            vec!["https://x.com/order/38961", "160"],
        ]),
    );
    let records: Vec<_> = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions {
            column: ColumnQuery::All,
            ..SearchOptions::default()
        },
        CancellationToken::new(),
    )
    .collect();

    assert_eq!(
        drain(records.into_iter()),
        vec![("Linki".to_string(), "A2".to_string(), "150".to_string())]
    );
}

#[test]
fn ignore_rule_overrides_matching_header() {
    let src = MemorySource::new().with_sheet(
        zlecenia(),
        "Arkusz1",
        Grid::from_rows(vec![
            vec!["Numer_old", "Numer_new", "Stawka"],
            vec!["38960", "38960", "10"],
        ]),
    );
    let ignore = IgnoreRules::parse("*old");

    let named: Vec<_> = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions {
            column: ColumnQuery::named("Numer_old"),
            ignore: ignore.clone(),
            ..SearchOptions::default()
        },
        CancellationToken::new(),
    )
    .collect();
    assert!(named.is_empty());

    let all: Vec<_> = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions {
            column: ColumnQuery::All,
            ignore,
            ..SearchOptions::default()
        },
        CancellationToken::new(),
    )
    .map(|r| r.cell_address())
    .collect();
    assert_eq!(all, vec!["B2"]);
}

#[test]
fn duplicates_in_order_column() {
    let src = MemorySource::new().with_sheet(
        zlecenia(),
        "Arkusz1",
        Grid::from_rows(vec![
            vec!["Numer zlecenia", "Stawka"],
            vec!["12345", "1"],
            vec!["12345", "2"],
            vec!["67890", "3"],
            vec!["12345", "4"],
        ]),
    );
    let groups: Vec<_> = find_duplicates(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        ColumnQuery::Strict,
        DuplicateOptions::default(),
        CancellationToken::new(),
    )
    .collect();

    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].normalized_value, "12345");
    assert_eq!(groups[0].row_numbers, vec![2, 3, 5]);
    assert_eq!(groups[0].count(), 3);
}

#[test]
fn repeated_header_columns_are_scanned_row_major() {
    let src = MemorySource::new().with_sheet(
        zlecenia(),
        "Arkusz1",
        Grid::from_rows(vec![
            vec!["Zlecenie", "Stawka", "Zlecenie", "Uwagi", "Zlecenie"],
            vec!["1", "5", "38960", "", "2"],
            vec!["38960", "6", "3", "", "38960"],
        ]),
    );
    let cells: Vec<_> = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions {
            column: ColumnQuery::named("zlecenie"),
            ..SearchOptions::default()
        },
        CancellationToken::new(),
    )
    .map(|r| (r.cell_address(), r.companion_value))
    .collect();

    assert_eq!(
        cells,
        vec![
            ("C2".to_string(), "5".to_string()),
            ("A3".to_string(), "6".to_string()),
            ("E3".to_string(), "6".to_string()),
        ]
    );
}

#[test]
fn all_spreadsheets_are_walked_in_listing_order() {
    let src = MemorySource::new()
        .with_sheet(
            zlecenia(),
            "Arkusz1",
            Grid::from_rows(vec![vec!["Nr zlecenia", "Cena"], vec!["38960", "1"]]),
        )
        .with_sheet(
            archiwum(),
            "2024",
            Grid::from_rows(vec![vec!["Nr zlecenia", "Cena"], vec!["38 960", "2"]]),
        );
    let records: Vec<_> = search(
        &src,
        ScanTarget::AllSpreadsheets,
        "38960",
        SearchOptions::default(),
        CancellationToken::new(),
    )
    .map(|r| (r.spreadsheet_name, r.matched_value))
    .collect();

    assert_eq!(
        records,
        vec![
            ("Zlecenia 2025".to_string(), "38960".to_string()),
            ("Archiwum".to_string(), "38 960".to_string()),
        ]
    );
    assert_eq!(src.calls()[0], SourceCall::ListSpreadsheets);
}

#[test]
fn cancellation_yields_a_prefix_and_stops_calling_the_source() {
    let full = drain(search(
        &three_sheets(),
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions::default(),
        CancellationToken::new(),
    ));
    assert_eq!(full.len(), 6);

    let src = three_sheets();
    let token = CancellationToken::new();
    let mut cursor = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions::default(),
        token.clone(),
    );

    let mut seen = Vec::new();
    for _ in 0..3 {
        match cursor.try_next() {
            Step::Item(record) => seen.push(record),
            Step::End(state) => panic!("scan ended early with {state:?}"),
        }
    }
    let calls_before = src.calls().len();
    token.cancel();

    assert!(matches!(cursor.try_next(), Step::End(ScanState::Stopped)));
    assert!(matches!(cursor.try_next(), Step::End(ScanState::Stopped)));
    assert_eq!(cursor.state(), ScanState::Stopped);
    assert_eq!(src.calls().len(), calls_before);
    assert_eq!(drain(seen.into_iter()), full[..3].to_vec());
}

#[test]
fn one_failing_sheet_does_not_abort_the_scan() {
    let src = three_sheets().fail_sheet("s1", "Luty");
    let mut cursor = search(
        &src,
        ScanTarget::Spreadsheet(zlecenia()),
        "38960",
        SearchOptions::default(),
        CancellationToken::new(),
    );

    let mut sheets = Vec::new();
    let end = loop {
        match cursor.try_next() {
            Step::Item(record) => sheets.push(record.sheet_name),
            Step::End(state) => break state,
        }
    };

    assert_eq!(end, ScanState::CompletedWithErrors);
    assert_eq!(sheets, vec!["Styczeń", "Styczeń", "Marzec", "Marzec"]);
    assert!(matches!(
        cursor.issues(),
        [ScanIssue::Sheet { sheet_name, .. }] if sheet_name == "Luty"
    ));
}

#[test]
fn failing_spreadsheet_is_skipped_in_a_multi_spreadsheet_scan() {
    let src = MemorySource::new()
        .with_sheet(
            zlecenia(),
            "Arkusz1",
            Grid::from_rows(vec![vec!["Nr zlecenia", "Stawka"], vec!["38960", "1"]]),
        )
        .with_sheet(
            archiwum(),
            "2024",
            Grid::from_rows(vec![vec!["Nr zlecenia", "Stawka"], vec!["38960", "1"]]),
        )
        .fail_spreadsheet("s1");
    let mut cursor = search(
        &src,
        ScanTarget::Spreadsheets(vec![zlecenia(), archiwum()]),
        "38960",
        SearchOptions::default(),
        CancellationToken::new(),
    );

    let names: Vec<_> = cursor.by_ref().map(|r| r.spreadsheet_name).collect();
    assert_eq!(names, vec!["Archiwum"]);
    assert_eq!(cursor.state(), ScanState::CompletedWithErrors);
    assert_eq!(cursor.issues().len(), 1);
}
