use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use sheetseek_engine::{
    check_values, find_duplicates, parse_column_identifier, search, CancellationToken, CheckMode,
    ChecklistOptions, ColumnQuery, DuplicateOptions, HeaderSpec, IgnoreRules, ScanIssue,
    ScanState, ScanTarget, SearchOptions, SheetSource, SpreadsheetInfo, Step, Vocabulary,
};
use sheetseek_model::{read_csv_grid, CsvOptions, CsvTextEncoding};

use crate::CsvDirSource;

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum EncodingArg {
    /// UTF-8, falling back to Windows-1250 for invalid fields.
    Auto,
    Utf8,
    Windows1250,
    Windows1252,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ModeArg {
    Exact,
    Substring,
}

#[derive(Debug, Parser)]
#[command(name = "sheetseek")]
#[command(about = "Search, de-duplicate and cross-check order numbers across CSV spreadsheets.")]
pub struct Cli {
    /// Directory holding the spreadsheets: sub-directories of CSV sheets and
    /// single-sheet CSV files.
    #[arg(long, global = true, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// JSON file overriding the built-in column vocabulary.
    #[arg(long, global = true, value_name = "FILE")]
    vocabulary: Option<PathBuf>,

    /// CSV field delimiter.
    #[arg(long, global = true, default_value_t = ',')]
    delimiter: char,

    /// CSV text encoding.
    #[arg(long, global = true, value_enum, default_value_t = EncodingArg::Auto)]
    encoding: EncodingArg,

    /// Output format.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List spreadsheets and their sheets.
    List,
    /// Find cells matching a query.
    Search(SearchArgs),
    /// Report values that repeat within a column.
    Duplicates(DuplicateArgs),
    /// Check which values of a list occur in a spreadsheet.
    Check(CheckArgs),
}

#[derive(Debug, Args)]
struct ScopeArgs {
    /// Spreadsheet id to scan (repeatable). Default: every spreadsheet.
    #[arg(long = "spreadsheet", value_name = "ID")]
    spreadsheets: Vec<String>,

    /// Scan only this sheet. Requires exactly one `--spreadsheet`.
    #[arg(long, value_name = "NAME")]
    sheet: Option<String>,
}

#[derive(Debug, Args)]
struct ColumnArgs {
    /// Column name to scan; `all` scans every column. Default: the order-number column.
    #[arg(long, value_name = "NAME")]
    column: Option<String>,

    /// Ignore patterns separated by `,` or `;` (`prefix*`, `*suffix`, `*part*`, `part`).
    #[arg(long, value_name = "TEXT")]
    ignore: Option<String>,

    /// 1-based header rows, e.g. `1,2`. Default: detected per sheet.
    #[arg(long = "header-rows", value_name = "ROWS")]
    header_rows: Option<String>,
}

#[derive(Debug, Args)]
struct SearchArgs {
    /// Text, number or regular expression to look for.
    query: String,

    /// Treat the query as a regular expression.
    #[arg(long)]
    regex: bool,

    #[arg(long = "case-sensitive")]
    case_sensitive: bool,

    /// Report matches whose value matches an ignore pattern.
    #[arg(long = "keep-ignored-values")]
    keep_ignored_values: bool,

    /// Stop after this many matches.
    #[arg(long = "max-results", value_name = "N")]
    max_results: Option<usize>,

    #[command(flatten)]
    columns: ColumnArgs,

    #[command(flatten)]
    scope: ScopeArgs,
}

#[derive(Debug, Args)]
struct DuplicateArgs {
    /// Compare trimmed text instead of normalized values.
    #[arg(long = "no-normalize")]
    no_normalize: bool,

    #[command(flatten)]
    columns: ColumnArgs,

    #[command(flatten)]
    scope: ScopeArgs,
}

#[derive(Debug, Args)]
struct CheckArgs {
    /// CSV file holding the values to check.
    #[arg(long = "values-file", value_name = "PATH")]
    values_file: PathBuf,

    /// Column of the values file, as a letter (`B`) or a 1-based number.
    #[arg(long = "values-column", value_name = "COLUMN", default_value = "A")]
    values_column: String,

    /// Skip the first row of the values file.
    #[arg(long = "values-header")]
    values_header: bool,

    /// Spreadsheet id to check against.
    #[arg(long, value_name = "ID")]
    spreadsheet: String,

    /// How a value is compared with cell values.
    #[arg(long, value_enum, default_value_t = ModeArg::Exact)]
    mode: ModeArg,

    /// Restrict to this sheet (repeatable).
    #[arg(long = "sheet", value_name = "NAME")]
    sheets: Vec<String>,

    /// Restrict to columns with this header (repeatable).
    #[arg(long = "in-column", value_name = "NAME")]
    in_columns: Vec<String>,

    /// 1-based header rows, e.g. `1,2`.
    #[arg(long = "header-rows", value_name = "ROWS", default_value = "1")]
    header_rows: String,
}

pub fn parse_args() -> Cli {
    Cli::parse()
}

/// Run a parsed command line. A closed stdout ends the command successfully.
pub fn run(cli: Cli, token: &CancellationToken) -> Result<()> {
    match run_command(cli, token) {
        Err(err) if is_broken_pipe(&err) => Ok(()),
        other => other,
    }
}

fn is_broken_pipe(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| {
        cause
            .downcast_ref::<io::Error>()
            .is_some_and(|io_err| io_err.kind() == io::ErrorKind::BrokenPipe)
    })
}

fn run_command(cli: Cli, token: &CancellationToken) -> Result<()> {
    let csv_options = csv_options(&cli)?;
    let source = CsvDirSource::open(&cli.root, csv_options.clone())?;
    let vocabulary = load_vocabulary(cli.vocabulary.as_deref())?;
    let format = cli.format;

    match cli.command {
        Command::List => run_list(&source, format),
        Command::Search(args) => run_search(&source, args, vocabulary, format, token),
        Command::Duplicates(args) => run_duplicates(&source, args, vocabulary, format, token),
        Command::Check(args) => run_check(&source, args, &csv_options, format, token),
    }
}

fn csv_options(cli: &Cli) -> Result<CsvOptions> {
    let delimiter = u8::try_from(cli.delimiter)
        .ok()
        .filter(u8::is_ascii)
        .with_context(|| format!("delimiter {:?} is not an ASCII character", cli.delimiter))?;
    let encoding = match cli.encoding {
        EncodingArg::Auto => CsvTextEncoding::Auto,
        EncodingArg::Utf8 => CsvTextEncoding::Utf8,
        EncodingArg::Windows1250 => CsvTextEncoding::Windows1250,
        EncodingArg::Windows1252 => CsvTextEncoding::Windows1252,
    };
    Ok(CsvOptions {
        delimiter,
        encoding,
        ..CsvOptions::default()
    })
}

fn load_vocabulary(path: Option<&Path>) -> Result<Vocabulary> {
    let Some(path) = path else {
        return Ok(Vocabulary::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read vocabulary file {}", path.display()))?;
    let vocabulary: Vocabulary = serde_json::from_str(&text)
        .with_context(|| format!("parse vocabulary file {}", path.display()))?;
    Ok(vocabulary.normalized())
}

fn find_spreadsheet<S: SheetSource>(source: &S, id: &str) -> Result<SpreadsheetInfo> {
    let spreadsheets = source.list_spreadsheets().context("list spreadsheets")?;
    spreadsheets
        .into_iter()
        .find(|info| info.id == id)
        .with_context(|| format!("unknown spreadsheet '{id}' (see `sheetseek list`)"))
}

fn scan_target<S: SheetSource>(source: &S, scope: &ScopeArgs) -> Result<ScanTarget> {
    match (scope.spreadsheets.as_slice(), scope.sheet.as_deref()) {
        ([], None) => Ok(ScanTarget::AllSpreadsheets),
        ([], Some(_)) => anyhow::bail!("--sheet requires --spreadsheet"),
        ([id], Some(sheet)) => Ok(ScanTarget::Sheet {
            spreadsheet: find_spreadsheet(source, id)?,
            sheet: sheet.to_string(),
        }),
        ([id], None) => Ok(ScanTarget::Spreadsheet(find_spreadsheet(source, id)?)),
        (_, Some(_)) => anyhow::bail!("--sheet requires exactly one --spreadsheet"),
        (ids, None) => Ok(ScanTarget::Spreadsheets(
            ids.iter()
                .map(|id| find_spreadsheet(source, id))
                .collect::<Result<_>>()?,
        )),
    }
}

fn state_label(state: ScanState) -> &'static str {
    match state {
        ScanState::Idle => "idle",
        ScanState::ResolvingHeader => "resolving header",
        ScanState::ResolvingColumns => "resolving columns",
        ScanState::Scanning => "scanning",
        ScanState::Completed => "completed",
        ScanState::CompletedWithErrors => "completed with errors",
        ScanState::Stopped => "stopped",
    }
}

fn describe_issue(issue: &ScanIssue) -> String {
    match issue {
        ScanIssue::Listing { reason } => format!("spreadsheet listing failed: {reason}"),
        ScanIssue::Spreadsheet {
            spreadsheet_name,
            reason,
            ..
        } => format!("skipped spreadsheet '{spreadsheet_name}': {reason}"),
        ScanIssue::Sheet {
            spreadsheet_name,
            sheet_name,
            reason,
            ..
        } => format!("skipped sheet '{spreadsheet_name}'/'{sheet_name}': {reason}"),
    }
}

/// Status and skipped units go to stderr so stdout stays machine-readable.
fn report_status(what: &str, count: usize, state: ScanState, issues: &[ScanIssue]) {
    for issue in issues {
        eprintln!("warning: {}", describe_issue(issue));
    }
    eprintln!("{count} {what}; status: {}", state_label(state));
}

#[derive(Debug, Serialize)]
struct JsonSpreadsheet<'a> {
    id: &'a str,
    name: &'a str,
    sheets: Vec<String>,
}

fn run_list<S: SheetSource>(source: &S, format: OutputFormat) -> Result<()> {
    let spreadsheets = source.list_spreadsheets().context("list spreadsheets")?;
    let mut listing = Vec::with_capacity(spreadsheets.len());
    for info in &spreadsheets {
        let sheets = source
            .sheet_names(&info.id)
            .with_context(|| format!("list sheets of '{}'", info.id))?;
        listing.push(JsonSpreadsheet {
            id: &info.id,
            name: &info.name,
            sheets,
        });
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => {
            for entry in &listing {
                writeln!(out, "{}\t{}", entry.id, entry.name)?;
                for sheet in &entry.sheets {
                    writeln!(out, "  {sheet}")?;
                }
            }
        }
        OutputFormat::Json => {
            serde_json::to_writer(&mut out, &listing)?;
            out.write_all(b"\n")?;
        }
    }
    Ok(())
}

fn column_query(args: &ColumnArgs, vocabulary: &Vocabulary) -> ColumnQuery {
    ColumnQuery::parse(args.column.as_deref(), vocabulary)
}

fn ignore_rules(args: &ColumnArgs) -> IgnoreRules {
    args.ignore
        .as_deref()
        .map(IgnoreRules::parse)
        .unwrap_or_default()
}

fn header_rows(args: &ColumnArgs) -> Option<HeaderSpec> {
    args.header_rows.as_deref().map(HeaderSpec::parse)
}

#[derive(Debug, Serialize)]
struct JsonMatch<'a> {
    spreadsheet_id: &'a str,
    spreadsheet_name: &'a str,
    sheet_name: &'a str,
    cell: String,
    column_label: &'a str,
    matched_value: &'a str,
    companion_value: &'a str,
}

#[derive(Debug, Serialize)]
struct JsonScan<'a, T> {
    state: ScanState,
    issues: &'a [ScanIssue],
    results: Vec<T>,
}

fn run_search<S: SheetSource>(
    source: &S,
    args: SearchArgs,
    vocabulary: Vocabulary,
    format: OutputFormat,
    token: &CancellationToken,
) -> Result<()> {
    let target = scan_target(source, &args.scope)?;
    let options = SearchOptions {
        regex: args.regex,
        case_sensitive: args.case_sensitive,
        column: column_query(&args.columns, &vocabulary),
        ignore: ignore_rules(&args.columns),
        header_rows: header_rows(&args.columns),
        ignore_matched_values: !args.keep_ignored_values,
        max_results: args.max_results,
        vocabulary,
        ..SearchOptions::default()
    };
    log::debug!("search {:?} in {:?} with {:?}", args.query, target, options.column);

    let mut cursor = search(source, target, &args.query, options, token.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut records = Vec::new();
    let state = loop {
        match cursor.try_next() {
            Step::Item(record) => {
                if let OutputFormat::Text = format {
                    writeln!(
                        out,
                        "{}\t{}\t{}\t{}\t{}\t{}",
                        record.spreadsheet_name,
                        record.sheet_name,
                        record.cell_address(),
                        record.column_label,
                        record.matched_value,
                        record.companion_value
                    )?;
                }
                records.push(record);
            }
            Step::End(state) => break state,
        }
    };

    if let OutputFormat::Json = format {
        let report = JsonScan {
            state,
            issues: cursor.issues(),
            results: records
                .iter()
                .map(|r| JsonMatch {
                    spreadsheet_id: &r.spreadsheet_id,
                    spreadsheet_name: &r.spreadsheet_name,
                    sheet_name: &r.sheet_name,
                    cell: r.cell_address(),
                    column_label: &r.column_label,
                    matched_value: &r.matched_value,
                    companion_value: &r.companion_value,
                })
                .collect(),
        };
        serde_json::to_writer(&mut out, &report)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    report_status("match(es)", records.len(), state, cursor.issues());
    Ok(())
}

fn run_duplicates<S: SheetSource>(
    source: &S,
    args: DuplicateArgs,
    vocabulary: Vocabulary,
    format: OutputFormat,
    token: &CancellationToken,
) -> Result<()> {
    let target = scan_target(source, &args.scope)?;
    let column = column_query(&args.columns, &vocabulary);
    let options = DuplicateOptions {
        normalize: !args.no_normalize,
        ignore: ignore_rules(&args.columns),
        header_rows: header_rows(&args.columns),
        vocabulary,
        ..DuplicateOptions::default()
    };

    let mut cursor = find_duplicates(source, target, column, options, token.clone());
    let stdout = io::stdout();
    let mut out = stdout.lock();
    let mut groups = Vec::new();
    let state = loop {
        match cursor.try_next() {
            Step::Item(group) => {
                if let OutputFormat::Text = format {
                    let rows: Vec<String> =
                        group.row_numbers.iter().map(ToString::to_string).collect();
                    writeln!(
                        out,
                        "{}\t{}\t{}\t{}\t{}x\trows {}",
                        group.spreadsheet_name,
                        group.sheet_name,
                        group.column_label,
                        group.display_value,
                        group.count(),
                        rows.join(", ")
                    )?;
                }
                groups.push(group);
            }
            Step::End(state) => break state,
        }
    };

    if let OutputFormat::Json = format {
        let report = JsonScan {
            state,
            issues: cursor.issues(),
            results: groups.iter().collect(),
        };
        serde_json::to_writer(&mut out, &report)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    report_status("duplicate group(s)", groups.len(), state, cursor.issues());
    Ok(())
}

/// Non-blank values of one column of a CSV file, in file order.
fn read_values(
    path: &Path,
    column: &str,
    skip_header: bool,
    options: &CsvOptions,
) -> Result<Vec<String>> {
    let col = parse_column_identifier(column)
        .with_context(|| format!("invalid --values-column '{column}'"))?;
    let col = usize::try_from(col).context("column index out of range")?;
    let file = std::fs::File::open(path)
        .with_context(|| format!("open values file {}", path.display()))?;
    let grid = read_csv_grid(io::BufReader::new(file), options)
        .with_context(|| format!("read values file {}", path.display()))?;

    let first = usize::from(skip_header);
    Ok((first..grid.row_count())
        .map(|row| grid.cell(row, col).to_text().trim().to_string())
        .filter(|value| !value.is_empty())
        .collect())
}

#[derive(Debug, Serialize)]
struct JsonCheckEntry<'a> {
    value: &'a str,
    found: bool,
    sheet_name: Option<&'a str>,
    cell: Option<String>,
    column_label: Option<&'a str>,
    matched_value: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct JsonCheck<'a> {
    spreadsheet: &'a SpreadsheetInfo,
    state: ScanState,
    issues: &'a [ScanIssue],
    found: usize,
    missing: usize,
    entries: Vec<JsonCheckEntry<'a>>,
}

fn run_check<S: SheetSource>(
    source: &S,
    args: CheckArgs,
    csv_options: &CsvOptions,
    format: OutputFormat,
    token: &CancellationToken,
) -> Result<()> {
    let values = read_values(
        &args.values_file,
        &args.values_column,
        args.values_header,
        csv_options,
    )?;
    let spreadsheet = find_spreadsheet(source, &args.spreadsheet)?;
    let options = ChecklistOptions {
        mode: match args.mode {
            ModeArg::Exact => CheckMode::Exact,
            ModeArg::Substring => CheckMode::Substring,
        },
        sheets: args.sheets,
        columns: args.in_columns,
        header_rows: HeaderSpec::parse(&args.header_rows),
    };
    log::debug!(
        "checking {} value(s) against '{}'",
        values.len(),
        spreadsheet.name
    );

    let report = check_values(source, &spreadsheet, &values, &options, token);
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match format {
        OutputFormat::Text => {
            for entry in &report.entries {
                match &entry.hit {
                    Some(hit) => writeln!(
                        out,
                        "FOUND\t{}\t{}!{}\t{}\t{}",
                        entry.value,
                        hit.sheet_name,
                        hit.cell.to_a1(),
                        hit.column_label,
                        hit.matched_value
                    )?,
                    None => writeln!(out, "MISSING\t{}", entry.value)?,
                }
            }
            writeln!(
                out,
                "found {}, missing {}",
                report.found(),
                report.missing()
            )?;
        }
        OutputFormat::Json => {
            let json = JsonCheck {
                spreadsheet: &report.spreadsheet,
                state: report.state,
                issues: &report.issues,
                found: report.found(),
                missing: report.missing(),
                entries: report
                    .entries
                    .iter()
                    .map(|entry| JsonCheckEntry {
                        value: &entry.value,
                        found: entry.is_found(),
                        sheet_name: entry.hit.as_ref().map(|h| h.sheet_name.as_str()),
                        cell: entry.hit.as_ref().map(|h| h.cell.to_a1()),
                        column_label: entry.hit.as_ref().map(|h| h.column_label.as_str()),
                        matched_value: entry.hit.as_ref().map(|h| h.matched_value.as_str()),
                    })
                    .collect(),
            };
            serde_json::to_writer(&mut out, &json)?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    report_status("value(s) checked", report.entries.len(), report.state, &report.issues);
    Ok(())
}
