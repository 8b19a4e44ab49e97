use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use pretty_assertions::assert_eq;
use serde_json::Value;

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().expect("temp dir");
    let root = dir.path();
    fs::create_dir(root.join("zlecenia")).expect("create spreadsheet dir");
    fs::write(
        root.join("zlecenia/styczen.csv"),
        "Numer zlecenia,Stawka,Uwagi\n38960,280.00,\n38961,300,https://x.com/order/38960\n",
    )
    .expect("write styczen");
    fs::write(root.join("zlecenia/luty.csv"), "Numer zlecenia,Stawka\n38 960,150\n")
        .expect("write luty");
    fs::write(
        root.join("archiwum.csv"),
        "Nr zlecenia,Cena\n12345,1\n12345,2\n67890,3\n",
    )
    .expect("write archiwum");
    dir
}

fn sheetseek(root: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sheetseek"))
        .arg("--root")
        .arg(root)
        .args(args)
        .output()
        .expect("run sheetseek")
}

fn stdout_of(output: &Output) -> String {
    assert!(
        output.status.success(),
        "sheetseek failed\nstderr:\n{}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8(output.stdout.clone()).expect("utf-8 stdout")
}

#[test]
fn list_shows_spreadsheets_and_sheets() {
    let dir = fixture();
    let stdout = stdout_of(&sheetseek(dir.path(), &["list"]));
    assert_eq!(
        stdout,
        "archiwum.csv\tarchiwum\n  archiwum\nzlecenia\tzlecenia\n  luty\n  styczen\n"
    );
}

#[test]
fn search_json_reports_records_and_state() {
    let dir = fixture();
    let output = sheetseek(dir.path(), &["search", "38960", "--format", "json"]);
    let json: Value = serde_json::from_str(&stdout_of(&output)).expect("json output");

    assert_eq!(json["state"], "completed");
    assert_eq!(json["issues"], Value::Array(Vec::new()));
    let results = json["results"].as_array().expect("results array");
    let summary: Vec<(&str, &str, &str)> = results
        .iter()
        .map(|r| {
            (
                r["sheet_name"].as_str().unwrap_or_default(),
                r["cell"].as_str().unwrap_or_default(),
                r["companion_value"].as_str().unwrap_or_default(),
            )
        })
        .collect();
    assert_eq!(
        summary,
        vec![("luty", "A2", "150"), ("styczen", "A2", "280.00")]
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("2 match(es); status: completed"), "{stderr}");
}

#[test]
fn search_all_columns_drops_ignored_values() {
    let dir = fixture();
    let base = [
        "search",
        "38960",
        "--column",
        "all",
        "--spreadsheet",
        "zlecenia",
        "--sheet",
        "styczen",
    ];

    let stdout = stdout_of(&sheetseek(dir.path(), &base));
    assert_eq!(
        stdout,
        "zlecenia\tstyczen\tA2\tnumer zlecenia\t38960\t280.00\n\
         zlecenia\tstyczen\tC3\tuwagi\thttps://x.com/order/38960\t300\n"
    );

    let mut ignored = base.to_vec();
    ignored.extend(["--ignore", "https"]);
    let stdout = stdout_of(&sheetseek(dir.path(), &ignored));
    assert_eq!(stdout, "zlecenia\tstyczen\tA2\tnumer zlecenia\t38960\t280.00\n");

    ignored.push("--keep-ignored-values");
    let stdout = stdout_of(&sheetseek(dir.path(), &ignored));
    assert_eq!(stdout.lines().count(), 2);
}

#[test]
fn max_results_caps_output() {
    let dir = fixture();
    let stdout = stdout_of(&sheetseek(dir.path(), &["search", "38960", "--max-results", "1"]));
    assert_eq!(stdout.lines().count(), 1);
    assert!(stdout.contains("luty"));
}

#[test]
fn duplicates_text_output() {
    let dir = fixture();
    let stdout = stdout_of(&sheetseek(
        dir.path(),
        &["duplicates", "--spreadsheet", "archiwum.csv"],
    ));
    assert_eq!(stdout, "archiwum\tarchiwum\tnr zlecenia\t12345\t2x\trows 2, 3\n");
}

#[test]
fn check_reports_found_and_missing() {
    let dir = fixture();
    let values = dir.path().join("lista.txt");
    fs::write(&values, "Numer\n38960\n99999\n").expect("write values");

    let output = sheetseek(
        dir.path(),
        &[
            "check",
            "--values-file",
            values.to_str().expect("utf-8 path"),
            "--values-header",
            "--spreadsheet",
            "zlecenia",
            "--format",
            "json",
        ],
    );
    let json: Value = serde_json::from_str(&stdout_of(&output)).expect("json output");
    assert_eq!(json["found"], 1);
    assert_eq!(json["missing"], 1);
    assert_eq!(json["entries"][0]["sheet_name"], "luty");
    assert_eq!(json["entries"][0]["cell"], "A2");
    assert_eq!(json["entries"][0]["matched_value"], "38 960");
    assert_eq!(json["entries"][1]["found"], false);
}

#[test]
fn argument_and_io_errors_fail() {
    let dir = fixture();

    let output = sheetseek(&dir.path().join("brak"), &["list"]);
    assert!(!output.status.success());

    let output = sheetseek(dir.path(), &["search", "1", "--spreadsheet", "nieznany"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("nieznany"));

    let output = sheetseek(dir.path(), &["search", "1", "--sheet", "luty"]);
    assert!(!output.status.success());

    let output = sheetseek(
        dir.path(),
        &[
            "check",
            "--values-file",
            "lista.csv",
            "--values-column",
            "0",
            "--spreadsheet",
            "zlecenia",
        ],
    );
    assert!(!output.status.success());
}
