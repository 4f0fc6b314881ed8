//! End-to-end tests driving the `nooc` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;

fn write_program(source: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".noo")
        .tempfile()
        .expect("create temp file");
    file.write_all(source.as_bytes()).expect("write program");
    file
}

fn nooc() -> Command {
    Command::cargo_bin("nooc").expect("binary builds")
}

#[test]
fn test_run_map_over_list() {
    let file = write_program("map (fn x => x + 1) [1, 2, 3]");
    nooc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[2, 3, 4]"));
}

#[test]
fn test_type_map_over_list() {
    let file = write_program("map (fn x => x + 1) [1, 2, 3]");
    nooc()
        .arg("--type")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("List Float"));
}

#[test]
fn test_run_pure_defaults() {
    let file = write_program("pure 1");
    nooc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Some 1"));
}

#[test]
fn test_type_pure_renders_constraint() {
    let file = write_program("pure 1");
    nooc()
        .arg("--type")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("a Float given a implements Monad"));
}

#[test]
fn test_type_accessor_lambda() {
    let file = write_program("fn obj => @name obj");
    nooc()
        .arg("--type")
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("a -> b given a has {@name b}"));
}

#[test]
fn test_arithmetic_and_concat() {
    let file = write_program("1.0 + 2.0");
    nooc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("3"));

    let file = write_program("\"a\" + \"b\"");
    nooc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("ab"));
}

#[test]
fn test_mixed_addition_fails_with_mismatch() {
    let file = write_program("1.0 + \"x\"");
    nooc()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("type mismatch"));
}

#[test]
fn test_user_trait_end_to_end() {
    let file = write_program(
        "constraint Display a ( display : a -> String ); \
         implement Display Float ( display = toString ); \
         display 42",
    );
    nooc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn test_union_operation_requires_match() {
    let file = write_program("type U = String | Float; x = 1 : U; x + 1");
    nooc()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("pattern matching to narrow the type"));
}

#[test]
fn test_benchmark_reports_all_four_phases() {
    let file = write_program("1 + 1");
    nooc()
        .arg("--benchmark")
        .arg(file.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("lex:"))
        .stderr(predicate::str::contains("parse:"))
        .stderr(predicate::str::contains("typecheck:"))
        .stderr(predicate::str::contains("evaluate:"));
}

#[test]
fn test_missing_file_fails() {
    nooc()
        .arg("definitely-not-a-file.noo")
        .assert()
        .failure();
}

#[test]
fn test_unknown_flag_fails() {
    nooc().arg("--bogus").assert().failure();
}

#[test]
fn test_import_relative_to_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    std::fs::write(dir.path().join("lib.noo"), "double = fn x => x * 2").unwrap();
    std::fs::write(
        dir.path().join("main.noo"),
        "lib = import \"lib\"; d = @double lib; d 21",
    )
    .unwrap();

    nooc()
        .arg(dir.path().join("main.noo"))
        .assert()
        .success()
        .stdout(predicate::str::contains("42"));
}

#[test]
fn test_import_missing_fails() {
    let file = write_program("import \"ghost-module\"");
    nooc()
        .arg(file.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("ghost-module"));
}

#[test]
fn test_effectful_program_prints() {
    let file = write_program("print (1 + 1)");
    nooc()
        .arg(file.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));
}
