//! End-to-end tests driving the built binary directly.

use std::fs;
use std::io::Write;

use assert_cmd::Command;
use predicates::str::contains;
use tempfile::tempdir;

fn write_corpus_entry(dir: &std::path::Path, label: &str, data: &[u8]) {
    let mut f = fs::File::create(dir.join(format!("{label}.corpus"))).unwrap();
    f.write_all(data).unwrap();
}

#[test]
fn whole_reports_the_matching_label() {
    let corpus_dir = tempdir().unwrap();
    let x86 = b"\x55\x89\xe5\x83\xec\x10\x8b\x45\x08\x01\xc2\x89\xd0\xc9\xc3".repeat(400);
    write_corpus_entry(corpus_dir.path(), "X86", &x86);

    let input_dir = tempdir().unwrap();
    let input_path = input_dir.path().join("blob.bin");
    fs::write(&input_path, &x86).unwrap();

    Command::cargo_bin("cpu-ident")
        .unwrap()
        .args([
            "whole",
            "--corpus",
            corpus_dir.path().to_str().unwrap(),
            input_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("X86"));
}

#[test]
fn whole_json_emits_a_record_per_file() {
    let corpus_dir = tempdir().unwrap();
    let x86 = b"\x55\x89\xe5\x83\xec\x10\x8b\x45\x08\x01\xc2\x89\xd0\xc9\xc3".repeat(400);
    write_corpus_entry(corpus_dir.path(), "X86", &x86);

    let input_dir = tempdir().unwrap();
    let input_path = input_dir.path().join("blob.bin");
    fs::write(&input_path, &x86).unwrap();

    Command::cargo_bin("cpu-ident")
        .unwrap()
        .args([
            "whole",
            "--corpus",
            corpus_dir.path().to_str().unwrap(),
            "--json",
            input_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("\"label\":\"X86\""));
}

#[test]
fn scan_prints_a_segmentation_line_per_run() {
    let corpus_dir = tempdir().unwrap();
    let x86 = b"\x55\x89\xe5\x83\xec\x10\x8b\x45\x08\x01\xc2\x89\xd0\xc9\xc3".repeat(2000);
    write_corpus_entry(corpus_dir.path(), "X86", &x86);

    let input_dir = tempdir().unwrap();
    let input_path = input_dir.path().join("blob.bin");
    fs::write(&input_path, &x86).unwrap();

    Command::cargo_bin("cpu-ident")
        .unwrap()
        .args([
            "scan",
            "--corpus",
            corpus_dir.path().to_str().unwrap(),
            input_path.to_str().unwrap(),
        ])
        .assert()
        .success()
        .stdout(contains("X86"))
        .stdout(contains("size="));
}

#[test]
fn missing_input_file_exits_nonzero_but_still_reports_other_files() {
    let corpus_dir = tempdir().unwrap();
    write_corpus_entry(corpus_dir.path(), "X86", &b"ab".repeat(2000));

    Command::cargo_bin("cpu-ident")
        .unwrap()
        .args([
            "whole",
            "--corpus",
            corpus_dir.path().to_str().unwrap(),
            "/nonexistent/does/not/exist.bin",
        ])
        .assert()
        .failure();
}

#[test]
fn unreadable_corpus_directory_is_a_hard_error() {
    let input_dir = tempdir().unwrap();
    let input_path = input_dir.path().join("blob.bin");
    fs::write(&input_path, b"hello").unwrap();

    Command::cargo_bin("cpu-ident")
        .unwrap()
        .args([
            "whole",
            "--corpus",
            "/nonexistent/corpus/dir",
            input_path.to_str().unwrap(),
        ])
        .assert()
        .failure()
        .stderr(contains("could not read corpus directory"));
}
