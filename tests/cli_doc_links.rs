//! Integration tests for the document-link commands and
//! `make-page2tsv-commands`.

#![allow(deprecated)] // cargo_bin deprecation, replacement not yet stable

use std::fs;

use assert_cmd::Command;
use predicates::prelude::*;

fn tsvtools() -> Command {
    // point config lookup at an empty directory so a developer's
    // ~/.config/tsvtools/config.toml cannot leak into the run
    let home = std::env::temp_dir().join("tsvtools-cli-test-home");
    let mut cmd = Command::cargo_bin("tsvtools").expect("binary 'tsvtools' should be built");
    cmd.env("HOME", &home).env("XDG_CONFIG_HOME", home.join(".config"));
    cmd
}

/// Two documents concatenated with `cat`, both numbering from url_id 0.
const CONCATENATED: &str = "No.\tTOKEN\tNE-TAG\turl_id\n\
                            # http://img/doc1.jpg\n\
                            0\tHello\tO\t0\n\
                            1\tBerlin\tB-LOC\t0\n\
                            # http://img/doc2.jpg\n\
                            0\tParis\tB-LOC\t0\n";

// ─── extract-doc-links ───────────────────────────────────────────────────────

#[test]
fn lists_one_url_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = dir.path().join("all.tsv");
    let urls = dir.path().join("urls.tsv");
    fs::write(&tsv, CONCATENATED).unwrap();

    tsvtools()
        .arg("extract-doc-links")
        .arg(&tsv)
        .arg(&urls)
        .assert()
        .success()
        .stderr(predicate::str::contains("2 documents"));

    assert_eq!(
        fs::read_to_string(&urls).unwrap(),
        "url\nhttp://img/doc1.jpg\nhttp://img/doc2.jpg\n"
    );
}

#[test]
fn rows_before_any_comment_are_unlinked() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = dir.path().join("all.tsv");
    let urls = dir.path().join("urls.tsv");
    fs::write(&tsv, "TOKEN\nloose\n# http://img/doc.jpg\nlinked\n").unwrap();

    tsvtools()
        .arg("extract-doc-links")
        .arg(&tsv)
        .arg(&urls)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&urls).unwrap(),
        "url\nhttp://empty\nhttp://img/doc.jpg\n"
    );
}

// ─── annotate-tsv ────────────────────────────────────────────────────────────

#[test]
fn renumbers_url_ids_per_document() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = dir.path().join("all.tsv");
    let out = dir.path().join("annotated.tsv");
    fs::write(&tsv, CONCATENATED).unwrap();

    tsvtools()
        .arg("annotate-tsv")
        .arg(&tsv)
        .arg(&out)
        .assert()
        .success();

    assert_eq!(
        fs::read_to_string(&out).unwrap(),
        "No.\tTOKEN\tNE-TAG\turl_id\n\
         # http://img/doc1.jpg\n\
         0\tHello\tO\t0\n\
         1\tBerlin\tB-LOC\t0\n\
         # http://img/doc2.jpg\n\
         0\tParis\tB-LOC\t1\n"
    );
}

#[test]
fn annotating_twice_changes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = dir.path().join("all.tsv");
    let once = dir.path().join("once.tsv");
    let twice = dir.path().join("twice.tsv");
    fs::write(&tsv, CONCATENATED).unwrap();

    tsvtools().arg("annotate-tsv").arg(&tsv).arg(&once).assert().success();
    tsvtools().arg("annotate-tsv").arg(&once).arg(&twice).assert().success();

    assert_eq!(
        fs::read_to_string(&once).unwrap(),
        fs::read_to_string(&twice).unwrap()
    );
}

#[test]
fn missing_table_fails() {
    let dir = tempfile::tempdir().unwrap();

    tsvtools()
        .arg("annotate-tsv")
        .arg(dir.path().join("absent.tsv"))
        .arg(dir.path().join("out.tsv"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("absent.tsv"));
}

// ─── make-page2tsv-commands ──────────────────────────────────────────────────

#[test]
fn prints_one_command_per_page_file() {
    let dir = tempfile::tempdir().unwrap();
    let ppn = dir.path().join("PPN680203753");
    fs::create_dir_all(&ppn).unwrap();
    fs::write(ppn.join("00000017.xml"), "<PcGts/>").unwrap();
    fs::write(ppn.join("readme.xml"), "<PcGts/>").unwrap();

    tsvtools()
        .arg("make-page2tsv-commands")
        .arg("--directory")
        .arg(dir.path())
        .args(["--purpose", "skew"])
        .assert()
        .success()
        .stdout(predicate::str::contains("tsvtools page2tsv "))
        .stdout(predicate::str::contains(
            "--image-url=https://content.staatsbibliothek-berlin.de/dc/PPN680203753-00000017/left,top,width,height/full/0/default.jpg",
        ))
        .stdout(predicate::str::contains("00000017.tsv"))
        .stdout(predicate::str::contains("--purpose=skew"))
        .stdout(predicate::str::contains("readme").not());
}
