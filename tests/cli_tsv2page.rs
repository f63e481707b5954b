//! Integration tests for `tsvtools tsv2page`.

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

const PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<PcGts xmlns="http://schema.primaresearch.org/PAGE/gts/pagecontent/2019-07-15">
  <Page imageFilename="0001.tif">
    <TextRegion id="r1">
      <Coords points="0,0 100,0 100,100 0,100"/>
      <TextLine id="l1">
        <Coords points="0,0 100,0 100,10 0,10"/>
        <Word id="w1">
          <Coords points="0,0 40,0 40,10 0,10"/>
          <TextEquiv><Unicode>Helo</Unicode></TextEquiv>
        </Word>
        <TextEquiv conf="0.5"><Unicode>Helo wrld</Unicode></TextEquiv>
      </TextLine>
      <TextLine id="l2">
        <Coords points="0,20 100,20 100,30 0,30"/>
        <TextStyle fontFamily="Fraktur"/>
      </TextLine>
    </TextRegion>
  </Page>
</PcGts>
"#;

const CORRECTIONS: &str = "line_id\tTEXT\tsegment_id\n\
                           # http://img/0001.tif\n\
                           l1\tHello world\tPHYS_0001_l1\n\
                           l2\tZweite Zeile\tPHYS_0001_l2\n";

// ─── Patching ────────────────────────────────────────────────────────────────

#[test]
fn patches_lines_into_named_output() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("0001.xml");
    let tsv = dir.path().join("0001.tsv");
    let out = dir.path().join("fixed.xml");
    fs::write(&page, PAGE).unwrap();
    fs::write(&tsv, CORRECTIONS).unwrap();

    tsvtools()
        .arg("tsv2page")
        .arg(&page)
        .arg(&tsv)
        .arg("-o")
        .arg(&out)
        .assert()
        .success()
        .stderr(predicate::str::contains("Patched 2 lines"));

    let patched = fs::read_to_string(&out).unwrap();
    assert!(patched.starts_with("<?xml"));
    assert!(patched.contains("<Unicode>Hello world</Unicode>"));
    assert!(patched.contains("<Unicode>Zweite Zeile</Unicode>"));
    assert!(!patched.contains("<Word"));
    assert!(patched.find("Zweite Zeile").unwrap() < patched.find("<TextStyle").unwrap());

    // the input is left alone
    assert_eq!(fs::read_to_string(&page).unwrap(), PAGE);
}

#[test]
fn keep_words_leaves_word_children() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("0001.xml");
    let tsv = dir.path().join("0001.tsv");
    let out = dir.path().join("fixed.xml");
    fs::write(&page, PAGE).unwrap();
    fs::write(&tsv, CORRECTIONS).unwrap();

    tsvtools()
        .arg("tsv2page")
        .arg(&page)
        .arg(&tsv)
        .arg("--output-filename")
        .arg(&out)
        .arg("--keep-words")
        .assert()
        .success();

    let patched = fs::read_to_string(&out).unwrap();
    assert!(patched.contains("<Word id=\"w1\">"));
    assert!(patched.contains("<Unicode>Helo</Unicode>"));
    assert!(patched.contains("<Unicode>Hello world</Unicode>"));
}

#[test]
fn default_output_lands_in_working_directory() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("in");
    fs::create_dir_all(&input).unwrap();
    let page = input.join("0001.xml");
    let tsv = input.join("0001.tsv");
    fs::write(&page, PAGE).unwrap();
    fs::write(&tsv, CORRECTIONS).unwrap();

    tsvtools()
        .current_dir(dir.path())
        .arg("tsv2page")
        .arg(&page)
        .arg(&tsv)
        .assert()
        .success();

    let patched = fs::read_to_string(dir.path().join("0001.corrected.xml")).unwrap();
    assert!(patched.contains("Hello world"));
}

// ─── Failures ────────────────────────────────────────────────────────────────

#[test]
fn unknown_line_id_fails_without_output() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("0001.xml");
    let tsv = dir.path().join("0001.tsv");
    let out = dir.path().join("fixed.xml");
    fs::write(&page, PAGE).unwrap();
    fs::write(&tsv, "line_id\tTEXT\nl1\tok\nl7\tlost\n").unwrap();

    tsvtools()
        .arg("tsv2page")
        .arg(&page)
        .arg(&tsv)
        .arg("-o")
        .arg(&out)
        .assert()
        .failure()
        .stderr(predicate::str::contains("l7"));

    assert!(!out.exists());
}

#[test]
fn table_without_text_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("0001.xml");
    let tsv = dir.path().join("0001.tsv");
    fs::write(&page, PAGE).unwrap();
    fs::write(&tsv, "line_id\ttext_equiv\nl1\tHello\n").unwrap();

    tsvtools()
        .arg("tsv2page")
        .arg(&page)
        .arg(&tsv)
        .arg("-o")
        .arg(dir.path().join("fixed.xml"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("TEXT"));
}
