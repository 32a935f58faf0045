//! CLI smoke tests: argument surface, exit codes, and a snapshot
//! round-trip over a synthetic master file.

use assert_cmd::Command;
use predicates::prelude::*;

fn fo76dm() -> Command {
    let mut cmd = Command::cargo_bin("fo76dm").unwrap();
    // Point the config dir somewhere empty so a developer's real
    // profiles never leak into the tests.
    cmd.env("XDG_CONFIG_HOME", std::env::temp_dir().join("fo76dm-test-config"));
    cmd
}

fn sub(tag: &[u8; 4], data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(tag);
    out.extend_from_slice(&(data.len() as u16).to_le_bytes());
    out.extend_from_slice(data);
    out
}

fn record(tag: &[u8; 4], form_id: u32, payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(tag);
    out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&form_id.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&208u16.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out.extend_from_slice(payload);
    out
}

fn group(label: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"GRUP");
    out.extend_from_slice(&((24 + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(label);
    out.extend_from_slice(&0i32.to_le_bytes());
    out.extend_from_slice(&[0; 8]);
    out.extend_from_slice(body);
    out
}

fn synthetic_esm() -> Vec<u8> {
    let mut out = record(b"TES4", 0, &sub(b"HEDR", &[0u8; 12]));
    let mut payload = sub(b"EDID", b"Weap10mmPistol\0");
    let mut dnam = Vec::new();
    for v in [50.0f32, 1.0, 1.5, 0.0, 100.0, 25.0, 2.0] {
        dnam.extend_from_slice(&v.to_le_bytes());
    }
    dnam.push(1);
    payload.extend(sub(b"DNAM", &dnam));
    out.extend(group(b"WEAP", &record(b"WEAP", 0x0012_3456, &payload)));
    out
}

#[test]
fn help_exits_zero() {
    fo76dm()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Snapshot and diff Fallout 76"));
}

#[test]
fn version_exits_zero() {
    fo76dm().arg("--version").assert().success();
}

#[test]
fn unknown_subcommand_is_user_error() {
    fo76dm().arg("frobnicate").assert().code(1);
}

#[test]
fn missing_profile_is_user_error() {
    fo76dm()
        .arg("list")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("No master file configured"));
}

#[test]
fn nonexistent_esm_is_data_error() {
    let dir = tempfile::tempdir().unwrap();
    fo76dm()
        .arg("--esm")
        .arg(dir.path().join("missing.esm"))
        .arg("snapshot")
        .assert()
        .code(2);
}

#[test]
fn snapshot_list_search_show_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let esm_path = dir.path().join("Data").join("SeventySix.esm");
    std::fs::create_dir_all(esm_path.parent().unwrap()).unwrap();
    std::fs::write(&esm_path, synthetic_esm()).unwrap();
    let db_path = dir.path().join("snapshots.db");

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .args(["snapshot", "--label", "baseline"])
        .assert()
        .success()
        .stdout(predicate::str::contains("committed"));

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("baseline"));

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .args(["search", "10mm"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0x00123456"));

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .args(["show", "0x00123456"])
        .assert()
        .success()
        .stdout(predicate::str::contains("damage"));

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("WEAP"));
}

#[test]
fn diff_needs_two_snapshots() {
    let dir = tempfile::tempdir().unwrap();
    let esm_path = dir.path().join("SeventySix.esm");
    std::fs::write(&esm_path, synthetic_esm()).unwrap();
    let db_path = dir.path().join("snapshots.db");

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .args(["snapshot"])
        .assert()
        .success();

    fo76dm()
        .arg("--esm")
        .arg(&esm_path)
        .arg("--db")
        .arg(&db_path)
        .args(["diff", "--latest"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("two snapshots"));
}
