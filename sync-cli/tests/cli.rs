//! End-to-end tests for the roomsync binary.

use assert_cmd::Command;
use predicates::prelude::*;

fn roomsync() -> Command {
    Command::cargo_bin("roomsync").unwrap()
}

#[test]
fn encode_prints_markup() {
    roomsync()
        .args(["encode", "**a** and *b* and __c__"])
        .assert()
        .success()
        .stdout("<strong>a</strong> and <em>b</em> and <u>c</u>\n");
}

#[test]
fn encode_escapes_html() {
    roomsync()
        .args(["encode", "<script>"])
        .assert()
        .success()
        .stdout(predicate::str::contains("&lt;script&gt;"));
}

#[test]
fn encode_reads_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");
    std::fs::write(&path, "line one\nline two\n").unwrap();

    roomsync()
        .args(["encode", "--file"])
        .arg(&path)
        .assert()
        .success()
        .stdout("line one<br>line two\n");
}

#[test]
fn encode_without_input_fails() {
    roomsync()
        .arg("encode")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Must specify text or --file"));
}

#[test]
fn demo_with_bad_config_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("roomsync.toml");
    std::fs::write(&path, "[client\n").unwrap();

    roomsync()
        .args(["demo", "--config"])
        .arg(&path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load configuration"));
}

#[test]
fn demo_runs_a_script() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("roomsync.toml");
    std::fs::write(
        &config,
        "[client]\nreconnect_delay_ms = 50\n\n[identity]\nsender_id = \"u1\"\nnickname = \"ada\"\n",
    )
    .unwrap();
    let script = dir.path().join("script.txt");
    std::fs::write(&script, "hello **world**\n\n").unwrap();

    roomsync()
        .args(["demo", "--room", "lobby", "--config"])
        .arg(&config)
        .arg("--script")
        .arg(&script)
        .assert()
        .success()
        .stdout(predicate::str::contains("room lobby"))
        .stdout(predicate::str::contains("<strong>world</strong>"))
        .stdout(predicate::str::contains("skipped empty line"))
        .stdout(predicate::str::contains("draft kept"))
        .stdout(predicate::str::contains("ada"));
}
