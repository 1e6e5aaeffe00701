use assert_cmd::cargo::{self};
use predicates::str::contains;
use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_file(name: &str, contents: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let path = std::env::temp_dir().join(format!("formdeck-cli-{nanos}-{name}"));
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn prints_help() {
    let mut cmd = cargo::cargo_bin_cmd!("formdeck");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(contains("formdeck"));
}

#[test]
fn replays_a_debounced_edit_into_one_form_body() {
    let snapshot = r#"{"titulo": "Clima", "campo_set": [{"id": 7, "tipo": "texto_curto", "rotulo": "Nome"}]}"#;
    let commands = temp_file(
        "commands.jsonl",
        concat!(
            r#"{"command":{"command":"card","card":1,"event":{"event":"label_edited","text":"Nome completo"}}}"#,
            "\n",
            r#"{"after_ms":100,"command":{"command":"card","card":1,"event":{"event":"help_edited","text":"Como no documento"}}}"#,
            "\n",
        ),
    );

    let mut cmd = cargo::cargo_bin_cmd!("formdeck");
    cmd.args(["--snapshot", snapshot, "--form-body", "--commands"])
        .arg(&commands)
        .assert()
        .success()
        .stdout(contains("campo_set-0-rotulo=Nome%20completo"))
        .stdout(contains("campo_set-0-ajuda=Como%20no%20documento"))
        .stderr(contains("1 save(s) emitted"));

    let _ = fs::remove_file(commands);
}

#[test]
fn rejects_two_stdin_inputs() {
    let mut cmd = cargo::cargo_bin_cmd!("formdeck");
    cmd.args(["-s", "-", "-c", "-"])
        .assert()
        .failure()
        .stderr(contains("stdin simultaneously"));
}

#[test]
fn edits_further_apart_than_the_window_save_separately() {
    let snapshot = r#"{"campo_set": [{"id": 7, "tipo": "texto_curto", "rotulo": "Nome"}]}"#;
    let commands = temp_file(
        "spaced.jsonl",
        concat!(
            r#"{"command":{"command":"card","card":1,"event":{"event":"label_edited","text":"Nome completo"}}}"#,
            "\n",
            r#"{"after_ms":1000,"command":{"command":"card","card":1,"event":{"event":"help_edited","text":"Como no documento"}}}"#,
            "\n",
        ),
    );

    let mut cmd = cargo::cargo_bin_cmd!("formdeck");
    cmd.args(["--snapshot", snapshot, "--form-body", "--debounce-ms", "400", "--commands"])
        .arg(&commands)
        .assert()
        .success()
        .stderr(contains("2 save(s) emitted"));

    let _ = fs::remove_file(commands);
}

#[test]
fn unreachable_save_endpoint_does_not_stop_the_replay() {
    let port = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let snapshot = r#"{"campo_set": [{"id": 7, "tipo": "texto_curto", "rotulo": "Nome"}]}"#;
    let commands = temp_file(
        "offline.jsonl",
        concat!(
            r#"{"command":{"command":"accepting_toggled","on":true}}"#,
            "\n",
            r#"{"after_ms":50,"command":{"command":"accepting_toggled","on":false}}"#,
            "\n",
        ),
    );

    let mut cmd = cargo::cargo_bin_cmd!("formdeck");
    cmd.args(["--snapshot", snapshot, "--form-body", "--save-url"])
        .arg(format!("http://127.0.0.1:{port}/formularios/1/builder/"))
        .arg("--commands")
        .arg(&commands)
        .assert()
        .success()
        .stderr(contains("2 save(s) emitted"))
        .stderr(contains("Save failed"));

    let _ = fs::remove_file(commands);
}
