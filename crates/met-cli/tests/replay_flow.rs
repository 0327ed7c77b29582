//! End-to-end tests for the replay pipeline.
//!
//! Runs the compiled binary over recorded event logs and checks the
//! report stream a live session would have transmitted.

use std::io::Write;
use std::process::Command;

use tempfile::TempDir;

fn met_binary() -> String {
    env!("CARGO_BIN_EXE_met").to_string()
}

/// A session with one committed visit, a debounced re-entry and a
/// successful second visit, ending in page teardown.
const REENTRY_LOG: &str = concat!(
    r#"{"at":"2026-03-01T10:00:00Z","type":"intersection","module":"hero","ratio":0.6}"#,
    "\n",
    r#"{"at":"2026-03-01T10:00:05Z","type":"intersection","module":"hero","ratio":0.0}"#,
    "\n",
    r#"{"at":"2026-03-01T10:00:08Z","type":"intersection","module":"hero","ratio":0.6}"#,
    "\n",
    r#"{"at":"2026-03-01T10:00:16Z","type":"intersection","module":"hero","ratio":0.6}"#,
    "\n",
    r#"{"at":"2026-03-01T10:00:20Z","type":"page_unload"}"#,
    "\n",
);

fn write_log(temp: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = temp.path().join("events.jsonl");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    path
}

fn run_met(temp: &TempDir, args: &[&str]) -> std::process::Output {
    Command::new(met_binary())
        .env("HOME", temp.path())
        .args(args)
        .output()
        .expect("failed to run met")
}

#[test]
fn replay_emits_the_full_report_stream() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, REENTRY_LOG);

    let output = run_met(
        &temp,
        &[
            "replay",
            log.to_str().unwrap(),
            "--visitor",
            "v-1",
            "--session",
            "s-1",
        ],
    );
    assert!(
        output.status.success(),
        "replay should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let stdout = String::from_utf8(output.stdout).unwrap();
    insta::assert_snapshot!(stdout.trim_end(), @r#"
    {"kind":"visit_committed","visitorId":"v-1","moduleName":"hero","sessionId":"s-1","visitNumber":1,"dwellSeconds":2.0,"scrollDepth":60}
    {"kind":"visit_activity","visitorId":"v-1","moduleName":"hero","sessionId":"s-1","visitNumber":1,"dwellSeconds":5.0,"scrollDepth":60,"isFinal":true}
    {"kind":"visit_committed","visitorId":"v-1","moduleName":"hero","sessionId":"s-1","visitNumber":2,"dwellSeconds":2.0,"scrollDepth":60}
    {"kind":"visit_activity","visitorId":"v-1","moduleName":"hero","sessionId":"s-1","visitNumber":2,"dwellSeconds":4.0,"scrollDepth":60,"isFinal":false}
    {"kind":"visit_activity","visitorId":"v-1","moduleName":"hero","sessionId":"s-1","visitNumber":2,"dwellSeconds":4.0,"scrollDepth":60,"isFinal":true}
    {"kind":"session_end","sessionId":"s-1"}
    "#);
}

#[test]
fn replay_debounces_the_rapid_reentry() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, REENTRY_LOG);

    let output = run_met(
        &temp,
        &["replay", log.to_str().unwrap(), "--visitor", "v-1", "--session", "s-1"],
    );
    let stdout = String::from_utf8(output.stdout).unwrap();

    // The attempt at +8s (3s after close) must not create a visit: only
    // visit numbers 1 and 2 ever appear.
    let mut numbers = std::collections::BTreeSet::new();
    for line in stdout.lines() {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        if let Some(number) = value.get("visitNumber") {
            numbers.insert(number.as_u64().unwrap());
        }
    }
    assert_eq!(numbers.into_iter().collect::<Vec<_>>(), [1, 2]);
}

#[test]
fn summary_aggregates_per_module() {
    let temp = TempDir::new().unwrap();
    let log = write_log(&temp, REENTRY_LOG);

    let output = run_met(&temp, &["summary", log.to_str().unwrap(), "--json"]);
    assert!(
        output.status.success(),
        "summary should succeed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let summary: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("summary output is JSON");
    assert_eq!(
        summary,
        serde_json::json!({
            "hero": {
                "visits": 2,
                "committed": 2,
                "dwell_seconds": 9.0,
                "max_scroll_depth": 60,
                "interactions": 0
            }
        })
    );
}

#[test]
fn replay_rejects_malformed_log_lines() {
    let temp = TempDir::new().unwrap();
    let log = write_log(
        &temp,
        concat!(
            r#"{"at":"2026-03-01T10:00:00Z","type":"tick"}"#,
            "\n",
            "not an event\n"
        ),
    );

    let output = run_met(&temp, &["replay", log.to_str().unwrap()]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("line 2"), "unexpected stderr: {stderr}");
}

#[test]
fn replay_of_interaction_log_reports_clicks() {
    let temp = TempDir::new().unwrap();
    let log = write_log(
        &temp,
        concat!(
            r#"{"at":"2026-03-01T10:00:00Z","type":"intersection","module":"video","ratio":0.9}"#,
            "\n",
            r#"{"at":"2026-03-01T10:00:03Z","type":"click","module":"video","control":{"control":"mute","muted":true}}"#,
            "\n",
            r#"{"at":"2026-03-01T10:00:06Z","type":"page_unload"}"#,
            "\n",
        ),
    );

    let output = run_met(
        &temp,
        &["replay", log.to_str().unwrap(), "--visitor", "v-1", "--session", "s-1"],
    );
    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();

    let interaction = stdout
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|value| value["kind"] == "interaction")
        .expect("an interaction report");
    assert_eq!(interaction["interactionKind"], "video_unmute");
    assert_eq!(interaction["detail"], "player");
    assert_eq!(interaction["moduleName"], "video");
}
