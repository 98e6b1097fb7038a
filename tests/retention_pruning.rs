use rusqlite::Connection;
use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_millis() as i64
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_quizd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn quizd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let resp: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "expected ok for {}: {}",
        method,
        resp
    );
    resp.get("result").cloned().expect("result")
}

/// Seed the store database the way a previous run would have left it.
fn prime_records(workspace: &Path, records: &[(&str, String)]) {
    let conn = Connection::open(workspace.join("quizd.sqlite3")).expect("open db");
    conn.execute(
        "CREATE TABLE IF NOT EXISTS records(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .expect("create table");
    for (key, value) in records {
        conn.execute(
            "INSERT INTO records(key, value) VALUES(?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            (*key, value.as_str()),
        )
        .expect("insert record");
    }
}

fn archived_session(id: &str, start_time: i64) -> serde_json::Value {
    json!({
        "id": id,
        "sourceQuizId": "quiz1",
        "questions": [],
        "currentQuestionIndex": 0,
        "answers": {},
        "startTime": start_time,
        "endTime": start_time + 60_000,
        "isCompleted": true
    })
}

#[test]
fn workspace_open_prunes_history_to_ten_newest() {
    let workspace = temp_dir("quizd-retention-count");
    let now = now_ms();

    // Fifteen recent sessions plus one well past the seven-day window.
    let mut sessions: Vec<serde_json::Value> = (0..15)
        .map(|i| archived_session(&format!("s{}", i), now - (i as i64) * 60_000))
        .collect();
    sessions.push(archived_session("expired", now - 8 * 24 * 60 * 60 * 1000));
    prime_records(
        &workspace,
        &[("sessions", serde_json::to_string(&sessions).expect("serialize"))],
    );

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let listed = request_ok(&mut stdin, &mut reader, "l1", "sessions.list", json!({}));
    let kept = listed.get("sessions").and_then(|v| v.as_array()).expect("sessions");
    assert_eq!(kept.len(), 10);
    let ids: Vec<&str> = kept
        .iter()
        .map(|s| s.get("id").and_then(|v| v.as_str()).expect("id"))
        .collect();
    assert!(!ids.contains(&"expired"));
    // Newest first: s0 had the most recent start.
    assert_eq!(ids[0], "s0");
    assert!(!ids.contains(&"s14"));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn stale_current_session_is_cleared_on_open() {
    let workspace = temp_dir("quizd-retention-stale");
    let now = now_ms();
    let stale = archived_session("abandoned", now - 25 * 60 * 60 * 1000);
    prime_records(
        &workspace,
        &[("currentSession", serde_json::to_string(&stale).expect("serialize"))],
    );

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let current = request_ok(&mut stdin, &mut reader, "c1", "session.current", json!({}));
    assert!(current.get("session").map(|v| v.is_null()).unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn fresh_current_session_survives_reopen() {
    let workspace = temp_dir("quizd-retention-fresh");
    let now = now_ms();
    let in_flight = json!({
        "id": "inflight",
        "sourceQuizId": "quiz1",
        "questions": [{
            "id": "q1",
            "prompt": "?",
            "options": { "a": "1", "b": "2", "c": "3", "d": "4" },
            "correctAnswer": "a",
            "categoryId": "general-knowledge"
        }],
        "currentQuestionIndex": 0,
        "answers": {},
        "startTime": now - 60_000,
        "isCompleted": false
    });
    prime_records(
        &workspace,
        &[("currentSession", serde_json::to_string(&in_flight).expect("serialize"))],
    );

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let current = request_ok(&mut stdin, &mut reader, "c1", "session.current", json!({}));
    assert_eq!(
        current.pointer("/session/id").and_then(|v| v.as_str()),
        Some("inflight")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn corrupt_current_session_is_dropped_not_fatal() {
    let workspace = temp_dir("quizd-retention-corrupt");
    prime_records(&workspace, &[("currentSession", "{not valid json".to_string())]);

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let current = request_ok(&mut stdin, &mut reader, "c1", "session.current", json!({}));
    assert!(current.get("session").map(|v| v.is_null()).unwrap_or(false));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn existing_user_records_are_not_reseeded_on_open() {
    let workspace = temp_dir("quizd-retention-noseed");
    let my_categories = json!([{
        "id": "my-topic",
        "name": "My Topic",
        "description": "mine",
        "questionCount": 0
    }]);
    prime_records(
        &workspace,
        &[
            ("categories", serde_json::to_string(&my_categories).expect("serialize")),
            ("questions", "[]".to_string()),
        ],
    );

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "c1", "categories.list", json!({}));
    let categories = listed
        .get("categories")
        .and_then(|v| v.as_array())
        .expect("categories");
    assert_eq!(categories.len(), 1);
    assert_eq!(
        categories[0].get("id").and_then(|v| v.as_str()),
        Some("my-topic")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
