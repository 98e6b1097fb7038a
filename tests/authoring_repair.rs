use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
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

fn request(
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
    serde_json::from_str(line.trim()).expect("parse response json")
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let resp = request(stdin, reader, id, method, params);
    assert_eq!(
        resp.get("ok").and_then(|v| v.as_bool()),
        Some(true),
        "expected ok for {}: {}",
        method,
        resp
    );
    resp.get("result").cloned().expect("result")
}

fn error_code(resp: &serde_json::Value) -> &str {
    assert_eq!(resp.get("ok").and_then(|v| v.as_bool()), Some(false));
    resp.get("error")
        .and_then(|e| e.get("code"))
        .and_then(|v| v.as_str())
        .expect("error code")
}

fn question_params(category_id: &str, prompt: &str) -> serde_json::Value {
    json!({
        "prompt": prompt,
        "options": { "a": "1", "b": "2", "c": "3", "d": "4" },
        "correctAnswer": "a",
        "categoryId": category_id
    })
}

#[test]
fn category_names_slug_to_ids_and_duplicates_are_rejected() {
    let workspace = temp_dir("quizd-authoring-slug");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let created = request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "categories.create",
        json!({ "name": "  World   Capitals " }),
    );
    assert_eq!(
        created.get("categoryId").and_then(|v| v.as_str()),
        Some("world-capitals")
    );

    // A different name with the same derived id collides.
    let dup = request(
        &mut stdin,
        &mut reader,
        "c2",
        "categories.create",
        json!({ "name": "world capitals" }),
    );
    assert_eq!(error_code(&dup), "category_exists");

    // Renaming keeps the original id.
    request_ok(
        &mut stdin,
        &mut reader,
        "c3",
        "categories.update",
        json!({ "categoryId": "world-capitals", "name": "Capitals of the World" }),
    );
    let listed = request_ok(&mut stdin, &mut reader, "c4", "categories.list", json!({}));
    let renamed = listed
        .get("categories")
        .and_then(|v| v.as_array())
        .expect("categories")
        .iter()
        .find(|c| c.get("id").and_then(|v| v.as_str()) == Some("world-capitals"))
        .expect("renamed category")
        .clone();
    assert_eq!(
        renamed.get("name").and_then(|v| v.as_str()),
        Some("Capitals of the World")
    );

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn deleting_a_category_cascades_to_its_loose_questions() {
    let workspace = temp_dir("quizd-authoring-cascade");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "c1",
        "categories.create",
        json!({ "name": "Doomed" }),
    );
    for i in 0..3 {
        request_ok(
            &mut stdin,
            &mut reader,
            &format!("q{}", i),
            "questions.create",
            question_params("doomed", &format!("Doomed question {}?", i)),
        );
    }
    let history_before = request_ok(
        &mut stdin,
        &mut reader,
        "h1",
        "questions.list",
        json!({ "categoryId": "history" }),
    )
    .get("questions")
    .and_then(|v| v.as_array())
    .map(|a| a.len())
    .expect("history questions");

    let deleted = request_ok(
        &mut stdin,
        &mut reader,
        "d1",
        "categories.delete",
        json!({ "categoryId": "doomed" }),
    );
    assert_eq!(
        deleted.get("questionsRemoved").and_then(|v| v.as_u64()),
        Some(3)
    );

    let orphaned = request_ok(
        &mut stdin,
        &mut reader,
        "q4",
        "questions.list",
        json!({ "categoryId": "doomed" }),
    );
    assert_eq!(
        orphaned.get("questions").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );
    let history_after = request_ok(
        &mut stdin,
        &mut reader,
        "h2",
        "questions.list",
        json!({ "categoryId": "history" }),
    )
    .get("questions")
    .and_then(|v| v.as_array())
    .map(|a| a.len())
    .expect("history questions");
    assert_eq!(history_after, history_before);

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn question_creation_requires_an_existing_category_and_full_options() {
    let workspace = temp_dir("quizd-authoring-validate");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let ghost_category = request(
        &mut stdin,
        &mut reader,
        "q1",
        "questions.create",
        question_params("no-such-category", "Orphan?"),
    );
    assert_eq!(error_code(&ghost_category), "not_found");

    let blank_option = request(
        &mut stdin,
        &mut reader,
        "q2",
        "questions.create",
        json!({
            "prompt": "Partial?",
            "options": { "a": "1", "b": "", "c": "3", "d": "4" },
            "correctAnswer": "a",
            "categoryId": "science"
        }),
    );
    assert_eq!(error_code(&blank_option), "bad_params");

    let bad_answer = request(
        &mut stdin,
        &mut reader,
        "q3",
        "questions.create",
        json!({
            "prompt": "Which?",
            "options": { "a": "1", "b": "2", "c": "3", "d": "4" },
            "correctAnswer": "e",
            "categoryId": "science"
        }),
    );
    assert_eq!(error_code(&bad_answer), "bad_params");

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn repair_restores_missing_defaults_but_keeps_user_content() {
    let workspace = temp_dir("quizd-authoring-repair");
    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    request_ok(
        &mut stdin,
        &mut reader,
        "ws",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    // Wipe everything, add user content, then repair.
    request_ok(&mut stdin, &mut reader, "w1", "storage.clearAll", json!({}));
    let summary = request_ok(&mut stdin, &mut reader, "r1", "storage.repair", json!({}));
    assert_eq!(
        summary.get("categoriesAdded").and_then(|v| v.as_u64()),
        Some(4)
    );
    assert_eq!(
        summary.get("questionsAdded").and_then(|v| v.as_u64()),
        Some(5)
    );

    request_ok(
        &mut stdin,
        &mut reader,
        "u1",
        "categories.create",
        json!({ "name": "Mine" }),
    );
    request_ok(
        &mut stdin,
        &mut reader,
        "u2",
        "questions.create",
        question_params("mine", "My question?"),
    );

    let again = request_ok(&mut stdin, &mut reader, "r2", "storage.repair", json!({}));
    assert_eq!(again.get("categoriesAdded").and_then(|v| v.as_u64()), Some(0));
    assert_eq!(again.get("questionsAdded").and_then(|v| v.as_u64()), Some(0));

    let listed = request_ok(&mut stdin, &mut reader, "l1", "categories.list", json!({}));
    let categories = listed
        .get("categories")
        .and_then(|v| v.as_array())
        .expect("categories");
    assert_eq!(categories.len(), 5);
    let mine = categories
        .iter()
        .find(|c| c.get("id").and_then(|v| v.as_str()) == Some("mine"))
        .expect("user category kept");
    assert_eq!(mine.get("questionCount").and_then(|v| v.as_u64()), Some(1));

    drop(stdin);
    let _ = child.wait();
    let _ = std::fs::remove_dir_all(workspace);
}
