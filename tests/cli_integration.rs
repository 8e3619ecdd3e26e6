// CLI integration tests for insert/get/query/aggregate flows and exit codes.
use std::io::Write;
use std::process::{Command, Output, Stdio};

use serde_json::Value;

fn cmd() -> Command {
    let exe = env!("CARGO_BIN_EXE_docshelf");
    Command::new(exe)
}

fn parse_json(value: &str) -> Value {
    serde_json::from_str(value).expect("valid json")
}

fn stdout_json(output: &Output) -> Value {
    parse_json(std::str::from_utf8(&output.stdout).expect("utf8"))
}

fn stderr_error(output: &Output) -> Value {
    let text = String::from_utf8_lossy(&output.stderr);
    let line = text.lines().last().expect("error line");
    parse_json(line)
}

fn run(dir: &str, args: &[&str]) -> Output {
    cmd().arg("--dir").arg(dir).args(args).output().expect("run")
}

fn seed_animals(dir: &str) {
    for (id, data) in [
        ("dinosaur", r#"{"Name":"Barney","Legs":2,"Beak":false}"#),
        ("chicken", r#"{"Name":"Clotilde","Legs":2,"Beak":true}"#),
        ("dog", r#"{"Name":"Wallander, Mortimer","Legs":4,"Beak":false}"#),
        ("cat", r#"{"Name":"Watson","Legs":3,"Beak":false}"#),
        ("ant", r#"{"Name":"Woody","Legs":5,"Beak":true}"#),
    ] {
        let insert = run(dir, &["insert", "animal", id, data]);
        assert!(insert.status.success(), "insert {id}");
    }
}

#[test]
fn insert_get_ids_delete_flow() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap();

    let insert = run(
        dir,
        &["insert", "person", "p0926", r#"{"Name":"James","Age":33,"Sex":false}"#],
    );
    assert!(insert.status.success());
    let insert_json = stdout_json(&insert);
    assert_eq!(insert_json["table"], "person");
    assert_eq!(insert_json["id"], "p0926");
    assert!(insert_json["path"].as_str().unwrap().ends_with("p0926.json"));
    assert!(temp.path().join("person").join("p0926.json").is_file());

    let get = run(dir, &["get", "person", "p0926"]);
    assert!(get.status.success());
    let get_json = stdout_json(&get);
    assert_eq!(get_json["Id"], "p0926");
    assert_eq!(get_json["Data"]["Name"], "James");
    assert_eq!(get_json["Data"]["Age"], 33);

    let ids = run(dir, &["ids", "person"]);
    assert!(ids.status.success());
    assert_eq!(stdout_json(&ids)["ids"], serde_json::json!(["p0926"]));

    let delete = run(dir, &["delete", "person", "p0926"]);
    assert!(delete.status.success());
    assert_eq!(stdout_json(&delete)["deleted"], serde_json::json!(["p0926"]));

    let ids = run(dir, &["ids", "person"]);
    assert!(ids.status.success());
    assert_eq!(stdout_json(&ids)["ids"], serde_json::json!([]));
}

#[test]
fn insert_reads_document_from_stdin() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap();

    let mut child = cmd()
        .args(["--dir", dir, "insert", "person", "q9823"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(br#"{"Name":"Jonas","Age":44,"Sex":true}"#)
        .expect("write stdin");
    let insert = child.wait_with_output().expect("wait");
    assert!(insert.status.success());

    let get = run(dir, &["get", "person", "q9823"]);
    assert_eq!(stdout_json(&get)["Data"]["Sex"], true);
}

#[test]
fn where_clauses_filter_queries_and_aggregates() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap();
    seed_animals(dir);

    let all = run(dir, &["all", "animal", "--where", "Beak=TRUE"]);
    assert!(all.status.success());
    let records = stdout_json(&all)["records"].clone();
    let keys: Vec<&str> = records
        .as_object()
        .expect("records object")
        .keys()
        .map(String::as_str)
        .collect();
    assert_eq!(keys, vec!["ant", "chicken"]);
    assert_eq!(records["chicken"]["Name"], "Clotilde");

    let count = run(dir, &["count", "animal"]);
    assert!(count.status.success());
    assert_eq!(stdout_json(&count)["count"], 5);

    let count = run(dir, &["count", "animal", "--where", "Legs=2"]);
    assert_eq!(stdout_json(&count)["count"], 2);

    let sum = run(dir, &["sum", "animal", "Legs"]);
    assert!(sum.status.success());
    assert_eq!(stdout_json(&sum)["sum"], 16);

    let sum = run(dir, &["sum", "animal", "Legs", "--where", "Beak=true"]);
    assert_eq!(stdout_json(&sum)["sum"], 7);
}

#[test]
fn missing_record_is_not_found() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap();
    seed_animals(dir);

    let get = run(dir, &["get", "animal", "unicorn"]);
    assert_eq!(get.status.code().unwrap(), 3);
    let err = stderr_error(&get);
    assert_eq!(err["error"]["kind"], "NotFound");
    assert_eq!(err["error"]["id"], "unicorn");
    assert!(err["error"]["hint"].as_str().unwrap().contains("docshelf ids animal"));

    let ids = run(dir, &["ids", "bird"]);
    assert_eq!(ids.status.code().unwrap(), 3);

    let delete = run(dir, &["delete", "animal", "unicorn"]);
    assert_eq!(delete.status.code().unwrap(), 3);
}

#[test]
fn usage_and_field_exit_codes() {
    let temp = tempfile::tempdir().expect("tempdir");
    let dir = temp.path().to_str().unwrap();
    seed_animals(dir);

    let not_json = run(dir, &["insert", "animal", "bad", "{not json"]);
    assert_eq!(not_json.status.code().unwrap(), 2);
    assert_eq!(stderr_error(&not_json)["error"]["kind"], "Usage");

    let not_object = run(dir, &["insert", "animal", "bad", "[1,2]"]);
    assert_eq!(not_object.status.code().unwrap(), 2);

    let bad_id = run(dir, &["insert", "animal", "..", "{}"]);
    assert_eq!(bad_id.status.code().unwrap(), 2);

    let bad_clause = run(dir, &["all", "animal", "--where", "Legs"]);
    assert_eq!(bad_clause.status.code().unwrap(), 2);

    let unknown = run(dir, &["frobnicate"]);
    assert_eq!(unknown.status.code().unwrap(), 2);

    let sum_text = run(dir, &["sum", "animal", "Name"]);
    assert_eq!(sum_text.status.code().unwrap(), 7);
    assert_eq!(stderr_error(&sum_text)["error"]["kind"], "Field");
}

#[test]
fn completion_emits_script() {
    let completion = cmd()
        .args(["completion", "bash"])
        .output()
        .expect("completion");
    assert!(completion.status.success());
    let script = String::from_utf8_lossy(&completion.stdout);
    assert!(script.contains("docshelf"));
}
