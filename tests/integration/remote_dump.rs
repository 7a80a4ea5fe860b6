// Runs the binary against an in-process HTTP listener that answers like CouchDB.
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use predicates::prelude::*;
use serde_json::json;

use crate::{ids, stdout_json, BIN};

fn serve(responses: Vec<(u16, String)>) -> (String, thread::JoinHandle<Vec<String>>) {
  let listener = TcpListener::bind("127.0.0.1:0").unwrap();
  let addr = listener.local_addr().unwrap();

  let handle = thread::spawn(move || {
    let mut seen = Vec::new();
    for (status, body) in responses {
      let (mut stream, _) = listener.accept().unwrap();
      seen.push(read_request(&mut stream));
      let reply = format!(
        "HTTP/1.1 {} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
      );
      stream.write_all(reply.as_bytes()).unwrap();
      stream.flush().unwrap();
    }
    seen
  });

  (addr.to_string(), handle)
}

fn read_request(stream: &mut TcpStream) -> String {
  let mut buf = Vec::new();
  let mut chunk = [0u8; 4096];
  loop {
    let n = stream.read(&mut chunk).unwrap();
    if n == 0 {
      break;
    }
    buf.extend_from_slice(&chunk[..n]);
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
      let head = String::from_utf8_lossy(&buf[..pos]).to_lowercase();
      let len = head
        .lines()
        .find_map(|l| l.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
      while buf.len() < pos + 4 + len {
        let n = stream.read(&mut chunk).unwrap();
        if n == 0 {
          break;
        }
        buf.extend_from_slice(&chunk[..n]);
      }
      break;
    }
  }
  String::from_utf8_lossy(&buf).to_string()
}

/// The binary, pointed at `addr` with no proxy inherited from the environment.
fn cmd_for(addr: &str) -> assert_cmd::Command {
  let mut cmd = test_support::cmd_bin(BIN);
  for var in ["HTTP_PROXY", "http_proxy", "HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"] {
    cmd.env_remove(var);
  }
  cmd.arg(format!("http://{}/db", addr));
  cmd
}

fn all_docs_body() -> String {
  json!({
    "total_rows": 2,
    "offset": 0,
    "rows": [
      {"id": "a", "key": "a", "value": {"rev": "1-x"}, "doc": {"_id": "a", "_rev": "1-x", "n": 1}},
      {"key": "zz", "error": "not_found"},
      {"id": "b", "key": "b", "value": {"rev": "1-y"}, "doc": {"_id": "b", "_rev": "1-y", "n": 2}}
    ]
  })
  .to_string()
}

#[test]
fn remote_dump_sends_basic_auth_and_cleans_rows() {
  let (addr, server) = serve(vec![
    (200, json!({"db_name": "db"}).to_string()),
    (200, all_docs_body()),
  ]);

  let out = cmd_for(&addr)
    .args(["-u", "admin", "-p", "secret"])
    .output()
    .unwrap();

  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  assert_eq!(ids(&stdout_json(&out)), vec!["a", "b"]);

  let seen = server.join().unwrap();
  assert!(seen[0].starts_with("GET /db HTTP/1.1"));
  assert!(seen[1].starts_with("GET /db/_all_docs?include_docs=true HTTP/1.1"));
  for req in &seen {
    // base64("admin:secret")
    assert!(req.to_lowercase().contains("authorization: basic ywrtaw46c2vjcmv0"), "{req}");
  }
}

#[test]
fn remote_keys_are_posted() {
  let (addr, server) = serve(vec![
    (200, json!({"db_name": "db"}).to_string()),
    (200, all_docs_body()),
  ]);

  let out = cmd_for(&addr)
    .args(["-k", "a", "zz", "b"])
    .output()
    .unwrap();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

  let seen = server.join().unwrap();
  assert!(seen[1].starts_with("POST /db/_all_docs?include_docs=true HTTP/1.1"), "{}", seen[1]);
  assert!(seen[1].ends_with(r#"{"keys":["a","zz","b"]}"#), "{}", seen[1]);
}

#[test]
fn remote_errors_exit_non_zero_without_leaking_the_password() {
  let (addr, server) = serve(vec![(
    401,
    json!({"error": "unauthorized", "reason": "Name or password is incorrect."}).to_string(),
  )]);

  cmd_for(&addr)
    .args(["-u", "admin", "-p", "hunter2"])
    .assert()
    .code(1)
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains("unauthorized"))
    .stderr(predicate::str::contains("hunter2").not());

  server.join().unwrap();
}

fn request_body(req: &str) -> serde_json::Value {
  let body = req.split_once("\r\n\r\n").map(|(_, b)| b).unwrap_or_default();
  serde_json::from_str(body).unwrap_or_else(|e| panic!("request body is not JSON ({e}): {req}"))
}

fn color_rows_body() -> String {
  json!({
    "total_rows": 3,
    "offset": 0,
    "rows": [
      {"id": "1", "key": "1", "value": {"rev": "1-a"}, "doc": {"_id": "1", "_rev": "1-a", "color": "red"}},
      {"id": "2", "key": "2", "value": {"rev": "1-b"}, "doc": {"_id": "2", "_rev": "1-b", "color": "blue"}},
      {"id": "3", "key": "3", "value": {"rev": "1-c"}, "doc": {"_id": "3", "_rev": "1-c"}}
    ]
  })
  .to_string()
}

#[test]
fn remote_view_key_without_design_doc_filters_a_full_listing() {
  let (addr, server) = serve(vec![
    (200, json!({"db_name": "db"}).to_string()),
    (200, color_rows_body()),
  ]);

  let out = cmd_for(&addr).args(["--vk", "color", "-k", "red"]).output().unwrap();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  assert_eq!(stdout_json(&out), json!([{"_id": "1", "_rev": "1-a", "color": "red"}]));

  let seen = server.join().unwrap();
  assert_eq!(seen.len(), 2, "nothing is written to the database");
  assert!(seen[0].starts_with("GET /db HTTP/1.1"), "{}", seen[0]);
  assert!(seen[1].starts_with("GET /db/_all_docs?include_docs=true HTTP/1.1"), "{}", seen[1]);
}

#[test]
fn remote_view_key_with_design_doc_saves_then_queries_the_view() {
  let view_rows = json!({
    "total_rows": 2,
    "offset": 1,
    "rows": [
      {"id": "1", "key": "red", "value": null, "doc": {"_id": "1", "_rev": "1-a", "color": "red"}}
    ]
  })
  .to_string();
  let (addr, server) = serve(vec![
    (200, json!({"db_name": "db"}).to_string()),
    (404, json!({"error": "not_found", "reason": "missing"}).to_string()),
    (201, json!({"ok": true, "id": "_design/dump-select", "rev": "1-abc"}).to_string()),
    (200, view_rows),
  ]);

  let out = cmd_for(&addr).args(["--vk", "color", "-k", "red", "--dd"]).output().unwrap();
  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  assert_eq!(ids(&stdout_json(&out)), vec!["1"]);

  let seen = server.join().unwrap();
  assert!(seen[0].starts_with("GET /db HTTP/1.1"), "{}", seen[0]);
  assert!(seen[1].starts_with("GET /db/_design/dump-select HTTP/1.1"), "{}", seen[1]);
  assert!(seen[2].starts_with("PUT /db/_design/dump-select HTTP/1.1"), "{}", seen[2]);
  assert!(
    seen[3].starts_with("GET /db/_design/dump-select/_view/by_color?include_docs=true&key=%22red%22 HTTP/1.1"),
    "{}",
    seen[3]
  );

  let design = request_body(&seen[2]);
  assert_eq!(design["_id"], json!("_design/dump-select"));
  assert_eq!(design["language"], json!("javascript"));
  assert_eq!(
    design["views"]["by_color"]["map"],
    json!("function(doc){if(doc.color)emit(doc.color);}")
  );
  assert!(design["views"]["by_color"].get("reduce").is_none());
}
