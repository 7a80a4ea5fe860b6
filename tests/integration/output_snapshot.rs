use crate::{color_db, stdout_json, BIN};

#[test]
fn pretty_key_value_dump_snapshot() {
  test_support::init_insta();
  let db = color_db();

  let out = test_support::cmd_bin(BIN)
    .arg(db.path())
    .args(["--vk", "color", "--dd", "--pretty"])
    .output()
    .unwrap();

  assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
  let text = String::from_utf8_lossy(&out.stdout);
  assert!(text.starts_with("[\n  {"), "pretty output expected: {text}");

  insta::assert_json_snapshot!(stdout_json(&out), @r#"
  [
    {
      "_id": "2",
      "color": "blue"
    },
    {
      "_id": "1",
      "color": "red"
    }
  ]
  "#);
}

#[test]
fn full_dump_after_persisting_includes_the_design_document() {
  test_support::init_insta();
  let db = color_db();

  let persisted = test_support::cmd_bin(BIN).arg(db.path()).args(["--vk", "color", "--dd"]).output().unwrap();
  assert!(persisted.status.success());

  let out = test_support::cmd_bin(BIN).arg(db.path()).output().unwrap();
  assert!(out.status.success());

  insta::assert_json_snapshot!(stdout_json(&out), @r#"
  [
    {
      "_id": "1",
      "color": "red"
    },
    {
      "_id": "2",
      "color": "blue"
    },
    {
      "_id": "3"
    },
    {
      "_id": "_design/dump-select",
      "_rev": "1-local",
      "language": "javascript",
      "views": {
        "by_color": {
          "map": "function(doc){if(doc.color)emit(doc.color);}"
        }
      }
    }
  ]
  "#);
}
