use predicates::prelude::*;

use crate::{color_db, BIN};

#[test]
fn help_prints_usage_and_exits_1() {
  for flag in ["-h", "--help"] {
    test_support::cmd_bin(BIN)
      .arg(flag)
      .assert()
      .code(1)
      .stdout(predicate::str::contains("Usage:"))
      .stdout(predicate::str::contains("--vk"));
  }
}

#[test]
fn missing_target_prints_hint_and_exits_1() {
  test_support::cmd_bin(BIN)
    .assert()
    .code(1)
    .stdout(predicate::str::is_empty())
    .stderr(predicate::str::contains(
      "You need to supply a database URL or filepath. -h for help",
    ));
}

#[test]
fn view_and_view_key_together_is_rejected() {
  let db = color_db();
  test_support::cmd_bin(BIN)
    .arg(db.path())
    .args(["-v", "app/by_color", "--vk", "color"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains(
      "You can't fetch from a view and a key-value pair at the same time.",
    ));
}

#[test]
fn malformed_query_option_is_rejected() {
  let db = color_db();
  test_support::cmd_bin(BIN)
    .arg(db.path())
    .args(["-q", "limit"])
    .assert()
    .code(1)
    .stderr(predicate::str::contains("NAME=VALUE"));
}

#[test]
fn unsupported_scheme_is_a_configuration_error() {
  test_support::cmd_bin(BIN)
    .arg("ftp://example.com/db")
    .assert()
    .code(1)
    .stderr(predicate::str::contains("unsupported scheme 'ftp'"));
}

#[test]
fn version_flag_succeeds() {
  test_support::cmd_bin(BIN)
    .arg("-V")
    .assert()
    .success()
    .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}
