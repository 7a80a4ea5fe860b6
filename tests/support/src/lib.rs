//! test-support: helpers for robust, nextest-friendly tests.
//!
//! Add as a dev-dependency in your top-level `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! test_support = { path = "tests/support", features = ["serde"] }
//! ```
//!
//! Then in tests:
//! ```rust,ignore
//! use test_support::{cmd_bin, init_tracing, seed_local_store, tempdir};
//!
//! #[test]
//! fn example() {
//!     init_tracing();
//!     let db = tempdir();
//!     seed_local_store(db.path(), &[serde_json::json!({"_id": "a"})]);
//!     cmd_bin("dump-select").arg(db.path()).assert().success();
//! }
//! ```

use once_cell::sync::Lazy;
use tracing_subscriber::{fmt, EnvFilter};

use std::env;
#[cfg(feature = "serde")]
use std::path::{Path, PathBuf};

/// Initialize `tracing` once, honoring `RUST_LOG` and writing via the test writer.
///
/// Safe to call from multiple tests; only the first call configures the global subscriber.
pub fn init_tracing() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new("warn,test=info"))
            .unwrap();
        // with_test_writer() causes logs to appear alongside failing tests only (cargo/nextest)
        let _ = fmt().with_env_filter(filter).with_test_writer().try_init();
    });
    Lazy::force(&INIT);
}

/// Initialize insta snapshot settings once per test process.
///
/// - Omits `Expression:` in snapshot headers for cleaner diffs
/// - Sorts map keys so snapshots do not depend on serde_json's map ordering
pub fn init_insta() {
    static INIT: Lazy<()> = Lazy::new(|| {
        let mut settings = insta::Settings::clone_current();
        settings.set_omit_expression(true);
        settings.set_sort_maps(true);
        // Bind settings to the thread for the remainder of the test process by leaking the guard
        let guard = settings.bind_to_scope();
        std::mem::forget(guard);
    });
    Lazy::force(&INIT);
}

/// Create a temp directory that deletes on drop.
pub fn tempdir() -> tempfile::TempDir {
    tempfile::tempdir().expect("create tempdir")
}

/// Set multiple environment variables for the duration of the returned guard.
pub fn with_env(vars: &[(&str, &str)]) -> EnvGuard {
    EnvGuard::set_many(vars)
}

/// Run a binary target with `assert_cmd`, returning the ready-to-run `Command`.
///
/// `RUST_LOG` is cleared so the child logs at its default level.
pub fn cmd_bin(bin: &str) -> assert_cmd::Command {
    init_tracing();
    let mut cmd = assert_cmd::Command::cargo_bin(bin).expect("binary target not found");
    cmd.env_remove("RUST_LOG");
    cmd
}

/// Write `docs` into `dir` the way the local store lays them out: one `<encoded _id>.json` per document.
#[cfg(feature = "serde")]
pub fn seed_local_store(dir: &Path, docs: &[serde_json::Value]) -> Vec<PathBuf> {
    use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

    const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
        .remove(b'-')
        .remove(b'_')
        .remove(b'.')
        .remove(b'!')
        .remove(b'~')
        .remove(b'*')
        .remove(b'\'')
        .remove(b'(')
        .remove(b')');

    std::fs::create_dir_all(dir).expect("create database dir");
    docs.iter()
        .map(|doc| {
            let id = doc["_id"].as_str().expect("seed documents need a string _id");
            let path = dir.join(format!("{}.json", utf8_percent_encode(id, COMPONENT)));
            std::fs::write(&path, serde_json::to_vec_pretty(doc).expect("serialize seed"))
                .unwrap_or_else(|e| panic!("failed to seed {}: {e}", path.display()));
            tracing::debug!(path = %path.display(), "seeded document");
            path
        })
        .collect()
}

/// Read and parse a JSON file written by the binary.
#[cfg(feature = "serde")]
pub fn read_json(path: &Path) -> serde_json::Value {
    let data = std::fs::read(path).unwrap_or_else(|e| panic!("failed to read {}: {e}", path.display()));
    serde_json::from_slice(&data).unwrap_or_else(|e| panic!("failed to parse {}: {e}", path.display()))
}

/// Guard for temporarily setting environment variables.
pub struct EnvGuard {
    prev: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn set_many(kv: &[(&str, &str)]) -> Self {
        let mut prev = Vec::with_capacity(kv.len());
        for (k, v) in kv {
            let k_owned = k.to_string();
            prev.push((k_owned.clone(), env::var(k).ok()));
            env::set_var(k, v);
        }
        Self { prev }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (k, old) in self.prev.drain(..) {
            match old {
                Some(v) => env::set_var(&k, v),
                None => env::remove_var(&k),
            }
        }
    }
}
