// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Typed error kinds shared by the selector, the store clients and the URL builder
// role: errors/types
// outputs: DumpError (Configuration | Validation | Store | Io | Json) and the crate Result alias
// invariants: Every fallible operation below the binary edge returns DumpError; main converts to anyhow
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = DumpError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum DumpError {
  /// Bad credential pairing or an unusable target.
  #[error("configuration error: {0}")]
  Configuration(String),

  /// A required argument is missing or malformed.
  #[error("validation error: {0}")]
  Validation(String),

  /// Any failure reported by (or while talking to) the document store.
  #[error("store error{}: {error}: {reason}", status_suffix(.status))]
  Store {
    status: Option<u16>,
    error: String,
    reason: String,
  },

  #[error("io error on {}: {source}", .path.display())]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error(transparent)]
  Json(#[from] serde_json::Error),
}

fn status_suffix(status: &Option<u16>) -> String {
  status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

impl DumpError {
  pub fn config(msg: impl Into<String>) -> Self {
    DumpError::Configuration(msg.into())
  }

  pub fn validation(msg: impl Into<String>) -> Self {
    DumpError::Validation(msg.into())
  }

  pub fn store(status: Option<u16>, error: impl Into<String>, reason: impl Into<String>) -> Self {
    DumpError::Store {
      status,
      error: error.into(),
      reason: reason.into(),
    }
  }

  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    DumpError::Io {
      path: path.into(),
      source,
    }
  }

  /// HTTP-style status of a store failure, when the store reported one.
  pub fn status(&self) -> Option<u16> {
    match self {
      DumpError::Store { status, .. } => *status,
      _ => None,
    }
  }
}
