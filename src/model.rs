// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the store-facing JSON model (documents, query rows, design documents) shared by stores and the selector
// role: model/types
// outputs: Document alias; Row/RowSet mirroring CouchDB query results; DesignDocument/ViewDefinition
// invariants: Unknown fields of design documents and view definitions survive a read/modify/write cycle (flattened extras)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An opaque store document; always carries `_id`.
pub type Document = serde_json::Map<String, Value>;

pub const DESIGN_PREFIX: &str = "_design/";

pub fn design_id(name: &str) -> String {
  format!("{}{}", DESIGN_PREFIX, name)
}

pub fn is_design_id(id: &str) -> bool {
  id.starts_with(DESIGN_PREFIX)
}

/// One entry of an `_all_docs` or view result.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Row {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id: Option<String>,
  #[serde(default)]
  pub key: Value,
  #[serde(default)]
  pub value: Value,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub doc: Option<Value>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}

impl Row {
  pub fn not_found(key: Value) -> Self {
    Row {
      key,
      error: Some("not_found".into()),
      ..Row::default()
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowSet {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub total_rows: Option<u64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub offset: Option<u64>,
  #[serde(default)]
  pub rows: Vec<Row>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ViewDefinition {
  #[serde(default, skip_serializing_if = "String::is_empty")]
  pub map: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub reduce: Option<String>,
  #[serde(flatten)]
  pub extra: Document,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignDocument {
  #[serde(rename = "_id")]
  pub id: String,
  #[serde(rename = "_rev", default, skip_serializing_if = "Option::is_none")]
  pub rev: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub language: Option<String>,
  #[serde(default)]
  pub views: BTreeMap<String, ViewDefinition>,
  #[serde(flatten)]
  pub extra: Document,
}

impl DesignDocument {
  /// A fresh, unsaved design document named `_design/<name>`.
  pub fn new(name: &str) -> Self {
    DesignDocument {
      id: design_id(name),
      rev: None,
      language: Some("javascript".into()),
      views: BTreeMap::new(),
      extra: Document::new(),
    }
  }

  /// Copy of `self` with view `name` set to `map`/`reduce`; other view fields are kept.
  pub fn with_view(&self, name: &str, map: &str, reduce: Option<&str>) -> Self {
    let mut next = self.clone();
    let view = next.views.entry(name.to_string()).or_default();
    view.map = map.to_string();
    view.reduce = reduce.map(str::to_string);
    next
  }
}
