// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: The generated single-field map function: validate the field path, render JS source, parse it back, evaluate natively
// role: query/map-function
// inputs: field name (dotted identifier path) or a JS map source string
// outputs: FieldEmitter with source(), view_name(), emit()
// invariants:
// - source() is `function(doc){if(doc.F)emit(doc.F);}` for a single segment, with a guard chain for nested paths
// - parse(source()) round-trips; any other source is not recognized
// - emit() emits the field value exactly when it is JS-truthy
// errors: DumpError::Validation for an empty or non-identifier field path
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::error::{DumpError, Result};
use crate::ext::serde_json::{JsonFetch, Truthy};

static RE_FIELD_PATH: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$").expect("field path regex"));

static RE_EMIT: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"emit\(doc\.([A-Za-z0-9_$.]+)\);?\}$").expect("emit regex"));

/// Emits `doc.<field>` as the key of every document where that field is truthy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldEmitter {
  field: String,
}

impl FieldEmitter {
  pub fn new(field: &str) -> Result<Self> {
    if field.is_empty() {
      return Err(DumpError::validation("the key parameter must not be empty"));
    }
    if !RE_FIELD_PATH.is_match(field) {
      return Err(DumpError::validation(format!(
        "'{}' is not a field path (expected identifiers separated by '.')",
        field
      )));
    }
    Ok(FieldEmitter {
      field: field.to_string(),
    })
  }

  pub fn field(&self) -> &str {
    &self.field
  }

  pub fn view_name(&self) -> String {
    format!("by_{}", self.field)
  }

  /// JS map source understood by CouchDB.
  pub fn source(&self) -> String {
    let segments: Vec<&str> = self.field.split('.').collect();
    let guard = (1..=segments.len())
      .map(|n| format!("doc.{}", segments[..n].join(".")))
      .collect::<Vec<_>>()
      .join("&&");
    format!("function(doc){{if({})emit(doc.{});}}", guard, self.field)
  }

  /// Recognize a source produced by [`FieldEmitter::source`]; whitespace is ignored.
  pub fn parse(source: &str) -> Option<Self> {
    let compact: String = source.chars().filter(|c| !c.is_whitespace()).collect();
    let caps = RE_EMIT.captures(&compact)?;
    let emitter = FieldEmitter::new(caps.get(1)?.as_str()).ok()?;
    (emitter.source() == compact).then_some(emitter)
  }

  /// The emitted key for `doc`, if any.
  pub fn emit(&self, doc: &Value) -> Option<Value> {
    doc
      .fetch(&self.field)
      .value()
      .filter(|v| v.is_truthy())
      .cloned()
  }
}
