// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Query options (free-form + built-in defaults), key selection, and client-side evaluation of _all_docs and views
// role: query/evaluation
// inputs: QueryOptions; document maps keyed by _id; FieldEmitter
// outputs: merged QueryOptions; RowSet shaped like a CouchDB response
// invariants:
// - merge_options: built-in defaults win; a default key filter displaces any caller key/keys
// - _all_docs rows follow _id byte order; with keys, one row per key in request order (missing => not_found)
// - view rows follow CouchDB collation of the emitted key, then doc id; design docs are never mapped
// errors: DumpError::Validation for option values of the wrong type
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::error::{DumpError, Result};
use crate::mapfn::FieldEmitter;
use crate::model::{is_design_id, Row, RowSet};

/// Free-form query parameters, named as CouchDB names them.
pub type QueryOptions = serde_json::Map<String, Value>;

/// Which keys a fetch is restricted to.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum KeySelection {
  #[default]
  All,
  One(Value),
  Many(Vec<Value>),
}

impl KeySelection {
  /// No keys selects everything; one key uses `key`; several use `keys`.
  pub fn from_keys<I, T>(keys: I) -> Self
  where
    I: IntoIterator<Item = T>,
    T: Into<Value>,
  {
    let mut keys: Vec<Value> = keys.into_iter().map(Into::into).collect();
    match keys.len() {
      0 => KeySelection::All,
      1 => KeySelection::One(keys.remove(0)),
      _ => KeySelection::Many(keys),
    }
  }

  fn apply(&self, opts: &mut QueryOptions) {
    match self {
      KeySelection::All => {}
      KeySelection::One(k) => {
        opts.insert("key".into(), k.clone());
      }
      KeySelection::Many(ks) => {
        opts.insert("keys".into(), Value::Array(ks.clone()));
      }
    }
  }
}

/// `include_docs` plus the key filter.
pub fn default_options(keys: &KeySelection) -> QueryOptions {
  let mut opts = QueryOptions::new();
  opts.insert("include_docs".into(), Value::Bool(true));
  keys.apply(&mut opts);
  opts
}

/// Lay `defaults` over the caller's options.
pub fn merge_options(caller: Option<&QueryOptions>, defaults: QueryOptions) -> QueryOptions {
  let mut merged = caller.cloned().unwrap_or_default();

  if defaults.contains_key("key") || defaults.contains_key("keys") {
    merged.remove("key");
    merged.remove("keys");
  }
  for (k, v) in defaults {
    merged.insert(k, v);
  }

  merged
}

#[derive(Debug, Default)]
struct LocalQuery {
  include_docs: bool,
  key: Option<Value>,
  keys: Option<Vec<Value>>,
  descending: bool,
  skip: usize,
  limit: Option<usize>,
}

fn as_bool(name: &str, v: &Value) -> Result<bool> {
  match v {
    Value::Bool(b) => Ok(*b),
    Value::String(s) if s == "true" => Ok(true),
    Value::String(s) if s == "false" => Ok(false),
    _ => Err(DumpError::validation(format!("query option '{}' must be a boolean", name))),
  }
}

fn as_usize(name: &str, v: &Value) -> Result<usize> {
  let n = match v {
    Value::Number(n) => n.as_u64(),
    Value::String(s) => s.parse::<u64>().ok(),
    _ => None,
  };
  n.and_then(|n| usize::try_from(n).ok())
    .ok_or_else(|| DumpError::validation(format!("query option '{}' must be a non-negative integer", name)))
}

impl LocalQuery {
  fn from_options(opts: &QueryOptions) -> Result<Self> {
    let mut q = LocalQuery::default();

    for (name, value) in opts {
      match name.as_str() {
        "include_docs" => q.include_docs = as_bool(name, value)?,
        "key" => q.key = Some(value.clone()),
        "keys" => {
          let keys = value
            .as_array()
            .cloned()
            .ok_or_else(|| DumpError::validation("query option 'keys' must be an array"))?;
          q.keys = Some(keys);
        }
        "descending" => q.descending = as_bool(name, value)?,
        "skip" => q.skip = as_usize(name, value)?,
        "limit" => q.limit = Some(as_usize(name, value)?),
        other => tracing::debug!(option = other, "query option ignored by client-side evaluation"),
      }
    }

    Ok(q)
  }

  fn finish(&self, mut rows: Vec<Row>, total: usize) -> RowSet {
    if self.descending {
      rows.reverse();
    }
    let rows: Vec<Row> = rows
      .into_iter()
      .skip(self.skip)
      .take(self.limit.unwrap_or(usize::MAX))
      .collect();

    RowSet {
      total_rows: Some(total as u64),
      offset: Some(self.skip as u64),
      rows,
    }
  }
}

pub fn is_deleted(doc: &Value) -> bool {
  doc.get("_deleted").and_then(Value::as_bool).unwrap_or(false)
}

fn rev_of(doc: &Value) -> Value {
  doc.get("_rev").cloned().unwrap_or(Value::Null)
}

fn doc_row(id: &str, doc: &Value, include_docs: bool) -> Row {
  Row {
    id: Some(id.to_string()),
    key: Value::String(id.to_string()),
    value: json!({ "rev": rev_of(doc) }),
    doc: include_docs.then(|| doc.clone()),
    error: None,
  }
}

/// Evaluate `_all_docs` over `docs` (keyed by `_id`, tombstones included).
pub fn evaluate_all_docs(docs: &BTreeMap<String, Value>, opts: &QueryOptions) -> Result<RowSet> {
  let q = LocalQuery::from_options(opts)?;
  let total = docs.values().filter(|d| !is_deleted(d)).count();

  let rows: Vec<Row> = match &q.keys {
    Some(keys) => keys
      .iter()
      .map(|k| match k.as_str().and_then(|id| docs.get_key_value(id)) {
        Some((id, d)) if is_deleted(d) => Row {
          id: Some(id.clone()),
          key: k.clone(),
          value: json!({ "rev": rev_of(d), "deleted": true }),
          doc: None,
          error: None,
        },
        Some((id, d)) => doc_row(id, d, q.include_docs),
        None => Row::not_found(k.clone()),
      })
      .collect(),
    None => docs
      .iter()
      .filter(|(_, d)| !is_deleted(d))
      .filter(|(id, _)| q.key.as_ref().map_or(true, |k| k.as_str() == Some(id.as_str())))
      .map(|(id, d)| doc_row(id, d, q.include_docs))
      .collect(),
  };

  Ok(q.finish(rows, total))
}

/// Evaluate the view defined by `emitter` over `docs`.
pub fn evaluate_view(docs: &BTreeMap<String, Value>, emitter: &FieldEmitter, opts: &QueryOptions) -> Result<RowSet> {
  let q = LocalQuery::from_options(opts)?;

  let mut emitted: Vec<Row> = docs
    .iter()
    .filter(|(id, d)| !is_design_id(id) && !is_deleted(d))
    .filter_map(|(id, d)| {
      emitter.emit(d).map(|key| Row {
        id: Some(id.clone()),
        key,
        value: Value::Null,
        doc: q.include_docs.then(|| d.clone()),
        error: None,
      })
    })
    .collect();
  emitted.sort_by(|a, b| collate(&a.key, &b.key).then_with(|| a.id.cmp(&b.id)));
  let total = emitted.len();

  let rows: Vec<Row> = if let Some(keys) = &q.keys {
    keys
      .iter()
      .flat_map(|k| {
        emitted
          .iter()
          .filter(move |r| collate(&r.key, k) == Ordering::Equal)
          .cloned()
      })
      .collect()
  } else if let Some(k) = &q.key {
    emitted
      .into_iter()
      .filter(|r| collate(&r.key, k) == Ordering::Equal)
      .collect()
  } else {
    emitted
  };

  Ok(q.finish(rows, total))
}

/// Documents of an `include_docs` result, keyed by `_id`.
pub fn docs_by_id(set: RowSet) -> BTreeMap<String, Value> {
  set
    .rows
    .into_iter()
    .filter(|r| r.error.is_none())
    .filter_map(|r| Some((r.id?, r.doc.filter(|d| !d.is_null())?)))
    .collect()
}

fn type_rank(v: &Value) -> u8 {
  match v {
    Value::Null => 0,
    Value::Bool(false) => 1,
    Value::Bool(true) => 2,
    Value::Number(_) => 3,
    Value::String(_) => 4,
    Value::Array(_) => 5,
    Value::Object(_) => 6,
  }
}

/// CouchDB view collation by type rank, then value.
///
/// Strings compare by Unicode code point, not by the ICU collation a CouchDB
/// server uses, so local order can differ from a server's: here `"Banana"`
/// sorts before `"apple"`, a server puts `"apple"` first.
pub fn collate(a: &Value, b: &Value) -> Ordering {
  let (ra, rb) = (type_rank(a), type_rank(b));
  if ra != rb {
    return ra.cmp(&rb);
  }

  match (a, b) {
    (Value::Number(x), Value::Number(y)) => {
      let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
      x.partial_cmp(&y).unwrap_or(Ordering::Equal)
    }
    (Value::String(x), Value::String(y)) => x.cmp(y),
    (Value::Array(x), Value::Array(y)) => x
      .iter()
      .zip(y.iter())
      .map(|(l, r)| collate(l, r))
      .find(|o| *o != Ordering::Equal)
      .unwrap_or_else(|| x.len().cmp(&y.len())),
    (Value::Object(x), Value::Object(y)) => x
      .iter()
      .zip(y.iter())
      .map(|((lk, lv), (rk, rv))| lk.cmp(rk).then_with(|| collate(lv, rv)))
      .find(|o| *o != Ordering::Equal)
      .unwrap_or_else(|| x.len().cmp(&y.len())),
    _ => Ordering::Equal,
  }
}
