// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Nested document field access via dotted paths, plus JS-style truthiness, for serde_json::Value
// role: extension/serde_json
// outputs: JsonFetch trait, JsonFetched wrapper, Truthy trait
// invariants: No panics; missing paths and non-object hops yield None; truthiness follows JS (null/false/0/"" are falsy)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Wrapper around a JSON location to allow typed extraction via a clear second step.
pub struct JsonFetched<'a> {
  inner: Option<&'a Value>,
}

impl<'a> JsonFetched<'a> {
  /// The raw value at the fetched location, if any.
  pub fn value(&self) -> Option<&'a Value> {
    self.inner
  }

  /// Attempt to deserialize the fetched value as `T`.
  pub fn to<T>(&self) -> Option<T>
  where
    T: DeserializeOwned,
  {
    self.inner.and_then(|v| serde_json::from_value::<T>(v.clone()).ok())
  }
}

/// Extension to fetch nested values via dotted paths like "address.city".
pub trait JsonFetch {
  fn fetch(&self, path: &str) -> JsonFetched<'_>;
}

impl JsonFetch for Value {
  fn fetch(&self, path: &str) -> JsonFetched<'_> {
    if path.is_empty() {
      return JsonFetched { inner: Some(self) };
    }

    let mut cur = self;

    for key in path.split('.') {
      match cur.as_object().and_then(|o| o.get(key)) {
        Some(next) => cur = next,
        None => return JsonFetched { inner: None },
      }
    }

    JsonFetched { inner: Some(cur) }
  }
}

/// JavaScript truthiness, as seen by a map function's `if (doc.x)`.
pub trait Truthy {
  fn is_truthy(&self) -> bool;
}

impl Truthy for Value {
  fn is_truthy(&self) -> bool {
    match self {
      Value::Null => false,
      Value::Bool(b) => *b,
      Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(true),
      Value::String(s) => !s.is_empty(),
      Value::Array(_) | Value::Object(_) => true,
    }
  }
}
