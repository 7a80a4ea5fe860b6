// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: CouchDB-compatible HTTP client for remote databases (open, _all_docs, views, get, put)
// role: store/http
// inputs: effective URL (credentials may be embedded in userinfo); timeout
// outputs: DocStore implementation backed by ureq
// side_effects: Network calls to the database server; put() writes documents
// invariants:
// - credentials never appear in request URLs or logs; they travel as an Authorization: Basic header
// - key-like options (key, keys, startkey, endkey, start_key, end_key) are JSON-encoded; `keys` is sent as a POST body
// - non-2xx responses become DumpError::Store with CouchDB's error/reason
// errors: Transport failures surface as DumpError::Store with status None
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use tracing::debug;

use crate::error::{DumpError, Result};
use crate::model::{is_design_id, RowSet, DESIGN_PREFIX};
use crate::query::QueryOptions;
use crate::target::{redact, split_credentials};
use crate::util::encode_component;

use super::{doc_id, DocStore};

const JSON_PARAMS: &[&str] = &["key", "keys", "startkey", "endkey", "start_key", "end_key"];
const MAX_RESPONSE_BYTES: u64 = 1 << 30;

enum Body<'a> {
  Empty,
  Post(&'a Value),
  Put(&'a Value),
}

pub struct HttpStore {
  agent: ureq::Agent,
  base: String,
  auth: Option<String>,
  display: String,
}

impl HttpStore {
  fn new(url: &str, timeout: Duration) -> Self {
    let (bare, creds) = split_credentials(url);
    let auth = creds.map(|(user, pass)| format!("Basic {}", STANDARD.encode(format!("{}:{}", user, pass))));

    let agent: ureq::Agent = ureq::Agent::config_builder()
      .http_status_as_error(false)
      .timeout_global(Some(timeout))
      .build()
      .into();

    HttpStore {
      agent,
      base: bare.trim_end_matches('/').to_string(),
      auth,
      display: redact(url),
    }
  }

  /// Connect and verify the database exists (`GET <db>`).
  pub fn open(url: &str, timeout: Duration) -> Result<Self> {
    let store = Self::new(url, timeout);
    let info = store.request(&store.base, Body::Empty)?;
    debug!(db = %store.display, name = ?info.get("db_name"), docs = ?info.get("doc_count"), "remote database reachable");
    Ok(store)
  }

  fn doc_url(&self, id: &str) -> String {
    if is_design_id(id) {
      format!("{}/{}{}", self.base, DESIGN_PREFIX, encode_component(&id[DESIGN_PREFIX.len()..]))
    } else {
      format!("{}/{}", self.base, encode_component(id))
    }
  }

  fn view_url(&self, design: &str, view: &str) -> String {
    format!(
      "{}/{}{}/_view/{}",
      self.base,
      DESIGN_PREFIX,
      encode_component(design),
      encode_component(view)
    )
  }

  fn request(&self, url: &str, body: Body<'_>) -> Result<Value> {
    let auth = self.auth.as_deref();
    let result = match body {
      Body::Empty => {
        debug!(method = "GET", url, "request");
        let mut req = self.agent.get(url).header("Accept", "application/json");
        if let Some(a) = auth {
          req = req.header("Authorization", a);
        }
        req.call()
      }
      Body::Post(b) => {
        debug!(method = "POST", url, "request");
        let mut req = self.agent.post(url).header("Accept", "application/json");
        if let Some(a) = auth {
          req = req.header("Authorization", a);
        }
        req.send_json(b)
      }
      Body::Put(b) => {
        debug!(method = "PUT", url, "request");
        let mut req = self.agent.put(url).header("Accept", "application/json");
        if let Some(a) = auth {
          req = req.header("Authorization", a);
        }
        req.send_json(b)
      }
    };

    let mut resp = result.map_err(|e| DumpError::store(None, "transport", format!("{}: {}", url, e)))?;
    let status = resp.status().as_u16();
    let bytes = resp
      .body_mut()
      .with_config()
      .limit(MAX_RESPONSE_BYTES)
      .read_to_vec()
      .map_err(|e| DumpError::store(Some(status), "transport", e.to_string()))?;

    if !(200..300).contains(&status) {
      return Err(couch_error(status, &bytes));
    }
    Ok(serde_json::from_slice(&bytes)?)
  }

  fn query(&self, url: String, opts: &QueryOptions) -> Result<RowSet> {
    let (qs, keys) = encode_query(opts);
    let url = if qs.is_empty() { url } else { format!("{}?{}", url, qs) };

    let value = match keys {
      Some(keys) => self.request(&url, Body::Post(&json!({ "keys": keys })))?,
      None => self.request(&url, Body::Empty)?,
    };
    Ok(serde_json::from_value(value)?)
  }
}

/// Query string for `opts`, plus the `keys` array that must travel in a POST body.
fn encode_query(opts: &QueryOptions) -> (String, Option<Value>) {
  let mut keys = None;
  let mut pairs = Vec::with_capacity(opts.len());

  for (name, value) in opts {
    if name == "keys" {
      keys = Some(value.clone());
      continue;
    }
    let text = match value {
      _ if JSON_PARAMS.contains(&name.as_str()) => value.to_string(),
      Value::String(s) => s.clone(),
      other => other.to_string(),
    };
    pairs.push(format!("{}={}", encode_component(name), encode_component(&text)));
  }

  (pairs.join("&"), keys)
}

fn couch_error(status: u16, body: &[u8]) -> DumpError {
  let parsed: Value = serde_json::from_slice(body).unwrap_or(Value::Null);
  let error = parsed
    .get("error")
    .and_then(Value::as_str)
    .unwrap_or("http_error")
    .to_string();
  let reason = parsed
    .get("reason")
    .and_then(Value::as_str)
    .map(str::to_string)
    .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());

  DumpError::store(Some(status), error, reason)
}

impl DocStore for HttpStore {
  fn describe(&self) -> String {
    self.display.clone()
  }

  fn all_docs(&self, opts: &QueryOptions) -> Result<RowSet> {
    self.query(format!("{}/_all_docs", self.base), opts)
  }

  fn query_view(&self, design: &str, view: &str, opts: &QueryOptions) -> Result<RowSet> {
    self.query(self.view_url(design, view), opts)
  }

  fn get(&self, id: &str) -> Result<Option<Value>> {
    match self.request(&self.doc_url(id), Body::Empty) {
      Ok(doc) => Ok(Some(doc)),
      Err(e) if e.status() == Some(404) => Ok(None),
      Err(e) => Err(e),
    }
  }

  fn put(&self, doc: &Value) -> Result<String> {
    let id = doc_id(doc)?;
    let resp = self.request(&self.doc_url(id), Body::Put(doc))?;

    resp
      .get("rev")
      .and_then(Value::as_str)
      .map(str::to_string)
      .ok_or_else(|| DumpError::store(None, "bad_response", format!("no rev in response for {}", id)))
  }
}
