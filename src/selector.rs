// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Mediate all document retrieval against one store: fetch by ids, by named view, or by a generated field predicate
// role: selection/orchestrator
// inputs: target + optional credentials (open) or an injected DocStore; key selections; caller query options
// outputs: flat, ordered Vec<Document> with error rows and document-less rows removed
// side_effects: upsert_view may write the design document _design/dump-select
// invariants:
// - every fetch returns Result; no mode swallows store failures
// - built-in defaults (include_docs, key/keys) override caller options
// - upsert_view writes only when the design document actually changes
// errors: DumpError::{Configuration, Validation, Store} from construction, arguments and the store respectively
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{DumpError, Result};
use crate::mapfn::FieldEmitter;
use crate::model::{design_id, DesignDocument, Document, RowSet, DESIGN_PREFIX};
use crate::query::{default_options, merge_options, KeySelection, QueryOptions};
use crate::store::{open_store, DocStore};
use crate::target::build_url;

/// Design document that holds persisted predicate views.
pub const DEFAULT_DESIGN_DOC: &str = "dump-select";

pub struct Selector {
  store: Box<dyn DocStore>,
}

impl Selector {
  /// Build the effective URL and open the store behind it.
  pub fn open(target: &str, username: Option<&str>, password: Option<&str>, timeout: Duration) -> Result<Self> {
    let url = build_url(target, username, password)?;
    let store = open_store(&url, timeout)?;
    debug!(store = %store.describe(), "opened database");
    Ok(Self::with_store(store))
  }

  pub fn with_store(store: Box<dyn DocStore>) -> Self {
    Selector { store }
  }

  /// Documents by primary id; `KeySelection::All` lists the whole store.
  pub fn fetch_all(&self, ids: &KeySelection, query_opts: Option<&QueryOptions>) -> Result<Vec<Document>> {
    let opts = merge_options(query_opts, default_options(ids));
    let rows = self.store.all_docs(&opts)?;
    Ok(Self::clean(rows))
  }

  /// Documents attached to the rows of `view` ("<design>/<view>").
  pub fn fetch_by_view(&self, view: &str, keys: &KeySelection, query_opts: Option<&QueryOptions>) -> Result<Vec<Document>> {
    let (design, name) = split_view_name(view)?;
    let opts = merge_options(query_opts, default_options(keys));
    let rows = self.store.query_view(design, name, &opts)?;
    Ok(Self::clean(rows))
  }

  /// Documents with a truthy `field`, optionally restricted to the given values.
  ///
  /// With `persist_view` the predicate is stored as `by_<field>` in the
  /// `_design/dump-select` document and evaluated by the store; otherwise it is
  /// evaluated over a full listing without writing anything.
  pub fn fetch_by_key_value(
    &self,
    field: &str,
    values: &KeySelection,
    query_opts: Option<&QueryOptions>,
    persist_view: bool,
  ) -> Result<Vec<Document>> {
    let emitter = FieldEmitter::new(field)?;
    let opts = merge_options(query_opts, default_options(values));
    debug!(field = emitter.field(), persist_view, "key/value selection");

    let rows = if persist_view {
      let view_ref = self.upsert_view(DEFAULT_DESIGN_DOC, &emitter.view_name(), &emitter.source(), None)?;
      let (design, name) = split_view_name(&view_ref)?;
      self.store.query_view(design, name, &opts)?
    } else {
      self.store.query_temp(&emitter, &opts)?
    };

    Ok(Self::clean(rows))
  }

  /// Keep the documents of rows that have no error and carry a document, in order.
  pub fn clean(result: RowSet) -> Vec<Document> {
    result
      .rows
      .into_iter()
      .filter(|row| row.error.is_none())
      .filter_map(|row| match row.doc {
        Some(Value::Object(doc)) => Some(doc),
        _ => None,
      })
      .collect()
  }

  /// Fetch or create `_design/<design>`, set view `view`, write only on change.
  /// Returns "<design>/<view>".
  pub fn upsert_view(&self, design: &str, view: &str, map: &str, reduce: Option<&str>) -> Result<String> {
    if view.is_empty() {
      return Err(DumpError::validation("the view name must not be empty"));
    }

    let previous = self.design_document(design)?;
    let base = previous.clone().unwrap_or_else(|| DesignDocument::new(design));
    let next = base.with_view(view, map, reduce);

    if previous.as_ref() == Some(&next) {
      debug!(design, view, "view definition unchanged");
    } else {
      let rev = self.store.put(&serde_json::to_value(&next)?)?;
      info!(design = %design_id(design), view, rev = %rev, "saved view definition");
    }

    Ok(format!("{}/{}", design, view))
  }

  fn design_document(&self, design: &str) -> Result<Option<DesignDocument>> {
    match self.store.get(&design_id(design))? {
      Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
      None => Ok(None),
    }
  }
}

/// Split "<design>/<view>" (a leading "_design/" is accepted).
fn split_view_name(view: &str) -> Result<(&str, &str)> {
  let trimmed = view.strip_prefix(DESIGN_PREFIX).unwrap_or(view);

  match trimmed.split_once('/') {
    Some((design, name)) if !design.is_empty() && !name.is_empty() && !name.contains('/') => Ok((design, name)),
    _ => Err(DumpError::validation(format!(
      "'{}' is not a view name; expected <design>/<view>",
      view
    ))),
  }
}
