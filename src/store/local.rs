// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Filesystem-backed document store: one JSON file per document inside a database directory
// role: store/local
// inputs: database directory path
// outputs: DocStore implementation evaluated client-side
// side_effects: put() writes <encoded _id>.json under the directory
// invariants:
// - file name is encode_component(_id) + ".json"; the document's own _id wins over the file name
// - revisions are "<n>-local"; a write with a stale or missing _rev is a 409 conflict
// errors: DumpError::Io with path context; DumpError::Store for a missing database or views this store cannot run
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::error::{DumpError, Result};
use crate::ext::serde_json::JsonFetch;
use crate::model::RowSet;
use crate::query::{evaluate_all_docs, is_deleted, QueryOptions};
use crate::util::{decode_component, encode_component};

use super::{doc_id, next_revision, view_from_docs, DocStore};

#[derive(Debug)]
pub struct LocalStore {
  root: PathBuf,
}

impl LocalStore {
  pub fn open(path: &Path) -> Result<Self> {
    let meta = std::fs::metadata(path).map_err(|e| {
      if e.kind() == std::io::ErrorKind::NotFound {
        DumpError::store(Some(404), "not_found", format!("no database at {}", path.display()))
      } else {
        DumpError::io(path, e)
      }
    })?;

    if !meta.is_dir() {
      return Err(DumpError::store(
        None,
        "not_a_database",
        format!("{} is not a database directory", path.display()),
      ));
    }

    Ok(LocalStore {
      root: path.to_path_buf(),
    })
  }

  fn file_for(&self, id: &str) -> PathBuf {
    self.root.join(format!("{}.json", encode_component(id)))
  }

  fn read_file(path: &Path) -> Result<Value> {
    let text = std::fs::read_to_string(path).map_err(|e| DumpError::io(path, e))?;
    let doc: Value = serde_json::from_str(&text)?;
    if !doc.is_object() {
      return Err(DumpError::store(
        None,
        "bad_document",
        format!("{} does not hold a JSON object", path.display()),
      ));
    }
    Ok(doc)
  }

  fn load(&self) -> Result<BTreeMap<String, Value>> {
    let mut docs = BTreeMap::new();
    let entries = std::fs::read_dir(&self.root).map_err(|e| DumpError::io(&self.root, e))?;

    for entry in entries {
      let path = entry.map_err(|e| DumpError::io(&self.root, e))?.path();
      if path.extension().and_then(|e| e.to_str()) != Some("json") || !path.is_file() {
        continue;
      }

      let doc = Self::read_file(&path)?;
      let id = match doc.fetch("_id").to::<String>() {
        Some(id) => id,
        None => path
          .file_stem()
          .and_then(|s| s.to_str())
          .map(decode_component)
          .unwrap_or_default(),
      };
      docs.insert(id, doc);
    }

    debug!(root = %self.root.display(), count = docs.len(), "loaded local documents");
    Ok(docs)
  }
}

impl DocStore for LocalStore {
  fn describe(&self) -> String {
    self.root.display().to_string()
  }

  fn all_docs(&self, opts: &QueryOptions) -> Result<RowSet> {
    evaluate_all_docs(&self.load()?, opts)
  }

  fn query_view(&self, design: &str, view: &str, opts: &QueryOptions) -> Result<RowSet> {
    view_from_docs(&self.load()?, design, view, opts)
  }

  fn get(&self, id: &str) -> Result<Option<Value>> {
    let path = self.file_for(id);
    if !path.exists() {
      return Ok(None);
    }
    let doc = Self::read_file(&path)?;
    Ok((!is_deleted(&doc)).then_some(doc))
  }

  fn put(&self, doc: &Value) -> Result<String> {
    let id = doc_id(doc)?;
    let path = self.file_for(id);
    let current = if path.exists() {
      Some(Self::read_file(&path)?)
    } else {
      None
    };

    let rev = next_revision(current.as_ref(), doc)?;
    let mut stored = doc.clone();
    if let Some(obj) = stored.as_object_mut() {
      obj.insert("_rev".into(), Value::String(rev.clone()));
    }

    std::fs::write(&path, serde_json::to_vec_pretty(&stored)?).map_err(|e| DumpError::io(&path, e))?;
    debug!(id, rev = %rev, "wrote local document");
    Ok(rev)
  }
}
