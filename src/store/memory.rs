// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: In-memory DocStore for unit tests and the testutil feature
// role: storage/test-double
// inputs: Seed documents
// outputs: RowSets and design documents, like the local store
// side_effects: None outside the process; counts reads and writes
// invariants:
// - clones share state so a test can keep a handle after boxing one
// - revisions follow the same N-local rule as the local store
// errors: DumpError::Store for missing views and revision conflicts
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use serde_json::Value;

use crate::error::Result;
use crate::model::RowSet;
use crate::query::{evaluate_all_docs, is_deleted, QueryOptions};

use super::{doc_id, next_revision, view_from_docs, DocStore};

#[derive(Default)]
struct MemoryState {
  docs: RefCell<BTreeMap<String, Value>>,
  reads: Cell<usize>,
  writes: Cell<usize>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
  state: Rc<MemoryState>,
}

impl MemoryStore {
  pub fn with_docs<I: IntoIterator<Item = Value>>(docs: I) -> Self {
    let store = MemoryStore::default();
    {
      let mut map = store.state.docs.borrow_mut();
      for d in docs {
        if let Some(id) = d.get("_id").and_then(Value::as_str) {
          map.insert(id.to_string(), d.clone());
        }
      }
    }
    store
  }

  pub fn reads(&self) -> usize {
    self.state.reads.get()
  }

  pub fn writes(&self) -> usize {
    self.state.writes.get()
  }

  pub fn doc(&self, id: &str) -> Option<Value> {
    self.state.docs.borrow().get(id).cloned()
  }

  fn touch_read(&self) {
    self.state.reads.set(self.state.reads.get() + 1);
  }
}

impl DocStore for MemoryStore {
  fn describe(&self) -> String {
    "memory".into()
  }

  fn all_docs(&self, opts: &QueryOptions) -> Result<RowSet> {
    self.touch_read();
    evaluate_all_docs(&self.state.docs.borrow(), opts)
  }

  fn query_view(&self, design: &str, view: &str, opts: &QueryOptions) -> Result<RowSet> {
    self.touch_read();
    view_from_docs(&self.state.docs.borrow(), design, view, opts)
  }

  fn get(&self, id: &str) -> Result<Option<Value>> {
    self.touch_read();
    Ok(self.state.docs.borrow().get(id).filter(|d| !is_deleted(d)).cloned())
  }

  fn put(&self, doc: &Value) -> Result<String> {
    let id = doc_id(doc)?.to_string();
    let rev = next_revision(self.state.docs.borrow().get(&id), doc)?;

    let mut stored = doc.clone();
    if let Some(obj) = stored.as_object_mut() {
      obj.insert("_rev".into(), Value::String(rev.clone()));
    }
    self.state.docs.borrow_mut().insert(id, stored);
    self.state.writes.set(self.state.writes.get() + 1);

    Ok(rev)
  }
}
