// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Run one dump: open the selector, make exactly one fetch per the selection, write the JSON
// role: processing/orchestrator
// inputs: EffectiveConfig
// outputs: JSON array on stdout or in --output-file
// side_effects: Network/filesystem reads; may save _design/dump-select; writes the output file
// invariants:
// - exactly one Selector fetch per run
// - caller query options are passed only when at least one was given
// errors: Store/validation errors are wrapped with the target (password redacted)
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{EffectiveConfig, Selection};
use crate::model::Document;
use crate::output::write_content;
use crate::selector::Selector;
use crate::target::redact;

pub fn select(selector: &Selector, cfg: &EffectiveConfig) -> Result<Vec<Document>> {
  let opts = (!cfg.query.is_empty()).then_some(&cfg.query);

  let docs = match &cfg.selection {
    Selection::All { keys } => selector.fetch_all(keys, opts)?,
    Selection::View { view, keys } => selector
      .fetch_by_view(view, keys, opts)
      .with_context(|| format!("querying view {}", view))?,
    Selection::KeyValue { field, values, persist } => selector
      .fetch_by_key_value(field, values, opts, *persist)
      .with_context(|| format!("selecting on field {}", field))?,
  };
  Ok(docs)
}

pub fn run_dump(cfg: &EffectiveConfig) -> Result<()> {
  let shown = redact(&cfg.target);
  debug!(target_db = %shown, selection = ?cfg.selection, "starting dump");

  let selector = Selector::open(
    &cfg.target,
    cfg.username.as_deref(),
    cfg.password.as_deref(),
    cfg.timeout,
  )
  .with_context(|| format!("opening {}", shown))?;

  let docs = select(&selector, cfg).with_context(|| format!("reading {}", shown))?;
  info!(count = docs.len(), "selected documents");

  write_content(&docs, cfg.output.as_deref(), cfg.pretty)
}
