// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Render the selected documents as one JSON array and write it to a file or stdout
// role: output/writer
// inputs: Selected documents, optional output path, pretty flag
// outputs: UTF-8 JSON bytes
// side_effects: Creates parent dirs and the output file; writes stdout; prints the file confirmation to stderr
// invariants:
// - the file is flushed, synced and closed before the confirmation is printed
// - the confirmation is printed regardless of RUST_LOG
// errors: IO and serialization errors carry the path as anyhow context
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{Context, Result};
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::model::Document;

/// Serialize the documents as one JSON array.
pub fn render(docs: &[Document], pretty: bool) -> Result<Vec<u8>> {
  let bytes = if pretty {
    serde_json::to_vec_pretty(docs)?
  } else {
    serde_json::to_vec(docs)?
  };
  Ok(bytes)
}

fn write_to<W: Write>(out: &mut W, content: &[u8]) -> std::io::Result<()> {
  out.write_all(content)?;
  out.flush()
}

/// Write to `path` (flushed, synced and closed before returning) or to stdout.
pub fn write_content(docs: &[Document], path: Option<&Path>, pretty: bool) -> Result<()> {
  let content = render(docs, pretty)?;

  match path {
    Some(path) => {
      if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
      }
      let mut file = std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
      write_to(&mut file, &content).with_context(|| format!("writing {}", path.display()))?;
      file.sync_all().with_context(|| format!("syncing {}", path.display()))?;
      drop(file);
      debug!(path = %path.display(), bytes = content.len(), "output file synced");
      eprintln!("File has been written.");
    }
    None => {
      let stdout = std::io::stdout();
      let mut lock = stdout.lock();
      write_to(&mut lock, &content).context("writing to stdout")?;
    }
  }
  Ok(())
}
