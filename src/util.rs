// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Small shared helpers: URI component encoding/decoding and man page rendering
// role: utilities/helpers
// inputs: Strings; clap CommandFactory
// outputs: Percent-encoded components, decoded components, man page text
// invariants:
// - encode_component matches JS encodeURIComponent (unreserved: A-Z a-z 0-9 - _ . ! ~ * ' ( ))
// - decode_component never panics; invalid UTF-8 is replaced lossily
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use clap::CommandFactory;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
  .remove(b'-')
  .remove(b'_')
  .remove(b'.')
  .remove(b'!')
  .remove(b'~')
  .remove(b'*')
  .remove(b'\'')
  .remove(b'(')
  .remove(b')');

pub fn encode_component(s: &str) -> String {
  utf8_percent_encode(s, URI_COMPONENT).to_string()
}

pub fn decode_component(s: &str) -> String {
  percent_decode_str(s).decode_utf8_lossy().into_owned()
}

/// Render a section-1 man page for a clap `CommandFactory` implementor.
/// Returns the troff content as a UTF-8 string.
pub fn render_man_page<T: CommandFactory>() -> anyhow::Result<String> {
  let cmd = T::command();
  let man = clap_mangen::Man::new(cmd);
  let mut buf: Vec<u8> = Vec::new();

  man.render(&mut buf)?;

  Ok(String::from_utf8_lossy(&buf).to_string())
}
