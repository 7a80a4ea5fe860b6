use anyhow::{bail, Result};
use clap::{ArgAction, Parser};
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

use crate::query::{KeySelection, QueryOptions};

pub const MISSING_TARGET: &str = "You need to supply a database URL or filepath. -h for help";
pub const VIEW_CONFLICT: &str = "You can't fetch from a view and a key-value pair at the same time.";

#[derive(Parser, Debug)]
#[command(
    name = "dump-select",
    version,
    about = "Dump selected documents from a CouchDB-style database as JSON",
    long_about = None,
    disable_help_flag = true,
    after_help = "Examples:\n  dump-select http://localhost:5984/db -k doc1 doc2\n  dump-select ./mydb -v app/by_type -k invoice -o out.json\n  dump-select http://localhost:5984/db --vk color -k red --dd"
)]
pub struct Cli {
  /// Database URL (http/https) or local database directory
  pub target: Option<String>,

  /// Print help and exit
  #[arg(short = 'h', long = "help", action = ArgAction::SetTrue)]
  pub help: bool,

  /// Named view to query, as <design>/<view>
  #[arg(short = 'v', long)]
  pub view: Option<String>,

  /// Key(s) to select; repeat the flag or pass several values.
  /// With --view/--vk a key that parses as JSON (30, true) is matched as that value
  #[arg(short = 'k', long = "key", num_args = 1.., action = ArgAction::Append)]
  pub keys: Vec<String>,

  /// Select documents where this field is truthy (values come from --key)
  #[arg(long = "vk", visible_alias = "viewkey")]
  pub view_key: Option<String>,

  /// Save the --vk view in _design/dump-select instead of evaluating it ad hoc
  #[arg(short = 'd', long = "dd", visible_alias = "designdoc")]
  pub design_doc: bool,

  /// Write the JSON here instead of stdout; "File has been written." is printed to stderr when done
  #[arg(short = 'o', long = "output-file")]
  pub output_file: Option<PathBuf>,

  /// Username for the database
  #[arg(short = 'u', long, env = "DUMP_SELECT_USERNAME", hide_env_values = true)]
  pub username: Option<String>,

  /// Password for the database
  #[arg(short = 'p', long, env = "DUMP_SELECT_PASSWORD", hide_env_values = true)]
  pub password: Option<String>,

  /// Extra query option NAME=VALUE (VALUE is JSON, else a plain string); repeatable
  #[arg(short = 'q', long = "query")]
  pub query: Vec<String>,

  /// Pretty-print the JSON output
  #[arg(long)]
  pub pretty: bool,

  /// HTTP timeout in seconds for remote databases
  #[arg(long, default_value_t = 30)]
  pub timeout: u64,

  /// Emit a troff man page to stdout (internal; for packaging)
  #[arg(long, hide = true)]
  pub gen_man: bool,
}

/// Which Selector call a run makes.
#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
  All { keys: KeySelection },
  View { view: String, keys: KeySelection },
  KeyValue { field: String, values: KeySelection, persist: bool },
}

#[derive(Debug)]
pub struct EffectiveConfig {
  pub target: String,
  pub username: Option<String>,
  pub password: Option<String>,
  pub selection: Selection,
  pub query: QueryOptions,
  pub output: Option<PathBuf>,
  pub pretty: bool,
  pub timeout: Duration,
}

pub fn normalize(cli: Cli) -> Result<EffectiveConfig> {
  let target = match cli.target {
    Some(t) if !t.trim().is_empty() => t,
    _ => bail!(MISSING_TARGET),
  };

  // document ids are always strings; view keys may be any JSON value
  let typed_keys = || KeySelection::from_keys(cli.keys.iter().map(|k| parse_json_or_string(k)));
  let selection = match (cli.view, cli.view_key) {
    (Some(_), Some(_)) => bail!(VIEW_CONFLICT),
    (Some(view), None) => Selection::View { view, keys: typed_keys() },
    (None, Some(field)) => Selection::KeyValue {
      field,
      values: typed_keys(),
      persist: cli.design_doc,
    },
    (None, None) => Selection::All {
      keys: KeySelection::from_keys(cli.keys.iter().cloned()),
    },
  };

  if cli.design_doc && !matches!(selection, Selection::KeyValue { .. }) {
    warn!("--dd only applies together with --vk; ignoring it");
  }

  let mut query = QueryOptions::new();
  for raw in &cli.query {
    let (name, value) = parse_query_option(raw)?;
    query.insert(name, value);
  }

  Ok(EffectiveConfig {
    target,
    username: cli.username,
    password: cli.password,
    selection,
    query,
    output: cli.output_file,
    pretty: cli.pretty,
    timeout: Duration::from_secs(cli.timeout),
  })
}

/// Split NAME=VALUE; VALUE is read as JSON when it parses, otherwise kept verbatim.
pub fn parse_query_option(raw: &str) -> Result<(String, Value)> {
  let Some((name, value)) = raw.split_once('=') else {
    bail!("--query expects NAME=VALUE, got '{}'", raw)
  };
  let name = name.trim();
  if name.is_empty() {
    bail!("--query expects NAME=VALUE, got '{}'", raw)
  }

  Ok((name.to_string(), parse_json_or_string(value)))
}

/// `30` → number, `true` → bool, `["a",1]` → array; anything that is not JSON stays a string.
pub fn parse_json_or_string(raw: &str) -> Value {
  serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
