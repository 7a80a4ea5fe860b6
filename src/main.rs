use anyhow::Result;
use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use tracing_subscriber::EnvFilter;

mod cli;
mod dump;
mod error;
mod ext;
mod mapfn;
mod model;
mod output;
mod query;
mod selector;
mod store;
mod target;
mod util;

use crate::cli::{normalize, Cli};

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .with_ansi(std::io::stderr().is_terminal())
    .with_target(false)
    .try_init();
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  if cli.gen_man {
    let page = util::render_man_page::<Cli>()?;
    print!("{}", page);
    return Ok(());
  }

  if cli.help {
    // no dump was made: exit 1
    print!("{}", Cli::command().render_help());
    std::process::exit(1);
  }

  init_tracing();

  // Phase 1: normalize CLI
  let cfg = normalize(cli)?;

  // Phase 2: one selection, one write
  dump::run_dump(&cfg)
}
