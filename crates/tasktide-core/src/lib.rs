pub mod calendar;
pub mod cli;
pub mod clock;
pub mod commands;
pub mod config;
pub mod datastore;
pub mod datetime;
pub mod error;
pub mod render;
pub mod session;
pub mod store;
pub mod task;

use std::ffi::OsString;
use std::io::{
  self,
  IsTerminal
};

use anyhow::Context;
use clap::Parser;
use tracing::{
  debug,
  info
};

pub use error::{
  CalendarError,
  CalendarResult,
  ErrorKind
};
pub use store::{
  CalendarAction,
  CalendarState,
  CalendarStore
};

#[tracing::instrument(skip_all)]
pub fn run(
  raw_args: Vec<OsString>
) -> anyhow::Result<()> {
  let pre =
    cli::preprocess_args(&raw_args)?;
  let cli = cli::GlobalCli::parse_from(
    pre.cleaned_args
  );

  cli::init_tracing(
    cli.verbose,
    cli.quiet
  )?;

  info!(
    verbose = cli.verbose,
    quiet = cli.quiet,
    "starting tasktide"
  );
  debug!(?pre.rc_overrides, "preprocessed rc overrides");

  let mut cfg = config::Config::load(
    cli.config.as_deref()
  )?;
  cfg.apply_overrides(
    pre.rc_overrides.into_iter().chain(
      cli
        .rc_overrides
        .into_iter()
        .map(|kv| (kv.key, kv.value))
    )
  )?;

  let data_dir =
    config::resolve_data_dir(
      &cfg,
      cli.data.as_deref()
    )
    .context(
      "failed to resolve data \
       directory"
    )?;

  let backend =
    datastore::FileTaskStore::open(
      &data_dir,
      &cfg.data.owner
    )
    .with_context(|| {
      format!(
        "failed to open task store at \
         {}",
        data_dir.display()
      )
    })?;

  let settings = cfg.settings();
  let store =
    CalendarStore::with_system_clock(
      settings,
      cfg.default_view()
    )?;
  let mut session =
    session::CalendarSession::new(
      backend,
      store,
      cfg.data.owner.clone()
    );
  session
    .refresh()
    .context("failed to load tasks")?;

  let color = !cli.no_color
    && io::stdout().is_terminal();
  let renderer = render::Renderer::new(
    &settings, color
  );

  let mut out = io::stdout().lock();
  commands::dispatch(
    &mut session,
    &renderer,
    cli.command.unwrap_or_default(),
    &mut out
  )?;

  info!("done");
  Ok(())
}
