use std::ffi::OsString;
use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::anyhow;
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone)]
pub struct PreprocessedArgs {
    pub cleaned_args: Vec<OsString>,
    pub rc_overrides: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct KeyVal {
    pub key: String,
    pub value: String,
}

impl std::str::FromStr for KeyVal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (k, v) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected KEY=VALUE, got: {s}"))?;
        Ok(Self {
            key: k.trim().to_string(),
            value: v.trim().to_string(),
        })
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    name = "tasktide",
    version,
    about = "Tasktide: calendar views over your tasks",
    disable_help_subcommand = true
)]
pub struct GlobalCli {
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short = 'q', long = "quiet", action = ArgAction::Count, global = true)]
    pub quiet: u8,

    #[arg(
        long = "rc",
        value_parser = clap::builder::ValueParser::new(|s: &str| s.parse::<KeyVal>()),
        action = ArgAction::Append,
        global = true
    )]
    pub rc_overrides: Vec<KeyVal>,

    #[arg(long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[arg(long = "data", global = true)]
    pub data: Option<PathBuf>,

    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Print the first and last instant a view covers
    Range(ViewArgs),
    /// Print the tasks of a period, day by day
    Show(ViewArgs),
    /// List upcoming tasks as a table
    Agenda {
        /// First day of the window
        #[arg(long)]
        from: Option<String>,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Create a task
    Add {
        #[arg(required = true, num_args = 1..)]
        title: Vec<String>,
        #[arg(long)]
        due: Option<String>,
        /// Time of day for --due, HH:MM or H:MMam
        #[arg(long)]
        at: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long = "tag", action = ArgAction::Append)]
        tags: Vec<String>,
        #[arg(long)]
        project: Option<String>,
    },
    /// Move a task to another day
    Reschedule {
        id: String,
        date: String,
        /// New time of day; keeps the current one when omitted
        #[arg(long)]
        at: Option<String>,
    },
    /// Per-status counts for a period
    Stats(ViewArgs),
}

impl Default for Command {
    fn default() -> Self {
        Self::Show(ViewArgs::default())
    }
}

#[derive(Args, Debug, Clone, Default)]
pub struct ViewArgs {
    /// month, week, day or agenda
    #[arg(long)]
    pub view: Option<String>,
    /// Anchor date: today, tomorrow, friday, march, +3d, 2024-01-05
    #[arg(long)]
    pub date: Option<String>,
    /// Step forward this many periods
    #[arg(long, default_value_t = 0)]
    pub next: u32,
    /// Step back this many periods
    #[arg(long, default_value_t = 0)]
    pub prev: u32,
    #[command(flatten)]
    pub filters: FilterArgs,
}

#[derive(Args, Debug, Clone, Default)]
pub struct FilterArgs {
    #[arg(long = "priority", action = ArgAction::Append)]
    pub priority: Vec<String>,
    #[arg(long = "status", action = ArgAction::Append)]
    pub status: Vec<String>,
    #[arg(long = "tag", action = ArgAction::Append)]
    pub tags: Vec<String>,
}

pub fn init_tracing(verbose: u8, quiet: u8) -> anyhow::Result<()> {
    let default_level = if quiet >= 2 {
        "error"
    } else if quiet == 1 {
        "warn"
    } else if verbose >= 3 {
        "trace"
    } else if verbose == 2 {
        "debug"
    } else if verbose == 1 {
        "info"
    } else {
        "warn"
    };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_level))
        .map_err(|e| anyhow!("invalid RUST_LOG / log filter: {e}"))?;

    let init_result = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_level(true)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init();

    if let Err(err) = init_result {
        debug!(error = %err, "tracing subscriber already set, continuing");
    }

    Ok(())
}

/// Pulls bare `rc.key=value` / `rc.key:value` words out of the argument
/// list so they can be applied like `--rc`.
#[tracing::instrument(skip_all)]
pub fn preprocess_args(raw: &[OsString]) -> anyhow::Result<PreprocessedArgs> {
    let mut cleaned = Vec::with_capacity(raw.len());
    let mut overrides: Vec<(String, String)> = Vec::new();

    let mut iter = raw.iter().cloned();
    if let Some(bin) = iter.next() {
        cleaned.push(bin);
    }

    for arg in iter {
        let s = arg.to_string_lossy();
        if let Some(rest) = s.strip_prefix("rc.") {
            let parsed = rest.split_once('=').or_else(|| rest.split_once(':'));
            if let Some((k, v)) = parsed {
                debug!(key = %k, value = %v, "captured positional rc override");
                overrides.push((k.to_string(), v.to_string()));
                continue;
            }
        }

        cleaned.push(arg);
    }

    Ok(PreprocessedArgs {
        cleaned_args: cleaned,
        rc_overrides: overrides,
    })
}
