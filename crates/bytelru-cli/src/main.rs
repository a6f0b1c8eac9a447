//! bytelru - drive a key-bounded LRU cache from the command line

mod demo;
mod handler;
mod script;

use anyhow::{Context, Result};
use bytelru::{CacheConfig, SharedCache, DEFAULT_KEY_LIMIT};
use clap::{Parser, Subcommand, ValueEnum};
use std::io::{self, Write};
use std::num::NonZeroU32;
use std::path::PathBuf;
use tracing::info;

use crate::handler::CommandHandler;
use crate::script::Command;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log every cache operation
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    mode: Mode,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Run the built-in string and float demonstration
    Demo,

    /// Execute cache operations, e.g. `run -c 2 put 1 foo , get 1 , dump`
    Run(RunArgs),
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Cache capacity (number of items)
    #[arg(short, long, default_value_t = 2, allow_negative_numbers = true)]
    capacity: i64,

    /// Keys must be below this bound
    #[arg(short, long, default_value_t = DEFAULT_KEY_LIMIT)]
    key_limit: NonZeroU32,

    /// Read operations from a file (one per line, run before inline operations)
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Operations separated by `,`: put <key> <value>, get <key>, remove <key>,
    /// pop, clear, dump, keys, stats
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    ops: Vec<String>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(io::stderr)
        .init();

    match args.mode {
        Mode::Demo => demo::run(&mut io::stdout().lock()),
        Mode::Run(run_args) => run(run_args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let config = CacheConfig::new(args.capacity).key_limit(args.key_limit);
    let cache = SharedCache::from_config(&config).context("failed to create cache")?;
    info!(
        capacity = cache.capacity(),
        key_limit = cache.key_limit(),
        "Cache ready"
    );

    let mut commands = Vec::new();
    if let Some(path) = &args.script {
        commands.extend(script::load(path)?);
    }
    commands.extend(script::parse_args(&args.ops)?);
    info!("Running {} operation(s)", commands.len());

    let handler = CommandHandler::new(cache);
    let mut out = io::stdout().lock();
    execute(&handler, &commands, args.format, &mut out)
}

fn execute<W: Write>(
    handler: &CommandHandler,
    commands: &[Command],
    format: Format,
    out: &mut W,
) -> Result<()> {
    for command in commands {
        let reply = handler.handle(command);
        match format {
            Format::Text => writeln!(out, "{}\n{}", command, reply)?,
            Format::Json => writeln!(out, "{}", serde_json::to_string(&reply)?)?,
        }
    }
    Ok(())
}
