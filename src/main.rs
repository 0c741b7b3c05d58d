use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

use pgqs::fingerprint::{fingerprint_options, query_id};
use pgqs::normalize::{Completion, NormalizeOptions, Normalizer};
use pgqs::output::json::JsonSink;
use pgqs::output::raw::RawSink;
use pgqs::output::{OutputSink, Report, ReportKind};
use pgqs::settings::{QueryTuner, Session, SettingsTable};

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Raw,
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "pgqs", version, about = "Normalize SQL and apply per-query settings")]
struct Cli {
    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value = "raw", global = true)]
    format: Format,

    /// Log at debug level (RUST_LOG still applies)
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the normalized form of a query
    Normalize {
        /// Keep one space for every whitespace run
        #[arg(short = 'p', long)]
        preserve_space: bool,

        /// Keep a trailing semicolon
        #[arg(long)]
        keep_semicolon: bool,

        /// Drop a leading EXPLAIN and its options
        #[arg(long)]
        strip_explain: bool,

        /// Query text. Read from stdin if omitted.
        query: Option<String>,
    },

    /// Print the query identifier
    Queryid {
        /// Query text. Read from stdin if omitted.
        query: Option<String>,
    },

    /// Apply the settings registered for a query, then restore them
    Tune {
        /// JSON file with the settings table
        #[arg(short = 's', long)]
        settings: PathBuf,

        /// Look nothing up and change nothing
        #[arg(long)]
        disabled: bool,

        /// Log the query identifier
        #[arg(long)]
        print_queryid: bool,

        /// Query text. Read from stdin if omitted.
        query: Option<String>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let directive = if cli.debug { "pgqs=debug" } else { "pgqs=info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive.parse()?))
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    debug!("pgqs {} starting", env!("CARGO_PKG_VERSION"));

    let mut sink: Box<dyn OutputSink> = match cli.format {
        Format::Raw => Box::new(RawSink::new()),
        Format::Json => Box::new(JsonSink::new()),
    };

    match cli.command {
        Command::Normalize {
            preserve_space,
            keep_semicolon,
            strip_explain,
            query,
        } => {
            let query = read_query(query)?;
            let normalizer = Normalizer::new(NormalizeOptions {
                preserve_space,
                drop_trailing_semicolon: !keep_semicolon,
                strip_explain,
            });
            let normalized = normalizer.normalize(&query);
            let truncated = match normalized.completion {
                Completion::Complete => None,
                Completion::Truncated(e) => {
                    warn!("Input truncated: {e}");
                    Some(e.to_string())
                }
            };
            sink.handle_report(&Report::now(ReportKind::Normalized {
                text: normalized.text,
                truncated,
            }))?;
        }
        Command::Queryid { query } => {
            let query = read_query(query)?;
            let normalized = Normalizer::new(fingerprint_options()).normalize(&query);
            sink.handle_report(&Report::now(ReportKind::QueryId {
                queryid: query_id(&query),
                normalized: normalized.text,
            }))?;
        }
        Command::Tune {
            settings,
            disabled,
            print_queryid,
            query,
        } => {
            let query = read_query(query)?;
            let table = SettingsTable::load(&settings)
                .with_context(|| format!("loading settings from {}", settings.display()))?;
            let tuner = QueryTuner::new(table)
                .enabled(!disabled)
                .print_queryid(print_queryid);

            let mut session = Session::new();
            let applied = tuner
                .begin(&mut session, &query)
                .context("applying query settings")?;
            sink.handle_report(&Report::now(ReportKind::Applied {
                queryid: applied.queryid(),
                changes: applied.changes().to_vec(),
            }))?;

            let changes = applied.finish().context("restoring settings")?;
            if !changes.is_empty() {
                sink.handle_report(&Report::now(ReportKind::Restored { changes }))?;
            }
        }
    }

    sink.shutdown()?;
    Ok(())
}

fn read_query(arg: Option<String>) -> anyhow::Result<String> {
    if let Some(query) = arg {
        return Ok(query);
    }
    let mut stdin = io::stdin();
    if stdin.is_terminal() {
        bail!("no query given: pass it as an argument or pipe it on stdin");
    }
    let mut query = String::new();
    stdin
        .read_to_string(&mut query)
        .context("reading query from stdin")?;
    Ok(query)
}
