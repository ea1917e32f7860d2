use std::path::{Path, PathBuf};
use std::process::ExitCode;

use boardreport::batch::{ArtifactInput, BatchContext, BatchReport, parse_artifacts_parallel};
use boardreport::config::{ReportConfig, load_report_config, load_report_config_from_path};
use boardreport::discover::{PathFilter, discover_artifacts};
use boardreport::error::ReportError;
use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Debug, Parser)]
#[command(
    name = "boardreport",
    about = "Aggregate CI test and performance artifacts into per-board summaries"
)]
struct Cli {
    /// Directory holding the downloaded artifacts.
    root: PathBuf,

    /// Config file; defaults to the first boardreport config found in ROOT.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Parser threads. 1 parses sequentially.
    #[arg(long, default_value_t = 1)]
    jobs: usize,

    #[arg(long, short)]
    verbose: bool,

    /// Pretty-print the JSON written to stdout.
    #[arg(long)]
    pretty: bool,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("BOARDREPORT_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
    };
    let log_json = std::env::var("BOARDREPORT_LOG_JSON")
        .ok()
        .is_some_and(|value| matches!(value.trim(), "1" | "true"));
    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<ReportConfig, ReportError> {
    match &cli.config {
        Some(path) => load_report_config_from_path(path),
        None => load_report_config(&cli.root),
    }
}

/// Reads every discovered artifact. Unreadable files are recorded on `ctx`.
fn read_inputs(
    root: &Path,
    config: &ReportConfig,
    ctx: &mut BatchContext,
) -> Result<Vec<ArtifactInput>, ReportError> {
    let filter = PathFilter::new(
        config.include.as_deref().unwrap_or_default(),
        config.exclude.as_deref().unwrap_or_default(),
    )?;
    let inputs = discover_artifacts(root, &filter, &config.label_rules())
        .into_iter()
        .filter_map(|found| {
            let input =
                ArtifactInput::new(&found.relative, &found.board, &found.suite, Vec::<u8>::new());
            match std::fs::read(&found.path) {
                Ok(content) => Some(ArtifactInput { content, ..input }),
                Err(source) => {
                    let error = ReportError::Io {
                        path: found.path,
                        source,
                    };
                    ctx.record_unreadable(&input, &error);
                    None
                }
            }
        })
        .collect();
    Ok(inputs)
}

fn run(cli: &Cli) -> Result<BatchReport, ReportError> {
    let config = load_config(cli)?;
    let mut ctx = BatchContext::new(&config)?;
    let inputs = read_inputs(&cli.root, &config, &mut ctx)?;
    tracing::info!(root = %cli.root.display(), artifacts = inputs.len(), "discovered artifacts");

    if cli.jobs > 1 {
        parse_artifacts_parallel(&mut ctx, &inputs, cli.jobs)?;
    } else {
        inputs.iter().for_each(|input| ctx.ingest(input));
    }
    Ok(ctx.finish())
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if !cli.root.is_dir() {
        tracing::error!(root = %cli.root.display(), "artifact root is not a directory");
        return ExitCode::from(EXIT_CONFIG_ERROR);
    }

    let report = match run(&cli) {
        Ok(report) => report,
        Err(err) => {
            tracing::error!(error = %err, "cannot run batch");
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };
    tracing::info!(
        parsed = report.stats.parsed,
        failed = report.stats.failed,
        unrecognized = report.stats.unrecognized,
        skipped_rows = report.stats.skipped_rows,
        "batch complete"
    );

    let rendered = if cli.pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    };
    match rendered {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "cannot serialize report");
            ExitCode::FAILURE
        }
    }
}
