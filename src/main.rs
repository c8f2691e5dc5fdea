//! linkscribe — Binary Entrypoint
//! Parses the CLI, wires configuration and the HTTP transport, and drives
//! the record pipeline. All the actual work lives in the library crate.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linkscribe::bundle;
use linkscribe::config::{Overrides, RunConfig, Settings};
use linkscribe::fetch::HttpTransport;
use linkscribe::input;
use linkscribe::outpath;
use linkscribe::pipeline::Pipeline;

/// Turn a CSV of links into a folder tree of Markdown notes.
#[derive(Parser, Debug)]
#[command(name = "linkscribe", version, about)]
struct Cli {
    /// CSV file with a url column (tags, title, description optional)
    #[arg(long)]
    csv: PathBuf,

    /// Output root for the note tree [default: notes]
    #[arg(long)]
    out: Option<PathBuf>,

    /// Seconds to wait between requests [default: 1.0]
    #[arg(long)]
    sleep: Option<f64>,

    /// Per-request timeout in seconds [default: 25]
    #[arg(long)]
    timeout: Option<u64>,

    /// Custom note template file
    #[arg(long)]
    template: Option<PathBuf>,

    /// Pack the output tree into a zip archive after the run
    #[arg(long)]
    zip: bool,

    /// Settings file [default: linkscribe.toml when present]
    #[arg(long)]
    config: Option<PathBuf>,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("linkscribe=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env first so RUST_LOG from it reaches the subscriber.
    let _ = dotenvy::dotenv();
    init_tracing();
    run(Cli::parse()).await
}

async fn run(cli: Cli) -> Result<()> {
    let settings = match &cli.config {
        Some(path) => Settings::load_from_file(path)?,
        None => Settings::load()?,
    };
    let cfg = RunConfig::assemble(
        cli.csv,
        Overrides {
            out: cli.out,
            sleep: cli.sleep,
            timeout: cli.timeout,
            template: cli.template,
            zip: cli.zip,
        },
        &settings,
    );

    let records = input::read_records(&cfg.csv_path)?;
    if records.is_empty() {
        bail!("no usable rows in {}", cfg.csv_path.display());
    }
    fs::create_dir_all(&cfg.out_root)
        .with_context(|| format!("creating the output root {}", cfg.out_root.display()))?;

    let template = match &cfg.template {
        Some(path) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("reading the template {}", path.display()))?,
        ),
        None => None,
    };

    tracing::info!(
        records = records.len(),
        out = %cfg.out_root.display(),
        sleep_s = cfg.sleep.as_secs_f64(),
        "starting the run"
    );

    let transport = Arc::new(HttpTransport::new(&cfg.user_agent, &cfg.accept_language)?);
    let pipeline = Pipeline::new(transport, cfg.clone(), template);
    let tally = pipeline.run(&records).await;

    let report_root = outpath::report_root(&cfg.out_root);
    let reports = tally
        .write_reports(report_root)
        .context("writing the run reports")?;
    for path in &reports {
        tracing::info!(report = %path.display(), "report written");
    }
    println!("{}", tally.summary_text());

    if cfg.zip {
        let bundle = bundle::pack_output(&cfg.out_root)?;
        tracing::info!(
            bundle = %bundle.path.display(),
            entries = bundle.entries,
            bytes = bundle.bytes,
            "output packed"
        );
    }
    Ok(())
}
