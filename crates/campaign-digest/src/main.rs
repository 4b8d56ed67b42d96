//! campaign-digest CLI
//!
//! One-shot command meant to be triggered by an external scheduler.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use campaign_digest::config::{Channel, Config, Requirements};
use campaign_digest::db::{PostgresRowSource, RowSource, StaticRowSource};
use campaign_digest::digest::aggregate;
use campaign_digest::models::{MetricRow, Totals};
use campaign_digest::pipeline::DigestRun;
use campaign_digest::publish::{EmailPublisher, PreviewPublisher, Publisher, SlackPublisher};
use campaign_digest::report::business_date;

/// Daily campaign performance digest for email and Slack
#[derive(Parser)]
#[command(name = "campaign-digest")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, env = "LOG_FORMAT", default_value = "pretty")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Print the payload instead of sending it
    #[arg(long)]
    dry_run: bool,

    /// Business date to report on (defaults to yesterday in REPORT_TIMEZONE)
    #[arg(long, value_name = "YYYY-MM-DD")]
    date: Option<NaiveDate>,

    /// Read rows from a JSON file instead of the database
    #[arg(long, value_name = "PATH")]
    rows_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Send the digest email
    Email(RunArgs),

    /// Post the digest to Slack
    Slack(RunArgs),

    /// Send the digest on every channel from a single fetch
    All(RunArgs),

    /// Show what the row source returns for the business date
    Probe {
        /// Business date to inspect (defaults to yesterday in REPORT_TIMEZONE)
        #[arg(long, value_name = "YYYY-MM-DD")]
        date: Option<NaiveDate>,

        /// Read rows from a JSON file instead of the database
        #[arg(long, value_name = "PATH")]
        rows_file: Option<PathBuf>,

        /// Number of rows to print
        #[arg(long, default_value = "10")]
        limit: usize,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // A local .env may supply settings; the real environment wins.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let result = match cli.command {
        Commands::Email(args) => run_digest(&[Channel::Email], args).await,
        Commands::Slack(args) => run_digest(&[Channel::Slack], args).await,
        Commands::All(args) => run_digest(&[Channel::Email, Channel::Slack], args).await,
        Commands::Probe {
            date,
            rows_file,
            limit,
            format,
        } => run_probe(date, rows_file.as_deref(), limit, format).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    match format {
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init(),
    }
}

fn resolve_date(config: &Config, date: Option<NaiveDate>) -> anyhow::Result<NaiveDate> {
    match date {
        Some(date) => Ok(date),
        None => Ok(business_date(config.report.timezone)?),
    }
}

async fn open_source(config: &Config, rows_file: Option<&Path>) -> anyhow::Result<Box<dyn RowSource>> {
    match rows_file {
        Some(path) => {
            let source = StaticRowSource::from_json_file(path)
                .with_context(|| format!("failed to read rows from {}", path.display()))?;
            Ok(Box::new(source))
        }
        None => Ok(Box::new(PostgresRowSource::connect(config.database()?).await?)),
    }
}

fn build_publisher(config: &Config, channel: Channel, dry_run: bool) -> anyhow::Result<Box<dyn Publisher>> {
    if dry_run {
        return Ok(Box::new(PreviewPublisher::new(channel)));
    }

    Ok(match channel {
        Channel::Email => Box::new(EmailPublisher::new(config.email()?.clone())?),
        Channel::Slack => Box::new(SlackPublisher::new(
            config.slack()?.clone(),
            config.report.network_timeout,
        )?),
    })
}

async fn run_digest(channels: &[Channel], args: RunArgs) -> anyhow::Result<()> {
    let transports: &[Channel] = if args.dry_run { &[] } else { channels };
    let config = Config::from_env(Requirements::for_channels(
        transports,
        args.rows_file.is_none(),
    ))?;
    let business_date = resolve_date(&config, args.date)?;

    // Every publisher is validated before the first connection is opened.
    let publishers = channels
        .iter()
        .map(|&channel| build_publisher(&config, channel, args.dry_run))
        .collect::<anyhow::Result<Vec<_>>>()?;

    info!(
        %business_date,
        channels = ?channels,
        dry_run = args.dry_run,
        thresholds = ?config.thresholds,
        "Starting digest run"
    );

    let source = open_source(&config, args.rows_file.as_deref()).await?;
    let summary = DigestRun::new(source.as_ref(), &config.thresholds)
        .execute(business_date, &publishers)
        .await?;

    info!(
        %business_date,
        rows = summary.rows,
        alerts = summary.alerts,
        published = ?summary.published,
        "Digest run complete"
    );
    Ok(())
}

#[derive(Serialize)]
struct ProbeRow<'a> {
    #[serde(flatten)]
    row: &'a MetricRow,
    reply_rate: String,
    bounce_rate: String,
}

#[derive(Serialize)]
struct ProbeReport<'a> {
    business_date: NaiveDate,
    row_count: usize,
    totals: Totals,
    rows: Vec<ProbeRow<'a>>,
}

async fn run_probe(
    date: Option<NaiveDate>,
    rows_file: Option<&Path>,
    limit: usize,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let config = Config::from_env(Requirements::for_channels(&[], rows_file.is_none()))?;
    let business_date = resolve_date(&config, date)?;

    let source = open_source(&config, rows_file).await?;
    let fetched = source.fetch_rows(business_date).await;
    source.close().await;
    let rows = fetched?;

    let basis = config.thresholds.rate_basis;
    let report = ProbeReport {
        business_date,
        row_count: rows.len(),
        totals: aggregate(&rows)?,
        rows: rows
            .iter()
            .take(limit)
            .map(|row| ProbeRow {
                row,
                reply_rate: row.reply_rate(basis).to_string(),
                bounce_rate: row.bounce_rate().to_string(),
            })
            .collect(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            let t = &report.totals;
            println!("Business date: {}", report.business_date);
            println!("Row count: {}", report.row_count);
            println!(
                "Totals -> sent: {} leads: {} replies: {} positives: {} bounces: {}",
                t.sent, t.leads, t.replies, t.positives, t.bounces
            );
            for probe in &report.rows {
                let r = probe.row;
                println!(
                    "  {:<30} sent={} leads={} replies={} positives={} bounces={} reply_rate={} bounce_rate={}",
                    if r.client_name.is_empty() { "(unattributed)" } else { &r.client_name },
                    r.sent,
                    r.leads,
                    r.replies,
                    r.positives,
                    r.bounces,
                    probe.reply_rate,
                    probe.bounce_rate
                );
            }
        }
    }

    Ok(())
}
