//! MetricScout CLI
//!
//! Command-line interface for metric discovery and per-operation health
//! queries against a telemetry backend.

use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing::info;

use metricscout::models::{MetricRole, TimeRange};
use metricscout::{Config, Engine};

/// MetricScout - adaptive metric discovery for telemetry backends
#[derive(Parser)]
#[command(name = "metricscout")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover which metric names carry data for a service
    Discover {
        /// Service name
        service: String,

        /// Deployment environment filter
        #[arg(long)]
        env: Option<String>,

        /// Probe window (e.g. "1h", "24h")
        #[arg(long)]
        window: Option<String>,
    },

    /// Per-operation latency, traffic and error breakdown
    Operations {
        /// Service name
        service: String,

        /// Deployment environment filter
        #[arg(long)]
        env: Option<String>,

        /// Time range (e.g. "1h", "24h", "7d")
        #[arg(long, default_value = "1h")]
        range: String,
    },

    /// Evaluate a raw metrics query
    Metrics {
        /// Backend metrics query, e.g. "avg:trace.servlet.request.duration{service:checkout}"
        query: String,

        /// Time range
        #[arg(long, default_value = "1h")]
        range: String,
    },

    /// Search recent spans of a service
    Spans {
        /// Service name
        service: String,

        /// Deployment environment filter
        #[arg(long)]
        env: Option<String>,

        /// Extra raw query clause, e.g. "status:error"
        #[arg(long)]
        filter: Option<String>,

        /// Time range
        #[arg(long, default_value = "1h")]
        range: String,

        /// Maximum spans returned
        #[arg(long, default_value = "20")]
        limit: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .init();

    let config = Config::from_env();
    let engine = match Engine::from_config(config) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::FAILURE;
        }
    };
    let _sweepers = engine.start_sweepers();

    let result = match cli.command {
        Commands::Discover {
            service,
            env,
            window,
        } => run_discover(&engine, &service, env.as_deref(), window.as_deref(), cli.format).await,
        Commands::Operations {
            service,
            env,
            range,
        } => run_operations(&engine, &service, env.as_deref(), &range, cli.format).await,
        Commands::Metrics { query, range } => {
            run_metrics(&engine, &query, &range, cli.format).await
        }
        Commands::Spans {
            service,
            env,
            filter,
            range,
            limit,
        } => {
            run_spans(
                &engine,
                &service,
                env.as_deref(),
                filter.as_deref(),
                &range,
                limit,
            )
            .await
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_discover(
    engine: &Engine,
    service: &str,
    env: Option<&str>,
    window: Option<&str>,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let window = window.map(TimeRange::parse).transpose()?;
    info!(service, "discovering metrics");
    let discovered = engine.discover(service, env, window).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&discovered)?),
        OutputFormat::Text => {
            println!("Primary metrics for '{service}':");
            for role in [MetricRole::Latency, MetricRole::Throughput, MetricRole::Errors] {
                match discovered.primary_metric(role) {
                    Some(metric) => println!("  {:<11} {metric}", role.as_str()),
                    None => println!("  {:<11} (none)", role.as_str()),
                }
            }
            if !discovered.alternates.is_empty() {
                println!("Alternate groups:");
                for (base, roles) in &discovered.alternates {
                    println!("  {base} ({} roles)", roles.len());
                }
            }
            println!("{} metrics total", discovered.all_metrics.len());
        }
    }
    Ok(())
}

async fn run_operations(
    engine: &Engine,
    service: &str,
    env: Option<&str>,
    range: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let range = TimeRange::parse(range)?;
    let operations = engine.get_operations(service, env, range).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&operations)?),
        OutputFormat::Text => {
            println!(
                "{:<40} {:>10} {:>8} {:>9} {:>9} {:>9} {:>7}",
                "OPERATION", "REQUESTS", "ERRORS", "P50(ms)", "P95(ms)", "P99(ms)", "ERR%"
            );
            for op in &operations {
                println!(
                    "{:<40} {:>10} {:>8} {:>9.2} {:>9.2} {:>9.2} {:>6.2}%",
                    op.operation,
                    op.request_count,
                    op.error_count,
                    op.p50_latency_ms,
                    op.p95_latency_ms,
                    op.p99_latency_ms,
                    op.error_rate,
                );
            }
        }
    }
    Ok(())
}

async fn run_metrics(
    engine: &Engine,
    query: &str,
    range: &str,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let range = TimeRange::parse(range)?;
    let series = engine.query_metrics(query, range).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&series)?),
        OutputFormat::Text => {
            for s in &series {
                let latest = s.latest_value().unwrap_or(0.0);
                println!("{:<60} {} points, latest {latest}", s.scope, s.points.len());
            }
            println!("{} series", series.len());
        }
    }
    Ok(())
}

async fn run_spans(
    engine: &Engine,
    service: &str,
    env: Option<&str>,
    filter: Option<&str>,
    range: &str,
    limit: usize,
) -> anyhow::Result<()> {
    let range = TimeRange::parse(range)?;
    let spans = engine.list_spans(service, env, filter, range, limit).await?;

    println!("{}", serde_json::to_string_pretty(&spans)?);
    Ok(())
}
