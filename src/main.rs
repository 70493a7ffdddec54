//! `council` — CLI entrypoint for the deliberation engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use council_engine::config::{build_provider, Config};
use council_engine::coordinator::Coordinator;
use council_engine::model::{AggregationMethod, Options, OutputMode, Role};

#[derive(Parser, Debug)]
#[command(author, version, about = "Run a multi-model council deliberation", long_about = None)]
struct Args {
    /// The task every role is asked to answer.
    #[arg(short, long)]
    task: String,

    /// TOML file listing the roles (`[[roles]]` entries).
    #[arg(short, long)]
    roles: PathBuf,

    /// Chairman model id, required unless `--output-mode perspectives`.
    #[arg(long)]
    chairman: Option<String>,

    /// Config file path; defaults to the platform config directory.
    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum, default_value_t = CliOutputMode::Both)]
    output_mode: CliOutputMode,

    #[arg(long, value_enum, default_value_t = CliAggregation::Borda)]
    aggregation: CliAggregation,

    #[arg(long, default_value_t = false)]
    no_anonymize: bool,

    #[arg(long, default_value_t = false)]
    no_review: bool,

    #[arg(long, value_enum, default_value_t = CliFormat::Json)]
    format: CliFormat,

    #[arg(long, default_value_t = false)]
    debug: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliOutputMode {
    Perspectives,
    Synthesis,
    Both,
}

impl From<CliOutputMode> for OutputMode {
    fn from(value: CliOutputMode) -> Self {
        match value {
            CliOutputMode::Perspectives => OutputMode::Perspectives,
            CliOutputMode::Synthesis => OutputMode::Synthesis,
            CliOutputMode::Both => OutputMode::Both,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliAggregation {
    Borda,
    BradleyTerry,
    Elo,
}

impl From<CliAggregation> for AggregationMethod {
    fn from(value: CliAggregation) -> Self {
        match value {
            CliAggregation::Borda => AggregationMethod::Borda,
            CliAggregation::BradleyTerry => AggregationMethod::BradleyTerry,
            CliAggregation::Elo => AggregationMethod::Elo,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CliFormat {
    Json,
    Report,
}

#[derive(Debug, Deserialize)]
struct RolesFile {
    roles: Vec<Role>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = Config::load(args.config.as_deref()).context("loading configuration")?;
    let provider = build_provider(&config).context("constructing provider")?;

    let roles_content = std::fs::read_to_string(&args.roles)
        .with_context(|| format!("reading roles file {}", args.roles.display()))?;
    let roles_file: RolesFile =
        toml::from_str(&roles_content).with_context(|| format!("parsing roles file {}", args.roles.display()))?;

    let options = Options {
        output_mode: args.output_mode.into(),
        anonymize: !args.no_anonymize,
        review: !args.no_review,
        reviewers: None,
        aggregation: args.aggregation.into(),
        chairman_model: args.chairman,
    };

    let coordinator = Coordinator::new(provider)
        .with_deadline(config.overall_deadline());

    let output = coordinator
        .deliberate(&args.task, &roles_file.roles, &options, CancellationToken::new())
        .await?;

    match args.format {
        CliFormat::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        CliFormat::Report => print_report(&output),
    }

    Ok(())
}

fn print_report(output: &council_engine::CouncilOutput) {
    println!("Task: {}\n", output.task);

    for answer in &output.results {
        println!("=== {} ({}) ===", answer.role, answer.model);
        if answer.success {
            println!("{}\n", answer.text);
        } else {
            println!("[failed: {}]\n", answer.error.as_deref().unwrap_or("unknown error"));
        }
    }

    for (method, scores) in &output.aggregation_scores {
        println!("-- {method} --");
        let mut ranked: Vec<(&String, &f64)> = scores.scores.iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(a.1).unwrap());
        for (role, score) in ranked {
            println!("  {role}: {score:.3}");
        }
    }

    if let Some(synthesis) = &output.synthesis {
        println!("\n=== Synthesis ===\n{synthesis}");
    }

    println!(
        "\n[generation {}ms, review {}ms, synthesis {}ms, verdicts {} (unparseable {}, failed {})]",
        output.metadata.generation_ms,
        output.metadata.review_ms,
        output.metadata.synthesis_ms,
        output.metadata.review_stats.verdicts,
        output.metadata.review_stats.unparseable,
        output.metadata.review_stats.failed,
    );
}
