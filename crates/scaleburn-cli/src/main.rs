mod cases;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand, ValueEnum};
use scaleburn_benchmark::{BenchmarkEvent, BenchmarkRunner, OpenAiClient};
use scaleburn_core::{
    parse_profile, BenchmarkConfig, ClientConfig, Report, RunInfo, ScaleBurnError, ServerInfo,
    TestCase,
};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scaleburn")]
#[command(about = "ScaleBurn - concurrency scaling benchmark for LLM servers", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List models served by the endpoint
    Models,

    /// Run the concurrency scaling benchmark
    Run {
        /// Which stage to run
        #[arg(short, long, value_enum, default_value = "all")]
        stage: Stage,

        /// Concurrency levels, comma separated (e.g. 1,2,4,8)
        #[arg(short, long)]
        profile: Option<String>,

        /// Sequential requests each worker makes per level
        #[arg(short = 'n', long)]
        requests_per_worker: Option<u32>,

        /// Length of the prefill prompt in paragraphs
        #[arg(long, default_value = "10")]
        paragraphs: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Show endpoint status
    Status,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Stage {
    Prefill,
    Decode,
    All,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Models) => cmd_models().await?,
        Some(Commands::Run {
            stage,
            profile,
            requests_per_worker,
            paragraphs,
            output,
        }) => {
            cmd_run(stage, profile.as_deref(), requests_per_worker, paragraphs, output).await?
        }
        Some(Commands::Status) => cmd_status().await?,
        None => cmd_run(Stage::All, None, None, 10, OutputFormat::Table).await?,
    }

    Ok(())
}

fn client_config() -> Result<ClientConfig> {
    ClientConfig::from_env().context("Endpoint is not configured (see CLIENT_* variables)")
}

async fn cmd_models() -> Result<()> {
    let config = client_config()?;
    let client = OpenAiClient::from_config(&config)?;
    let models = client.list_models().await?;

    println!();
    println!("Available Models ({}):", config.endpoint_url());
    println!("{:-<50}", "");
    for (i, id) in models.iter().enumerate() {
        println!("  {:<4} {}", i + 1, id);
    }
    println!();

    Ok(())
}

async fn cmd_status() -> Result<()> {
    let config = client_config()?;
    println!("System Status:");
    println!("{:-<40}", "");
    println!("  Endpoint: {}", config.endpoint_url());
    println!("  Model:    {}", config.model_name);

    let client = OpenAiClient::from_config(&config)?;
    match client.list_models().await {
        Ok(models) => {
            let served = models.iter().any(|m| m == &config.model_name);
            println!("  Server:   connected ({} models available)", models.len());
            if !served {
                println!("  Warning:  {} is not listed by the server", config.model_name);
            }
        }
        Err(e) => {
            println!("  Server:   disconnected ({})", e);
        }
    }

    Ok(())
}

async fn cmd_run(
    stage: Stage,
    profile: Option<&str>,
    requests_per_worker: Option<u32>,
    paragraphs: usize,
    output: OutputFormat,
) -> Result<()> {
    let client_config = client_config()?;
    let mut config = BenchmarkConfig::from_env()?;
    if let Some(raw) = profile {
        config.profile = parse_profile(raw)?;
    }
    if let Some(n) = requests_per_worker {
        config.requests_per_worker = n;
    }
    config.validate()?;

    let client = OpenAiClient::from_config(&client_config)?;

    let models = match client.list_models().await {
        Ok(models) => models,
        Err(e) => {
            warn!("Could not list models: {}", e);
            Vec::new()
        }
    };
    let run_info = RunInfo {
        datetime: Utc::now(),
        model: client_config.model_name.clone(),
        server: ServerInfo {
            info: join_info(&config.info, &client_config.info),
            host: client_config.host.clone(),
            models,
        },
    };
    print_run_info(&run_info, output)?;

    let mut test_cases: Vec<(&str, TestCase)> = Vec::new();
    if matches!(stage, Stage::Prefill | Stage::All) {
        test_cases.push(("prefill", cases::prefill(&config.profile, paragraphs)));
    }
    if matches!(stage, Stage::Decode | Stage::All) {
        test_cases.push(("decode", cases::decode(&config.profile)));
    }

    info!(
        "Running {} stage(s) against {} with {} requests per worker",
        test_cases.len(),
        client_config.endpoint_url(),
        config.requests_per_worker
    );

    let runner = BenchmarkRunner::new(client, config);

    for (name, test_case) in &test_cases {
        let (tx, mut rx) = mpsc::channel(64);
        let stage_name = name.to_string();
        let progress = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Some(line) = progress_line(&stage_name, &event) {
                    eprintln!("{}", line);
                }
            }
        });

        let result = runner.run_with_events(name, test_case, Some(tx)).await;
        if let Err(e) = progress.await {
            warn!("Progress reporter stopped: {}", e);
        }

        match result {
            Ok(report) => print_report(&report, output)?,
            Err(ScaleBurnError::RunFailed {
                concurrency,
                completed,
                source,
            }) => {
                if !completed.is_empty() {
                    print_report(&completed, output)?;
                }
                anyhow::bail!(
                    "{} stage failed at concurrency {}: {}",
                    name,
                    concurrency,
                    source
                );
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}

/// Renders one progress event for stderr; `Done` is covered by the report itself.
fn progress_line(stage: &str, event: &BenchmarkEvent) -> Option<String> {
    match event {
        BenchmarkEvent::Warmup { .. } => Some(format!("[{}] warmed up", stage)),
        BenchmarkEvent::Level {
            current,
            total,
            concurrency,
        } => Some(format!(
            "[{}] level {}/{}: {} workers...",
            stage, current, total, concurrency
        )),
        BenchmarkEvent::LevelComplete { concurrency, stats } => Some(format!(
            "[{}] {} workers: {:.1} prompt, {:.1} completion tokens, {:.3}s per request",
            stage, concurrency, stats.prompt_tokens, stats.completion_tokens, stats.elapsed_secs
        )),
        BenchmarkEvent::Error { message } => Some(format!("[{}] failed: {}", stage, message)),
        BenchmarkEvent::Done { .. } => None,
    }
}

fn join_info(benchmark: &str, client: &str) -> String {
    match (benchmark.is_empty(), client.is_empty()) {
        (true, _) => client.to_string(),
        (_, true) => benchmark.to_string(),
        _ => format!("{}; {}", benchmark, client),
    }
}

fn print_run_info(run_info: &RunInfo, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(run_info)?),
        OutputFormat::Csv => {
            println!("# datetime: {}", run_info.datetime.format("%Y-%m-%d %H:%M:%S"));
            println!("# model: {}", run_info.model);
            println!("# host: {}", run_info.server.host);
        }
        OutputFormat::Table => {
            println!();
            println!("Running benchmark...");
            println!("  Date:   {}", run_info.datetime.format("%Y-%m-%d %H:%M:%S"));
            println!("  Model:  {}", run_info.model);
            println!("  Host:   {}", run_info.server.host);
            if !run_info.server.info.is_empty() {
                println!("  Info:   {}", run_info.server.info);
            }
            println!();
        }
    }
    Ok(())
}

fn print_report(report: &Report, output: OutputFormat) -> Result<()> {
    match output {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(report)?),
        OutputFormat::Csv => {
            println!("# {}-stage", report.name);
            print!("{}", report.to_csv());
        }
        OutputFormat::Table => {
            print!("{}", report.to_table());
            println!();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use scaleburn_core::LevelStatistic;

    #[test]
    fn test_progress_line_for_level_start() {
        let event = BenchmarkEvent::Level {
            current: 2,
            total: 5,
            concurrency: 8,
        };
        assert_eq!(
            progress_line("decode", &event).as_deref(),
            Some("[decode] level 2/5: 8 workers...")
        );
    }

    #[test]
    fn test_progress_line_for_level_complete() {
        let event = BenchmarkEvent::LevelComplete {
            concurrency: 4,
            stats: LevelStatistic {
                prompt_tokens: 100.0,
                completion_tokens: 12.5,
                elapsed_secs: 0.25,
            },
        };
        assert_eq!(
            progress_line("prefill", &event).as_deref(),
            Some("[prefill] 4 workers: 100.0 prompt, 12.5 completion tokens, 0.250s per request")
        );
    }

    #[test]
    fn test_progress_line_skips_done() {
        let event = BenchmarkEvent::Done {
            report: Report::new("decode"),
        };
        assert!(progress_line("decode", &event).is_none());
    }

    #[test]
    fn test_join_info() {
        assert_eq!(join_info("", "gpu"), "gpu");
        assert_eq!(join_info("a100", ""), "a100");
        assert_eq!(join_info("a100", "vllm"), "a100; vllm");
    }
}
