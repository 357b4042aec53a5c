#![forbid(unsafe_code)]

use std::fs;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use neuroforge::gateway::{NoopUsageSink, ProviderGateway, TracingUsageSink};
use neuroforge::pipeline::{self, StageObserver};
use neuroforge::stages::StageId;
use neuroforge::{naming, server};

#[derive(Parser)]
#[command(name = "neuroforge", version, about = "Nine-stage game generation pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API server
    Serve {
        #[arg(long, default_value = "0.0.0.0:3000")]
        addr: SocketAddr,
    },
    /// Run the pipeline once and emit the HTML artifact
    Generate {
        /// Inline game request text
        #[arg(long, group = "input")]
        prompt: Option<String>,

        /// Read the game request from a file (alternative to --prompt)
        #[arg(long, group = "input")]
        prompt_file: Option<PathBuf>,

        /// Write the artifact here instead of stdout
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Name the requested game with a single model call
    Name {
        #[arg(long)]
        prompt: String,
    },
}

/// Progress reporting for one-shot runs: one stderr line per finished stage.
struct StderrProgress;

impl StageObserver for StderrProgress {
    fn on_stage_complete(&self, stage: StageId, index: usize, latency: Duration) {
        eprintln!(
            "[generate] [{}/9] {} done ({:.1}s)",
            index + 1,
            stage,
            latency.as_secs_f64()
        );
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { addr } => {
            let gateway = ProviderGateway::from_env(Arc::new(TracingUsageSink))?;
            server::serve(addr, Arc::new(gateway)).await?;
        }
        Commands::Generate {
            prompt,
            prompt_file,
            out,
        } => {
            let task = match (prompt, prompt_file) {
                (Some(text), _) => text,
                (None, Some(path)) => fs::read_to_string(path)?,
                (None, None) => return Err("--prompt or --prompt-file is required".into()),
            };
            let task = task.trim().to_string();
            if task.is_empty() {
                return Err("prompt must not be empty".into());
            }

            let gateway = ProviderGateway::from_env(Arc::new(NoopUsageSink))?;
            let outcome = pipeline::run_pipeline(&gateway, &task, &StderrProgress).await?;

            match out {
                Some(path) => {
                    fs::write(&path, &outcome.html)?;
                    eprintln!("[generate] wrote {}", path.display());
                }
                None => {
                    let mut stdout = std::io::stdout().lock();
                    stdout.write_all(outcome.html.as_bytes())?;
                    stdout.write_all(b"\n")?;
                }
            }
        }
        Commands::Name { prompt } => {
            let gateway = ProviderGateway::from_env(Arc::new(NoopUsageSink))?;
            let name = naming::name_game(&gateway, &prompt).await?;
            println!("{name}");
        }
    }

    Ok(())
}
