mod commands;
mod events;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};

use fg_core::domain::settings::ClientSettings;
use fg_core::domain::types::{Quality, Style};
use fg_core::infra::opener::{LogOpener, SystemOpener, UrlOpener};
use fg_core::infra::service::{GenerationService, HttpGenerationService, NoopGenerationService};
use fg_core::usecase::app_service::AppService;

use crate::commands::{CmdResult, CommandError, GenerateArgs};

#[derive(Parser)]
#[command(name = "filmgen")]
#[command(about = "Turn a screenplay into generated film scenes")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Settings file (default: <config_dir>/filmgen/settings.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the offline demo service instead of the HTTP API
    #[arg(long, global = true)]
    offline: bool,

    /// Print one JSON event per line
    #[arg(long, global = true)]
    json: bool,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Estimate generation cost for a screenplay
    Estimate {
        /// Screenplay file
        file: PathBuf,

        /// Quality tier (low, medium, high, ultra)
        #[arg(short, long)]
        quality: Option<Quality>,
    },

    /// Submit a screenplay and follow the job to completion
    Generate {
        /// Screenplay file
        file: PathBuf,

        /// Visual style (cinematic, documentary, noir, ...)
        #[arg(short, long)]
        style: Option<Style>,

        /// Quality tier (low, medium, high, ultra)
        #[arg(short, long)]
        quality: Option<Quality>,

        /// Open every playable scene video when the job completes
        #[arg(long)]
        download: bool,
    },

    /// Show generation service information
    Info,
}

/// 生成サービスを構築する（--offline: Noop, 他: HTTP）
fn create_service(
    settings: &ClientSettings,
    offline: bool,
) -> CmdResult<Arc<dyn GenerationService>> {
    if offline {
        log::info!("Using offline demo generation service");
        return Ok(Arc::new(NoopGenerationService::new()));
    }

    let service = HttpGenerationService::new(settings)
        .map_err(|e| fg_core::domain::error::AppError::config(e.to_string()))?;
    log::info!("Using generation service at {}", service.base_url());
    Ok(Arc::new(service))
}

fn create_opener(offline: bool) -> Arc<dyn UrlOpener> {
    if offline {
        Arc::new(LogOpener)
    } else {
        Arc::new(SystemOpener::new())
    }
}

async fn run(cli: Cli) -> CmdResult<()> {
    let settings = ClientSettings::resolve(cli.config.as_deref())?;
    let service = create_service(&settings, cli.offline)?;
    let app = AppService::new(service, create_opener(cli.offline), settings);

    match cli.command {
        Command::Estimate { file, quality } => {
            let quality = quality.unwrap_or(app.settings().default_quality);
            commands::estimate(&app, &file, quality, cli.json)
        }
        Command::Generate {
            file,
            style,
            quality,
            download,
        } => {
            commands::generate(
                &app,
                GenerateArgs {
                    path: file,
                    style,
                    quality,
                    download,
                    json: cli.json,
                },
            )
            .await
        }
        Command::Info => commands::info(&app, cli.json).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let json = cli.json;
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            CommandError::report(&e, json);
            ExitCode::FAILURE
        }
    }
}
