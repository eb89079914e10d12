//! subgen - subtitle generation for video files
//!
//! Extracts audio with ffmpeg, transcribes it with whisper-cpp, optionally
//! translates it through ollama and writes an SRT file beside the video.
//! Runs either as a batch CLI or as an HTTP task API.

use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use subgen::cli::{Args, Commands};
use subgen::config::Config;
use subgen::media::FfmpegExtractor;
use subgen::models::ModelManager;
use subgen::server;
use subgen::task::{Orchestrator, TaskStore};
use subgen::translate::OllamaProvider;
use subgen::workflow::{collect_videos, Workflow};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let _log_guard = setup_logging(args.verbose)?;
    info!("Starting subgen");

    let mut config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let model_manager = ModelManager::new(&config.transcriber.models_dir)?;

    match args.command {
        Commands::Models { download } => {
            let models = model_manager.get_available_models();
            println!("\nAvailable Whisper Models:");
            println!("{:<22} {:<32} {:<10} {:<10}", "Name", "Filename", "Size (MB)", "Status");
            println!("{}", "-".repeat(76));

            for model in &models {
                let status = if model_manager.local_path(model).exists() {
                    "Downloaded"
                } else {
                    "Missing"
                };
                println!(
                    "{:<22} {:<32} {:<10.1} {:<10}",
                    model.name, model.filename, model.size_mb, status
                );
            }

            if download {
                info!("Downloading all missing models...");
                for model in &models {
                    model_manager.download_model(model).await?;
                }
                info!("All models downloaded successfully");
            }
        }
        Commands::Generate {
            inputs,
            target_lang,
            batch_size,
            context_window,
        } => {
            if target_lang.is_some() {
                config.translate.target_language = target_lang;
            }
            if let Some(batch_size) = batch_size {
                config.translate.batch_size = batch_size;
            }
            if let Some(context_window) = context_window {
                config.translate.context_window_size = context_window;
            }

            let workflow = build_workflow(&mut config, &model_manager).await?;

            let videos = collect_videos(&inputs);
            if videos.is_empty() {
                warn!("No video files found");
                return Ok(ExitCode::SUCCESS);
            }

            let mut failures = 0;
            for video in &videos {
                match workflow.process_file(video).await {
                    Ok(srt_path) => println!("✓ {} -> {}", video.display(), srt_path.display()),
                    Err(e) => {
                        failures += 1;
                        println!("✗ {}: {}", video.display(), e);
                    }
                }
            }

            info!(
                "Processed {} videos: {} succeeded, {} failed",
                videos.len(),
                videos.len() - failures,
                failures
            );
            if failures > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Commands::Serve { addr, port } => {
            if let Some(addr) = addr {
                config.server.addr = addr;
            }
            if let Some(port) = port {
                config.server.port = port;
            }

            let workflow = build_workflow(&mut config, &model_manager).await?;
            let store = Arc::new(TaskStore::with_retention(
                config.server.retention_secs.map(Duration::from_secs),
            ));
            let orchestrator = Arc::new(Orchestrator::new(
                store,
                Arc::new(workflow),
                config.server.media_root.clone(),
            ));

            server::serve(&config.server, orchestrator).await?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Resolve the whisper model, report missing external tools and build the
/// workflow from the final configuration.
async fn build_workflow(config: &mut Config, model_manager: &ModelManager) -> Result<Workflow> {
    config.validate()?;

    let model_path = model_manager.resolve(&config.transcriber.model).await?;
    config.transcriber.model = model_path.to_string_lossy().to_string();
    info!("Using whisper model: {}", config.transcriber.model);

    if let Err(e) = FfmpegExtractor::new(config.media.clone()).check_availability().await {
        warn!("ffmpeg is not available: {}", e);
    }

    if config.translate.target_language.is_some() {
        let provider = OllamaProvider::new(config.translate.clone())?;
        if let Err(e) = provider.check_availability().await {
            warn!("Translation will fall back to source text: {}", e);
        }
    }

    Ok(Workflow::from_config(config)?)
}

fn setup_logging(verbose: bool) -> Result<WorkerGuard> {
    let log_dir = std::env::current_dir()?.join(".subgen").join("log");
    std::fs::create_dir_all(&log_dir)?;

    // Daily rotation; the guard flushes the file writer on drop
    let file_appender = rolling::daily(&log_dir, "subgen.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    let console_layer = fmt::layer()
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!(
        "Logging initialized - console: {}, file: {}",
        log_level,
        log_dir.join("subgen.log").display()
    );

    Ok(guard)
}
