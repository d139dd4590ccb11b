use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shiro_notes::audio::{SimulatedMicrophone, SimulatedMicrophoneConfig};
use shiro_notes::chat::{Author, EchoGenerator, ResponderState, TurnResponder};
use shiro_notes::notes::format_duration;
use shiro_notes::{
    create_router, AppState, Config, InMemoryNoteRepository, RecordingController, StartOutcome,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "shiro")]
#[command(about = "Notes, chat and voice recording core", version)]
struct Cli {
    /// Configuration file (without extension)
    #[arg(short, long, global = true, default_value = "config/shiro")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API
    Serve,

    /// Chat with the agent from stdin, one message per line
    Chat,

    /// Record from the simulated microphone
    Record {
        /// Seconds to record before saving
        #[arg(short, long, default_value = "5")]
        seconds: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = Config::load(&cli.config)?;
    info!("Loaded config: {}", cfg.service.name);

    match cli.command {
        Command::Serve => serve(cfg).await,
        Command::Chat => chat(cfg).await,
        Command::Record { seconds } => record(cfg, seconds).await,
    }
}

fn build_recorder(cfg: &Config) -> Arc<RecordingController> {
    let mut mic_config = SimulatedMicrophoneConfig::new(cfg.recordings_dir());
    mic_config.sample_rate = cfg.recording.sample_rate;
    let backend = Arc::new(SimulatedMicrophone::new(mic_config));

    Arc::new(RecordingController::new(backend, cfg.recording_config()))
}

async fn serve(cfg: Config) -> Result<()> {
    let recorder = build_recorder(&cfg);
    let state = AppState::new(
        Arc::new(InMemoryNoteRepository::new()),
        Arc::new(TurnResponder::new(cfg.responder_config(), Arc::new(EchoGenerator))),
        recorder.clone(),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    info!("Shutting down, releasing microphone");
    recorder.teardown().await;
    Ok(())
}

async fn chat(cfg: Config) -> Result<()> {
    let responder = TurnResponder::new(cfg.responder_config(), Arc::new(EchoGenerator));

    for message in responder.messages().await {
        println!("agent> {}", message.text);
    }

    let mut events = responder.subscribe();
    let printer = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(message) if message.author == Author::Agent => {
                    println!("agent> {}", message.text);
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!("Missed {} chat events", skipped),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        responder.submit_user_message(&line).await;
    }

    // Let a pending reply land before exiting
    let poll = Duration::from_millis(50);
    while responder.state().await == ResponderState::Armed {
        tokio::time::sleep(poll).await;
    }
    tokio::time::sleep(poll).await;

    drop(responder);
    printer.abort();
    Ok(())
}

async fn record(cfg: Config, seconds: u64) -> Result<()> {
    let recorder = build_recorder(&cfg);

    if recorder.start().await? == StartOutcome::Cancelled {
        info!("Recording was cancelled before it started");
        return Ok(());
    }
    info!("Recording for {} seconds, press Ctrl+C to cancel", seconds);

    let mut status_rx = recorder.watch();
    let meter = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = status_rx.borrow_and_update().clone();
            let bars = (status.level * 20.0).round() as usize;
            eprint!(
                "\r{} [{:<20}] x{:.2}",
                format_duration(status.elapsed_ms),
                "#".repeat(bars.min(20)),
                status.scale
            );
        }
    });

    let cancelled = tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(seconds)) => false,
        _ = tokio::signal::ctrl_c() => true,
    };
    meter.abort();
    eprintln!();

    if cancelled {
        recorder.cancel().await;
        info!("Recording cancelled");
        return Ok(());
    }

    let capture = recorder.stop_and_save().await?;
    info!(
        "Saved {} ({})",
        capture.local_handle,
        format_duration(capture.duration_ms)
    );
    Ok(())
}
