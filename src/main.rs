use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use speech_session::{
    AudioInput, AudioSourceOptions, ChannelSink, Collaborators, Config, DefaultBackendFactory,
    NoopAudioSession, RecognitionEvent, RecognitionOptions, RecordingOptions, ReplayProvider, ReplayScript,
    SpeechRecognitionService, StaticPermissions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[derive(Parser)]
#[command(name = "speech-session", about = "Speech recognition session runner")]
struct Cli {
    /// Configuration file (without extension)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run one session against a scripted recognizer and print its events
    Replay(ReplayArgs),
}

#[derive(clap::Args)]
struct ReplayArgs {
    /// Replay script (JSON)
    #[arg(long)]
    script: PathBuf,

    #[arg(long)]
    lang: Option<String>,

    #[arg(long)]
    continuous: bool,

    #[arg(long)]
    interim: bool,

    /// WAV file played back as the live input
    #[arg(long)]
    input_wav: Option<String>,

    /// Transcribe this URI instead of live input
    #[arg(long)]
    audio_uri: Option<String>,

    /// Persist the live input
    #[arg(long)]
    persist: bool,

    /// Recording destination
    #[arg(long)]
    output: Option<PathBuf>,

    #[arg(long)]
    stop_after_ms: Option<u64>,

    #[arg(long)]
    abort_after_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => Some(Config::load(path)?),
        None => None,
    };
    if let Some(cfg) = &cfg {
        info!("Loaded config: {}", cfg.service.name);
    }

    match cli.command {
        Command::Replay(args) => replay(args, cfg).await,
    }
}

async fn replay(args: ReplayArgs, cfg: Option<Config>) -> Result<()> {
    let script = ReplayScript::load(&args.script)?;

    let settings = cfg
        .as_ref()
        .map(Config::controller_settings)
        .unwrap_or_default();
    let default_locale = cfg
        .as_ref()
        .map(|c| c.recognition.default_locale.clone())
        .unwrap_or_else(|| "en-US".to_string());
    let mut locales = cfg
        .as_ref()
        .map(|c| c.recognition.supported_locales.clone())
        .unwrap_or_default();
    if locales.is_empty() {
        locales.push(default_locale.clone());
    }

    let input = match &args.input_wav {
        Some(path) => AudioInput::WavFile {
            path: path.clone(),
            realtime: true,
        },
        None => AudioInput::Microphone,
    };

    let service = Arc::new(SpeechRecognitionService::new(
        Arc::new(ReplayProvider::new(locales, script)),
        Collaborators {
            permissions: Arc::new(StaticPermissions::granted()),
            audio_session: Arc::new(NoopAudioSession),
            backends: Arc::new(DefaultBackendFactory::new(input)),
        },
        settings,
    ));

    let mut options = RecognitionOptions::new(args.lang.unwrap_or(default_locale));
    options.continuous = args.continuous;
    options.interim_results = args.interim;
    options.audio_source = args.audio_uri.map(AudioSourceOptions::new);
    if args.persist {
        options.recording_options = Some(RecordingOptions::persist_to(args.output));
    }

    let (sink, mut events) = ChannelSink::new();
    service
        .start(
            options,
            sink,
            Some(Box::new(|path: PathBuf| info!("Recording saved to {}", path.display()))),
        )
        .await;

    if let Some(delay) = args.stop_after_ms {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            service.stop().await;
        });
    }
    if let Some(delay) = args.abort_after_ms {
        let service = Arc::clone(&service);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(delay)).await;
            service.abort().await;
        });
    }

    while let Some(event) = events.recv().await {
        let is_end = event == RecognitionEvent::End;
        let line = serde_json::json!({
            "at": chrono::Utc::now().to_rfc3339(),
            "event": event,
        });
        println!("{}", serde_json::to_string(&line).context("Failed to encode event")?);
        if is_end {
            break;
        }
    }

    Ok(())
}
