use std::{net::SocketAddr, path::PathBuf, sync::Arc, time::Duration};

use clap::{Parser, Subcommand};
use video_digest::{
    groq::GroqClient,
    media::ytdlp::YtDlpAcquirer,
    server,
    tracing::init_tracing_subscriber,
    AnalysisOrchestrator, AnalysisOrchestratorBuilder, ConfigError, RateLimiter,
};

#[derive(Parser)]
#[command(name = "video-digest", about = "Educational video analyzer")]
struct Cli {
    /// Groq API key
    #[arg(long, env = "GROQ_API_KEY", hide_env_values = true)]
    groq_api_key: Option<String>,

    /// Working directory for downloaded videos and frames
    #[arg(long, env = "VIDEO_DIGEST_WORKDIR", default_value = "/var/tmp/video-digest")]
    workdir: PathBuf,

    /// Maximum model calls admitted per minute
    #[arg(long, env = "CALLS_PER_MINUTE", default_value = "10")]
    calls_per_minute: usize,

    /// Keep every Nth decoded frame
    #[arg(long, default_value = "30")]
    frame_interval: u32,

    /// Frames analyzed concurrently
    #[arg(long, default_value = "4")]
    batch_size: usize,

    /// Transcript characters sent to the summarizer
    #[arg(long, default_value = "2000")]
    transcript_limit: usize,

    /// Timeout for each model request, in seconds
    #[arg(long, default_value = "120")]
    request_timeout_secs: u64,

    /// Path to the yt-dlp binary
    #[arg(long, env = "YTDLP_PATH", default_value = "yt-dlp")]
    ytdlp_path: PathBuf,

    /// Path to the ffmpeg binary
    #[arg(long, env = "FFMPEG_PATH", default_value = "ffmpeg")]
    ffmpeg_path: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Serve {
        /// Address to bind
        #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
        bind: SocketAddr,
    },
    /// Analyze a single video and print the result as JSON
    Analyze {
        /// Video url
        url: String,
    },
}

type Orchestrator = AnalysisOrchestrator<YtDlpAcquirer, GroqClient, GroqClient>;

fn build_orchestrator(cli: &Cli) -> anyhow::Result<Orchestrator> {
    let api_key = cli
        .groq_api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .ok_or(ConfigError::MissingSecret("GROQ_API_KEY"))?;

    //XXX: handles transcription, vision and text generation; hence cloned
    let groq = GroqClient::new(api_key, Duration::from_secs(cli.request_timeout_secs))?;

    let acquirer = YtDlpAcquirer::new(&cli.workdir)
        .with_binaries(&cli.ytdlp_path, &cli.ffmpeg_path)
        .with_frame_interval(cli.frame_interval);

    let orchestrator = AnalysisOrchestratorBuilder::new()
        .media_acquirer(acquirer)
        .transcriber(groq.clone())
        .model(Arc::new(groq))
        .rate_limiter(Arc::new(RateLimiter::new(cli.calls_per_minute)))
        .batch_size(cli.batch_size)
        .transcript_limit(cli.transcript_limit)
        .build();

    Ok(orchestrator)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    let _guard = sentry::init((
        std::env::var("SENTRY_DSN").unwrap_or_default(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    ));

    let cli = Cli::parse();
    init_tracing_subscriber()?;

    let orchestrator = build_orchestrator(&cli)
        .inspect_err(|e| tracing::error!(error = %e, "Invalid configuration"))?;
    tokio::fs::create_dir_all(&cli.workdir).await?;

    match cli.command {
        Command::Serve { bind } => {
            let listener = tokio::net::TcpListener::bind(bind).await?;
            server::serve(listener, server::router(Arc::new(orchestrator))).await?;
        }
        Command::Analyze { url } => {
            let result = orchestrator.analyze(&url).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
