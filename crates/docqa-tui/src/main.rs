use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use colored::*;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use docqa_core::{BackendClient, Config, PendingFile, QueryConsole, TopK, UploadStatus, Uploader};

mod app;
mod handler;
mod paths;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "docqa")]
#[command(about = "Upload documents and ask questions against a RAG backend")]
struct Cli {
    /// Backend base URL (overrides config file and DOCQA_BASE_URL)
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive terminal UI (default)
    Tui,
    /// Upload files for ingestion
    Ingest {
        /// Files to upload
        #[arg(required = true)]
        files: Vec<std::path::PathBuf>,
    },
    /// Ask a single question
    Ask {
        /// Your question
        question: String,
        /// Number of supporting snippets to request (1-20)
        #[arg(short = 'k', long)]
        top_k: Option<u32>,
    },
}

fn setup_logging() -> Result<WorkerGuard> {
    let directory = Config::config_dir().unwrap_or_else(|_| std::env::temp_dir());
    std::fs::create_dir_all(&directory)?;

    let file_appender = tracing_appender::rolling::never(&directory, "docqa.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    // The TUI owns the terminal, so logs only go to the file
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true),
        )
        .init();

    tracing::info!(log_dir = %directory.display(), "logging initialized");
    Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _guard = setup_logging()?;

    let mut config = Config::load().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "falling back to default config");
        Config::new()
    });
    config = config.with_env_overrides();
    if let Some(url) = cli.base_url {
        config.base_url = url;
    }

    match cli.command.unwrap_or(Commands::Tui) {
        Commands::Tui => run_tui(&config).await,
        Commands::Ingest { files } => ingest_files(&config, &files).await,
        Commands::Ask { question, top_k } => {
            let top_k = top_k.map(TopK::new).unwrap_or_else(|| config.top_k());
            ask_question(&config, &question, top_k).await
        }
    }
}

async fn run_tui(config: &Config) -> Result<()> {
    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut app = App::new(config)?;
    let mut events = EventHandler::new();

    let result = async {
        while !app.should_quit {
            terminal.draw(|frame| ui::render(&mut app, frame))?;

            if let Some(event) = events.next().await {
                handler::handle_event(&mut app, event).await?;
            }
            app.poll_tasks().await;
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    app.shutdown();
    tui::restore()?;
    result
}

async fn ingest_files(config: &Config, paths: &[std::path::PathBuf]) -> Result<()> {
    let client = BackendClient::from_config(config)?;

    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(PendingFile::from_path(path).await?);
    }

    let mut uploader = Uploader::new(config.media_filter());
    uploader.set_listener(|summary| {
        println!("{} {}", "Indexed:".dimmed(), summary.info);
    });
    uploader.select(files);

    println!(
        "📤 Uploading {} file(s) to {}",
        uploader.len().to_string().bold(),
        client.base_url().cyan()
    );

    uploader.submit(&client, &CancellationToken::new()).await?;

    match uploader.status() {
        Some(UploadStatus::Success(msg)) => {
            println!("{}", msg.green());
            Ok(())
        }
        Some(UploadStatus::Error(msg)) => Err(anyhow!("{}", msg)),
        None => Ok(()),
    }
}

async fn ask_question(config: &Config, question: &str, top_k: TopK) -> Result<()> {
    let client = BackendClient::from_config(config)?;
    let mut console = QueryConsole::new(top_k);

    println!("🔍 Asking {} (top-k {})\n", client.base_url().cyan(), top_k);

    if !console
        .ask_and_wait(question, top_k, &client, &CancellationToken::new())
        .await
    {
        return Err(anyhow!("Question is empty"));
    }

    let Some(reply) = console.transcript().last() else {
        return Ok(());
    };

    println!("{}", "Answer:".bold().green());
    println!("{}", reply.content);

    if !reply.sources.is_empty() {
        println!("\n{}", "Sources:".bold().blue());
        for source in &reply.sources {
            println!("• {} {}", source.id.yellow(), source.text.dimmed());
        }
    }

    Ok(())
}
