use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};

use clipdeck::api::{self, AppState};
use clipdeck::config::AppConfig;
use clipdeck::core::media::{
    AbortFlag, FfmpegTranscoder, FsObjectStore, MigrationJobs, MigrationOptions, MigrationProgress, MigrationRunner,
    PassthroughTranscoder, Transcoder,
};
use clipdeck::database::Database;

#[derive(Parser, Debug)]
#[command(name = "clipdeck", version, about = "Language-learning card platform backend")]
struct Cli {
    /// Config file (defaults to ~/.config/clipdeck/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Convert media objects from one suffix to another in place
    MigrateMedia {
        #[arg(long)]
        prefix: Option<String>,
        #[arg(long = "from")]
        source_suffix: Option<String>,
        #[arg(long = "to")]
        target_suffix: Option<String>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        dry_run: bool,
        /// Repoint card and cover references at the converted objects
        #[arg(long)]
        rewrite_refs: bool,
        #[arg(long)]
        delete_original: bool,
        /// Copy bytes unchanged instead of running ffmpeg
        #[arg(long)]
        passthrough: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let loaded = AppConfig::load(cli.config.as_deref());
    let config = loaded.config;

    let _log_guard = clipdeck::core::logging::init(&config.logging, &config.log_dir());
    tracing::info!("clipdeck v{} starting", clipdeck::VERSION);
    match loaded.error {
        Some(e) => tracing::warn!(error = %e, "Using default configuration"),
        None => tracing::info!(path = %loaded.path.display(), "Configuration loaded"),
    }

    match cli.command.unwrap_or(Command::Serve { host: None, port: None }) {
        Command::Serve { host, port } => serve(config, host, port).await,
        Command::MigrateMedia {
            prefix,
            source_suffix,
            target_suffix,
            concurrency,
            dry_run,
            rewrite_refs,
            delete_original,
            passthrough,
        } => {
            let mut options = MigrationOptions::from_config(&config.migration);
            options.prefix = prefix.unwrap_or(options.prefix);
            options.source_suffix = source_suffix.unwrap_or(options.source_suffix);
            options.target_suffix = target_suffix.unwrap_or(options.target_suffix);
            options.concurrency = concurrency.unwrap_or(options.concurrency);
            options.dry_run = dry_run;
            options.rewrite_references = rewrite_refs;
            options.delete_original = delete_original;
            migrate_media(config, options, passthrough).await
        }
    }
}

fn build_transcoder(config: &AppConfig, passthrough: bool) -> Arc<dyn Transcoder> {
    if passthrough {
        Arc::new(PassthroughTranscoder::new(config.media.output_content_type.clone()))
    } else {
        Arc::new(FfmpegTranscoder::new(
            config.media.ffmpeg_path.clone(),
            config.media.ffmpeg_args.clone(),
            config.media.output_content_type.clone(),
        ))
    }
}

async fn serve(mut config: AppConfig, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let db = Database::new(&config.data_dir()).await.context("Failed to open database")?;
    let store = Arc::new(FsObjectStore::new(config.media_root()).context("Failed to open media store")?);

    let runner = MigrationRunner::new(store, build_transcoder(&config, false)).with_references(Arc::new(db.clone()));

    let state = AppState {
        db,
        jobs: Arc::new(MigrationJobs::new(runner)),
        migration_defaults: MigrationOptions::from_config(&config.migration),
    };

    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.bind_address()))?;

    api::serve(state, addr, &config.server.cors_origins).await?;
    Ok(())
}

async fn migrate_media(config: AppConfig, options: MigrationOptions, passthrough: bool) -> anyhow::Result<()> {
    let store = Arc::new(FsObjectStore::new(config.media_root()).context("Failed to open media store")?);
    let mut runner = MigrationRunner::new(store, build_transcoder(&config, passthrough));
    if options.rewrite_references {
        let db = Database::new(&config.data_dir()).await.context("Failed to open database")?;
        runner = runner.with_references(Arc::new(db));
    }

    let abort = AbortFlag::new();
    let on_signal = abort.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Ctrl+C received, stopping after the current batch");
            on_signal.abort();
        }
    });

    let progress = MigrationProgress::new(options.log_capacity);
    let summary = runner.run(&options, &progress, &abort).await?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    if summary.counts.failed > 0 {
        anyhow::bail!("{} objects failed to migrate", summary.counts.failed);
    }
    Ok(())
}
