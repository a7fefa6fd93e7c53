#![allow(clippy::nursery)]
#![allow(clippy::pedantic)]

use std::sync::Arc;

use clap::Parser;

use exam_cache::TtlCache;
use exam_config::ExamConfig;
use exam_db::ExamDb;
use exam_moodle::MoodleClient;
use exam_resolve::ResolutionEngine;

mod cli;
mod commands;

use commands::AppContext;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        eprintln!("exf error: {error:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = cli::Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let config = ExamConfig::load_with_dotenv()?;
    let db = Arc::new(ExamDb::open_local(&config.database.path).await?);
    let cache = Arc::new(TtlCache::new(config.cache.default_ttl()));
    let client = Arc::new(MoodleClient::new(&config.moodle));
    let engine = Arc::new(ResolutionEngine::new(
        Arc::clone(&cache),
        Arc::clone(&db),
        Arc::clone(&client),
        config.subjects.clone(),
        &config.cache,
    ));

    let ctx = AppContext {
        config,
        db,
        engine,
        client,
    };

    match &cli.command {
        cli::Commands::Resolve {
            subject_code,
            token,
        } => commands::resolve(&ctx, subject_code, token.as_deref(), cli.json).await,
        cli::Commands::Mappings { action } => match action {
            cli::MappingsAction::List => commands::mappings_list(&ctx, cli.json).await,
            cli::MappingsAction::Deactivate { subject_code } => {
                commands::mappings_deactivate(&ctx, subject_code).await
            }
        },
        cli::Commands::Cache { action } => match action {
            cli::CacheAction::Stats => commands::cache_stats(&ctx, cli.json).await,
            cli::CacheAction::Clear => commands::cache_clear(&ctx).await,
        },
        cli::Commands::Refresh { token } => commands::refresh(&ctx, token, cli.json).await,
        cli::Commands::Upload { file, blob_dir } => {
            commands::upload(&ctx, file, blob_dir, cli.json).await
        }
        cli::Commands::Submit {
            artifact_uid,
            token,
        } => commands::submit(&ctx, artifact_uid, token, cli.json).await,
    }
}

fn init_tracing(quiet: bool, verbose: u8) {
    let default = if quiet {
        "error"
    } else {
        match verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
