//! Wiring & DI. Entry point: load config, connect the clients, run the
//! dispatcher. No business logic here.

use clap::Parser;
use dotenv::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tg_recall::adapters::search::EsSearchGateway;
use tg_recall::adapters::telegram::{self, GrammersChatGateway};
use tg_recall::domain::ReplyFormat;
use tg_recall::ports::{ChatGateway, SearchGateway};
use tg_recall::shared::config::{AppConfig, ConfigView};
use tg_recall::usecases::{AccessPolicy, EventDispatcher, QueryBuilder};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Answers chat messages with the origin of the most similar archived
/// message.
#[derive(Debug, Parser)]
#[command(name = "tg-recall", version, about)]
struct Cli {
    /// Path to the YAML config file.
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config.yml")]
    config: PathBuf,

    /// Reply with a JSON document instead of the text template.
    #[arg(long)]
    response_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_loaded = dotenv();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    if let Ok(path) = &env_loaded {
        info!(path = %path.display(), "loaded .env");
    }

    let cli = Cli::parse();

    let view = ConfigView::load(&cli.config)?;
    let cfg = AppConfig::from_view(&view)?;
    let reply_format = if cli.response_json {
        ReplyFormat::Json
    } else {
        ReplyFormat::Text
    };
    info!(
        config = %cli.config.display(),
        index_prefix = %cfg.search.index_prefix,
        banned_users = cfg.bot.banned_users.len(),
        json_replies = cli.response_json,
        "configuration loaded"
    );

    // --- Telegram: connect with catch-up, bot sign-in, session persisted ---
    let client = telegram::auth::connect(&cfg.bot.session_file, &cfg.telegram, true).await?;
    telegram::auth::ensure_bot_signed_in(&client, &cfg.bot.token, &cfg.bot.session_file).await?;
    info!("connected to Telegram");

    let chat: Arc<dyn ChatGateway> = Arc::new(GrammersChatGateway::new(
        client.clone(),
        Duration::from_millis(cfg.bot.catch_up_grace_ms),
    ));

    // --- Search backend ---
    let search: Arc<dyn SearchGateway> = Arc::new(EsSearchGateway::new(
        &cfg.search.host,
        Duration::from_millis(cfg.search.request_timeout_ms),
    )?);

    // --- Dispatcher ---
    let dispatcher = EventDispatcher::new(
        chat,
        search,
        AccessPolicy::new(cfg.bot.banned_users.clone()),
        QueryBuilder::new(&cfg.search.index_prefix),
        reply_format,
    );

    let outcome = dispatcher.run().await;

    if let Err(e) = telegram::session::persist(&client, &cfg.bot.session_file) {
        warn!(error = %e, "failed to save session on exit");
    }
    outcome?;
    info!("shut down cleanly");
    Ok(())
}
