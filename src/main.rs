//! resumebot - Entry Point
//!
//! Runs the Telegram long-polling loop and the health endpoint side by
//! side until interrupted.

use std::sync::Arc;

use anyhow::Context;
use resumebot::{health, telegram, BotHandlers, CompletionClient, Config, ResumeStore, TelegramSender};
use teloxide::Bot;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let log_level = std::env::var("RUST_LOG")
        .map(|s| match s.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        })
        .unwrap_or(Level::INFO);

    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(false)
            .json()
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(log_level)
            .with_ansi(true)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    }

    info!("resumebot v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env().context("invalid configuration")?;
    info!("Resume store: {:?}", config.resumes_path);

    let store = ResumeStore::open(&config.resumes_path)
        .await
        .context("failed to initialise resume store")?;

    let completion = CompletionClient::from_config(&config);
    info!(
        "Completion model: {} (stream: {})",
        completion.model(),
        completion.is_streaming()
    );
    completion
        .probe()
        .await
        .context("completion provider unreachable")?;

    let bot = Bot::new(&config.telegram_bot_token);
    telegram::verify_bot(&bot).await?;

    let handlers = Arc::new(BotHandlers::new(
        Arc::new(store),
        Arc::new(completion),
        Arc::new(TelegramSender::new(bot.clone())),
        config.max_concurrent_jobs,
    ));

    let bot_loop = telegram::run_telegram_bot(bot, handlers);
    let http = health::serve(config.port, health::shutdown_signal());

    tokio::select! {
        result = bot_loop => result?,
        result = http => result.context("health server failed")?,
    }

    info!("resumebot stopped");
    Ok(())
}
