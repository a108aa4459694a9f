use std::sync::Arc;

use partybot::bot::Bot;
use partybot::channels::{CliGateway, Gateway, TelegramGateway};
use partybot::config::BotConfig;
use partybot::content::FilePoolProvider;
use partybot::dashboard;
use partybot::stats::Stats;
use partybot::trivia::Trivia;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = BotConfig::from_env();

    eprintln!("🎭 Partybot v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Content dir: {}", config.content_dir.display());
    eprintln!("   Join window: {}s", config.join_window.as_secs());
    eprintln!(
        "   Dashboard: http://0.0.0.0:{}/api/stats{}",
        config.dashboard_port,
        if config.dashboard_key.is_some() {
            " (key required)"
        } else {
            ""
        }
    );

    // ── Content pools ────────────────────────────────────────────────
    let provider = Arc::new(FilePoolProvider::load(&config.content_dir).await?);
    let trivia = Trivia::load(&config.content_dir).await?;

    // ── Stats + dashboard ────────────────────────────────────────────
    let stats = Arc::new(Stats::new());
    let _dashboard_handle = dashboard::spawn(
        Arc::clone(&stats),
        config.dashboard_port,
        config.dashboard_key.clone(),
    );

    // ── Gateway ──────────────────────────────────────────────────────
    let gateway: Arc<dyn Gateway> = match std::env::var("TELEGRAM_BOT_TOKEN") {
        Ok(token) => {
            eprintln!("   Channel: telegram\n");
            Arc::new(TelegramGateway::new(secrecy::SecretString::from(token)))
        }
        Err(_) => {
            eprintln!("   Channel: cli (set TELEGRAM_BOT_TOKEN for Telegram)");
            eprintln!("   Say \"truth or dare\" to start, /as <name> to switch user.\n");
            Arc::new(CliGateway::new())
        }
    };

    if let Err(e) = gateway.health_check().await {
        tracing::warn!(error = %e, "Gateway health check failed, continuing anyway");
    }

    // ── Bot ──────────────────────────────────────────────────────────
    let bot = Bot::new(gateway, provider, trivia, stats, config);
    bot.run().await?;

    Ok(())
}
