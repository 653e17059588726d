//! Wiring & DI. Entry point: bootstrap adapters, inject into services, run
//! the reminder loop. No business logic here.
//!
//! Initialization order: config -> storage -> fetcher -> services ->
//! scheduler. Shutdown on ctrl-c; storage commits every write, so there is
//! nothing left to flush.

use dotenv::dotenv;
use schedbot::adapters::notify::ChannelNotifier;
use schedbot::adapters::persistence::{SqliteCache, SqliteChatStore};
use schedbot::adapters::upstream::HttpFetcher;
use schedbot::ports::{BotPort, CachePort, ChatDataPort, FetcherPort, NotifierPort};
use schedbot::shared::clock::{Clock, SystemClock};
use schedbot::usecases::{BotApi, ReminderScheduler, ScheduleService};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

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

    let cfg = schedbot::shared::config::AppConfig::load().unwrap_or_default();
    let data_path = PathBuf::from(cfg.data_dir_or_default());
    info!(path = %data_path.display(), "data directory");

    // --- Durable stores (schedule cache + chat subscriptions) ---
    let cache: Arc<dyn CachePort> = Arc::new(
        SqliteCache::connect(&data_path)
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    );
    let chats: Arc<dyn ChatDataPort> = Arc::new(
        SqliteChatStore::connect(&data_path, cfg.default_lang_or_default())
            .await
            .map_err(|e| anyhow::anyhow!("{e}"))?,
    );

    // --- Upstream fetcher (bounded timeout, retries with backoff) ---
    let fetcher: Arc<dyn FetcherPort> = Arc::new(
        HttpFetcher::new(
            cfg.api_url_or_default(),
            cfg.default_lang_or_default(),
            Duration::from_secs(cfg.api_timeout_secs_or_default()),
            cfg.fetch_attempts_or_default(),
            Duration::from_millis(cfg.retry_delay_ms_or_default()),
        )
        .map_err(|e| anyhow::anyhow!("{e}"))?,
    );

    let schedule = Arc::new(ScheduleService::new(fetcher, cache));

    // --- Reminder events: bounded channel toward the presentation layer ---
    let (event_tx, mut event_rx) = mpsc::channel(cfg.event_queue_size_or_default());
    let notifier: Arc<dyn NotifierPort> = Arc::new(ChannelNotifier::new(event_tx));

    // Presentation-layer seam: the real bot renders and sends these. The
    // consumer resolves the chat's language through the inbound port.
    let api: Arc<dyn BotPort> = Arc::new(BotApi::new(Arc::clone(&schedule), Arc::clone(&chats)));
    let consumer_api = Arc::clone(&api);
    tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            let lang = consumer_api
                .get_subscription(event.chat_id)
                .await
                .map(|s| s.lang_code)
                .unwrap_or_default();
            info!(
                chat_id = event.chat_id,
                lang,
                subject = %event.lesson.subject,
                boundary = %event.boundary,
                stale = event.is_stale,
                "reminder event"
            );
        }
    });

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let scheduler = ReminderScheduler::new(
        schedule,
        chats,
        notifier,
        clock,
        Duration::from_secs(cfg.tick_secs_or_default()),
        Duration::from_secs(cfg.lookahead_secs_or_default()),
    );

    tokio::select! {
        _ = scheduler.run_loop() => {}
        _ = tokio::signal::ctrl_c() => info!("shutting down"),
    }

    Ok(())
}
