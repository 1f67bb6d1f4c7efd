use anyhow::{Context, Result};
use clap::Parser;
use newsdesk::config::{self, Config};
use newsdesk::delivery::{MessageTransport, TelegramClient};
use newsdesk::digest::DigestJob;
use newsdesk::dispatch::Dispatcher;
use newsdesk::feed::{FeedFetcher, HttpFeedFetcher};
use newsdesk::gateway::Gateway;
use newsdesk::schedule::run_daily;
use newsdesk::subscribers::{InMemorySubscribers, SubscriberStore};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Parser, Debug)]
#[command(name = "newsdesk", about = "Telegram news relay for RSS feeds")]
struct Args {
    /// Config file (defaults to $NEWSDESK_CONFIG, then ./newsdesk.toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config_path = args.config.unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    config.validate().context("Invalid configuration")?;

    if args.check {
        println!("Configuration OK: {}", config_path.display());
        return Ok(());
    }

    let token = config::bot_token()?;
    let registry = Arc::new(config.registry()?);
    let digest_source = registry
        .lookup(&config.digest_category)
        .cloned()
        .context("Digest category missing from registry")?;

    let http = reqwest::Client::builder()
        .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let telegram = TelegramClient::new(http.clone(), token).with_api_base(config.api_base.clone());
    let me = telegram
        .get_me()
        .await
        .context("Bot token rejected by the Bot API")?;
    tracing::info!(bot_id = me.id, username = ?me.username, "Connected to Bot API");

    let fetcher: Arc<dyn FeedFetcher> = Arc::new(HttpFeedFetcher::new(http, config.fetch_timeout()));
    let transport: Arc<dyn MessageTransport> = Arc::new(telegram.clone());
    let subscribers: Arc<dyn SubscriberStore> = Arc::new(InMemorySubscribers::new());

    let dispatcher = Dispatcher::new(
        Arc::clone(&registry),
        Arc::clone(&fetcher),
        Arc::clone(&transport),
        Arc::clone(&subscribers),
        config.dispatch_settings()?,
    );
    let digest = Arc::new(DigestJob::new(
        digest_source,
        fetcher,
        transport,
        subscribers,
        config.digest_settings()?,
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let schedule = config.schedule()?;
    let digest_task = tokio::spawn(run_daily(schedule, shutdown_rx.clone(), move || {
        let digest = Arc::clone(&digest);
        async move {
            // Failures are logged inside the run; the next day tries again
            let _ = digest.run().await;
        }
    }));

    let gateway = Gateway::new(telegram, dispatcher, config.poll_timeout_secs);
    let gateway_task = tokio::spawn(gateway.run(shutdown_rx));

    tracing::info!(
        categories = registry.len(),
        digest_category = %config.digest_category,
        schedule = %config.digest_schedule,
        "newsdesk running"
    );

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutting down");
    let _ = shutdown_tx.send(true);

    gateway_task.await.context("Gateway task panicked")?;
    digest_task.await.context("Digest task panicked")?;

    Ok(())
}
