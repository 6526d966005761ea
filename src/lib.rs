pub mod config;
pub mod dedup;
pub mod error;
pub mod message;
pub mod models;
pub mod scraping;
pub mod telegram;
pub mod updates;
pub mod watcher;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::Config;
use scraping::base::HttpFetcher;
use telegram::{Delivery, TelegramNotifier};
use watcher::Watcher;

pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,standup_watch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

pub async fn run() -> Result<()> {
    let config = Config::from_env().context("unable to load configuration")?;

    let notifier = TelegramNotifier::new(&config.token, config.chat_id)
        .context("unable to init bot api client")?;
    let account = notifier
        .authorize()
        .await
        .context("unable to authorize bot token")?;
    info!(account = %account, "Authorized");

    let cancel = CancellationToken::new();
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let fetcher = HttpFetcher::new().context("unable to build http client")?;
    info!(
        url = %config.listing_url,
        interval = ?config.check_interval,
        suppress_baseline = config.suppress_baseline,
        "starting watcher"
    );
    let mut handle = Watcher::new(fetcher, config.watch_config()).watch(cancel.clone());

    while let Some(event) = handle.events.recv().await {
        match notifier.deliver(&event, &cancel).await {
            Delivery::Sent => {}
            Delivery::Rejected => {
                warn!(link = %event.booking_link, "dropping event the api refused")
            }
            Delivery::Cancelled => {
                info!(link = %event.booking_link, "dropping undelivered event on shutdown")
            }
        }
    }

    let watcher = handle.task.await.context("watcher task panicked")?;
    if watcher.seen().is_empty() {
        info!("watcher stopped without seeing any events");
    } else {
        info!(seen = watcher.seen().len(), "watcher stopped");
    }
    Ok(())
}

async fn cancel_on_signal(cancel: CancellationToken) {
    wait_for_signal().await;
    info!("shutdown signal received");
    cancel.cancel();
}

async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "unable to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "unable to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
