//! Herald bot binary entrypoint.

use herald_broadcast::broadcaster::Broadcaster;
use herald_broadcast::subscription::SubscriptionStore;
use herald_common::config::AppConfig;
use herald_common::db;
use herald_telegram::TelegramClient;

use herald_bot::cas::CasClient;
use herald_bot::dispatcher::UpdateDispatcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "herald_bot=info,herald_broadcast=info".into()),
        )
        .init();

    tracing::info!("Herald starting...");

    // Load configuration
    let config = AppConfig::from_env()?;

    // Open the database and apply migrations
    let pool = db::create_pool(&config.database_url, config.db_max_connections).await?;
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    // Assemble the components
    let store = SubscriptionStore::new(pool);
    let client = TelegramClient::new(config.telegram_bot_token.clone())?;
    let cas = CasClient::new(config.cas_api_url.clone())?;
    let broadcaster = Broadcaster::new(config.max_admins);

    let dispatcher = UpdateDispatcher::new(
        client,
        store,
        broadcaster,
        cas,
        config.poll_timeout_secs,
    );

    // Run with graceful shutdown on Ctrl+C
    tokio::select! {
        result = dispatcher.run() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Dispatcher exited with error");
                return Err(e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received shutdown signal, stopping gracefully...");
        }
    }

    tracing::info!("Herald stopped.");
    Ok(())
}
