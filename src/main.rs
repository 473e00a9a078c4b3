use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use forum_relay::config::Config;
use forum_relay::correlator::{CorrelatorStore, Sweeper};
use forum_relay::ingest::IngestionGate;
use forum_relay::notify::{CompletionDispatcher, OpenAiSummarizer, TelegramNotifier};
use forum_relay::server::{AppState, build_router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "forum_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("failed to load configuration")?;

    let client = reqwest::Client::builder()
        .user_agent(concat!("forum-relay/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let notifier = TelegramNotifier::new(
        client.clone(),
        config.telegram.bot_token.clone(),
        config.telegram.chat_id,
    )
    .with_premium_notice(config.telegram.premium_notice.clone());

    let summarizer = config.openai.as_ref().map(|openai| {
        OpenAiSummarizer::new(client.clone(), openai.api_key.clone(), openai.model.clone())
            .with_base_url(openai.base_url.clone())
    });
    if summarizer.is_none() {
        tracing::warn!("OPENAI_API_KEY not set; notifications will use the fallback summary");
    }

    let store = Arc::new(CorrelatorStore::new());
    let policy = Arc::new(config.policy.clone());
    let dispatcher = CompletionDispatcher::new(
        Arc::clone(&store),
        Arc::clone(&policy),
        config.dispatch_settings(),
        notifier,
        summarizer,
    );
    let gate = IngestionGate::new(policy, Arc::clone(&store), dispatcher);

    let shutdown = CancellationToken::new();
    let sweeper = Sweeper::new(Arc::clone(&store), config.sweeper_config()).spawn(shutdown.clone());

    let app = build_router(
        AppState::new(gate, config.webhook.secret.as_bytes()),
        &config.webhook.path,
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], config.webhook.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(
        addr = %addr,
        webhook_path = %config.webhook.path,
        chat_id = config.telegram.chat_id,
        "listening"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .context("server error")?;

    shutdown.cancel();
    sweeper.await.context("sweeper task panicked")?;
    tracing::info!(pending = store.len(), "shut down");

    Ok(())
}

/// Resolves on SIGINT or SIGTERM and cancels `shutdown`.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
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

    tracing::info!("shutdown signal received");
    shutdown.cancel();
}
