use std::sync::Arc;

use anyhow::Context;
use tracing_appender::non_blocking::WorkerGuard;

use aura_assist::app;
use aura_assist::assistant::{AssistantRouteState, assistant_routes};
use aura_assist::channels::CliChannel;
use aura_assist::config::AuraConfig;

/// Log to stderr, or to a daily rolling file when a log directory is set.
fn init_tracing(config: &AuraConfig) -> Option<WorkerGuard> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "aura.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = app::load_config().unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    let _log_guard = init_tracing(&config);

    eprintln!("✨ AURA v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.model);
    eprintln!("   Store: {}", config.db_path.display());

    let session = app::open_session(&config)
        .await
        .with_context(|| format!("starting with store at {}", config.db_path.display()))?;

    if let Some(port) = config.http_port {
        let router = assistant_routes(AssistantRouteState {
            session: Arc::clone(&session),
        });
        let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
            .await
            .with_context(|| format!("binding HTTP port {port}"))?;
        eprintln!("   API: http://0.0.0.0:{port}/api/dashboard");
        tokio::spawn(async move {
            tracing::info!(port, "HTTP API started");
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "HTTP API stopped");
            }
        });
    }

    CliChannel::new(session).run().await?;
    eprintln!("Goodbye!");
    Ok(())
}
