use std::sync::Arc;
use tokio::net::TcpListener;

use easelserver::config::Config;
use easelserver::middleware::auth::StaticTokenResolver;
use easelserver::pipeline::ShutdownOutcome;
use easelserver::state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "easelserver=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env();
    let identity = StaticTokenResolver::from_entries(&config.tokens);
    print_banner(&config, identity.len());

    if identity.is_empty() {
        tracing::warn!("no credentials configured, every connection will be rejected (set EASEL_TOKENS)");
    }

    let (state, pipeline) = AppState::new(&config, Arc::new(identity));
    let app = easelserver::routes::router(state);

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .expect("failed to bind");

    let actual_port = listener
        .local_addr()
        .expect("failed to get local address")
        .port();
    eprintln!("  \x1b[32m→ listening on 0.0.0.0:{actual_port}\x1b[0m");
    eprintln!();

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    if let ShutdownOutcome::Halted { workers } = pipeline.shutdown().await {
        eprintln!("  \x1b[33m! halted {workers} busy worker(s) at shutdown\x1b[0m");
    }
}

fn print_banner(config: &Config, credentials: usize) {
    let version = env!("CARGO_PKG_VERSION");

    eprintln!();
    eprintln!("  \x1b[1;36measel\x1b[0m \x1b[2mv{version}\x1b[0m");
    eprintln!();
    eprintln!("  \x1b[2mport\x1b[0m         {}", config.port);
    eprintln!("  \x1b[2mworkers\x1b[0m      {}", config.workers);
    eprintln!("  \x1b[2mbuffer\x1b[0m       {}", config.buffer_capacity);
    eprintln!(
        "  \x1b[2msend timeout\x1b[0m {}ms",
        config.send_timeout.as_millis()
    );
    eprintln!("  \x1b[2mcredentials\x1b[0m  {credentials}");
    eprintln!();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {:?}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
