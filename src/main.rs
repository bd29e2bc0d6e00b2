use anyhow::Result;
use founder_reality_check::analysis::AnalysisClient;
use founder_reality_check::config::Config;
use founder_reality_check::routes::{router, AppState};
use founder_reality_check::tools::gemini::GeminiClient;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("founder_reality_check=debug,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let gemini = GeminiClient::new(&config)?;
    info!("Using model {}", gemini.model());

    let state = AppState::new(Arc::new(AnalysisClient::new(gemini))).with_session_ttl(config.session_ttl);
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    info!("Founder reality check running on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
