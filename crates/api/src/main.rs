use anyhow::{Context, Result};
use api::{AppConfig, AppState, services};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    api::init_tracing();

    let config = AppConfig::from_env().context("invalid configuration")?;

    let embedder = services::build_embedder(&config)?;
    let llm = services::build_llm(&config)?;
    let pipeline = services::build_pipeline(&config, embedder)?;

    let stored = pipeline.list().await?;
    info!(
        index_dir = %config.server.index_dir.display(),
        stored = stored.len(),
        embedding_model = %config.models.embedding_model,
        "starting document QA service"
    );

    let bind_addr = config.server.bind_addr.clone();
    let state = Arc::new(AppState::new(config, pipeline, llm));
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
