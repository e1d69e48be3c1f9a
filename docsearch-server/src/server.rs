//! Router assembly, backend wiring and the serve loop.

use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use docsearch_rag::{EmbeddingProvider, OpenAIEmbeddingProvider, PineconeClient, VectorStoreManager};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::{not_found, panic_response};
use crate::routes::{documents, health, search};
use crate::settings::Settings;
use crate::state::AppState;

/// Build the application router.
pub fn app_router(state: AppState) -> Router {
    let body_limit = state.settings.max_file_size;

    let api = Router::new()
        .route("/documents", post(documents::upload_document).get(documents::list_documents))
        .route("/documents/{doc_id}", delete(documents::delete_document))
        .route("/search", post(search::search_documents))
        .route("/search/similar", post(search::find_similar_documents))
        .route("/search/stats", get(search::get_search_stats));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .fallback(not_found)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Wire the OpenAI embedder and the Pinecone control plane from settings.
pub fn build_manager(settings: &Settings) -> anyhow::Result<VectorStoreManager> {
    let (pinecone_key, openai_key) = settings.secrets()?;
    let rag_config = settings.rag_config().context("invalid chunking or dimension settings")?;

    let mut embedder = OpenAIEmbeddingProvider::new(openai_key)?
        .with_model(&settings.embedding_model)
        .with_timeout(settings.api_timeout)?;
    if embedder.dimensions() != settings.embedding_dimension {
        embedder = embedder.with_dimensions(settings.embedding_dimension);
    }

    let control = PineconeClient::new(pinecone_key)?
        .with_serverless_spec(&settings.pinecone_cloud, &settings.pinecone_environment)
        .with_timeout(settings.api_timeout)?;

    let manager = VectorStoreManager::builder()
        .config(rag_config)
        .embedding_provider(Arc::new(embedder))
        .index_control(Arc::new(control))
        .index_name(&settings.pinecone_index_name)
        .build()?;
    Ok(manager)
}

/// Connect (creating the index if needed) and serve until a shutdown signal.
pub async fn run_server(state: AppState) -> anyhow::Result<()> {
    let manager = state.manager.clone();
    let dimension = state.settings.embedding_dimension;
    if let Err(e) = manager.init_index(dimension).await {
        warn!(error = %e, "vector store unavailable at startup; index routes will fail until restart");
    }

    let addr = (state.settings.host.clone(), state.settings.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}:{}", addr.0, addr.1))?;
    info!(address = %listener.local_addr()?, profile = state.settings.profile.as_str(), "docsearch server listening");

    axum::serve(listener, app_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    manager.shutdown().await;
    info!("docsearch server stopped");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
