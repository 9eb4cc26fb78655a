use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::http::{header, HeaderValue, Method};
use maintrag_core::Dataset;
use maintrag_llm::OllamaRephraser;
use maintrag_retrieval::{AnalyticsOptions, QueryPipeline};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use maintrag_api::config::ApiConfig;
use maintrag_api::router::create_router;
use maintrag_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "maintrag_api=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ApiConfig::from_env().context("Failed to load configuration")?;
    let settings = config.settings.clone();

    tracing::info!(
        port = config.port,
        data = %settings.data_path.value.display(),
        llm_enabled = settings.llm_enabled.value,
        "Starting maintrag API server"
    );

    // The Ollama probe blocks on its own runtime
    let pipeline = tokio::task::spawn_blocking(move || build_pipeline(&settings)).await??;
    tracing::info!(
        rows = pipeline.dataset().len(),
        work_orders = pipeline.dataset().distinct_work_orders(),
        "Dataset loaded"
    );

    let cors = CorsLayer::new()
        .allow_origin(
            config
                .cors_origin
                .parse::<HeaderValue>()
                .context("Invalid MAINTRAG_CORS_ORIGIN")?,
        )
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let app = create_router(AppState::new(pipeline)).layer(cors);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!("Listening on {}", addr);
    tracing::info!("CORS enabled for {}", config.cors_origin);

    axum::serve(listener, app).await?;
    Ok(())
}

fn build_pipeline(settings: &maintrag_core::config::LayeredConfig) -> anyhow::Result<QueryPipeline> {
    let dataset = Dataset::load(&settings.data_path.value).with_context(|| {
        format!("Failed to load dataset {}", settings.data_path.value.display())
    })?;

    let mut pipeline = QueryPipeline::new(Arc::new(dataset)).with_options(AnalyticsOptions {
        top_n: settings.top_n.value,
        list_limit: settings.list_limit.value,
    });

    if settings.llm_enabled.value {
        let rephraser = OllamaRephraser::new(
            settings.llm_host.value.clone(),
            settings.llm_model.value.clone(),
            Duration::from_secs(settings.llm_timeout_secs.value),
        );
        if rephraser.is_available() {
            tracing::info!(model = %settings.llm_model.value, "Rephrasing enabled");
            pipeline = pipeline.with_rephraser(Arc::new(rephraser));
        } else {
            tracing::warn!(
                host = %settings.llm_host.value,
                "Ollama is not reachable; answers will not be rephrased"
            );
        }
    }

    Ok(pipeline)
}
