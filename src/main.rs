use std::sync::Arc;

use axum::{routing::get, routing::post, Json, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use video_compare::app_state::AppState;
use video_compare::config::AppConfig;
use video_compare::routes;
use video_compare::services::gemini::GeminiClient;
use video_compare::services::pipeline::ComparisonPipeline;
use video_compare::services::queue::JobQueue;
use video_compare::services::storage::VideoStorage;
use video_compare::services::store::JobStore;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing video-compare server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!("comparison_jobs_created", "Total comparison jobs created");
    metrics::describe_counter!(
        "comparison_jobs_completed",
        "Total comparison jobs completed"
    );
    metrics::describe_counter!("comparison_jobs_failed", "Total comparison jobs that failed");
    metrics::describe_counter!(
        "comparison_jobs_cancelled",
        "Total comparison jobs cancelled"
    );
    metrics::describe_gauge!(
        "comparison_jobs_running",
        "Number of comparison jobs currently running"
    );
    metrics::describe_histogram!(
        "comparison_job_duration_seconds",
        "Time to run a comparison job to completion"
    );
    metrics::describe_counter!("video_uploads_total", "Total video files uploaded");

    // Initialize persistent job store
    tracing::info!(dir = %config.jobs_dir, "Initializing job store");
    let store = Arc::new(
        JobStore::new(config.jobs_dir.clone()).expect("Failed to initialize job store"),
    );

    // Initialize job queue supervisor
    let queue = Arc::new(JobQueue::new(store));

    // Initialize video storage
    tracing::info!(dir = %config.upload_dir, "Initializing video storage");
    let videos = Arc::new(
        VideoStorage::new(config.upload_dir.clone()).expect("Failed to initialize video storage"),
    );

    // Initialize Gemini client
    tracing::info!(judge_model = %config.judge_model, "Initializing Gemini client");
    let gemini = Arc::new(
        GeminiClient::new(config.gemini_api_key.clone(), config.judge_model.clone())
            .expect("Failed to initialize Gemini client"),
    );

    // Initialize comparison pipeline
    let pipeline = Arc::new(ComparisonPipeline::new(
        Arc::clone(&queue),
        Arc::clone(&videos),
        gemini,
    ));

    // Create shared application state
    let state = AppState::new(queue, videos, pipeline, config.max_upload_bytes);

    // Build API routes
    let app = Router::new()
        .route("/", get(service_info))
        .route("/health", get(routes::health::health_check))
        .route("/api/v1/models", get(routes::compare::list_models))
        .route("/api/v1/compare", post(routes::compare::submit_compare))
        .route(
            "/api/v1/batch-compare",
            post(routes::compare::submit_batch_compare),
        )
        .route("/api/v1/jobs", get(routes::jobs::list_jobs))
        .route("/api/v1/jobs/cleanup", post(routes::jobs::cleanup_jobs))
        .route(
            "/api/v1/jobs/{job_id}",
            get(routes::jobs::get_job).delete(routes::jobs::delete_job),
        )
        .route("/api/v1/jobs/{job_id}/cancel", post(routes::jobs::cancel_job))
        .route(
            "/api/v1/jobs/{job_id}/result",
            get(routes::jobs::get_job_result),
        )
        .route("/api/v1/video/upload", post(routes::video::upload_video))
        .route("/api/v1/video/{video_id}", get(routes::video::get_video))
        .route(
            "/api/v1/video/{video_id}/metadata",
            get(routes::video::get_video_metadata),
        )
        .with_state(state)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        // Slack above the upload cap so the handler can return its own 413.
        .layer(RequestBodyLimitLayer::new(
            config.max_upload_bytes + 1024 * 1024,
        ));

    tracing::info!("Starting video-compare on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}

async fn service_info() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": "Video Understanding Comparisons API",
        "version": env!("CARGO_PKG_VERSION"),
        "status": "running",
    }))
}
