use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use loan_approval_api::config::Config;
use loan_approval_api::db::Database;
use loan_approval_api::handlers::AppState;
use loan_approval_api::loader::ClassifierCell;
use loan_approval_api::routes;
use loan_approval_api::sink::PgRecordSink;

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - The model artifact (fatal if no candidate path has a usable one).
/// - The record store pool (lazy; an unreachable database only disables recording).
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_approval_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load the model before accepting any requests
    let classifier = ClassifierCell::new(config.model_paths.clone());
    let artifact = classifier.get().await?;
    tracing::info!(
        "Serving {} model from {}",
        artifact.classifier.kind(),
        artifact.path.display()
    );

    // Initialize record store
    let db = Database::new(&config)?;
    let sink = PgRecordSink::new(db.pool.clone());
    match db.ping().await {
        Ok(()) => {
            sink.ensure_schema().await?;
            tracing::info!("Database connection pool established");
        }
        Err(e) => {
            tracing::warn!(
                "Database unreachable at startup, predictions will not be recorded until it recovers: {}",
                e
            );
        }
    }

    let app_state = Arc::new(AppState { classifier, sink });

    // Configure rate limiter: 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("invalid rate limiter configuration"))?,
    );

    let api = routes::api_routes::<PgRecordSink>().layer(GovernorLayer {
        config: governor_conf,
    });
    let app = routes::app(api, app_state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
