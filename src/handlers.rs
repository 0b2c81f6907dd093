use crate::encoding::{encoding_tables, EncodingTable, FEATURE_COLUMNS};
use crate::errors::{AppError, ResultExt};
use crate::loader::ClassifierCell;
use crate::models::*;
use crate::service;
use crate::sink::RecordSink;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;

/// Default page size for `GET /api/v1/applications`.
pub const DEFAULT_LIST_LIMIT: i64 = 20;
/// Largest page `GET /api/v1/applications` will return.
pub const MAX_LIST_LIMIT: i64 = 100;

/// Shared application state injected into handlers.
pub struct AppState<S> {
    /// The serving classifier, loaded once.
    pub classifier: ClassifierCell,
    /// Where submitted applications are recorded.
    pub sink: S,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "loan-approval-api",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/predict
///
/// Scores a loan application and records it. A storage failure still returns
/// the verdict, with `persisted: false` and a warning.
///
/// # Returns
///
/// * `Result<Json<PredictionResponse>, AppError>` - The verdict, or 422 for an unknown category.
pub async fn predict<S: RecordSink>(
    State(state): State<Arc<AppState<S>>>,
    Json(request): Json<LoanApplicationRequest>,
) -> Result<Json<PredictionResponse>, AppError> {
    tracing::info!(
        "POST /predict - age={} credit_score={} loan_amount={}",
        request.age,
        request.credit_score,
        request.loan_amount
    );

    let artifact = state.classifier.get().await?;
    let submission = service::submit(&request, artifact.classifier.as_ref(), &state.sink)
        .await
        .context("scoring loan application")?;

    Ok(Json(PredictionResponse::from(&submission)))
}

/// Response body for `GET /api/v1/schema`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaResponse {
    pub feature_columns: Vec<&'static str>,
    pub encoding_tables: Vec<EncodingTable>,
    pub model_kind: &'static str,
    pub model_path: String,
    pub model_fingerprint: String,
}

/// GET /api/v1/schema
///
/// Publishes the feature order and code tables together with the artifact
/// they are being served against.
pub async fn schema<S: RecordSink>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<SchemaResponse>, AppError> {
    let artifact = state.classifier.get().await?;

    Ok(Json(SchemaResponse {
        feature_columns: FEATURE_COLUMNS.to_vec(),
        encoding_tables: encoding_tables(),
        model_kind: artifact.classifier.kind(),
        model_path: artifact.path.display().to_string(),
        model_fingerprint: artifact.fingerprint.clone(),
    }))
}

/// GET /api/v1/applications?limit=N
///
/// Most recent stored applications first.
pub async fn list_applications<S: RecordSink>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListApplicationsParams>,
) -> Result<Json<Vec<StoredRecord>>, AppError> {
    let limit = params.limit.unwrap_or(DEFAULT_LIST_LIMIT);
    if limit < 1 {
        return Err(AppError::BadRequest(
            "limit must be a positive number".to_string(),
        ));
    }

    let records = state.sink.recent(limit.min(MAX_LIST_LIMIT)).await?;
    tracing::debug!("Listing {} loan application(s)", records.len());

    Ok(Json(records))
}
