use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;
use std::path::PathBuf;

/// Outcome of an unsuccessful artifact search.
///
/// An empty `corrupt` list means no candidate path existed at all.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArtifactSearch {
    /// Every candidate path that was considered, in order.
    pub searched: Vec<PathBuf>,
    /// Paths that existed but failed to deserialize, with the reason.
    pub corrupt: Vec<(PathBuf, String)>,
}

impl ArtifactSearch {
    /// True when at least one candidate existed on disk but none could be decoded.
    pub fn all_corrupt(&self) -> bool {
        !self.corrupt.is_empty()
    }
}

impl fmt::Display for ArtifactSearch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all_corrupt() {
            write!(f, "found but all corrupt:")?;
            for (path, reason) in &self.corrupt {
                write!(f, " [{}: {}]", path.display(), reason)?;
            }
            Ok(())
        } else {
            let paths: Vec<String> = self
                .searched
                .iter()
                .map(|p| p.display().to_string())
                .collect();
            write!(f, "not found in any of [{}]", paths.join(", "))
        }
    }
}

/// Application-specific error types.
#[derive(Debug, Clone)]
pub enum AppError {
    /// No usable classifier at any candidate path.
    ArtifactNotFound(ArtifactSearch),
    /// A categorical field held a value outside its declared domain.
    UnknownCategory {
        /// Name of the offending request field.
        field: &'static str,
        /// The rejected value, as supplied.
        value: String,
    },
    /// The classifier could not produce a usable label for the feature vector.
    PredictionFailed(String),
    /// The record sink was unavailable or rejected the write.
    PersistenceFailed(String),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ArtifactNotFound(search) => write!(f, "Model artifact {}", search),
            AppError::UnknownCategory { field, value } => {
                write!(f, "Unknown category for {}: {:?}", field, value)
            }
            AppError::PredictionFailed(msg) => write!(f, "Prediction failed: {}", msg),
            AppError::PersistenceFailed(msg) => write!(f, "Persistence failed: {}", msg),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    /// Maps each error variant to an HTTP status code and JSON body.
    fn into_response(self) -> Response {
        let (status, error_message) = match &self {
            AppError::ArtifactNotFound(search) => {
                tracing::error!("Model artifact unavailable: {}", search);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Model is not loaded".to_string(),
                )
            }
            AppError::UnknownCategory { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, self.to_string())
            }
            AppError::PredictionFailed(msg) => {
                tracing::error!("Prediction failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Prediction failed".to_string(),
                )
            }
            AppError::PersistenceFailed(msg) => {
                tracing::warn!("Record store unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Record store unavailable".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                return (**source).clone().into_response();
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;

    /// Add context lazily (only evaluated on error).
    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, AppError> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error; database failures in the record path are persistence failures.
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::PersistenceFailed(format!("{}: {}", context.into(), e)))
    }

    fn with_context<F>(self, f: F) -> Result<T, AppError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| AppError::PersistenceFailed(format!("{}: {}", f(), e)))
    }
}

impl AppError {
    /// Strips `WithContext` wrappers and returns the underlying error.
    pub fn root(&self) -> &AppError {
        match self {
            AppError::WithContext { source, .. } => source.root(),
            other => other,
        }
    }
}
