use chrono::Utc;

use crate::classifier::Classifier;
use crate::encoding::encode;
use crate::errors::AppError;
use crate::models::{LoanApplicationRequest, PredictionVerdict, StoredRecord, Submission};
use crate::sink::RecordSink;

/// Scores one application and records it.
///
/// Flow:
/// 1. Encode the request into the classifier's feature vector.
/// 2. Predict and map the raw label to a verdict.
/// 3. Append the original request, verdict and timestamp to the sink.
///
/// Encoding and prediction errors abort the submission before anything is
/// written. A sink error does not: the verdict is still returned, with the
/// error attached to the `Submission`.
pub async fn submit<S: RecordSink>(
    request: &LoanApplicationRequest,
    classifier: &dyn Classifier,
    sink: &S,
) -> Result<Submission, AppError> {
    let features = encode(request)?;
    tracing::debug!("Encoded features: {:?}", features.as_slice());

    let raw = classifier
        .predict(&features)
        .map_err(|e| AppError::PredictionFailed(format!("{:#}", e)))?;
    let verdict = PredictionVerdict::from_raw(raw)?;
    tracing::info!(
        "Loan application scored: {} (raw label {})",
        verdict.as_str(),
        raw
    );

    let record = StoredRecord::new(request, verdict, Utc::now());
    let persistence_error = match sink.append(&record).await {
        Ok(()) => None,
        Err(e) => {
            tracing::warn!("Prediction {} was not recorded: {}", record.id, e);
            Some(e)
        }
    };

    Ok(Submission {
        verdict,
        features,
        record,
        persistence_error,
    })
}
