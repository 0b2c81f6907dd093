use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::encoding::FeatureVector;
use crate::errors::AppError;

// ============ Request Models ============

/// One loan application as submitted by the form.
///
/// Numeric fields arrive already range-checked by the form layer. Categorical
/// fields are kept as the human-readable labels the form shows; they are only
/// turned into codes by [`crate::encoding::encode`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoanApplicationRequest {
    /// Applicant age in years (18-100).
    pub age: i32,
    /// Number of dependent family members.
    pub dependents: i32,
    /// Monthly applicant income.
    pub monthly_income: f64,
    /// Requested loan amount.
    pub loan_amount: f64,
    /// CIBIL credit score (300-900).
    pub credit_score: i32,
    /// Loan tenure in months, a multiple of 6.
    pub tenure_months: i32,
    /// "Male" or "Female".
    pub gender: String,
    /// "Yes" or "No".
    pub married: String,
    /// "Graduate" or "NotGraduate".
    pub education: String,
    /// "Yes" or "No".
    pub self_employed: String,
    /// "Yes" or "No".
    pub previous_loan_taken: String,
    /// "Urban", "Semiurban" or "Rural".
    pub property_area: String,
    /// "Low", "Medium" or "High".
    pub customer_bandwidth: String,
}

// ============ Prediction Models ============

/// Human-readable outcome derived from the classifier's raw label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionVerdict {
    Approved,
    Rejected,
}

impl PredictionVerdict {
    /// Maps the classifier's raw label: 0 is approval, 1 is rejection.
    ///
    /// Any other value means the artifact and this service disagree on the
    /// label convention and is reported as a prediction failure.
    pub fn from_raw(raw: i64) -> Result<Self, AppError> {
        match raw {
            0 => Ok(PredictionVerdict::Approved),
            1 => Ok(PredictionVerdict::Rejected),
            other => Err(AppError::PredictionFailed(format!(
                "classifier returned unexpected label {}",
                other
            ))),
        }
    }

    /// Label stored in the `prediction` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionVerdict::Approved => "Approved",
            PredictionVerdict::Rejected => "Rejected",
        }
    }

    /// Message shown to the applicant.
    pub fn message(&self) -> &'static str {
        match self {
            PredictionVerdict::Approved => "Loan Approved",
            PredictionVerdict::Rejected => "Loan Rejected",
        }
    }
}

// ============ Database Models ============

/// A submitted application as stored in `loan_applications`.
///
/// Categorical fields hold the original labels, not the encoded codes.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Unique identifier for the record.
    pub id: Uuid,
    pub customer_age: i32,
    pub family_member: i32,
    pub income: f64,
    pub loan_amount: f64,
    pub cibil_score: i32,
    pub tenure: i32,
    pub gender: String,
    pub married: String,
    pub education: String,
    pub self_employed: String,
    pub previous_loan_taken: String,
    pub property_area: String,
    pub customer_bandwidth: String,
    /// "Approved" or "Rejected".
    pub prediction: String,
    /// When the application was submitted.
    pub submitted_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Builds the record for a request and its verdict, stamped with `submitted_at`.
    pub fn new(
        request: &LoanApplicationRequest,
        verdict: PredictionVerdict,
        submitted_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_age: request.age,
            family_member: request.dependents,
            income: request.monthly_income,
            loan_amount: request.loan_amount,
            cibil_score: request.credit_score,
            tenure: request.tenure_months,
            gender: request.gender.clone(),
            married: request.married.clone(),
            education: request.education.clone(),
            self_employed: request.self_employed.clone(),
            previous_loan_taken: request.previous_loan_taken.clone(),
            property_area: request.property_area.clone(),
            customer_bandwidth: request.customer_bandwidth.clone(),
            prediction: verdict.as_str().to_string(),
            submitted_at,
        }
    }
}

/// Result of one submission.
///
/// A failed write does not retract the verdict; it is carried in
/// `persistence_error` instead.
#[derive(Debug, Clone)]
pub struct Submission {
    pub verdict: PredictionVerdict,
    pub features: FeatureVector,
    pub record: StoredRecord,
    pub persistence_error: Option<AppError>,
}

impl Submission {
    /// Whether the record sink accepted the record.
    pub fn persisted(&self) -> bool {
        self.persistence_error.is_none()
    }
}

// ============ API Response Models ============

/// Response body for `POST /api/v1/predict`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResponse {
    pub verdict: PredictionVerdict,
    pub message: String,
    pub features: Vec<f64>,
    /// Id of the stored record; `None` when the write failed.
    pub record_id: Option<Uuid>,
    pub persisted: bool,
    /// Present when the prediction succeeded but the record was not stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

impl From<&Submission> for PredictionResponse {
    fn from(submission: &Submission) -> Self {
        Self {
            verdict: submission.verdict,
            message: submission.verdict.message().to_string(),
            features: submission.features.as_slice().to_vec(),
            record_id: submission.persisted().then_some(submission.record.id),
            persisted: submission.persisted(),
            warning: submission
                .persistence_error
                .as_ref()
                .map(|e| format!("Prediction was not saved: {}", e)),
        }
    }
}

/// Query parameters for `GET /api/v1/applications`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListApplicationsParams {
    pub limit: Option<i64>,
}
