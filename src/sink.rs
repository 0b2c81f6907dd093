use bigdecimal::BigDecimal;
use failsafe::futures::CircuitBreaker;
use sqlx::PgPool;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::circuit_breaker::{create_db_circuit_breaker, is_store_failure, RecordStoreBreaker};
use crate::errors::{AppError, ResultExt};
use crate::models::StoredRecord;

const SCHEMA_SQL: &str = include_str!("../migrations/0001_loan_applications.sql");
const WIDEN_MONEY_SQL: &str = include_str!("../migrations/0002_unbounded_money.sql");

const INSERT_SQL: &str = r#"
    INSERT INTO loan_applications
    (id, customer_age, family_member, income, loan_amount, cibil_score, tenure,
     gender, married, education, self_employed, previous_loan_taken,
     property_area, customer_bandwidth, prediction, submitted_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
"#;

const RECENT_SQL: &str = r#"
    SELECT id, customer_age, family_member,
           income::float8 AS income, loan_amount::float8 AS loan_amount,
           cibil_score, tenure, gender, married, education, self_employed,
           previous_loan_taken, property_area, customer_bandwidth,
           prediction, submitted_at
    FROM loan_applications
    ORDER BY submitted_at DESC
    LIMIT $1
"#;

/// Durable, append-only storage for submitted applications.
///
/// Failures are reported as `AppError::PersistenceFailed`.
pub trait RecordSink: Send + Sync + 'static {
    /// Appends one record. Resolves once the store has accepted or rejected it.
    fn append(&self, record: &StoredRecord) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Most recent records first.
    fn recent(&self, limit: i64)
        -> impl Future<Output = Result<Vec<StoredRecord>, AppError>> + Send;
}

/// Exact decimal form of an amount for the unconstrained NUMERIC money columns.
fn to_decimal(field: &str, value: f64) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(&value.to_string())
        .map_err(|e| AppError::PersistenceFailed(format!("{} is not storable: {}", field, e)))
}

/// PostgreSQL-backed sink writing to `loan_applications`.
pub struct PgRecordSink {
    pool: PgPool,
    breaker: RecordStoreBreaker,
}

impl PgRecordSink {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            breaker: create_db_circuit_breaker(),
        }
    }

    /// Creates the table and index if they do not exist yet, and widens
    /// money columns left bounded by older deployments.
    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::raw_sql(SCHEMA_SQL)
            .execute(&self.pool)
            .await
            .context("creating loan_applications table")?;
        sqlx::raw_sql(WIDEN_MONEY_SQL)
            .execute(&self.pool)
            .await
            .context("widening loan_applications money columns")?;
        Ok(())
    }
}

impl RecordSink for PgRecordSink {
    async fn append(&self, record: &StoredRecord) -> Result<(), AppError> {
        let income = to_decimal("income", record.income)?;
        let loan_amount = to_decimal("loan_amount", record.loan_amount)?;

        let insert = sqlx::query(INSERT_SQL)
            .bind(record.id)
            .bind(record.customer_age)
            .bind(record.family_member)
            .bind(income)
            .bind(loan_amount)
            .bind(record.cibil_score)
            .bind(record.tenure)
            .bind(record.gender.as_str())
            .bind(record.married.as_str())
            .bind(record.education.as_str())
            .bind(record.self_employed.as_str())
            .bind(record.previous_loan_taken.as_str())
            .bind(record.property_area.as_str())
            .bind(record.customer_bandwidth.as_str())
            .bind(record.prediction.as_str())
            .bind(record.submitted_at)
            .execute(&self.pool);

        match self.breaker.call_with(is_store_failure, insert).await {
            Ok(_) => {
                tracing::debug!("Stored loan application {}", record.id);
                Ok(())
            }
            Err(failsafe::Error::Rejected) => Err(AppError::PersistenceFailed(
                "record store circuit is open".to_string(),
            )),
            Err(failsafe::Error::Inner(e)) => Err(e).context("inserting loan application"),
        }
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredRecord>, AppError> {
        sqlx::query_as::<_, StoredRecord>(RECENT_SQL)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .context("listing loan applications")
    }
}

/// Process-local sink. Records live as long as the sink.
#[derive(Debug, Default)]
pub struct MemoryRecordSink {
    records: Mutex<Vec<StoredRecord>>,
    unavailable: AtomicBool,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every operation until `set_available(true)`.
    pub fn unavailable() -> Self {
        let sink = Self::default();
        sink.set_available(false);
        sink
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Snapshot of stored records in insertion order.
    pub fn records(&self) -> Vec<StoredRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(AppError::PersistenceFailed(
                "record store is unavailable".to_string(),
            ));
        }
        Ok(())
    }
}

impl RecordSink for MemoryRecordSink {
    async fn append(&self, record: &StoredRecord) -> Result<(), AppError> {
        self.check_available()?;
        self.records
            .lock()
            .map_err(|_| AppError::PersistenceFailed("record store lock poisoned".to_string()))?
            .push(record.clone());
        Ok(())
    }

    async fn recent(&self, limit: i64) -> Result<Vec<StoredRecord>, AppError> {
        self.check_available()?;
        let records = self
            .records
            .lock()
            .map_err(|_| AppError::PersistenceFailed("record store lock poisoned".to_string()))?;
        Ok(records
            .iter()
            .rev()
            .take(usize::try_from(limit).unwrap_or(0))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LoanApplicationRequest, PredictionVerdict};
    use chrono::{Duration, Utc};

    fn record(age: i32) -> StoredRecord {
        let request = LoanApplicationRequest {
            age,
            dependents: 0,
            monthly_income: 3000.0,
            loan_amount: 5000.0,
            credit_score: 720,
            tenure_months: 6,
            gender: "Male".to_string(),
            married: "No".to_string(),
            education: "Graduate".to_string(),
            self_employed: "No".to_string(),
            previous_loan_taken: "No".to_string(),
            property_area: "Urban".to_string(),
            customer_bandwidth: "Low".to_string(),
        };
        StoredRecord::new(
            &request,
            PredictionVerdict::Approved,
            Utc::now() + Duration::seconds(i64::from(age)),
        )
    }

    #[test]
    fn test_to_decimal_keeps_exact_amount() {
        assert_eq!(
            to_decimal("income", 1234.567).unwrap(),
            BigDecimal::from_str("1234.567").unwrap()
        );
        assert_eq!(
            to_decimal("loan_amount", 2e15).unwrap(),
            BigDecimal::from_str("2000000000000000").unwrap()
        );
        assert!(matches!(
            to_decimal("income", f64::NAN),
            Err(AppError::PersistenceFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_memory_sink_appends_every_record() {
        let sink = MemoryRecordSink::new();
        let first = record(30);
        sink.append(&first).await.unwrap();
        sink.append(&first).await.unwrap();
        sink.append(&record(31)).await.unwrap();

        assert_eq!(sink.records().len(), 3);
        let recent = sink.recent(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].customer_age, 31);
    }

    #[tokio::test]
    async fn test_unavailable_memory_sink_fails_with_persistence_error() {
        let sink = MemoryRecordSink::unavailable();
        assert!(matches!(
            sink.append(&record(30)).await,
            Err(AppError::PersistenceFailed(_))
        ));
        assert!(sink.records().is_empty());

        sink.set_available(true);
        sink.append(&record(30)).await.unwrap();
        assert_eq!(sink.records().len(), 1);
    }
}
