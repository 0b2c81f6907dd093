use chrono::{SubsecRound, Utc};
use std::env;
use std::path::PathBuf;

use loan_approval_api::config::Config;
use loan_approval_api::db::Database;
use loan_approval_api::models::{LoanApplicationRequest, PredictionVerdict, StoredRecord};
use loan_approval_api::sink::{PgRecordSink, RecordSink};

fn test_config() -> anyhow::Result<Config> {
    let database_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    Ok(Config {
        database_url,
        port: 0,
        model_paths: vec![PathBuf::from("demos/sample_model.json")],
        db_max_connections: 2,
        db_acquire_timeout_secs: 5,
    })
}

/// Integration smoke test for the Postgres record sink.
/// Marked ignored to avoid running against production by accident; set TEST_DATABASE_URL to run.
#[tokio::test]
#[ignore]
async fn stored_application_round_trips() -> anyhow::Result<()> {
    let db = Database::new(&test_config()?)?;
    let sink = PgRecordSink::new(db.pool.clone());
    sink.ensure_schema()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    // Applying the schema twice must be harmless.
    sink.ensure_schema()
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let request = LoanApplicationRequest {
        age: 37,
        dependents: 2,
        monthly_income: 7200.5,
        // Well beyond what a NUMERIC(14, 2) column would hold.
        loan_amount: 1e13,
        credit_score: 705,
        tenure_months: 48,
        gender: "Female".to_string(),
        married: "Yes".to_string(),
        education: "Not Graduate".to_string(),
        self_employed: "No".to_string(),
        previous_loan_taken: "Yes".to_string(),
        property_area: "Semiurban".to_string(),
        customer_bandwidth: "Medium".to_string(),
    };
    // TIMESTAMPTZ keeps microseconds.
    let submitted_at = Utc::now().trunc_subsecs(6);
    let record = StoredRecord::new(&request, PredictionVerdict::Rejected, submitted_at);

    sink.append(&record)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let recent = sink
        .recent(1)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0], record);
    assert_eq!(recent[0].submitted_at, submitted_at);
    assert_eq!(recent[0].education, "Not Graduate");
    assert_eq!(recent[0].prediction, "Rejected");
    assert_eq!(recent[0].loan_amount, 1e13);
    Ok(())
}
