/// Checks the bundled sample artifact against the current feature schema
use loan_approval_api::loader;
use loan_approval_api::models::{LoanApplicationRequest, PredictionVerdict};
use loan_approval_api::service::submit;
use loan_approval_api::sink::MemoryRecordSink;
use std::path::PathBuf;

fn sample_model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/sample_model.json")
}

fn request(credit_score: i32, loan_amount: f64, monthly_income: f64) -> LoanApplicationRequest {
    LoanApplicationRequest {
        age: 30,
        dependents: 1,
        monthly_income,
        loan_amount,
        credit_score,
        tenure_months: 12,
        gender: "Male".to_string(),
        married: "No".to_string(),
        education: "Graduate".to_string(),
        self_employed: "No".to_string(),
        previous_loan_taken: "No".to_string(),
        property_area: "Urban".to_string(),
        customer_bandwidth: "Medium".to_string(),
    }
}

#[tokio::test]
async fn sample_model_scores_against_current_schema() {
    let artifact = loader::load(&[sample_model_path()]).expect("sample model should load");
    assert_eq!(artifact.classifier.kind(), "decision_tree");

    let sink = MemoryRecordSink::new();
    let cases = [
        (request(700, 10000.0, 5000.0), PredictionVerdict::Approved),
        (request(600, 10000.0, 5000.0), PredictionVerdict::Rejected),
        (request(750, 900000.0, 5000.0), PredictionVerdict::Rejected),
        (request(750, 900000.0, 45000.0), PredictionVerdict::Approved),
    ];

    for (application, expected) in &cases {
        let submission = submit(application, artifact.classifier.as_ref(), &sink)
            .await
            .unwrap();
        assert_eq!(submission.verdict, *expected, "{:?}", application);
    }
    assert_eq!(sink.records().len(), cases.len());
}
