//! Utility to check which model artifact the service would serve.
//!
//! Usage: `inspect-model [age,dependents,income,loan,score,tenure,gender,married,education,self_employed,previous_loan,area,bandwidth]`
//!
//! Resolves the artifact from `MODEL_PATHS` (or the defaults), prints where it
//! was found and its fingerprint, and optionally scores one encoded row.

use anyhow::Context;
use loan_approval_api::config::Config;
use loan_approval_api::encoding::{FeatureVector, FEATURE_COLUMNS, FEATURE_COUNT};
use loan_approval_api::loader;
use loan_approval_api::models::PredictionVerdict;

fn parse_row(raw: &str) -> anyhow::Result<FeatureVector> {
    let values: Vec<f64> = raw
        .split(',')
        .map(|v| {
            v.trim()
                .parse::<f64>()
                .with_context(|| format!("not a number: {:?}", v))
        })
        .collect::<anyhow::Result<_>>()?;

    let values: [f64; FEATURE_COUNT] = values.try_into().map_err(|v: Vec<f64>| {
        anyhow::anyhow!("expected {} values, got {}", FEATURE_COUNT, v.len())
    })?;
    Ok(FeatureVector::new(values))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "loan_approval_api=info".into()),
        )
        .init();

    let candidates = Config::model_paths_from_env()?;
    let artifact = loader::load(&candidates)?;

    println!("Model artifact:");
    println!("  path:        {}", artifact.path.display());
    println!("  kind:        {}", artifact.classifier.kind());
    println!("  fingerprint: {}", artifact.fingerprint);
    println!("  columns:     {}", FEATURE_COLUMNS.join(", "));

    if let Some(raw) = std::env::args().nth(1) {
        let row = parse_row(&raw)?;
        let label = artifact.classifier.predict(&row)?;
        let verdict = PredictionVerdict::from_raw(label)?;
        println!();
        println!("Prediction for {:?}: {} (label {})", row.as_slice(), verdict.message(), label);
    }

    Ok(())
}
