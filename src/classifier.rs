use anyhow::{anyhow, bail, ensure};
use serde::{Deserialize, Serialize};

use crate::encoding::{FeatureVector, FEATURE_COLUMNS};

/// A trained binary classifier.
///
/// `predict` is a pure function of the feature row and returns the raw class
/// label. Implementations are shared read-only across requests.
pub trait Classifier: Send + Sync {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64>;

    /// Short name of the model family, for diagnostics.
    fn kind(&self) -> &'static str {
        "custom"
    }
}

/// JSON model artifact.
///
/// ```json
/// {"kind": "logistic_regression", "coefficients": [...13], "intercept": -1.5}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    LogisticRegression(LogisticRegression),
    DecisionTree(DecisionTree),
}

impl ModelArtifact {
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl Classifier for ModelArtifact {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64> {
        match self {
            ModelArtifact::LogisticRegression(m) => m.predict(features),
            ModelArtifact::DecisionTree(m) => m.predict(features),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            ModelArtifact::LogisticRegression(m) => m.kind(),
            ModelArtifact::DecisionTree(m) => m.kind(),
        }
    }
}

/// Rejects an artifact whose recorded training columns differ from ours.
fn check_feature_names(names: &[String]) -> anyhow::Result<()> {
    if names.is_empty() {
        return Ok(());
    }
    ensure!(
        names.iter().map(String::as_str).eq(FEATURE_COLUMNS.iter().copied()),
        "artifact was trained on columns {:?}, expected {:?}",
        names,
        FEATURE_COLUMNS
    );
    Ok(())
}

fn default_threshold() -> f64 {
    0.5
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticRegression {
    /// Training column names; empty when the exporter did not record them.
    #[serde(default)]
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    /// Probability at or above which the positive class (1) is predicted.
    #[serde(default = "default_threshold")]
    pub threshold: f64,
}

impl LogisticRegression {
    /// Probability of class 1.
    pub fn probability(&self, features: &FeatureVector) -> anyhow::Result<f64> {
        check_feature_names(&self.feature_names)?;
        let row = features.as_slice();
        ensure!(
            self.coefficients.len() == row.len(),
            "artifact expects {} features, got {}",
            self.coefficients.len(),
            row.len()
        );

        let margin: f64 = self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(w, x)| w * x)
                .sum::<f64>();
        ensure!(!margin.is_nan(), "margin is NaN");

        Ok(1.0 / (1.0 + (-margin).exp()))
    }
}

impl Classifier for LogisticRegression {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64> {
        let p = self.probability(features)?;
        Ok(if p >= self.threshold { 1 } else { 0 })
    }

    fn kind(&self) -> &'static str {
        "logistic_regression"
    }
}

/// Tree node. Splits send rows with `x[feature] <= threshold` to `left`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TreeNode {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        label: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    #[serde(default)]
    pub feature_names: Vec<String>,
    /// Flattened nodes; index 0 is the root.
    pub nodes: Vec<TreeNode>,
}

impl Classifier for DecisionTree {
    fn predict(&self, features: &FeatureVector) -> anyhow::Result<i64> {
        check_feature_names(&self.feature_names)?;
        let row = features.as_slice();

        let mut index = 0;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..self.nodes.len() {
            let node = self
                .nodes
                .get(index)
                .ok_or_else(|| anyhow!("tree references missing node {}", index))?;
            match node {
                TreeNode::Leaf { label } => return Ok(*label),
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    let value = row.get(*feature).ok_or_else(|| {
                        anyhow!(
                            "tree splits on feature {} but rows have {} columns",
                            feature,
                            row.len()
                        )
                    })?;
                    index = if value <= threshold { *left } else { *right };
                }
            }
        }
        bail!("tree did not reach a leaf; nodes form a cycle")
    }

    fn kind(&self) -> &'static str {
        "decision_tree"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(credit_score: f64) -> FeatureVector {
        FeatureVector::new([
            30.0,
            1.0,
            5000.0,
            10000.0,
            credit_score,
            12.0,
            0.0,
            0.0,
            1.0,
            0.0,
            0.0,
            2.0,
            1.0,
        ])
    }

    fn credit_tree() -> DecisionTree {
        DecisionTree {
            feature_names: vec![],
            nodes: vec![
                TreeNode::Split {
                    feature: 4,
                    threshold: 650.0,
                    left: 1,
                    right: 2,
                },
                TreeNode::Leaf { label: 1 },
                TreeNode::Leaf { label: 0 },
            ],
        }
    }

    #[test]
    fn test_tree_routes_on_threshold() {
        let tree = credit_tree();
        assert_eq!(tree.predict(&row(600.0)).unwrap(), 1);
        assert_eq!(tree.predict(&row(650.0)).unwrap(), 1);
        assert_eq!(tree.predict(&row(700.0)).unwrap(), 0);
    }

    #[test]
    fn test_tree_cycle_is_an_error() {
        let tree = DecisionTree {
            feature_names: vec![],
            nodes: vec![TreeNode::Split {
                feature: 0,
                threshold: 100.0,
                left: 0,
                right: 0,
            }],
        };
        assert!(tree.predict(&row(700.0)).is_err());
    }

    #[test]
    fn test_tree_out_of_range_feature_is_an_error() {
        let tree = DecisionTree {
            feature_names: vec![],
            nodes: vec![
                TreeNode::Split {
                    feature: 13,
                    threshold: 0.0,
                    left: 1,
                    right: 1,
                },
                TreeNode::Leaf { label: 0 },
            ],
        };
        assert!(tree.predict(&row(700.0)).is_err());
    }

    #[test]
    fn test_logistic_dimension_mismatch_is_an_error() {
        let model = LogisticRegression {
            feature_names: vec![],
            coefficients: vec![0.1; 12],
            intercept: 0.0,
            threshold: 0.5,
        };
        let err = model.predict(&row(700.0)).unwrap_err();
        assert!(err.to_string().contains("expects 12 features"));
    }

    #[test]
    fn test_logistic_threshold() {
        let mut coefficients = vec![0.0; 13];
        coefficients[4] = -0.01;
        let model = LogisticRegression {
            feature_names: vec![],
            coefficients,
            intercept: 6.5,
            threshold: 0.5,
        };
        // margin = 6.5 - 7.0 < 0 → approved
        assert_eq!(model.predict(&row(700.0)).unwrap(), 0);
        // margin = 6.5 - 6.0 > 0 → rejected
        assert_eq!(model.predict(&row(600.0)).unwrap(), 1);
    }

    #[test]
    fn test_stale_feature_names_are_rejected() {
        let mut names: Vec<String> = FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect();
        names.swap(11, 12);
        let tree = DecisionTree {
            feature_names: names,
            ..credit_tree()
        };
        let err = tree.predict(&row(700.0)).unwrap_err();
        assert!(err.to_string().contains("trained on columns"));
    }

    #[test]
    fn test_artifact_json_is_tagged_by_kind() {
        let json = r#"{
            "kind": "decision_tree",
            "nodes": [
                {"feature": 4, "threshold": 650.0, "left": 1, "right": 2},
                {"label": 1},
                {"label": 0}
            ]
        }"#;
        let artifact = ModelArtifact::from_json(json.as_bytes()).unwrap();
        assert_eq!(artifact.kind(), "decision_tree");
        assert_eq!(artifact.predict(&row(720.0)).unwrap(), 0);

        let json = r#"{"kind": "logistic_regression", "coefficients": [], "intercept": 0.0}"#;
        match ModelArtifact::from_json(json.as_bytes()).unwrap() {
            ModelArtifact::LogisticRegression(m) => assert_eq!(m.threshold, 0.5),
            other => panic!("unexpected artifact {:?}", other),
        }

        assert!(ModelArtifact::from_json(b"{\"kind\": \"svm\"}").is_err());
    }
}
