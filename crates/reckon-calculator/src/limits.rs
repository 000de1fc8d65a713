//! Static execution budget enforced when a formula is compiled

use serde::{Deserialize, Serialize};

/// Bounds on formula size, checked once before a formula can ever run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpressionLimits {
    #[serde(default = "default_max_expression_length")]
    pub max_expression_length: usize,
    #[serde(default = "default_max_expression_nodes")]
    pub max_expression_nodes: usize,
    #[serde(default = "default_max_expression_depth")]
    pub max_expression_depth: usize,
}

fn default_max_expression_length() -> usize {
    10_000
}
fn default_max_expression_nodes() -> usize {
    1000
}
fn default_max_expression_depth() -> usize {
    50
}

impl Default for ExpressionLimits {
    fn default() -> Self {
        Self {
            max_expression_length: default_max_expression_length(),
            max_expression_nodes: default_max_expression_nodes(),
            max_expression_depth: default_max_expression_depth(),
        }
    }
}
