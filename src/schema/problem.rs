//! Definition of the synthetic branch-tree problem used by the CLI.
//!
//! Goals form a complete binary tree: goal `i` guards goals `2i + 1` and
//! `2i + 2`, and every goal is a window condition `|x[depth] - centre| <= width`
//! on the gene belonging to its depth. Siblings share a gene, so they behave
//! like the two arms of nested `if` statements.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Synthetic problem parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticProblem {
    /// Number of goals in the tree.
    #[serde(default = "default_goals")]
    pub goals: u32,
    /// Half-width of every condition window.
    #[serde(default = "default_width")]
    pub width: f64,
    /// Genes live in `[-range, range]`.
    #[serde(default = "default_range")]
    pub range: f64,
    /// Standard deviation of Gaussian mutation.
    #[serde(default = "default_mutation_sigma")]
    pub mutation_sigma: f64,
    /// Seed for placing the condition windows.
    #[serde(default = "default_layout_seed")]
    pub layout_seed: u64,
}

impl Default for SyntheticProblem {
    fn default() -> Self {
        Self {
            goals: default_goals(),
            width: default_width(),
            range: default_range(),
            mutation_sigma: default_mutation_sigma(),
            layout_seed: default_layout_seed(),
        }
    }
}

fn default_goals() -> u32 {
    31
}
fn default_width() -> f64 {
    0.1
}
fn default_range() -> f64 {
    1.0
}
fn default_mutation_sigma() -> f64 {
    0.2
}
fn default_layout_seed() -> u64 {
    1
}

impl SyntheticProblem {
    /// Load a problem definition from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ProblemError> {
        let content = fs::read_to_string(path)?;
        let problem: Self = serde_json::from_str(&content)?;
        problem.validate()?;
        Ok(problem)
    }

    /// Validate problem parameters.
    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.goals == 0 {
            return Err(ProblemError::NoGoals);
        }
        if !(self.range.is_finite() && self.range > 0.0) {
            return Err(ProblemError::InvalidRange(self.range));
        }
        if !(self.width > 0.0 && self.width < self.range) {
            return Err(ProblemError::InvalidWidth {
                width: self.width,
                range: self.range,
            });
        }
        if !(self.mutation_sigma.is_finite() && self.mutation_sigma > 0.0) {
            return Err(ProblemError::InvalidSigma(self.mutation_sigma));
        }
        Ok(())
    }
}

/// Problem definition errors.
#[derive(Debug, thiserror::Error)]
pub enum ProblemError {
    #[error("Problem must define at least one goal")]
    NoGoals,
    #[error("Gene range {0} must be positive and finite")]
    InvalidRange(f64),
    #[error("Window width {width} must lie in (0, {range})")]
    InvalidWidth { width: f64, range: f64 },
    #[error("Mutation sigma {0} must be positive and finite")]
    InvalidSigma(f64),
    #[error("Failed to read problem: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse problem: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_problem_valid() {
        assert!(SyntheticProblem::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_problems_rejected() {
        let problem = SyntheticProblem {
            goals: 0,
            ..Default::default()
        };
        assert!(matches!(problem.validate(), Err(ProblemError::NoGoals)));

        let problem = SyntheticProblem {
            width: 2.0,
            ..Default::default()
        };
        assert!(matches!(
            problem.validate(),
            Err(ProblemError::InvalidWidth { .. })
        ));

        let problem = SyntheticProblem {
            mutation_sigma: 0.0,
            ..Default::default()
        };
        assert!(matches!(
            problem.validate(),
            Err(ProblemError::InvalidSigma(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"goals": 7, "width": 0.25}}"#).unwrap();

        let problem = SyntheticProblem::from_json_file(file.path()).unwrap();
        assert_eq!(problem.goals, 7);
        assert_eq!(problem.width, 0.25);
        assert_eq!(problem.range, 1.0);
    }
}
