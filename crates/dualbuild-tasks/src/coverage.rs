//! Coverage summary evaluation
//!
//! Reads the istanbul `json-summary` report and checks it against the
//! configured thresholds. Percentages are recomputed from the covered and
//! total counts; a file's coverage is its lowest metric.

use crate::error::{BuildError, BuildResult};
use dualbuild_config::CoverageThresholds;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, warn};

/// Report file produced by the `json-summary` reporter
pub const SUMMARY_FILE_NAME: &str = "coverage-summary.json";

/// Key of the aggregate entry
const TOTAL_KEY: &str = "total";

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct Metric {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub covered: u64,
}

impl Metric {
    /// Percentage covered, `None` when there is nothing to cover
    pub fn percentage(&self) -> Option<f64> {
        (self.total > 0).then(|| self.covered as f64 * 100.0 / self.total as f64)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
pub struct FileCoverage {
    #[serde(default)]
    pub lines: Metric,
    #[serde(default)]
    pub statements: Metric,
    #[serde(default)]
    pub functions: Metric,
    #[serde(default)]
    pub branches: Metric,
}

impl FileCoverage {
    /// Lowest percentage across metrics; 100 when nothing is measurable
    pub fn percentage(&self) -> f64 {
        [self.lines, self.statements, self.functions, self.branches]
            .iter()
            .filter_map(Metric::percentage)
            .fold(100.0, f64::min)
    }
}

/// Parsed `coverage-summary.json`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoverageSummary {
    pub total: FileCoverage,
    pub files: BTreeMap<String, FileCoverage>,
}

/// Result of checking a summary against thresholds
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    /// Minimum thresholds missed
    pub failures: Vec<String>,
    /// Optimal thresholds missed
    pub warnings: Vec<String>,
}

impl CoverageSummary {
    pub fn parse(content: &str) -> serde_json::Result<Self> {
        let mut entries: BTreeMap<String, FileCoverage> = serde_json::from_str(content)?;
        let total = entries.remove(TOTAL_KEY).unwrap_or_default();
        Ok(Self {
            total,
            files: entries,
        })
    }

    pub async fn load(path: &Path) -> BuildResult<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| BuildError::io(path, e))?;
        Self::parse(&content).map_err(|e| BuildError::BuildFailed(format!(
            "Invalid coverage summary {}: {}",
            path.display(),
            e
        )))
    }

    /// Compare against thresholds; file names are shown relative to `root`
    pub fn evaluate(&self, thresholds: &CoverageThresholds, root: &Path) -> Evaluation {
        let mut evaluation = Evaluation::default();
        let overall = self.total.percentage();

        if overall < thresholds.minimum {
            evaluation.failures.push(format!(
                "overall coverage {:.2}% is below minimum {:.2}%",
                overall, thresholds.minimum
            ));
        } else if let Some(optimal) = thresholds.optimal.filter(|optimal| overall < *optimal) {
            evaluation.warnings.push(format!(
                "overall coverage {:.2}% is below optimal {:.2}%",
                overall, optimal
            ));
        }

        for (file, coverage) in &self.files {
            let percentage = coverage.percentage();
            let name = pathdiff::diff_paths(file, root)
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| file.clone());

            if percentage < thresholds.minimum_file {
                evaluation.failures.push(format!(
                    "{} coverage {:.2}% is below minimum {:.2}%",
                    name, percentage, thresholds.minimum_file
                ));
            } else if let Some(optimal) = thresholds.optimal_file.filter(|o| percentage < *o) {
                evaluation.warnings.push(format!(
                    "{} coverage {:.2}% is below optimal {:.2}%",
                    name, percentage, optimal
                ));
            }
        }

        evaluation
    }

    /// Log the outcome and fail when a minimum threshold is missed
    pub fn check(&self, thresholds: &CoverageThresholds, root: &Path) -> BuildResult<()> {
        let evaluation = self.evaluate(thresholds, root);
        for warning in &evaluation.warnings {
            warn!("{}", warning);
        }

        if !evaluation.failures.is_empty() {
            return Err(BuildError::CoverageBelowThreshold(evaluation.failures));
        }

        info!(
            "Coverage {:.2}% across {} files",
            self.total.percentage(),
            self.files.len()
        );
        Ok(())
    }
}
