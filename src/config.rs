use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::Reduction;
use crate::data::model::{columns, experiment_columns, ColumnSpec};

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

/// How a view is meant to be drawn; decides which table the pipeline builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewKind {
    /// One reduced value per group.
    Bar,
    /// Quartile summary per group.
    Box,
}

/// A grouped view requested from the pipeline. The last group key is the
/// hue key that receives legend colours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewSpec {
    pub title: String,
    pub kind: ViewKind,
    pub group_keys: Vec<String>,
    pub value_column: String,
    #[serde(default)]
    pub reduction: Reduction,
}

impl ViewSpec {
    fn new(title: &str, kind: ViewKind, keys: &[&str], value: &str) -> Self {
        ViewSpec {
            title: title.to_string(),
            kind,
            group_keys: keys.iter().map(|k| k.to_string()).collect(),
            value_column: value.to_string(),
            reduction: Reduction::Mean,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline configuration
// ---------------------------------------------------------------------------

/// Column declarations plus the views to compute after cleaning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub columns: Vec<ColumnSpec>,
    #[serde(default)]
    pub views: Vec<ViewSpec>,
}

impl Default for PipelineConfig {
    /// The seven-column experiment schema with its four standard views.
    fn default() -> Self {
        use columns::*;
        PipelineConfig {
            columns: experiment_columns(),
            views: vec![
                ViewSpec::new(
                    "Correctness by Angle and Dimension",
                    ViewKind::Bar,
                    &[ANGLE, DIMENSION],
                    CORRECT,
                ),
                ViewSpec::new(
                    "Response Time by Angle and Dimension",
                    ViewKind::Bar,
                    &[ANGLE, DIMENSION],
                    RESPONSE_TIME,
                ),
                ViewSpec::new(
                    "Vividness Response by Dimension and WM Condition",
                    ViewKind::Box,
                    &[DIMENSION, WM],
                    VIVIDNESS,
                ),
                ViewSpec::new(
                    "Strategy Response by Dimension and WM Condition",
                    ViewKind::Box,
                    &[DIMENSION, WM],
                    STRATEGY,
                ),
            ],
        }
    }
}

impl PipelineConfig {
    /// Read a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: PipelineConfig = serde_json::from_str(&text).context("parsing config JSON")?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that can never produce a result.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            bail!("config declares no columns");
        }
        for (i, spec) in self.columns.iter().enumerate() {
            if self.columns[..i].iter().any(|s| s.name == spec.name) {
                bail!("column '{}' declared twice", spec.name);
            }
        }
        for view in &self.views {
            if view.group_keys.is_empty() {
                bail!("view '{}' has no group keys", view.title);
            }
        }
        Ok(())
    }
}
