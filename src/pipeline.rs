use log::{debug, info, warn};
use serde::Serialize;

use crate::color::{ColorMap, LegendEntry};
use crate::config::{PipelineConfig, ViewKind, ViewSpec};
use crate::data::aggregate::{aggregate, distribution, AggregateTable, DistributionTable};
use crate::data::clean::{
    coerce_column, drop_empty_columns, drop_incomplete_rows, empty_columns, missing_counts,
};
use crate::data::loader::load;
use crate::data::model::{CellValue, CleanedTable, RawTable};
use crate::data::stats::{summarize, Summary};
use crate::error::{Result, Stage};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

/// What cleaning did to the upload.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleaningReport {
    pub raw_rows: usize,
    pub raw_columns: usize,
    /// Columns removed because every cell was empty.
    pub dropped_columns: Vec<String>,
    /// Critical columns the upload does not have (after empty-column removal).
    pub absent_columns: Vec<String>,
    pub dropped_rows: usize,
    pub cleaned_rows: usize,
    /// Missing cells left per column, in header order.
    pub missing_after_cleaning: Vec<(String, usize)>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "table", rename_all = "lowercase")]
pub enum ViewTable {
    Bar(AggregateTable),
    Box(DistributionTable),
}

/// Outcome of one requested view. A failed view never affects the others.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ViewResult {
    Ready {
        title: String,
        table: ViewTable,
        legend: Vec<LegendEntry>,
    },
    Failed {
        title: String,
        stage: Stage,
        error: String,
    },
}

impl ViewResult {
    pub fn title(&self) -> &str {
        match self {
            ViewResult::Ready { title, .. } | ViewResult::Failed { title, .. } => title,
        }
    }
}

/// Everything one run hands back to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub cleaning: CleaningReport,
    pub cleaned: CleanedTable,
    /// `None` when summarizing failed; the failure is listed in `failures`.
    pub summary: Option<Summary>,
    pub views: Vec<ViewResult>,
    pub failures: Vec<String>,
}

impl PipelineReport {
    /// The no-data signal: `false` when no row survived cleaning.
    pub fn has_data(&self) -> bool {
        !self.cleaned.is_empty()
    }

    pub fn view(&self, title: &str) -> Option<&ViewResult> {
        self.views.iter().find(|v| v.title() == title)
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// Stateless composition of the cleaning steps. Each call to [`Pipeline::run`]
/// is an independent pass over one upload.
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Load, prune, coerce and filter an upload.
    ///
    /// Only a parse failure is fatal; a table with no surviving rows is
    /// returned as-is.
    pub fn clean(&self, bytes: &[u8]) -> Result<(CleanedTable, CleaningReport)> {
        Ok(self.clean_table(load(bytes)?))
    }

    /// Prune, coerce and filter an already loaded table.
    pub fn clean_table(&self, raw: RawTable) -> (CleanedTable, CleaningReport) {
        let mut report = CleaningReport {
            raw_rows: raw.len(),
            raw_columns: raw.columns().len(),
            dropped_columns: empty_columns(&raw),
            ..Default::default()
        };
        if !report.dropped_columns.is_empty() {
            debug!("dropping empty columns: {}", report.dropped_columns.join(", "));
        }

        let mut table = drop_empty_columns(raw);
        for spec in &self.config.columns {
            table = coerce_column(table, &spec.name, spec.ty);
        }

        report.absent_columns = self
            .config
            .columns
            .iter()
            .filter(|s| s.critical && !table.has_column(&s.name))
            .map(|s| s.name.clone())
            .collect();

        let cleaned = drop_incomplete_rows(table, &self.config.columns);
        report.cleaned_rows = cleaned.len();
        report.dropped_rows = report.raw_rows - cleaned.len();
        report.missing_after_cleaning = missing_counts(&cleaned);

        (cleaned, report)
    }

    /// Build the table for one view.
    pub fn view(&self, table: &CleanedTable, view: &ViewSpec) -> Result<ViewTable> {
        let keys: Vec<&str> = view.group_keys.iter().map(String::as_str).collect();
        match view.kind {
            ViewKind::Bar => {
                aggregate(table, &keys, &view.value_column, view.reduction).map(ViewTable::Bar)
            }
            ViewKind::Box => distribution(table, &keys, &view.value_column).map(ViewTable::Box),
        }
    }

    /// Run every step over one upload.
    pub fn run(&self, bytes: &[u8]) -> Result<PipelineReport> {
        Ok(self.run_table(load(bytes)?))
    }

    /// Run every step after loading. Cannot fail: later-stage errors are
    /// recorded in the report.
    pub fn run_table(&self, raw: RawTable) -> PipelineReport {
        let (cleaned, cleaning) = self.clean_table(raw);
        info!(
            "cleaned upload: {} of {} rows kept",
            cleaning.cleaned_rows, cleaning.raw_rows
        );

        let mut failures = Vec::new();
        let summary = match summarize(&cleaned) {
            Ok(summary) => Some(summary),
            Err(e) => {
                warn!("{e}");
                failures.push(e.to_string());
                None
            }
        };

        let mut views = Vec::new();
        if cleaned.is_empty() {
            info!("no data available after cleaning, skipping views");
        } else {
            for spec in &self.config.views {
                let result = self.view_result(&cleaned, spec);
                if let ViewResult::Failed { error, .. } = &result {
                    failures.push(format!("{}: {error}", spec.title));
                }
                views.push(result);
            }
        }

        PipelineReport {
            cleaning,
            cleaned,
            summary,
            views,
            failures,
        }
    }

    fn view_result(&self, table: &CleanedTable, spec: &ViewSpec) -> ViewResult {
        match self.view(table, spec) {
            Ok(view) => ViewResult::Ready {
                title: spec.title.clone(),
                legend: legend(&view),
                table: view,
            },
            Err(e) => {
                warn!("view '{}' failed: {e}", spec.title);
                ViewResult::Failed {
                    title: spec.title.clone(),
                    stage: e.stage(),
                    error: e.to_string(),
                }
            }
        }
    }
}

/// Legend for the last group key of a view.
fn legend(view: &ViewTable) -> Vec<LegendEntry> {
    let (keys, hues): (&[String], Vec<&CellValue>) = match view {
        ViewTable::Bar(t) => (
            t.group_keys.as_slice(),
            t.groups.iter().filter_map(|g| g.key.last()).collect(),
        ),
        ViewTable::Box(t) => (
            t.group_keys.as_slice(),
            t.groups.iter().filter_map(|g| g.key.last()).collect(),
        ),
    };
    match keys.last() {
        Some(column) => ColorMap::new(column, hues).legend_entries(),
        None => Vec::new(),
    }
}

/// Run one upload through the experiment schema and its standard views.
pub fn run_default(bytes: &[u8]) -> Result<PipelineReport> {
    Pipeline::default().run(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::aggregate::Reduction;
    use crate::data::model::{ColumnSpec, ColumnType};

    const UPLOAD: &str = "\
participant,dimension,angle,wm,key_resp.corr,vivid_response,strategy_response,key_resp.rt,notes
p1,2D,0,True,1,4,3,0.53,
p1,2D,0,False,0,None,2,0.61,
p1,3D,45,True,1,5,4,0.92,
p1,3D,45,False,0,3,3,1.10,
";

    #[test]
    fn run_builds_cleaning_report() {
        let report = Pipeline::default().run(UPLOAD.as_bytes()).unwrap();
        assert!(report.has_data());
        assert_eq!(report.cleaning.raw_rows, 4);
        assert_eq!(report.cleaning.dropped_columns, ["notes"]);
        assert_eq!(report.cleaning.dropped_rows, 1);
        assert_eq!(report.cleaning.cleaned_rows, 3);
        assert!(report.cleaning.missing_after_cleaning.iter().all(|(_, n)| *n == 0));
        assert!(report.failures.is_empty());
    }

    #[test]
    fn default_views_are_ready() {
        let pipeline = Pipeline::default();
        let report = pipeline.run(UPLOAD.as_bytes()).unwrap();
        assert_eq!(report.views.len(), pipeline.config().views.len());
        assert_eq!(report.views.len(), 4);
        let Some(ViewResult::Ready { table: ViewTable::Bar(t), legend, .. }) =
            report.view("Correctness by Angle and Dimension")
        else {
            panic!("correctness view missing");
        };
        assert_eq!(t.find(&["45", "3D"]).unwrap().value, Some(0.5));
        let labels: Vec<&str> = legend.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, ["2D", "3D"]);
    }

    #[test]
    fn failed_view_does_not_spoil_others() {
        let mut config = PipelineConfig::default();
        config.views.push(ViewSpec {
            title: "by block".into(),
            kind: ViewKind::Bar,
            group_keys: vec!["block".into()],
            value_column: "key_resp.rt".into(),
            reduction: Reduction::Mean,
        });
        let report = Pipeline::new(config).run(UPLOAD.as_bytes()).unwrap();
        assert_eq!(report.views.len(), 5);
        assert!(matches!(
            report.view("by block"),
            Some(ViewResult::Failed { stage: Stage::Aggregate, .. })
        ));
        assert_eq!(report.failures.len(), 1);
        assert!(report.summary.is_some());
    }

    #[test]
    fn missing_critical_column_yields_no_data() {
        let report = Pipeline::default().run(b"dimension,angle\n2D,0\n").unwrap();
        assert!(!report.has_data());
        assert_eq!(report.summary, Some(Summary::NoData));
        assert!(report.views.is_empty());
        assert_eq!(report.cleaning.absent_columns.len(), 5);
    }

    #[test]
    fn relaxed_config_keeps_rows_without_ratings() {
        let mut config = PipelineConfig::default();
        for spec in &mut config.columns {
            if spec.name == "vivid_response" || spec.name == "strategy_response" {
                spec.critical = false;
            }
        }
        let report = Pipeline::new(config).run(UPLOAD.as_bytes()).unwrap();
        assert_eq!(report.cleaning.cleaned_rows, 4);
        assert!(report.summary.unwrap().get("vivid_response").is_none());
    }

    #[test]
    fn parse_errors_abort_the_run() {
        let err = run_default(b"a,b\n1\n").unwrap_err();
        assert_eq!(err.stage(), Stage::Load);
    }

    #[test]
    fn report_serializes_rows_as_records() {
        let config = PipelineConfig {
            columns: vec![ColumnSpec::new("x", ColumnType::Numeric)],
            views: Vec::new(),
        };
        let report = Pipeline::new(config).run(b"x,y\n1,a\n").unwrap();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["cleaned"][0]["x"], 1.0);
        assert_eq!(json["cleaned"][0]["y"], "a");
        assert_eq!(json["summary"]["status"], "stats");
    }
}
