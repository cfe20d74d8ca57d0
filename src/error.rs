use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Pipeline step that raised an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Load,
    Summarize,
    Aggregate,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Load => write!(f, "load"),
            Stage::Summarize => write!(f, "summarize"),
            Stage::Aggregate => write!(f, "aggregate"),
        }
    }
}

/// Errors surfaced to the caller. Bad cells are never errors; they become
/// missing and are only visible through the dropped-row count.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// The upload is not UTF-8 or not a rectangular comma-separated table.
    #[error("cannot parse upload: {reason}")]
    Parse { reason: String },

    /// A critical or group-by column is not in the table schema.
    #[error("{stage}: column '{column}' not found")]
    ColumnNotFound { column: String, stage: Stage },
}

impl PipelineError {
    pub fn parse(reason: impl Into<String>) -> Self {
        PipelineError::Parse {
            reason: reason.into(),
        }
    }

    pub fn column_not_found(column: &str, stage: Stage) -> Self {
        PipelineError::ColumnNotFound {
            column: column.to_string(),
            stage,
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            PipelineError::Parse { .. } => Stage::Load,
            PipelineError::ColumnNotFound { stage, .. } => *stage,
        }
    }
}

impl From<csv::Error> for PipelineError {
    fn from(err: csv::Error) -> Self {
        let reason = match err.kind() {
            csv::ErrorKind::UnequalLengths {
                pos,
                expected_len,
                len,
            } => {
                let line = pos.as_ref().map(|p| p.line()).unwrap_or(0);
                format!("line {line} has {len} fields, header has {expected_len}")
            }
            csv::ErrorKind::Utf8 { pos, err } => {
                let line = pos.as_ref().map(|p| p.line()).unwrap_or(0);
                format!("line {line} is not valid UTF-8: {err}")
            }
            _ => err.to_string(),
        };
        PipelineError::parse(reason)
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_stage() {
        let err = PipelineError::column_not_found("angle", Stage::Aggregate);
        assert_eq!(err.to_string(), "aggregate: column 'angle' not found");
        assert_eq!(err.stage(), Stage::Aggregate);
        assert_eq!(PipelineError::parse("bad").stage(), Stage::Load);
    }
}
