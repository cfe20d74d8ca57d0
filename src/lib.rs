//! Cleaning and summary pipeline for mental-rotation experiment exports.
//!
//! An upload goes through [`pipeline::Pipeline::run`]: it is parsed, empty
//! columns are dropped, the declared columns are coerced, incomplete rows are
//! removed, and the surviving rows are summarized and grouped into the views
//! the caller asked for. Rendering is left to the caller; [`render`] turns the
//! report tables into Arrow record batches for display.

pub mod color;
pub mod config;
pub mod data;
pub mod error;
pub mod pipeline;
pub mod render;

pub use config::{PipelineConfig, ViewKind, ViewSpec};
pub use error::{PipelineError, Stage};
pub use pipeline::{Pipeline, PipelineReport};
