//! Chart rendering for monitoring data.
//!
//! Implements:
//! - An RGBA canvas with line and rectangle primitives
//! - Line charts and depth profiles (depth increasing downward)
//! - PNG encoding (indexed or RGBA)

pub mod canvas;
pub mod chart;
pub mod png;

pub use canvas::{Canvas, Color};
pub use chart::{Bounds, Chart, Series, SERIES_COLORS};

use monitor_common::MonitorError;
use thiserror::Error;

/// Errors produced while rendering a chart.
#[derive(Debug, Error, PartialEq)]
pub enum RenderError {
    #[error("Chart size {width}x{height} is too small (minimum {min}x{min})")]
    InvalidSize {
        width: usize,
        height: usize,
        min: usize,
    },

    #[error("No finite data points to plot")]
    NoData,

    #[error("Pixel buffer has {actual} bytes, expected {expected}")]
    BufferSize { expected: usize, actual: usize },

    #[error("PNG encoding failed: {0}")]
    Encode(String),
}

impl From<RenderError> for MonitorError {
    fn from(err: RenderError) -> Self {
        match err {
            RenderError::NoData => MonitorError::ColumnNotFound(
                "no numeric values in the selected columns".to_string(),
            ),
            other => MonitorError::RenderError(other.to_string()),
        }
    }
}
