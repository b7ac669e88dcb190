//! Per-column statistics.

use serde::Serialize;

use crate::table::parse_number;

/// Summary of one column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnSummary {
    pub name: String,
    /// Non-empty cells
    pub count: usize,
    /// Empty cells
    pub missing: usize,
    /// True when the column has values and every one parses as a number
    pub numeric: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean: Option<f64>,
}

pub(crate) fn summarize_column<'a>(
    name: &str,
    cells: impl Iterator<Item = &'a str>,
) -> ColumnSummary {
    let mut count = 0usize;
    let mut missing = 0usize;
    let mut all_numeric = true;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    let mut sum = 0.0;

    for cell in cells {
        if cell.trim().is_empty() {
            missing += 1;
            continue;
        }
        count += 1;
        match parse_number(cell) {
            Some(v) => {
                min = min.min(v);
                max = max.max(v);
                sum += v;
            }
            None => all_numeric = false,
        }
    }

    let numeric = count > 0 && all_numeric;
    ColumnSummary {
        name: name.to_string(),
        count,
        missing,
        numeric,
        min: numeric.then_some(min),
        max: numeric.then_some(max),
        mean: numeric.then(|| sum / count as f64),
    }
}
