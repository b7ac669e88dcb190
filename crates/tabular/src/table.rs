//! In-memory table of string cells.

use std::io::Read;
use std::path::Path;

use monitor_common::{DataFormat, MonitorError, MonitorResult};
use serde::Serialize;
use tracing::debug;

use crate::cnv;
use crate::summary::{summarize_column, ColumnSummary};

/// Column names recognised as depth or pressure.
const DEPTH_COLUMNS: &[&str] = &["depth", "depsm", "depth_m", "prdm", "pressure", "pres"];

/// Column names recognised as latitude.
const LATITUDE_COLUMNS: &[&str] = &["lat", "latitude"];

/// Column names recognised as longitude.
const LONGITUDE_COLUMNS: &[&str] = &["lon", "long", "longitude", "lng"];

/// A rectangular table: every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    /// Build a table, squaring off ragged input.
    ///
    /// Short rows are padded with empty cells. Cells beyond the header get
    /// synthetic `column_N` headers (1-based), as do blank header cells.
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = rows
            .iter()
            .map(|r| r.len())
            .max()
            .unwrap_or(0)
            .max(headers.len());

        let mut headers: Vec<String> = headers
            .into_iter()
            .enumerate()
            .map(|(i, h)| {
                let h = h.trim();
                if h.is_empty() {
                    synthetic_header(i)
                } else {
                    h.to_string()
                }
            })
            .collect();
        for i in headers.len()..width {
            headers.push(synthetic_header(i));
        }

        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();

        Self { headers, rows }
    }

    /// Load a data file, dispatching on its extension.
    pub fn load(path: &Path) -> MonitorResult<Self> {
        let format = DataFormat::from_path(path).ok_or_else(|| {
            MonitorError::UnsupportedFormat(format!("unrecognised file type: {}", path.display()))
        })?;

        let table = match format {
            DataFormat::Csv => Self::from_delimited(std::fs::File::open(path)?, b',')?,
            DataFormat::Tsv => Self::from_delimited(std::fs::File::open(path)?, b'\t')?,
            DataFormat::Text => Self::from_text(&read_text(path)?)?,
            DataFormat::Cnv => cnv::parse_cnv(&read_text(path)?)?,
            DataFormat::Excel | DataFormat::Rds => {
                return Err(MonitorError::UnsupportedFormat(format!(
                    "{} files can be stored and passed to scripts but not displayed",
                    format.as_str()
                )));
            }
        };

        debug!(
            path = %path.display(),
            format = format.as_str(),
            rows = table.row_count(),
            columns = table.column_count(),
            "Loaded table"
        );
        Ok(table)
    }

    /// Parse delimited text with a header row.
    pub fn from_delimited<R: Read>(reader: R, delimiter: u8) -> MonitorResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers: Vec<String> = reader
            .headers()
            .map_err(|e| MonitorError::ParseError(e.to_string()))?
            .iter()
            .map(|h| h.trim_start_matches('\u{feff}').to_string())
            .collect();

        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(MonitorError::ParseError("no header row".to_string()));
        }

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| MonitorError::ParseError(e.to_string()))?;
            if record.iter().all(|cell| cell.is_empty()) {
                continue;
            }
            rows.push(record.iter().map(str::to_string).collect());
        }

        Ok(Self::new(headers, rows))
    }

    /// Parse text whose separator is detected from the first non-empty line.
    ///
    /// Tab wins over comma, comma over semicolon; otherwise columns are
    /// split on runs of whitespace.
    pub fn from_text(text: &str) -> MonitorResult<Self> {
        let first = text
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| MonitorError::ParseError("file is empty".to_string()))?;

        let delimiter = if first.contains('\t') {
            Some(b'\t')
        } else if first.contains(',') {
            Some(b',')
        } else if first.contains(';') {
            Some(b';')
        } else {
            None
        };

        match delimiter {
            Some(d) => Self::from_delimited(text.as_bytes(), d),
            None => Ok(Self::from_whitespace(text)),
        }
    }

    /// Parse whitespace-separated columns; the first non-empty line is the header.
    pub fn from_whitespace(text: &str) -> Self {
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());
        let headers = lines
            .next()
            .map(|l| l.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();
        let rows = lines
            .map(|l| l.split_whitespace().map(str::to_string).collect())
            .collect();
        Self::new(headers, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// The first `n` rows as a new table.
    pub fn head(&self, n: usize) -> Table {
        Table {
            headers: self.headers.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// Index of the first column whose name matches any candidate,
    /// ignoring case and surrounding whitespace.
    pub fn find_column(&self, candidates: &[&str]) -> Option<usize> {
        candidates.iter().find_map(|candidate| {
            self.headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(candidate.trim()))
        })
    }

    /// Like [`find_column`](Self::find_column) for a single name, failing if absent.
    pub fn require_column(&self, name: &str) -> MonitorResult<usize> {
        self.find_column(&[name])
            .ok_or_else(|| MonitorError::ColumnNotFound(name.to_string()))
    }

    pub fn depth_column(&self) -> Option<usize> {
        self.find_column(DEPTH_COLUMNS)
    }

    pub fn latitude_column(&self) -> Option<usize> {
        self.find_column(LATITUDE_COLUMNS)
    }

    pub fn longitude_column(&self) -> Option<usize> {
        self.find_column(LONGITUDE_COLUMNS)
    }

    /// Cells of column `index`, top to bottom.
    pub fn column_values(&self, index: usize) -> impl Iterator<Item = &str> + '_ {
        self.rows
            .iter()
            .map(move |row| row.get(index).map(String::as_str).unwrap_or(""))
    }

    /// Numeric values of the named column; unparseable or empty cells are `None`.
    pub fn numeric_column(&self, name: &str) -> MonitorResult<Vec<Option<f64>>> {
        let index = self.require_column(name)?;
        Ok(self.numeric_values(index))
    }

    pub fn numeric_values(&self, index: usize) -> Vec<Option<f64>> {
        self.column_values(index).map(parse_number).collect()
    }

    /// Per-column statistics.
    pub fn summary(&self) -> Vec<ColumnSummary> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, name)| summarize_column(name, self.column_values(i)))
            .collect()
    }
}

/// Parse a cell as a finite number.
pub fn parse_number(cell: &str) -> Option<f64> {
    let cell = cell.trim();
    if cell.is_empty() {
        return None;
    }
    cell.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn synthetic_header(index: usize) -> String {
    format!("column_{}", index + 1)
}

fn read_text(path: &Path) -> MonitorResult<String> {
    let bytes = std::fs::read(path)?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}
