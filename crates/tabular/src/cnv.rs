//! Sea-Bird `.cnv` converted cast parsing.
//!
//! A `.cnv` file has a header of `*` (instrument) and `#` (processing)
//! lines terminated by `*END*`, followed by whitespace-separated data.
//! Column names come from `# name N = short: long description` lines;
//! cells equal to the `# bad_flag` value are blanked.

use monitor_common::{MonitorError, MonitorResult};

use crate::table::Table;

const END_MARKER: &str = "*END*";

/// Upper bound on column numbers when no `# nquan` line precedes the names.
pub const MAX_COLUMNS: usize = 4096;

/// Parsed `.cnv` header.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CnvHeader {
    /// Column names indexed by column number (gaps are `None`).
    pub names: Vec<Option<String>>,
    /// Value marking missing samples.
    pub bad_flag: Option<f64>,
    /// Declared column count from `# nquan`.
    pub nquan: Option<usize>,
}

/// Parse a `.cnv` file into a table.
pub fn parse_cnv(text: &str) -> MonitorResult<Table> {
    let mut header = CnvHeader::default();
    let mut lines = text.lines();
    let mut saw_end = false;

    for line in lines.by_ref() {
        let trimmed = line.trim();
        if trimmed.starts_with(END_MARKER) {
            saw_end = true;
            break;
        }
        if let Some(rest) = trimmed.strip_prefix('#') {
            parse_header_line(rest.trim(), &mut header)?;
        }
    }

    if !saw_end {
        return Err(MonitorError::ParseError(
            "missing *END* marker in .cnv header".to_string(),
        ));
    }

    let rows: Vec<Vec<String>> = lines
        .filter(|l| !l.trim().is_empty())
        .map(|l| {
            l.split_whitespace()
                .map(|cell| blank_if_flagged(cell, header.bad_flag))
                .collect()
        })
        .collect();

    let headers = header
        .names
        .into_iter()
        .map(|name| name.unwrap_or_default())
        .collect();

    Ok(Table::new(headers, rows))
}

fn parse_header_line(line: &str, header: &mut CnvHeader) -> MonitorResult<()> {
    if let Some(rest) = line.strip_prefix("name ") {
        // "0 = prDM: Pressure, Digiquartz [db]"
        let Some((index, label)) = rest.split_once('=') else {
            return Ok(());
        };
        let Ok(index) = index.trim().parse::<usize>() else {
            return Ok(());
        };
        let short = label.split(':').next().unwrap_or("").trim();
        if short.is_empty() {
            return Ok(());
        }

        let limit = header.nquan.unwrap_or(MAX_COLUMNS);
        let len = index
            .checked_add(1)
            .filter(|len| *len <= limit)
            .ok_or_else(|| {
                MonitorError::ParseError(format!(
                    "column number {} out of range (limit {})",
                    index, limit
                ))
            })?;
        if header.names.len() < len {
            header.names.resize(len, None);
        }
        header.names[index] = Some(short.to_string());
    } else if let Some(rest) = line.strip_prefix("nquan") {
        let count = rest
            .trim_start()
            .strip_prefix('=')
            .and_then(|v| v.trim().parse::<usize>().ok());
        if let Some(count) = count {
            if count > MAX_COLUMNS {
                return Err(MonitorError::ParseError(format!(
                    "nquan {} exceeds {} columns",
                    count, MAX_COLUMNS
                )));
            }
            header.nquan = Some(count);
        }
    } else if let Some(rest) = line.strip_prefix("bad_flag") {
        header.bad_flag = rest
            .trim_start()
            .strip_prefix('=')
            .and_then(|v| v.trim().parse::<f64>().ok());
    }
    Ok(())
}

fn blank_if_flagged(cell: &str, bad_flag: Option<f64>) -> String {
    match (bad_flag, cell.parse::<f64>()) {
        (Some(flag), Ok(value)) if value == flag => String::new(),
        _ => cell.to_string(),
    }
}
