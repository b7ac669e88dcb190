//! Table, summary, chart and map views of stored data files.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Extension, Path, Query},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use metrics::counter;
use monitor_common::{FileKind, MonitorError, MonitorResult};
use renderer::{Chart, Series};
use serde::{Deserialize, Serialize};
use tabular::{ColumnSummary, SiteCollection, Table};
use tracing::debug;

use crate::handlers::error::ApiResult;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct TableQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct TableResponse {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub total_rows: usize,
    /// True when `rows` holds fewer rows than the file
    pub truncated: bool,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub name: String,
    pub rows: usize,
    pub columns: Vec<ColumnSummary>,
}

/// Query for `chart.png`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChartQuery {
    /// Horizontal axis column; the row index when absent
    pub x: Option<String>,
    /// Comma-separated columns to plot; every other numeric column when absent
    pub y: Option<String>,
    /// Plot the y columns against depth, depth increasing downward
    #[serde(default)]
    pub profile: bool,
}

/// GET /api/data/:name/table?limit=
pub async fn table_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    query: Result<Query<TableQuery>, QueryRejection>,
) -> ApiResult<Json<TableResponse>> {
    let Query(query) = query?;
    let preview = &state.config.preview;
    let limit = query
        .limit
        .unwrap_or(preview.default_rows)
        .min(preview.max_rows);

    let path = state.store.resolve(FileKind::Data, &name).await?;
    let table = load_blocking(path, move |table| Ok(table.head(limit))).await?;
    let total_rows = table.total_rows;
    let shown = table.value;

    Ok(Json(TableResponse {
        name,
        truncated: shown.row_count() < total_rows,
        headers: shown.headers,
        rows: shown.rows,
        total_rows,
    }))
}

/// GET /api/data/:name/summary
pub async fn summary_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<SummaryResponse>> {
    let path = state.store.resolve(FileKind::Data, &name).await?;
    let loaded = load_blocking(path, |table| Ok(table.summary())).await?;

    Ok(Json(SummaryResponse {
        name,
        rows: loaded.total_rows,
        columns: loaded.value,
    }))
}

/// GET /api/data/:name/chart.png?x=&y=&profile=
pub async fn chart_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
    query: Result<Query<ChartQuery>, QueryRejection>,
) -> ApiResult<Response> {
    let Query(query) = query?;
    let (width, height) = (state.config.chart.width, state.config.chart.height);
    let path = state.store.resolve(FileKind::Data, &name).await?;

    let png = load_blocking(path, move |table| {
        let chart = build_chart(table, &query, width, height)?;
        Ok(chart.render()?)
    })
    .await?
    .value;

    counter!("dashboard_chart_renders_total").increment(1);
    debug!(file = %name, bytes = png.len(), "Rendered chart");

    Ok(([(header::CONTENT_TYPE, "image/png")], png).into_response())
}

/// GET /api/data/:name/sites
pub async fn sites_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(name): Path<String>,
) -> ApiResult<Json<SiteCollection>> {
    let path = state.store.resolve(FileKind::Data, &name).await?;
    let sites = load_blocking(path, tabular::sites_geojson).await?.value;
    Ok(Json(sites))
}

struct Loaded<T> {
    total_rows: usize,
    value: T,
}

/// Parse a data file on the blocking pool and derive a view from it.
async fn load_blocking<T, F>(path: PathBuf, view: F) -> MonitorResult<Loaded<T>>
where
    T: Send + 'static,
    F: FnOnce(&Table) -> MonitorResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let table = Table::load(&path)?;
        Ok(Loaded {
            total_rows: table.row_count(),
            value: view(&table)?,
        })
    })
    .await
    .map_err(|e| MonitorError::Internal(format!("view task failed: {}", e)))?
}

/// Lay out the requested columns as chart series.
pub fn build_chart(
    table: &Table,
    query: &ChartQuery,
    width: usize,
    height: usize,
) -> MonitorResult<Chart> {
    let axis_index = if query.profile {
        Some(
            table
                .depth_column()
                .ok_or_else(|| MonitorError::ColumnNotFound("depth".to_string()))?,
        )
    } else {
        match &query.x {
            Some(x) => Some(table.require_column(x)?),
            None => None,
        }
    };

    let value_columns = match &query.y {
        Some(y) => y
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(|name| table.require_column(name))
            .collect::<MonitorResult<Vec<_>>>()?,
        None => table
            .summary()
            .iter()
            .enumerate()
            .filter(|(i, column)| column.numeric && Some(*i) != axis_index)
            .map(|(i, _)| i)
            .collect(),
    };
    if value_columns.is_empty() {
        return Err(MonitorError::ColumnNotFound(
            "no numeric columns to plot".to_string(),
        ));
    }

    let axis: Vec<f64> = match axis_index {
        Some(index) => table
            .numeric_values(index)
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect(),
        None => (0..table.row_count()).map(|i| i as f64).collect(),
    };

    let mut chart = Chart::new(width, height).inverted_y(query.profile);
    for index in value_columns {
        let values = table.numeric_values(index);
        let points = axis
            .iter()
            .zip(values)
            .map(|(&a, v)| {
                let v = v.unwrap_or(f64::NAN);
                if query.profile {
                    (v, a)
                } else {
                    (a, v)
                }
            })
            .collect();
        chart = chart.with_series(Series::new(table.headers[index].clone(), points));
    }
    Ok(chart)
}
