//! Tabular views of uploaded monitoring data.
//!
//! Parses the text formats the dashboard can display:
//! - CSV / TSV (via the `csv` crate)
//! - Delimited text with an auto-detected separator
//! - Sea-Bird `.cnv` converted CTD casts
//!
//! and derives column summaries and site locations from the result.

pub mod cnv;
pub mod sites;
pub mod summary;
pub mod table;

pub use sites::{sites_geojson, SiteCollection, SiteFeature};
pub use summary::ColumnSummary;
pub use table::Table;
