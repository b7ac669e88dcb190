//! Common types shared by the monitoring dashboard crates.

pub mod error;
pub mod file_kind;

pub use error::{MonitorError, MonitorResult};
pub use file_kind::{extension_of, validate_file_name, DataFormat, FileKind};
