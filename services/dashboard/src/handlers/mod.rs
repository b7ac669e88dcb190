//! HTTP request handlers for the dashboard.

pub mod directories;
pub mod error;
pub mod files;
pub mod health;
pub mod page;
pub mod scripts;
pub mod views;

pub use error::ApiError;
