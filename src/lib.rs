//! dataops - Stateless transformations for tabular data
//!
//! A table is a list of rows, each row an ordered map from column name to a
//! scalar value. Operations borrow a table and return a new one along with
//! their diagnostics:
//!
//! - [`ops::remove_nulls`] deletes or imputes missing values
//! - [`ops::count_nulls`] counts missing values per column
//! - [`ops::preview`] returns a bounded prefix
//! - [`ops::summary`] computes per-column statistics
//! - [`ops::convert_type`] coerces a column cell by cell
//! - [`expr::create_derived_column`] evaluates a sandboxed formula per row
//!
//! [`service::Service`] sits in front of the engine and turns request
//! envelopes into accepted, rejected or failed responses.

pub mod config;
pub mod error;
pub mod expr;
pub mod logging;
pub mod model;
pub mod ops;
pub mod output;
pub mod parser;
pub mod service;

pub use config::Config;
pub use error::{EngineError, Result};
pub use model::{Row, Table, Value};
pub use service::{Request, Response, Service};
