//! Data model for tabular data representation

mod matcher;
mod schema;
mod table;
mod value;

pub use matcher::find_matching_column;
pub use schema::ColumnKind;
pub use table::{Row, Table};
pub use value::Value;
