//! # gridlite core
//!
//! Types and pure logic shared by the gridlite crates: the error taxonomy,
//! scalar values, table metadata, translation of grid searches into
//! parameterised SQL, and the records and envelopes returned to the grid.
//!
//! Nothing in this crate touches the database; the storage crate executes
//! what is built here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
/// Search and sort translation
#[allow(missing_docs)]
pub mod filter;
#[allow(missing_docs)]
pub mod record;
/// Grid wire types
#[allow(missing_docs)]
pub mod request;
#[allow(missing_docs)]
pub mod schema;
/// Scalar values
#[allow(missing_docs)]
pub mod value;

pub use error::{Error, Result};
pub use filter::{
    translate_search, translate_sort, SearchClause, SearchLogic, SortClause, SortDirection,
    WhereFragment,
};
pub use record::{format_records, Record, RECID};
pub use request::{DeleteRequest, Envelope, GridRequest, QueryRequest, RowChange, SaveRequest};
pub use schema::{quote_identifier, ColumnInfo, TableSchema, TypeCategory};
pub use value::Value;
