//! gridquery protocol types.
//!
//! This crate defines the types exchanged with a data-grid client: the
//! normalized request, the versioned response envelope, and the scalar
//! values used in query plans and hydrated rows.
//!
//! # Modules
//!
//! - [`value`] - Runtime scalar values
//! - [`request`] - Normalized grid request and column requests
//! - [`response`] - Page response and protocol-versioned envelope
//! - [`error`] - Protocol error types

pub mod error;
pub mod request;
pub mod response;
pub mod value;

pub use error::Error;

pub use request::{
    ColumnRequest, ColumnSpec, OrderRequest, RequestModel, SearchSpec, SortDirection, ALL_RECORDS,
};
pub use response::{
    DisplayRow, EnvelopeKeys, GridResponse, ProtocolVersion, RawRow, ROW_CLASS_FIELD, ROW_ID_FIELD,
};
pub use value::Value;
