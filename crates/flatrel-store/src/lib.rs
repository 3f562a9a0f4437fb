//! # flatrel-store
//!
//! A relational record store over flat delimited files.
//!
//! This crate provides:
//! - Declared schemas with primitive and foreign-key fields
//! - One backing file per schema, one record per line, no header
//! - Foreign keys stored as positional row ids and materialized into nested
//!   records on read
//! - A predicate query engine (limit, multi-key sort, comparisons, `any`)
//! - Grouping with `min`/`max`/`sum` aggregates
//! - Cascading delete that keeps surviving references pointing at the same
//!   rows
//!
//! Row ids are positions, so they shift whenever earlier rows are removed.
//! Only [`Catalog::delete`] renumbers references; everything else treats
//! them as opaque.

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Cascading delete orchestration
pub mod cascade;

/// Table registry
pub mod catalog;

/// Backing file codec
pub mod codec;

/// Store configuration
pub mod config;

/// Error types
pub mod error;

/// Grouping and aggregates
pub mod group;

/// Typed records
pub mod model;

/// Query predicates and execution
pub mod query;

/// Field resolution
pub mod resolver;

/// Schemas and fields
pub mod schema;

/// Persistent and virtual tables
pub mod table;

/// Values and records
pub mod value;

pub use cascade::{CascadeTarget, DeleteSummary};
pub use catalog::{BreakReferences, Catalog};
pub use config::StoreConfig;
pub use error::{ErrorCode, StoreError, StoreResult};
pub use group::{Aggregate, AggregateFn};
pub use model::Model;
pub use query::{CompareOp, Predicate, Query, SortDirection};
pub use schema::{Field, FieldType, RowId, Schema};
pub use table::{Queryable, Table, VirtualTable};
pub use value::{Record, Value};
