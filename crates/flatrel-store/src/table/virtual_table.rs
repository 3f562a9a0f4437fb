//! In-memory tables with no backing file.

use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::group::{group_rows, Aggregate};
use crate::schema::{RowId, Schema};
use crate::value::Record;

use super::Queryable;

/// A fixed row sequence sharing the query interface of persistent tables.
///
/// There is nothing to refresh against, so reads never check staleness.
#[derive(Debug, Clone)]
pub struct VirtualTable {
    schema: Arc<Schema>,
    rows: Arc<Vec<Record>>,
}

impl VirtualTable {
    /// Creates a virtual table over `rows`.
    pub fn new(schema: Arc<Schema>, rows: Vec<Record>) -> Self {
        Self {
            schema,
            rows: Arc::new(rows),
        }
    }

    /// Returns the position of the first row equal to `item`.
    pub fn get_id(&self, item: &Record) -> StoreResult<RowId> {
        self.rows
            .iter()
            .position(|row| row == item)
            .ok_or_else(|| StoreError::NotFound {
                schema: self.schema.name().to_string(),
            })
    }

    /// Groups these rows; see [`Table::group_by`](super::Table::group_by).
    pub fn group_by(&self, key: &str, aggregates: &[(&str, Aggregate)]) -> StoreResult<VirtualTable> {
        group_rows(&self.schema, &self.rows, key, aggregates)
    }

    /// Iterates the rows in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.rows.iter()
    }
}

impl Queryable for VirtualTable {
    fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    fn snapshot(&self) -> StoreResult<Arc<Vec<Record>>> {
        Ok(Arc::clone(&self.rows))
    }
}

impl<'a> IntoIterator for &'a VirtualTable {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
