//! Tables: row sequences behind the query engine.
//!
//! - [`VirtualTable`]: a fixed, in-memory row sequence (computed views).
//! - [`Table`]: a row sequence bound to one backing file, reloaded whenever
//!   the file changes.
//!
//! Both expose the same read surface through [`Queryable`].

mod persistent;
mod virtual_table;

pub use persistent::{Table, TableStore};
pub use virtual_table::VirtualTable;

use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::query::Query;
use crate::schema::{RowId, Schema};
use crate::value::Record;

/// Read access shared by persistent and virtual tables.
pub trait Queryable {
    /// Returns the schema of the rows.
    fn schema(&self) -> &Arc<Schema>;

    /// Returns the current rows. Persistent tables refresh first if their
    /// backing file changed.
    fn snapshot(&self) -> StoreResult<Arc<Vec<Record>>>;

    /// Runs a query over the current rows.
    fn read(&self, query: &Query) -> StoreResult<Vec<Record>> {
        let rows = self.snapshot()?;
        query.apply(self.schema(), &rows)
    }

    /// Returns every row in position order.
    fn read_all(&self) -> StoreResult<Vec<Record>> {
        Ok(self.snapshot()?.as_ref().clone())
    }

    /// Returns the row at position `id`.
    fn read_one(&self, id: RowId) -> StoreResult<Record> {
        let rows = self.snapshot()?;
        rows.get(id).cloned().ok_or_else(|| StoreError::MissingRow {
            schema: self.schema().name().to_string(),
            id,
            len: rows.len(),
        })
    }

    /// Returns the position of the first row structurally equal to `item`.
    fn position(&self, item: &Record) -> StoreResult<Option<RowId>> {
        Ok(self.snapshot()?.iter().position(|row| row == item))
    }

    /// Returns the number of rows.
    fn len(&self) -> StoreResult<usize> {
        Ok(self.snapshot()?.len())
    }

    /// Returns true if there are no rows.
    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.len()? == 0)
    }
}
