//! Cascading delete.
//!
//! Row ids are positions, so removing rows from one table silently repoints
//! every reference into it. The orchestrator here keeps references intact
//! across a batch of tables:
//!
//! 1. Walk the dependents of the seed items (rows in scope tables whose
//!    reference columns hold a to-be-deleted record), transitively, and
//!    collect one delete set per schema.
//! 2. For every schema with a non-empty set, remove those rows and renumber
//!    every scope column that references the schema, using that schema's
//!    own delete set only.
//!
//! All discovery happens before the first write. The operation is not
//! transactional: an I/O failure half-way leaves earlier files rewritten.
//!
//! The orchestrator only sees tables through [`CascadeTarget`].

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::schema::{RowId, Schema};
use crate::value::Record;

/// Per-table capabilities needed by [`cascade_delete`].
pub trait CascadeTarget {
    /// Schema of the rows held by this target.
    fn table_schema(&self) -> &Arc<Schema>;

    /// Rows holding `target` in any column whose type is the schema of
    /// `target`, with their positions.
    fn find_referencing_rows(&self, target: &Record) -> StoreResult<Vec<(RowId, Record)>>;

    /// Position of the first row equal to `item`.
    fn resolve_id(&self, item: &Record) -> StoreResult<RowId>;

    /// Removes the rows at `ids`. Returns how many were removed.
    fn delete_rows(&self, ids: &BTreeSet<RowId>) -> StoreResult<usize>;

    /// Renumbers the columns referencing `target` after its rows `deleted`
    /// were removed.
    fn shift_references(&self, target: &Schema, deleted: &BTreeSet<RowId>) -> StoreResult<()>;
}

/// Row ids removed by a delete, per schema name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeleteSummary {
    deleted: BTreeMap<String, BTreeSet<RowId>>,
}

impl DeleteSummary {
    pub(crate) fn new(deleted: BTreeMap<String, BTreeSet<RowId>>) -> Self {
        Self { deleted }
    }

    /// Original positions removed from the table of `schema`.
    pub fn ids(&self, schema: &str) -> Option<&BTreeSet<RowId>> {
        self.deleted.get(schema)
    }

    /// Number of rows removed from the table of `schema`.
    pub fn count(&self, schema: &str) -> usize {
        self.ids(schema).map_or(0, BTreeSet::len)
    }

    /// Total number of rows removed.
    pub fn total(&self) -> usize {
        self.deleted.values().map(BTreeSet::len).sum()
    }

    /// Returns true if nothing was removed.
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Iterates `(schema name, ids)` in schema name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<RowId>)> {
        self.deleted.iter().map(|(name, ids)| (name.as_str(), ids))
    }
}

/// Deletes `seeds` and everything in `scope` that transitively references
/// them, renumbering the surviving references in `scope`.
///
/// Every seed's own table must be part of `scope`. A seed with no equal row
/// fails with [`StoreError::NotFound`] before anything is written. Tables
/// outside `scope` are not inspected; their references into deleted tables
/// are left as they are.
pub fn cascade_delete(seeds: &[Record], scope: &[&dyn CascadeTarget]) -> StoreResult<DeleteSummary> {
    let mut pending: Vec<(Record, Option<RowId>)> =
        seeds.iter().rev().map(|seed| (seed.clone(), None)).collect();
    let mut queued: HashSet<(String, RowId)> = HashSet::new();
    let mut delete_sets: BTreeMap<String, BTreeSet<RowId>> = BTreeMap::new();

    while let Some((item, found_at)) = pending.pop() {
        for table in scope {
            for (id, row) in table.find_referencing_rows(&item)? {
                if queued.insert((table.table_schema().name().to_string(), id)) {
                    pending.push((row, Some(id)));
                }
            }
        }

        let name = item.schema().name();
        let id = match found_at {
            Some(id) => id,
            None => owner(scope, name)?.resolve_id(&item)?,
        };
        queued.insert((name.to_string(), id));
        delete_sets.entry(name.to_string()).or_default().insert(id);
    }

    for (name, ids) in &delete_sets {
        let target = owner(scope, name)?;
        target.delete_rows(ids)?;
        for table in scope {
            table.shift_references(target.table_schema(), ids)?;
        }
    }

    let summary = DeleteSummary::new(delete_sets);
    tracing::info!(
        "Cascade delete removed {} rows across {} tables",
        summary.total(),
        summary.deleted.len()
    );
    Ok(summary)
}

fn owner<'a>(scope: &[&'a dyn CascadeTarget], name: &str) -> StoreResult<&'a dyn CascadeTarget> {
    scope
        .iter()
        .copied()
        .find(|t| t.table_schema().name() == name)
        .ok_or_else(|| StoreError::NotFound {
            schema: name.to_string(),
        })
}
