//! File-backed tables.
//!
//! A [`TableStore`] owns one backing file and a cached materialization of
//! its rows. The cache is keyed on the file's modification stamp: any read
//! first compares the current stamp with the one seen at the last load and
//! reloads on mismatch, so edits made by other processes are picked up.
//! Writes made through the store drop the cache outright.
//!
//! Writes come in two flavors:
//! - appends, which add one encoded line at the end of the file
//! - rewrites, which replace the file atomically (temp file, then rename)
//!   and operate on raw lines without materializing any record

use std::collections::BTreeSet;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::cascade::CascadeTarget;
use crate::catalog::Catalog;
use crate::codec::{decode_records, encode_record, encode_records, RawRecord};
use crate::error::{StoreError, StoreResult};
use crate::group::{group_rows, Aggregate};
use crate::query::any_positions;
use crate::resolver::{encode_fields, FieldResolver, ReferenceLookup};
use crate::schema::{FieldType, RowId, Schema};
use crate::value::{Record, Value};

use super::{Queryable, VirtualTable};

/// Referenced snapshots a load resolved against, one per target schema.
type TargetSnapshots = Vec<(Arc<Schema>, Arc<Vec<Record>>)>;

/// Identity of a backing file's content as seen by the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FileStamp {
    modified: SystemTime,
    len: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    rows: Option<Arc<Vec<Record>>>,
    /// Stamp observed right before the cached rows were read.
    /// `None` together with cached rows means the file did not exist.
    stamp: Option<FileStamp>,
    /// Snapshots of referenced tables the cached rows were resolved from.
    targets: TargetSnapshots,
}

/// Backing file plus cached rows for one schema.
#[derive(Debug)]
pub struct TableStore {
    schema: Arc<Schema>,
    path: PathBuf,
    delimiter: char,
    state: Mutex<CacheState>,
}

impl TableStore {
    /// Creates a store for `schema` backed by `path`. Nothing is read yet.
    pub fn new(schema: Arc<Schema>, path: PathBuf, delimiter: char) -> Self {
        Self {
            schema,
            path,
            delimiter,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Returns the schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the current rows, reloading if the backing file changed.
    pub fn snapshot<L: ReferenceLookup + ?Sized>(&self, lookup: &L) -> StoreResult<Arc<Vec<Record>>> {
        let mut state = self.state.lock();
        let stamp = self.stamp()?;
        if let Some(rows) = &state.rows {
            if state.stamp == stamp && targets_current(&state.targets, lookup)? {
                return Ok(Arc::clone(rows));
            }
        }

        let (rows, targets) = self.load(lookup)?;
        let rows = Arc::new(rows);
        tracing::debug!(
            "Loaded {} rows of {} from {}",
            rows.len(),
            self.schema.name(),
            self.path.display()
        );
        state.rows = Some(Arc::clone(&rows));
        state.stamp = stamp;
        state.targets = targets;
        Ok(rows)
    }

    /// Drops the cached rows so the next read reloads.
    pub fn invalidate(&self) {
        self.state.lock().rows = None;
    }

    fn load<L: ReferenceLookup + ?Sized>(&self, lookup: &L) -> StoreResult<(Vec<Record>, TargetSnapshots)> {
        let raw = self.raw_records()?;
        let mut resolver = FieldResolver::new(&self.schema, lookup);
        let rows = raw
            .iter()
            .map(|r| resolver.resolve(r))
            .collect::<StoreResult<Vec<_>>>()?;
        Ok((rows, resolver.into_targets()))
    }

    fn stamp(&self) -> StoreResult<Option<FileStamp>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(FileStamp {
                modified: meta.modified().map_err(|e| StoreError::io(&self.path, e))?,
                len: meta.len(),
            })),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io(&self.path, e)),
        }
    }

    /// Reads and decodes the backing file without resolving any field.
    /// A missing file reads as empty.
    pub fn raw_records(&self) -> StoreResult<Vec<RawRecord>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.path, e)),
        };
        decode_records(&content, self.delimiter, self.schema.name())
    }

    /// Appends one encoded record.
    pub fn append(&self, fields: &[String]) -> StoreResult<()> {
        let mut state = self.state.lock();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| StoreError::io(&self.path, e))?;
        file.write_all(encode_record(fields, self.delimiter).as_bytes())
            .map_err(|e| StoreError::io(&self.path, e))?;
        state.rows = None;
        tracing::debug!("Appended row to {}", self.path.display());
        Ok(())
    }

    /// Removes the rows at `ids` from the backing file.
    ///
    /// Ids beyond the end of the file are ignored. Remaining rows keep their
    /// relative order.
    pub fn delete_rows_raw(&self, ids: &BTreeSet<RowId>) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let mut state = self.state.lock();
        let raw = self.raw_records()?;
        let before = raw.len();
        let kept: Vec<Vec<String>> = raw
            .into_iter()
            .enumerate()
            .filter(|(id, _)| !ids.contains(id))
            .map(|(_, r)| r.fields)
            .collect();
        let removed = before - kept.len();
        self.rewrite(&kept)?;
        state.rows = None;
        tracing::debug!(
            "Deleted {} rows from {}",
            removed,
            self.path.display()
        );
        Ok(removed)
    }

    /// Renumbers the reference columns at `columns` after the rows `deleted`
    /// were removed from the referenced table.
    ///
    /// Each stored id `v` becomes `v - |{d in deleted : d < v}|`. Only raw
    /// lines are touched; nothing is materialized.
    pub fn shift_columns_raw(&self, columns: &[usize], deleted: &BTreeSet<RowId>) -> StoreResult<()> {
        if columns.is_empty() || deleted.is_empty() {
            return Ok(());
        }
        let mut state = self.state.lock();
        let mut raw = self.raw_records()?;
        if raw.is_empty() {
            return Ok(());
        }
        for record in &mut raw {
            if record.fields.len() != self.schema.len() {
                return Err(StoreError::MalformedRow {
                    schema: self.schema.name().to_string(),
                    line: record.line,
                    reason: format!(
                        "expected {} fields, found {}",
                        self.schema.len(),
                        record.fields.len()
                    ),
                });
            }
            for &column in columns {
                let text = &record.fields[column];
                let id: RowId = text.trim().parse().map_err(|_| StoreError::MalformedRow {
                    schema: self.schema.name().to_string(),
                    line: record.line,
                    reason: format!("{:?} is not a row id", text),
                })?;
                record.fields[column] = shifted(id, deleted).to_string();
            }
        }
        let lines: Vec<Vec<String>> = raw.into_iter().map(|r| r.fields).collect();
        self.rewrite(&lines)?;
        state.rows = None;
        tracing::debug!(
            "Shifted {} reference columns in {}",
            columns.len(),
            self.path.display()
        );
        Ok(())
    }

    /// Replaces the backing file with `records`.
    fn rewrite(&self, records: &[Vec<String>]) -> StoreResult<()> {
        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.write_all(encode_records(records, self.delimiter).as_bytes())
            .map_err(|e| StoreError::io(&tmp_path, e))?;
        file.sync_all().map_err(|e| StoreError::io(&tmp_path, e))?;
        drop(file);

        fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::io(&self.path, e))?;
        Ok(())
    }
}

/// Returns true if every referenced table still serves the snapshot the
/// cached rows were resolved from.
fn targets_current<L: ReferenceLookup + ?Sized>(
    targets: &[(Arc<Schema>, Arc<Vec<Record>>)],
    lookup: &L,
) -> StoreResult<bool> {
    for (schema, seen) in targets {
        if !Arc::ptr_eq(seen, &lookup.rows_of(schema)?) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// New position of row `id` once the rows in `deleted` are gone.
fn shifted(id: RowId, deleted: &BTreeSet<RowId>) -> RowId {
    id - deleted.range(..id).count()
}

/// A persistent table bound to a [`Catalog`].
///
/// Handles are cheap; the catalog keeps one [`TableStore`] per schema and
/// every handle for that schema shares it.
#[derive(Clone)]
pub struct Table<'c> {
    catalog: &'c Catalog,
    store: Arc<TableStore>,
}

impl<'c> Table<'c> {
    pub(crate) fn new(catalog: &'c Catalog, store: Arc<TableStore>) -> Self {
        Self { catalog, store }
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        self.store.path()
    }

    /// Returns the catalog this table belongs to.
    pub fn catalog(&self) -> &'c Catalog {
        self.catalog
    }

    /// Forces a reload on the next read.
    pub fn refresh(&self) {
        self.store.invalidate();
    }

    /// Returns the row id of the first row equal to `item`.
    ///
    /// When absent and `allow_create` is set the record is created first
    /// (nested references included) and its new id returned; otherwise the
    /// lookup fails with [`StoreError::NotFound`].
    pub fn get_id(&self, item: &Record, allow_create: bool) -> StoreResult<RowId> {
        self.check_schema(item)?;
        if let Some(id) = self.position(item)? {
            return Ok(id);
        }
        if !allow_create {
            return Err(StoreError::NotFound {
                schema: self.schema().name().to_string(),
            });
        }
        self.create(item, true)?;
        self.refresh();
        self.position(item)?.ok_or_else(|| StoreError::NotFound {
            schema: self.schema().name().to_string(),
        })
    }

    /// Appends `item` as a new row.
    ///
    /// Nested records are stored as the row id of their first equal row.
    /// With `recurse` set, nested records not stored yet are created first;
    /// without it they must already exist. Duplicates are not checked.
    pub fn create(&self, item: &Record, recurse: bool) -> StoreResult<()> {
        self.check_schema(item)?;
        let fields = encode_fields(item, self.catalog, recurse)?;
        self.store.append(&fields)
    }

    /// Names of the fields whose declared type is exactly `ty`.
    pub fn fields_of_type(&self, ty: &FieldType) -> Vec<String> {
        self.schema()
            .fields_of_type(ty)
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Removes rows by position from the backing file, without touching any
    /// table that references them.
    pub fn delete_rows_raw(&self, ids: &BTreeSet<RowId>) -> StoreResult<usize> {
        self.store.delete_rows_raw(ids)
    }

    /// Renumbers one reference column after rows of its target table were
    /// deleted.
    pub fn shift_reference(&self, field: &str, deleted: &BTreeSet<RowId>) -> StoreResult<()> {
        let index = self.schema().require(field)?;
        if self.schema().fields()[index].ty().target().is_none() {
            return Err(StoreError::TypeMismatch {
                field: field.to_string(),
                expected: "reference".to_string(),
            });
        }
        self.store.shift_columns_raw(&[index], deleted)
    }

    /// Renumbers every column referencing `target` after its rows `deleted`
    /// were removed. A table without such columns is left untouched.
    pub fn shift_references_to(&self, target: &Schema, deleted: &BTreeSet<RowId>) -> StoreResult<()> {
        let columns: Vec<usize> = self
            .schema()
            .fields()
            .iter()
            .enumerate()
            .filter(|(_, f)| f.ty().target().is_some_and(|s| s.name() == target.name()))
            .map(|(i, _)| i)
            .collect();
        self.store.shift_columns_raw(&columns, deleted)
    }

    /// Groups rows by `key` and computes one column per named aggregate.
    ///
    /// See [`group_rows`] for the shape of the result.
    pub fn group_by(&self, key: &str, aggregates: &[(&str, Aggregate)]) -> StoreResult<VirtualTable> {
        let rows = self.snapshot()?;
        group_rows(self.schema(), &rows, key, aggregates)
    }

    fn check_schema(&self, item: &Record) -> StoreResult<()> {
        if item.schema().as_ref() != self.schema().as_ref() {
            return Err(StoreError::SchemaMismatch {
                expected: self.schema().to_string(),
                actual: item.schema().to_string(),
            });
        }
        Ok(())
    }
}

impl Queryable for Table<'_> {
    fn schema(&self) -> &Arc<Schema> {
        self.store.schema()
    }

    fn snapshot(&self) -> StoreResult<Arc<Vec<Record>>> {
        self.store.snapshot(self.catalog)
    }
}

impl CascadeTarget for Table<'_> {
    fn table_schema(&self) -> &Arc<Schema> {
        self.schema()
    }

    fn find_referencing_rows(&self, target: &Record) -> StoreResult<Vec<(RowId, Record)>> {
        let rows = self.snapshot()?;
        let value = Value::from(target.clone());
        Ok(any_positions(self.schema(), &rows, &value)
            .into_iter()
            .map(|id| (id, rows[id].clone()))
            .collect())
    }

    fn resolve_id(&self, item: &Record) -> StoreResult<RowId> {
        self.get_id(item, false)
    }

    fn delete_rows(&self, ids: &BTreeSet<RowId>) -> StoreResult<usize> {
        self.delete_rows_raw(ids)
    }

    fn shift_references(&self, target: &Schema, deleted: &BTreeSet<RowId>) -> StoreResult<()> {
        self.shift_references_to(target, deleted)
    }
}

impl std::fmt::Debug for Table<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Table")
            .field("schema", &self.schema().name())
            .field("path", &self.path())
            .finish()
    }
}
