//! Table registry.
//!
//! A [`Catalog`] owns one data directory and hands out [`Table`] handles,
//! one backing store per schema name for the catalog's lifetime. It is also
//! what nested references resolve through: loading a table that references
//! another schema reads that schema's table from the same catalog.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::cascade::{cascade_delete, CascadeTarget, DeleteSummary};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::resolver::ReferenceLookup;
use crate::schema::{RowId, Schema};
use crate::table::{Queryable, Table, TableStore};
use crate::value::Record;

/// Acknowledgment that a delete may leave dangling references.
///
/// Required by [`Catalog::delete_unchecked`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakReferences;

/// Registry of the tables stored in one directory.
#[derive(Debug)]
pub struct Catalog {
    config: StoreConfig,
    tables: RwLock<HashMap<String, Arc<TableStore>>>,
}

impl Catalog {
    /// Opens the catalog described by `config`, creating its directory if
    /// needed.
    pub fn open(config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir).map_err(|e| StoreError::io(&config.data_dir, e))?;
        tracing::debug!("Opened catalog at {}", config.data_dir.display());
        Ok(Self {
            config,
            tables: RwLock::new(HashMap::new()),
        })
    }

    /// Returns the configuration.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Returns the table for `schema`, registering it on first use.
    ///
    /// A schema name maps to one shape for the catalog's lifetime: asking
    /// for a differently shaped schema under a known name fails with
    /// [`StoreError::SchemaMismatch`].
    pub fn get(&self, schema: &Arc<Schema>) -> StoreResult<Table<'_>> {
        if let Some(store) = self.tables.read().get(schema.name()) {
            return self.checked(store, schema);
        }

        check_acyclic(schema)?;
        let mut tables = self.tables.write();
        // another caller may have registered it in between
        if let Some(store) = tables.get(schema.name()) {
            return self.checked(store, schema);
        }
        let path = self.config.table_path(schema.name());
        tracing::debug!("Registered {} at {}", schema.name(), path.display());
        let store = Arc::new(TableStore::new(
            Arc::clone(schema),
            path,
            self.config.delimiter,
        ));
        tables.insert(schema.name().to_string(), Arc::clone(&store));
        Ok(Table::new(self, store))
    }

    fn checked(&self, store: &Arc<TableStore>, schema: &Arc<Schema>) -> StoreResult<Table<'_>> {
        if store.schema().as_ref() != schema.as_ref() {
            return Err(StoreError::SchemaMismatch {
                expected: store.schema().to_string(),
                actual: schema.to_string(),
            });
        }
        Ok(Table::new(self, Arc::clone(store)))
    }

    /// Schemas registered so far, sorted by name.
    pub fn schemas(&self) -> Vec<Arc<Schema>> {
        let mut schemas: Vec<Arc<Schema>> = self
            .tables
            .read()
            .values()
            .map(|store| Arc::clone(store.schema()))
            .collect();
        schemas.sort_by(|a, b| a.name().cmp(b.name()));
        schemas
    }

    /// Stores `item`, creating any nested record that is not stored yet.
    pub fn create(&self, item: &Record) -> StoreResult<()> {
        self.get(item.schema())?.create(item, true)
    }

    /// Deletes `items` and, transitively, every row of the `cascade`
    /// schemas that references a deleted row. References held by the
    /// items' schemas and the `cascade` schemas are renumbered.
    pub fn delete(&self, items: &[Record], cascade: &[Arc<Schema>]) -> StoreResult<DeleteSummary> {
        if items.is_empty() {
            return Ok(DeleteSummary::default());
        }

        let mut scope_schemas: Vec<&Arc<Schema>> = Vec::new();
        for schema in items.iter().map(Record::schema).chain(cascade) {
            if !scope_schemas.iter().any(|s| s.name() == schema.name()) {
                scope_schemas.push(schema);
            }
        }
        let tables = scope_schemas
            .into_iter()
            .map(|schema| self.get(schema))
            .collect::<StoreResult<Vec<_>>>()?;
        let scope: Vec<&dyn CascadeTarget> = tables.iter().map(|t| t as &dyn CascadeTarget).collect();

        cascade_delete(items, &scope)
    }

    /// Deletes the rows of `items` only.
    ///
    /// Nothing else is inspected or renumbered, so references into the
    /// affected tables may afterwards point at the wrong row or past the
    /// end of the file.
    pub fn delete_unchecked(&self, items: &[Record], _ack: BreakReferences) -> StoreResult<DeleteSummary> {
        let mut by_schema: BTreeMap<String, (Table<'_>, BTreeSet<RowId>)> = BTreeMap::new();
        for item in items {
            let name = item.schema().name();
            if !by_schema.contains_key(name) {
                let table = self.get(item.schema())?;
                by_schema.insert(name.to_string(), (table, BTreeSet::new()));
            }
            if let Some((table, ids)) = by_schema.get_mut(name) {
                ids.insert(table.get_id(item, false)?);
            }
        }

        let mut deleted = BTreeMap::new();
        for (name, (table, ids)) in by_schema {
            table.delete_rows_raw(&ids)?;
            tracing::warn!(
                "Deleted {} rows of {} without renumbering references",
                ids.len(),
                name
            );
            deleted.insert(name, ids);
        }
        Ok(DeleteSummary::new(deleted))
    }
}

impl ReferenceLookup for Catalog {
    fn rows_of(&self, schema: &Arc<Schema>) -> StoreResult<Arc<Vec<Record>>> {
        self.get(schema)?.snapshot()
    }

    fn id_of(&self, item: &Record, allow_create: bool) -> StoreResult<RowId> {
        self.get(item.schema())?.get_id(item, allow_create)
    }
}

/// Rejects schemas that reach a schema of their own name through references.
///
/// Schemas cannot form cycles by construction, but two distinct schemas may
/// share a name; a table reading itself while loading would never finish.
fn check_acyclic(schema: &Arc<Schema>) -> StoreResult<()> {
    let mut stack: Vec<&Arc<Schema>> = schema
        .fields()
        .iter()
        .filter_map(|f| f.ty().target())
        .collect();
    while let Some(target) = stack.pop() {
        if target.name() == schema.name() {
            return Err(StoreError::InvalidSchema(format!(
                "{} references itself",
                schema.name()
            )));
        }
        stack.extend(target.fields().iter().filter_map(|f| f.ty().target()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Field;
    use tempfile::TempDir;

    fn parent_schema() -> Arc<Schema> {
        Schema::new("Parent", vec![Field::text("name"), Field::float("weight")]).unwrap()
    }

    fn child_schema(parent: &Arc<Schema>) -> Arc<Schema> {
        Schema::new(
            "Child",
            vec![Field::reference("parent", parent), Field::integer("age")],
        )
        .unwrap()
    }

    fn parent(schema: &Arc<Schema>, name: &str, weight: f64) -> Record {
        Record::new(schema, vec![name.into(), weight.into()]).unwrap()
    }

    #[test]
    fn test_open_creates_directory() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("nested").join("store");
        let catalog = Catalog::open(StoreConfig::with_data_dir(&dir)).unwrap();
        assert!(dir.is_dir());
        assert_eq!(catalog.config().data_dir, dir);
    }

    #[test]
    fn test_get_is_memoized() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();
        let schema = parent_schema();

        let a = catalog.get(&schema).unwrap();
        a.create(&parent(&schema, "Joe", 57.4), true).unwrap();
        // a second, structurally equal schema maps to the same table
        let b = catalog.get(&parent_schema()).unwrap();
        assert_eq!(b.len().unwrap(), 1);
        assert_eq!(catalog.schemas().len(), 1);
    }

    #[test]
    fn test_schema_mismatch() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();
        catalog.get(&parent_schema()).unwrap();

        let other = Schema::new("Parent", vec![Field::text("name")]).unwrap();
        assert!(matches!(
            catalog.get(&other),
            Err(StoreError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_self_reference_rejected() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();
        let node = Schema::new("Node", vec![Field::text("label")]).unwrap();
        let impostor = Schema::new("Node", vec![Field::reference("next", &node)]).unwrap();

        assert!(matches!(
            catalog.get(&impostor),
            Err(StoreError::InvalidSchema(_))
        ));
    }

    #[test]
    fn test_cascade_delete() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();
        let parent_s = parent_schema();
        let child_s = child_schema(&parent_s);

        let p1 = parent(&parent_s, "P1", 1.0);
        let p2 = parent(&parent_s, "P2", 2.0);
        catalog.create(&p1).unwrap();
        catalog.create(&p2).unwrap();
        let c1 = Record::new(&child_s, vec![p1.clone().into(), 1.into()]).unwrap();
        let c2 = Record::new(&child_s, vec![p2.clone().into(), 2.into()]).unwrap();
        catalog.create(&c1).unwrap();
        catalog.create(&c2).unwrap();

        let summary = catalog.delete(&[p1], &[Arc::clone(&child_s)]).unwrap();
        assert_eq!(summary.count("Parent"), 1);
        assert_eq!(summary.count("Child"), 1);

        let children = catalog.get(&child_s).unwrap();
        assert_eq!(fs::read_to_string(children.path()).unwrap(), "0,2\n");
        assert_eq!(children.read_all().unwrap(), vec![c2]);
        assert_eq!(catalog.get(&parent_s).unwrap().read_all().unwrap(), vec![p2]);
    }

    #[test]
    fn test_delete_unchecked_leaves_dangling() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();
        let parent_s = parent_schema();
        let child_s = child_schema(&parent_s);

        let p1 = parent(&parent_s, "P1", 1.0);
        let p2 = parent(&parent_s, "P2", 2.0);
        catalog.create(&p1).unwrap();
        catalog.create(&p2).unwrap();
        catalog
            .create(&Record::new(&child_s, vec![p2.into(), 2.into()]).unwrap())
            .unwrap();

        let summary = catalog.delete_unchecked(&[p1], BreakReferences).unwrap();
        assert_eq!(summary.total(), 1);
        assert!(matches!(
            catalog.get(&child_s).unwrap().read_all(),
            Err(StoreError::MissingRow { id: 1, len: 1, .. })
        ));
    }

    #[test]
    fn test_delete_nothing() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();
        assert!(catalog.delete(&[], &[parent_schema()]).unwrap().is_empty());
    }
}
