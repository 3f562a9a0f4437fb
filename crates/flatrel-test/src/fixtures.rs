//! Shared fixtures for scenario tests.

use std::path::PathBuf;
use std::sync::Arc;

use flatrel_store::{Catalog, Field, Record, Schema, StoreConfig, Value};
use tempfile::TempDir;

/// A catalog over a scratch directory removed on drop.
pub struct Scratch {
    dir: TempDir,
    catalog: Catalog,
}

impl Scratch {
    /// Creates an empty scratch store.
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let catalog = Catalog::open(StoreConfig::with_data_dir(dir.path()))
            .expect("Failed to open catalog");
        Self { dir, catalog }
    }

    /// Returns the catalog.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Opens a second, independent catalog over the same directory.
    pub fn reopen(&self) -> Catalog {
        Catalog::open(StoreConfig::with_data_dir(self.dir.path())).expect("Failed to reopen catalog")
    }

    /// Backing file of the schema called `schema`.
    pub fn file(&self, schema: &str) -> PathBuf {
        self.dir
            .path()
            .join(format!("{}.csv", schema.to_lowercase()))
    }

    /// Replaces the backing file of `schema` behind the catalog's back.
    pub fn write(&self, schema: &str, content: &str) {
        std::fs::write(self.file(schema), content).expect("Failed to write backing file");
    }

    /// Reads the backing file of `schema`.
    pub fn read(&self, schema: &str) -> String {
        std::fs::read_to_string(self.file(schema)).expect("Failed to read backing file")
    }
}

impl Default for Scratch {
    fn default() -> Self {
        Self::new()
    }
}

/// `Parent(name: text, weight: float)`
pub fn parent_schema() -> Arc<Schema> {
    Schema::new("Parent", vec![Field::text("name"), Field::float("weight")])
        .expect("valid schema")
}

/// `Child(parent: Parent, age: integer)`
pub fn child_schema() -> Arc<Schema> {
    Schema::new(
        "Child",
        vec![
            Field::reference("parent", &parent_schema()),
            Field::integer("age"),
        ],
    )
    .expect("valid schema")
}

/// `Item(label: text, n: integer)`
pub fn item_schema() -> Arc<Schema> {
    Schema::new("Item", vec![Field::text("label"), Field::integer("n")]).expect("valid schema")
}

/// A `Parent` record.
pub fn parent(name: &str, weight: f64) -> Record {
    Record::new(&parent_schema(), vec![name.into(), weight.into()]).expect("valid record")
}

/// A `Child` record.
pub fn child(parent: &Record, age: i64) -> Record {
    Record::new(&child_schema(), vec![parent.clone().into(), age.into()]).expect("valid record")
}

/// An `Item` record.
pub fn item(label: &str, n: i64) -> Record {
    Record::new(&item_schema(), vec![label.into(), n.into()]).expect("valid record")
}

/// Integer column `field` of each record.
pub fn ints(records: &[Record], field: &str) -> Vec<i64> {
    records
        .iter()
        .map(|r| match r.get(field) {
            Ok(Value::Integer(i)) => *i,
            other => panic!("{} is not an integer: {:?}", field, other),
        })
        .collect()
}
