//! Typed records.
//!
//! [`Model`] maps a Rust struct to a schema so callers can work with their
//! own types instead of [`Record`]s. Nested models map to reference fields.

use std::sync::Arc;

use crate::catalog::Catalog;
use crate::error::StoreResult;
use crate::query::Query;
use crate::schema::Schema;
use crate::table::{Queryable, Table};
use crate::value::Record;

/// A struct with a declared schema.
pub trait Model: Sized {
    /// Schema of the struct. Must return the same shape on every call.
    fn schema() -> StoreResult<Arc<Schema>>;

    /// Converts the struct into a record of [`Model::schema`].
    fn to_record(&self) -> StoreResult<Record>;

    /// Builds the struct from a record of [`Model::schema`].
    fn from_record(record: &Record) -> StoreResult<Self>;

    /// Returns the table holding this model.
    fn table(catalog: &Catalog) -> StoreResult<Table<'_>> {
        catalog.get(&Self::schema()?)
    }

    /// Runs `query` over `source` and converts the results.
    fn read_from<Q: Queryable + ?Sized>(source: &Q, query: &Query) -> StoreResult<Vec<Self>> {
        source
            .read(query)?
            .iter()
            .map(Self::from_record)
            .collect()
    }

    /// Stores this value, creating nested values that are not stored yet.
    fn create_in(&self, catalog: &Catalog) -> StoreResult<()> {
        catalog.create(&self.to_record()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use crate::schema::Field;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    struct Parent {
        name: String,
        weight: f64,
    }

    impl Model for Parent {
        fn schema() -> StoreResult<Arc<Schema>> {
            Schema::new("Parent", vec![Field::text("name"), Field::float("weight")])
        }

        fn to_record(&self) -> StoreResult<Record> {
            Record::new(
                &Self::schema()?,
                vec![self.name.as_str().into(), self.weight.into()],
            )
        }

        fn from_record(record: &Record) -> StoreResult<Self> {
            Ok(Self {
                name: record.text("name")?.to_string(),
                weight: record.float("weight")?,
            })
        }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Child {
        parent: Parent,
        age: i64,
    }

    impl Model for Child {
        fn schema() -> StoreResult<Arc<Schema>> {
            Schema::new(
                "Child",
                vec![
                    Field::reference("parent", &Parent::schema()?),
                    Field::integer("age"),
                ],
            )
        }

        fn to_record(&self) -> StoreResult<Record> {
            Record::new(
                &Self::schema()?,
                vec![self.parent.to_record()?.into(), self.age.into()],
            )
        }

        fn from_record(record: &Record) -> StoreResult<Self> {
            Ok(Self {
                parent: Parent::from_record(record.record("parent")?)?,
                age: record.integer("age")?,
            })
        }
    }

    #[test]
    fn test_model_roundtrip_through_table() {
        let tmp = TempDir::new().unwrap();
        let catalog = Catalog::open(StoreConfig::with_data_dir(tmp.path())).unwrap();

        let joe = Parent {
            name: "Joe".to_string(),
            weight: 57.4,
        };
        let kid = Child {
            parent: joe.clone(),
            age: 7,
        };
        kid.create_in(&catalog).unwrap();

        let parents = Parent::table(&catalog).unwrap();
        assert_eq!(Parent::read_from(&parents, &Query::new()).unwrap(), vec![joe]);

        let children = Child::table(&catalog).unwrap();
        let read = Child::read_from(&children, &Query::new().filter("age_ge", 5)).unwrap();
        assert_eq!(read, vec![kid]);
    }
}
