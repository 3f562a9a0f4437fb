//! Field resolution between raw text fields and materialized values.
//!
//! Each declared field maps to a constructor: primitives parse from text,
//! reference fields parse a row id and look the row up in the referenced
//! table. Lookups go through a [`ReferenceLookup`] so nested tables are read
//! once per load, from one snapshot, instead of once per row.

use std::collections::HashMap;
use std::sync::Arc;

use crate::codec::RawRecord;
use crate::error::{StoreError, StoreResult};
use crate::schema::{FieldType, RowId, Schema};
use crate::value::{Record, Value};

/// Source of materialized rows for referenced schemas.
pub trait ReferenceLookup {
    /// Returns the current rows of the table bound to `schema`.
    fn rows_of(&self, schema: &Arc<Schema>) -> StoreResult<Arc<Vec<Record>>>;

    /// Returns the row id of `item` in its own table, creating it first when
    /// `allow_create` is set.
    fn id_of(&self, item: &Record, allow_create: bool) -> StoreResult<RowId>;
}

/// Turns raw records of one schema into materialized [`Record`]s.
pub struct FieldResolver<'a, L: ReferenceLookup + ?Sized> {
    schema: &'a Arc<Schema>,
    lookup: &'a L,
    targets: HashMap<String, (Arc<Schema>, Arc<Vec<Record>>)>,
}

impl<'a, L: ReferenceLookup + ?Sized> FieldResolver<'a, L> {
    /// Creates a resolver for `schema`.
    pub fn new(schema: &'a Arc<Schema>, lookup: &'a L) -> Self {
        Self {
            schema,
            lookup,
            targets: HashMap::new(),
        }
    }

    /// Materializes one raw record.
    pub fn resolve(&mut self, raw: &RawRecord) -> StoreResult<Record> {
        let schema = self.schema;
        if raw.fields.len() != schema.len() {
            return Err(self.malformed(
                raw,
                format!(
                    "expected {} fields, found {}",
                    schema.len(),
                    raw.fields.len()
                ),
            ));
        }

        let mut values = Vec::with_capacity(raw.fields.len());
        for (field, text) in schema.fields().iter().zip(&raw.fields) {
            let value = match field.ty() {
                FieldType::Text => Value::Text(text.clone()),
                FieldType::Integer => Value::Integer(text.trim().parse().map_err(|_| {
                    self.malformed(raw, format!("{} is not an integer: {:?}", field.name(), text))
                })?),
                FieldType::Float => Value::Float(
                    text.trim()
                        .parse()
                        .ok()
                        .filter(|f: &f64| f.is_finite())
                        .ok_or_else(|| {
                            self.malformed(
                                raw,
                                format!("{} is not a finite float: {:?}", field.name(), text),
                            )
                        })?,
                ),
                FieldType::Ref(target) => {
                    let id: RowId = text.trim().parse().map_err(|_| {
                        self.malformed(raw, format!("{} is not a row id: {:?}", field.name(), text))
                    })?;
                    Value::Record(Arc::new(self.dereference(target, id)?))
                }
            };
            values.push(value);
        }

        Ok(Record::from_parts(Arc::clone(schema), values))
    }

    /// Referenced snapshots read so far, one per target schema.
    pub fn into_targets(self) -> Vec<(Arc<Schema>, Arc<Vec<Record>>)> {
        self.targets.into_values().collect()
    }

    fn dereference(&mut self, target: &Arc<Schema>, id: RowId) -> StoreResult<Record> {
        let rows = match self.targets.get(target.name()) {
            Some((_, rows)) => Arc::clone(rows),
            None => {
                let rows = self.lookup.rows_of(target)?;
                self.targets.insert(
                    target.name().to_string(),
                    (Arc::clone(target), Arc::clone(&rows)),
                );
                rows
            }
        };
        rows.get(id).cloned().ok_or_else(|| StoreError::MissingRow {
            schema: target.name().to_string(),
            id,
            len: rows.len(),
        })
    }

    fn malformed(&self, raw: &RawRecord, reason: String) -> StoreError {
        StoreError::MalformedRow {
            schema: self.schema.name().to_string(),
            line: raw.line,
            reason,
        }
    }
}

/// Converts a record into the text fields written to disk, replacing nested
/// records with their row ids.
pub fn encode_fields<L: ReferenceLookup + ?Sized>(
    record: &Record,
    lookup: &L,
    allow_create: bool,
) -> StoreResult<Vec<String>> {
    let schema = record.schema();
    let mut out = Vec::with_capacity(schema.len());
    for (field, value) in schema.fields().iter().zip(record.values()) {
        let text = match (field.ty(), value) {
            (FieldType::Ref(target), Value::Record(nested)) => {
                if nested.schema().name() != target.name() {
                    return Err(StoreError::SchemaMismatch {
                        expected: target.name().to_string(),
                        actual: nested.schema().name().to_string(),
                    });
                }
                lookup.id_of(nested, allow_create)?.to_string()
            }
            (FieldType::Ref(_), _) => {
                return Err(StoreError::TypeMismatch {
                    field: field.name().to_string(),
                    expected: field.ty().kind(),
                })
            }
            (_, Value::Text(s)) => s.clone(),
            (_, Value::Integer(i)) => i.to_string(),
            (_, Value::Float(f)) => f.to_string(),
            (_, Value::Record(_)) => {
                return Err(StoreError::TypeMismatch {
                    field: field.name().to_string(),
                    expected: field.ty().kind(),
                })
            }
        };
        out.push(text);
    }
    Ok(out)
}
