//! Runtime values and materialized records.
//!
//! A [`Record`] is a schema instance whose reference fields are already
//! resolved into nested records. Equality is structural all the way down: two
//! records are equal when they share a schema name and every field is equal,
//! nested references included, regardless of the row ids they were stored
//! under.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::schema::{FieldType, Schema};

/// A field value.
#[derive(Debug, Clone)]
pub enum Value {
    /// Text value.
    Text(String),
    /// Integer value.
    Integer(i64),
    /// Floating point value.
    Float(f64),
    /// Materialized foreign record.
    Record(Arc<Record>),
}

impl Value {
    /// Creates a text value.
    pub fn text(v: impl Into<String>) -> Self {
        Value::Text(v.into())
    }

    /// Returns the value as f64 for numeric kinds.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Returns the nested record, if any.
    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Record(r) => Some(r),
            _ => None,
        }
    }

    /// Returns true if this value may be stored in a field of type `ty`.
    pub fn matches(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (Value::Text(_), FieldType::Text) => true,
            (Value::Integer(_), FieldType::Integer) => true,
            (Value::Float(_) | Value::Integer(_), FieldType::Float) => true,
            (Value::Record(r), FieldType::Ref(target)) => r.schema().name() == target.name(),
            _ => false,
        }
    }

    /// Returns true if the value's own type is exactly `ty`.
    ///
    /// Unlike [`Value::matches`] an integer is not of type float.
    pub fn is_of_type(&self, ty: &FieldType) -> bool {
        match (self, ty) {
            (Value::Text(_), FieldType::Text)
            | (Value::Integer(_), FieldType::Integer)
            | (Value::Float(_), FieldType::Float) => true,
            (Value::Record(r), FieldType::Ref(target)) => r.schema().name() == target.name(),
            _ => false,
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Integer(_) | Value::Float(_) => 0,
            Value::Text(_) => 1,
            Value::Record(_) => 2,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(Arc::new(v))
    }
}

impl From<Arc<Record>> for Value {
    fn from(v: Arc<Record>) -> Self {
        Value::Record(v)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (a, b) => match (a.to_f64(), b.to_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a.cmp(b),
            (Value::Text(a), Value::Text(b)) => a.cmp(b),
            (Value::Record(a), Value::Record(b)) => a.values().cmp(b.values()),
            (a, b) => match (a.to_f64(), b.to_f64()) {
                (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or_else(|| a.total_cmp(&b)),
                _ => a.kind_rank().cmp(&b.kind_rank()),
            },
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind_rank().hash(state);
        match self {
            // integers and floats that compare equal must hash equal
            Value::Integer(i) => hash_f64(*i as f64, state),
            Value::Float(f) => hash_f64(*f, state),
            Value::Text(s) => s.hash(state),
            Value::Record(r) => r.hash(state),
        }
    }
}

fn hash_f64<H: Hasher>(v: f64, state: &mut H) {
    let v = if v == 0.0 { 0.0 } else { v };
    v.to_bits().hash(state);
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Integer(i) => write!(f, "{}", i),
            Value::Float(v) => write!(f, "{}", v),
            Value::Record(r) => write!(f, "{}", r),
        }
    }
}

/// A materialized instance of a schema.
#[derive(Debug, Clone)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    /// Creates a record, checking arity and field kinds.
    ///
    /// Integer values given for float fields are widened.
    pub fn new(schema: &Arc<Schema>, values: Vec<Value>) -> StoreResult<Self> {
        if values.len() != schema.len() {
            return Err(StoreError::SchemaMismatch {
                expected: format!("{} with {} fields", schema.name(), schema.len()),
                actual: format!("{} values", values.len()),
            });
        }
        let mut checked = Vec::with_capacity(values.len());
        for (field, value) in schema.fields().iter().zip(values) {
            if !value.matches(field.ty()) {
                return Err(StoreError::TypeMismatch {
                    field: field.name().to_string(),
                    expected: field.ty().kind(),
                });
            }
            let value = match (field.ty(), value) {
                (FieldType::Float, Value::Integer(i)) => Value::Float(i as f64),
                // NaN never equals itself, so such a row could not be found again
                (_, Value::Float(f)) if !f.is_finite() => {
                    return Err(StoreError::TypeMismatch {
                        field: field.name().to_string(),
                        expected: "finite float".to_string(),
                    })
                }
                (_, value) => value,
            };
            checked.push(value);
        }
        Ok(Self {
            schema: Arc::clone(schema),
            values: checked,
        })
    }

    /// Creates a record without validation. Callers guarantee the shape.
    pub(crate) fn from_parts(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        Self { schema, values }
    }

    /// Returns the record's schema.
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the values in field order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of a field.
    pub fn get(&self, field: &str) -> StoreResult<&Value> {
        let index = self.schema.require(field)?;
        Ok(&self.values[index])
    }

    /// Returns a text field.
    pub fn text(&self, field: &str) -> StoreResult<&str> {
        match self.get(field)? {
            Value::Text(s) => Ok(s),
            _ => Err(type_mismatch(field, "text")),
        }
    }

    /// Returns an integer field.
    pub fn integer(&self, field: &str) -> StoreResult<i64> {
        match self.get(field)? {
            Value::Integer(i) => Ok(*i),
            _ => Err(type_mismatch(field, "integer")),
        }
    }

    /// Returns a numeric field as f64.
    pub fn float(&self, field: &str) -> StoreResult<f64> {
        self.get(field)?
            .to_f64()
            .ok_or_else(|| type_mismatch(field, "float"))
    }

    /// Returns a reference field's materialized record.
    pub fn record(&self, field: &str) -> StoreResult<&Record> {
        self.get(field)?
            .as_record()
            .ok_or_else(|| type_mismatch(field, "record"))
    }
}

fn type_mismatch(field: &str, expected: &str) -> StoreError {
    StoreError::TypeMismatch {
        field: field.to_string(),
        expected: expected.to_string(),
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.schema.name() == other.schema.name() && self.values == other.values
    }
}

impl Eq for Record {}

impl Hash for Record {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.schema.name().hash(state);
        self.values.hash(state);
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.schema.name())?;
        for (i, (field, value)) in self.schema.fields().iter().zip(&self.values).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", field.name(), value)?;
        }
        write!(f, ")")
    }
}
