//! Record shapes.
//!
//! A [`Schema`] is a name plus an ordered list of typed fields. A field is
//! either a primitive or a reference to another schema; references hold the
//! target schema itself, so reference graphs cannot contain cycles.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};

/// Positional row index inside a backing file.
///
/// Never stored on disk; unstable under deletion.
pub type RowId = usize;

/// Declared type of a field.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// UTF-8 text.
    Text,
    /// 64-bit signed integer.
    Integer,
    /// 64-bit floating point.
    Float,
    /// Foreign key into the table of another schema.
    Ref(Arc<Schema>),
}

impl FieldType {
    /// Returns true for numeric primitives.
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Integer | FieldType::Float)
    }

    /// Returns the referenced schema, if this is a reference.
    pub fn target(&self) -> Option<&Arc<Schema>> {
        match self {
            FieldType::Ref(schema) => Some(schema),
            _ => None,
        }
    }

    /// Human-readable kind name.
    pub fn kind(&self) -> String {
        match self {
            FieldType::Text => "text".to_string(),
            FieldType::Integer => "integer".to_string(),
            FieldType::Float => "float".to_string(),
            FieldType::Ref(schema) => format!("ref {}", schema.name()),
        }
    }
}

/// Two field types are equal when they are the same primitive or reference
/// schemas with the same name.
impl PartialEq for FieldType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FieldType::Text, FieldType::Text)
            | (FieldType::Integer, FieldType::Integer)
            | (FieldType::Float, FieldType::Float) => true,
            (FieldType::Ref(a), FieldType::Ref(b)) => a.name() == b.name(),
            _ => false,
        }
    }
}

impl Eq for FieldType {}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind())
    }
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: String,
    ty: FieldType,
}

impl Field {
    /// Creates a field.
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }

    /// Creates a text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// Creates an integer field.
    pub fn integer(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Integer)
    }

    /// Creates a float field.
    pub fn float(name: impl Into<String>) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// Creates a reference field pointing at `target`.
    pub fn reference(name: impl Into<String>, target: &Arc<Schema>) -> Self {
        Self::new(name, FieldType::Ref(Arc::clone(target)))
    }

    /// Returns the field name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared type.
    pub fn ty(&self) -> &FieldType {
        &self.ty
    }
}

/// A declared record shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    name: String,
    fields: Vec<Field>,
}

impl Schema {
    /// Builds a schema, rejecting empty names, empty field lists and
    /// duplicate field names.
    pub fn new(name: impl Into<String>, fields: Vec<Field>) -> StoreResult<Arc<Self>> {
        let name = name.into();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return Err(StoreError::InvalidSchema(format!(
                "schema name {:?} must be a non-empty identifier",
                name
            )));
        }
        // a record without fields encodes as a blank line and never reads back
        if fields.is_empty() {
            return Err(StoreError::InvalidSchema(format!("{} declares no fields", name)));
        }
        let mut seen = HashSet::new();
        for field in &fields {
            if !seen.insert(field.name()) {
                return Err(StoreError::InvalidSchema(format!(
                    "{} declares field {} twice",
                    name,
                    field.name()
                )));
            }
        }
        Ok(Arc::new(Self { name, fields }))
    }

    /// Returns the schema name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema declares no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the position of a field.
    pub fn index_of(&self, field: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == field)
    }

    /// Returns the position of a field or an `UnknownField` error.
    pub fn require(&self, field: &str) -> StoreResult<usize> {
        self.index_of(field).ok_or_else(|| StoreError::UnknownField {
            schema: self.name.clone(),
            field: field.to_string(),
        })
    }

    /// Returns the field at a position.
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Names of the fields whose declared type is exactly `ty`.
    pub fn fields_of_type(&self, ty: &FieldType) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.ty() == ty)
            .map(Field::name)
            .collect()
    }

    /// Names of the fields referencing the schema called `target`.
    pub fn fields_referencing(&self, target: &str) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.ty().target().is_some_and(|s| s.name() == target))
            .map(Field::name)
            .collect()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, field.ty)?;
        }
        write!(f, ")")
    }
}
