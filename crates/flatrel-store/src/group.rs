//! Grouping with per-group aggregates.
//!
//! Grouping partitions rows by the value of one key field and emits one row
//! per distinct key, in order of first occurrence. Each requested aggregate
//! adds a column computed over the group's rows.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{StoreError, StoreResult};
use crate::schema::{Field, FieldType, Schema};
use crate::table::VirtualTable;
use crate::value::{Record, Value};

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFn {
    /// Smallest value in the group.
    Min,
    /// Largest value in the group.
    Max,
    /// Sum of a numeric field over the group.
    Sum,
}

impl AggregateFn {
    fn name(self) -> &'static str {
        match self {
            AggregateFn::Min => "min",
            AggregateFn::Max => "max",
            AggregateFn::Sum => "sum",
        }
    }
}

/// An aggregate function applied to one source field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Aggregate {
    func: AggregateFn,
    field: String,
}

impl Aggregate {
    /// Creates an aggregate.
    pub fn new(func: AggregateFn, field: impl Into<String>) -> Self {
        Self {
            func,
            field: field.into(),
        }
    }

    /// `min(field)`.
    pub fn min(field: impl Into<String>) -> Self {
        Self::new(AggregateFn::Min, field)
    }

    /// `max(field)`.
    pub fn max(field: impl Into<String>) -> Self {
        Self::new(AggregateFn::Max, field)
    }

    /// `sum(field)`.
    pub fn sum(field: impl Into<String>) -> Self {
        Self::new(AggregateFn::Sum, field)
    }

    /// Parses the `func(field)` form, e.g. `max(end)`.
    pub fn parse(input: &str) -> StoreResult<Self> {
        let invalid = || StoreError::InvalidAggregate(input.to_string());
        let expr = input.trim();
        let (func, rest) = expr.split_once('(').ok_or_else(invalid)?;
        let field = rest.strip_suffix(')').ok_or_else(invalid)?.trim();
        if field.is_empty() {
            return Err(invalid());
        }
        let func = match func.trim() {
            "min" => AggregateFn::Min,
            "max" => AggregateFn::Max,
            "sum" => AggregateFn::Sum,
            _ => return Err(invalid()),
        };
        Ok(Self::new(func, field))
    }

    /// Returns the function.
    pub fn func(&self) -> AggregateFn {
        self.func
    }

    /// Returns the source field.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Declared type of the output column for a source field of type `ty`.
    fn output_type(&self, ty: &FieldType) -> StoreResult<FieldType> {
        match self.func {
            AggregateFn::Min | AggregateFn::Max => Ok(ty.clone()),
            AggregateFn::Sum if ty.is_numeric() => Ok(ty.clone()),
            AggregateFn::Sum => Err(StoreError::InvalidAggregate(format!(
                "{} over {} field {}",
                self, ty, self.field
            ))),
        }
    }

    fn compute<'r>(&self, index: usize, rows: impl Iterator<Item = &'r Record>) -> Value {
        let values = rows.map(|row| &row.values()[index]);
        match self.func {
            AggregateFn::Min => values.min().cloned().unwrap_or(Value::Integer(0)),
            AggregateFn::Max => values.max().cloned().unwrap_or(Value::Integer(0)),
            AggregateFn::Sum => {
                let mut int_sum: i64 = 0;
                let mut float_sum: f64 = 0.0;
                let mut is_float = false;
                for value in values {
                    match value {
                        Value::Integer(i) => int_sum = int_sum.saturating_add(*i),
                        Value::Float(f) => {
                            is_float = true;
                            float_sum += f;
                        }
                        _ => {}
                    }
                }
                if is_float {
                    Value::Float(float_sum + int_sum as f64)
                } else {
                    Value::Integer(int_sum)
                }
            }
        }
    }
}

impl FromStr for Aggregate {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.func.name(), self.field)
    }
}

/// Groups `rows` of `schema` by the field `key`.
///
/// The result has schema `<Schema>Group` with the key field first and then
/// one field per `(name, aggregate)` pair. With no aggregates this yields the
/// distinct key values in order of first occurrence.
pub fn group_rows(
    schema: &Arc<Schema>,
    rows: &[Record],
    key: &str,
    aggregates: &[(&str, Aggregate)],
) -> StoreResult<VirtualTable> {
    let key_index = schema.require(key)?;

    let mut fields = vec![schema.fields()[key_index].clone()];
    let mut sources = Vec::with_capacity(aggregates.len());
    for (name, aggregate) in aggregates {
        let index = schema.require(aggregate.field())?;
        let ty = aggregate.output_type(schema.fields()[index].ty())?;
        fields.push(Field::new(*name, ty));
        sources.push(index);
    }
    let group_schema = Schema::new(format!("{}Group", schema.name()), fields)?;

    let mut order: Vec<Value> = Vec::new();
    let mut members: HashMap<Value, Vec<usize>> = HashMap::new();
    for (position, row) in rows.iter().enumerate() {
        let value = &row.values()[key_index];
        match members.get_mut(value) {
            Some(list) => list.push(position),
            None => {
                order.push(value.clone());
                members.insert(value.clone(), vec![position]);
            }
        }
    }

    let mut out = Vec::with_capacity(order.len());
    for key_value in order {
        let positions = members.get(&key_value).map(Vec::as_slice).unwrap_or(&[]);
        let mut values = Vec::with_capacity(1 + aggregates.len());
        values.push(key_value.clone());
        for ((_, aggregate), &index) in aggregates.iter().zip(&sources) {
            values.push(aggregate.compute(index, positions.iter().map(|&p| &rows[p])));
        }
        out.push(Record::from_parts(Arc::clone(&group_schema), values));
    }

    Ok(VirtualTable::new(group_schema, out))
}
