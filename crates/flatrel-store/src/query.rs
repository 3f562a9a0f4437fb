//! Query engine: filter, sort and limit over an ordered row sequence.
//!
//! A [`Query`] is an ordered list of predicates. They are applied one after
//! another in the order the caller added them, so `limit` followed by
//! `order` sorts only the truncated prefix while `order` followed by `limit`
//! sorts everything and then truncates.
//!
//! ```
//! use flatrel_store::Query;
//!
//! let recent = Query::new().order([("end", "desc")]).limit(20);
//! let late = Query::new().filter("end_gt", 1_700_000_000.0);
//! # let _ = (recent, late);
//! ```

use std::cmp::Ordering;
use std::fmt;

use crate::error::{StoreError, StoreResult};
use crate::schema::Schema;
use crate::value::{Record, Value};

/// Sort direction of one order key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Ascending.
    Asc,
    /// Descending.
    Desc,
}

impl SortDirection {
    /// `desc` means descending; every other token means ascending.
    pub fn from_token(token: &str) -> Self {
        if token == "desc" {
            SortDirection::Desc
        } else {
            SortDirection::Asc
        }
    }
}

/// Single-field comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// Equal.
    Eq,
    /// Less than.
    Lt,
    /// Greater than.
    Gt,
    /// Less than or equal.
    Le,
    /// Greater than or equal.
    Ge,
    /// Not equal.
    Ne,
}

impl CompareOp {
    /// Parses an operator suffix.
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "eq" => Some(CompareOp::Eq),
            "lt" => Some(CompareOp::Lt),
            "gt" => Some(CompareOp::Gt),
            "le" => Some(CompareOp::Le),
            "ge" => Some(CompareOp::Ge),
            "ne" => Some(CompareOp::Ne),
            _ => None,
        }
    }

    /// Evaluates `left <op> right`.
    pub fn evaluate(self, left: &Value, right: &Value) -> bool {
        match self {
            CompareOp::Eq => left == right,
            CompareOp::Ne => left != right,
            CompareOp::Lt => left.cmp(right) == Ordering::Less,
            CompareOp::Gt => left.cmp(right) == Ordering::Greater,
            CompareOp::Le => left.cmp(right) != Ordering::Greater,
            CompareOp::Ge => left.cmp(right) != Ordering::Less,
        }
    }
}

/// One step of a query.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// Keep the first N rows.
    Limit(usize),
    /// Multi-key stable sort, first key most significant.
    Order(Vec<(String, SortDirection)>),
    /// Keep rows with any field of the value's type equal to the value.
    Any(Value),
    /// Keyed predicate resolved when the query runs (`<field>_<op>`,
    /// `limit`, `order` or `any`).
    Keyed {
        /// Predicate key.
        key: String,
        /// Argument.
        value: Value,
    },
}

/// An ordered list of predicates.
#[derive(Debug, Clone, Default)]
pub struct Query {
    predicates: Vec<Predicate>,
}

impl Query {
    /// Creates an empty query, which returns every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a limit.
    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.predicates.push(Predicate::Limit(n));
        self
    }

    /// Appends a multi-key sort given `(field, direction token)` pairs.
    #[must_use]
    pub fn order<I, F, D>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = (F, D)>,
        F: Into<String>,
        D: AsRef<str>,
    {
        let keys = keys
            .into_iter()
            .map(|(f, d)| (f.into(), SortDirection::from_token(d.as_ref())))
            .collect();
        self.predicates.push(Predicate::Order(keys));
        self
    }

    /// Appends a sort given a flat `field, direction, field, direction, ...`
    /// token list. A trailing field without a direction sorts ascending.
    #[must_use]
    pub fn order_tokens<S: AsRef<str>>(mut self, tokens: &[S]) -> Self {
        self.predicates.push(Predicate::Order(parse_order_tokens(tokens)));
        self
    }

    /// Appends a cross-column match on `value`.
    #[must_use]
    pub fn any(mut self, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Any(value.into()));
        self
    }

    /// Appends a keyed predicate such as `end_gt` or `name_eq`.
    ///
    /// The key is checked when the query runs; unknown forms fail with
    /// [`StoreError::BadFilterKey`].
    #[must_use]
    pub fn filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.predicates.push(Predicate::Keyed {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Returns the predicates in application order.
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Runs the query over `rows`, which all belong to `schema`.
    pub fn apply(&self, schema: &Schema, rows: &[Record]) -> StoreResult<Vec<Record>> {
        let mut result = rows.to_vec();
        for predicate in &self.predicates {
            let step = plan(schema, predicate)?;
            result = step.run(result);
        }
        Ok(result)
    }
}

fn parse_order_tokens<S: AsRef<str>>(tokens: &[S]) -> Vec<(String, SortDirection)> {
    tokens
        .chunks(2)
        .map(|pair| {
            let direction = pair
                .get(1)
                .map_or(SortDirection::Asc, |d| SortDirection::from_token(d.as_ref()));
            (pair[0].as_ref().to_string(), direction)
        })
        .collect()
}

/// A predicate bound to column positions of one schema.
enum Step<'q> {
    Limit(usize),
    Order(Vec<(usize, SortDirection)>),
    Any { columns: Vec<usize>, value: &'q Value },
    Compare { index: usize, op: CompareOp, value: &'q Value },
}

impl Step<'_> {
    fn run(&self, mut rows: Vec<Record>) -> Vec<Record> {
        match self {
            Step::Limit(n) => rows.truncate(*n),
            Step::Order(keys) => {
                // one stable pass per key, least significant first
                for &(index, direction) in keys.iter().rev() {
                    match direction {
                        SortDirection::Asc => {
                            rows.sort_by(|a, b| a.values()[index].cmp(&b.values()[index]))
                        }
                        SortDirection::Desc => {
                            rows.sort_by(|a, b| b.values()[index].cmp(&a.values()[index]))
                        }
                    }
                }
            }
            Step::Any { columns, value } => {
                rows.retain(|row| columns.iter().any(|&i| &row.values()[i] == *value));
            }
            Step::Compare { index, op, value } => {
                rows.retain(|row| op.evaluate(&row.values()[*index], value));
            }
        }
        rows
    }
}

fn plan<'q>(schema: &Schema, predicate: &'q Predicate) -> StoreResult<Step<'q>> {
    match predicate {
        Predicate::Limit(n) => Ok(Step::Limit(*n)),
        Predicate::Order(keys) => plan_order(schema, keys.clone()),
        Predicate::Any(value) => Ok(plan_any(schema, value)),
        Predicate::Keyed { key, value } => plan_keyed(schema, key, value),
    }
}

fn plan_order(schema: &Schema, keys: Vec<(String, SortDirection)>) -> StoreResult<Step<'static>> {
    let keys = keys
        .into_iter()
        .map(|(field, direction)| Ok((schema.require(&field)?, direction)))
        .collect::<StoreResult<Vec<_>>>()?;
    Ok(Step::Order(keys))
}

fn plan_any<'q>(schema: &Schema, value: &'q Value) -> Step<'q> {
    let columns = schema
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, f)| value.is_of_type(f.ty()))
        .map(|(i, _)| i)
        .collect();
    Step::Any { columns, value }
}

/// Positions of the rows matching an `any = value` predicate.
pub(crate) fn any_positions(schema: &Schema, rows: &[Record], value: &Value) -> Vec<usize> {
    let Step::Any { columns, value } = plan_any(schema, value) else {
        return Vec::new();
    };
    rows.iter()
        .enumerate()
        .filter(|(_, row)| columns.iter().any(|&i| &row.values()[i] == value))
        .map(|(id, _)| id)
        .collect()
}

fn plan_keyed<'q>(schema: &Schema, key: &str, value: &'q Value) -> StoreResult<Step<'q>> {
    match key {
        "limit" => match value {
            Value::Integer(n) if *n >= 0 => Ok(Step::Limit(*n as usize)),
            _ => Err(StoreError::TypeMismatch {
                field: "limit".to_string(),
                expected: "non-negative integer".to_string(),
            }),
        },
        "order" => match value {
            Value::Text(list) => {
                let tokens: Vec<&str> = list.split(',').map(str::trim).collect();
                plan_order(schema, parse_order_tokens(&tokens))
            }
            _ => Err(StoreError::TypeMismatch {
                field: "order".to_string(),
                expected: "text".to_string(),
            }),
        },
        "any" => Ok(plan_any(schema, value)),
        _ => {
            let (field, op) = key
                .rsplit_once('_')
                .and_then(|(field, op)| CompareOp::parse(op).map(|op| (field, op)))
                .ok_or_else(|| StoreError::BadFilterKey(key.to_string()))?;
            let index = schema.require(field)?;
            Ok(Step::Compare { index, op, value })
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::Limit(n) => write!(f, "limit={}", n),
            Predicate::Order(keys) => {
                write!(f, "order=(")?;
                for (i, (field, direction)) in keys.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let token = match direction {
                        SortDirection::Asc => "asc",
                        SortDirection::Desc => "desc",
                    };
                    write!(f, "{}, {}", field, token)?;
                }
                write!(f, ")")
            }
            Predicate::Any(value) => write!(f, "any={}", value),
            Predicate::Keyed { key, value } => write!(f, "{}={}", key, value),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::schema::Field;

    fn schema() -> Arc<Schema> {
        Schema::new(
            "Log",
            vec![Field::text("name"), Field::integer("end"), Field::text("note")],
        )
        .unwrap()
    }

    fn rows(ends: &[i64]) -> Vec<Record> {
        let schema = schema();
        ends.iter()
            .enumerate()
            .map(|(i, end)| {
                let name = if i % 2 == 0 { "a" } else { "b" };
                Record::new(&schema, vec![name.into(), (*end).into(), "x".into()]).unwrap()
            })
            .collect()
    }

    fn ends(rows: &[Record]) -> Vec<i64> {
        rows.iter().map(|r| r.integer("end").unwrap()).collect()
    }

    #[test]
    fn test_limit_then_order_sorts_prefix() {
        let data = rows(&[5, 3, 4, 1, 2]);
        let result = Query::new()
            .limit(3)
            .order([("end", "desc")])
            .apply(&schema(), &data)
            .unwrap();
        assert_eq!(ends(&result), vec![5, 4, 3]);
    }

    #[test]
    fn test_order_then_limit_sorts_everything() {
        let data = rows(&[1, 3, 4, 5, 2]);
        let limited_first = Query::new()
            .limit(3)
            .order([("end", "desc")])
            .apply(&schema(), &data)
            .unwrap();
        let ordered_first = Query::new()
            .order([("end", "desc")])
            .limit(3)
            .apply(&schema(), &data)
            .unwrap();
        assert_eq!(ends(&limited_first), vec![4, 3, 1]);
        assert_eq!(ends(&ordered_first), vec![5, 4, 3]);
    }

    #[test]
    fn test_multi_key_sort() {
        // names alternate a, b, a, b, a
        let data = rows(&[1, 2, 3, 4, 5]);
        let result = Query::new()
            .order([("name", "asc"), ("end", "desc")])
            .apply(&schema(), &data)
            .unwrap();
        assert_eq!(ends(&result), vec![5, 3, 1, 4, 2]);

        let result = Query::new()
            .order_tokens(&["name", "desc", "end"])
            .apply(&schema(), &data)
            .unwrap();
        assert_eq!(ends(&result), vec![2, 4, 1, 3, 5]);
    }

    #[test]
    fn test_comparison_filters() {
        let data = rows(&[5, 3, 4, 1, 2]);
        let schema = schema();

        let gt = Query::new().filter("end_gt", 3).apply(&schema, &data).unwrap();
        assert_eq!(ends(&gt), vec![5, 4]);

        let le = Query::new().filter("end_le", 3).apply(&schema, &data).unwrap();
        assert_eq!(ends(&le), vec![3, 1, 2]);

        let ne = Query::new().filter("end_ne", 4).apply(&schema, &data).unwrap();
        assert_eq!(ends(&ne), vec![5, 3, 1, 2]);

        let eq = Query::new().filter("name_eq", "b").apply(&schema, &data).unwrap();
        assert_eq!(ends(&eq), vec![3, 1]);

        // numeric comparison across integer and float
        let ge = Query::new().filter("end_ge", 4.5).apply(&schema, &data).unwrap();
        assert_eq!(ends(&ge), vec![5]);
    }

    #[test]
    fn test_keyed_limit_and_order() {
        let data = rows(&[5, 3, 4, 1, 2]);
        let result = Query::new()
            .filter("order", "end, asc")
            .filter("limit", 2)
            .apply(&schema(), &data)
            .unwrap();
        assert_eq!(ends(&result), vec![1, 2]);
    }

    #[test]
    fn test_any_matches_columns_of_value_type() {
        let data = rows(&[1, 2, 3]);
        // "x" only appears in the note column, which is also text
        let result = Query::new().any("x").apply(&schema(), &data).unwrap();
        assert_eq!(result.len(), 3);

        let result = Query::new().any("b").apply(&schema(), &data).unwrap();
        assert_eq!(ends(&result), vec![2]);

        // integers never match text columns
        let result = Query::new().any(2).apply(&schema(), &data).unwrap();
        assert_eq!(ends(&result), vec![2]);
    }

    #[test]
    fn test_bad_filter_key() {
        let data = rows(&[1]);
        let result = Query::new().filter("end_between", 1).apply(&schema(), &data);
        assert!(matches!(result, Err(StoreError::BadFilterKey(k)) if k == "end_between"));

        let result = Query::new().filter("end", 1).apply(&schema(), &data);
        assert!(matches!(result, Err(StoreError::BadFilterKey(_))));

        let result = Query::new().filter("age_eq", 1).apply(&schema(), &data);
        assert!(matches!(result, Err(StoreError::UnknownField { .. })));
    }

    #[test]
    fn test_predicate_display() {
        let query = Query::new().filter("end_gt", 3).order([("end", "desc")]).limit(2);
        let rendered: Vec<String> = query.predicates().iter().map(|p| p.to_string()).collect();
        assert_eq!(rendered, vec!["end_gt=3", "order=(end, desc)", "limit=2"]);
    }
}
