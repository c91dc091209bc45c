//! Turns a logical host query (filters, exclusions, sort keys, paging and an
//! optional field projection) into a validated [`QueryPlan`] over the `host`
//! entity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use sea_orm::prelude::Expr;
use sea_orm::sea_query::SimpleExpr;
use sea_orm::{
    ColumnType, Condition, JoinType, Order, QueryFilter, QueryOrder, QuerySelect, RelationTrait,
    Select, Value,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::db::entities::host;
use crate::db::error::{CmdbError, CmdbResult};
use crate::db::fields::{self, FieldPath, HostField};

/// Stands in for "no limit"; large enough for every backend to accept.
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

/// A host query as it arrives from a caller.
///
/// Filter values: a scalar matches by equality, an array by membership and
/// `null` matches missing values. `excludes` applies the inverse.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct HostQuery {
    pub filters: BTreeMap<String, JsonValue>,
    pub excludes: BTreeMap<String, JsonValue>,
    pub fields: Vec<String>,
    pub sort_by: Vec<String>,
    pub order: Vec<String>,
    pub offset: u64,
    pub limit: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn parse(token: &str) -> CmdbResult<Self> {
        match token {
            "asc" => Ok(SortDirection::Asc),
            "desc" => Ok(SortDirection::Desc),
            other => Err(CmdbError::InvalidOrder(other.to_string())),
        }
    }

    fn order(self) -> Order {
        match self {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SortKey {
    pub field: FieldPath,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateOp {
    Equals,
    NotEquals,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PredicateValue {
    Null,
    One(Value),
    Many(Vec<Value>),
}

#[derive(Debug, Clone)]
pub struct Predicate {
    pub field: FieldPath,
    pub op: PredicateOp,
    pub value: PredicateValue,
}

impl Predicate {
    fn new(name: &str, op: PredicateOp, raw: &JsonValue) -> CmdbResult<Self> {
        let field = fields::resolve(name)?;
        let column_type = field.column_type();
        let value = match raw {
            JsonValue::Null => PredicateValue::Null,
            JsonValue::Array(items) => PredicateValue::Many(
                items
                    .iter()
                    .map(|item| coerce(name, &column_type, item))
                    .collect::<CmdbResult<Vec<_>>>()?,
            ),
            scalar => PredicateValue::One(coerce(name, &column_type, scalar)?),
        };
        Ok(Predicate { field, op, value })
    }

    pub fn to_expr(&self) -> SimpleExpr {
        let column = Expr::expr(self.field.expr());
        match (self.op, &self.value) {
            (PredicateOp::Equals, PredicateValue::Null) => column.is_null(),
            (PredicateOp::Equals, PredicateValue::One(v)) => column.eq(v.clone()),
            (PredicateOp::Equals, PredicateValue::Many(vs)) => column.is_in(vs.clone()),
            (PredicateOp::NotEquals, PredicateValue::Null) => column.is_not_null(),
            (PredicateOp::NotEquals, PredicateValue::One(v)) => column.ne(v.clone()),
            (PredicateOp::NotEquals, PredicateValue::Many(vs)) => column.is_not_in(vs.clone()),
        }
    }
}

/// Converts a JSON filter value into a storage value of the column's type.
/// Strings are accepted for numeric, boolean and timestamp columns since most
/// filters originate from query strings.
fn coerce(name: &str, column_type: &ColumnType, raw: &JsonValue) -> CmdbResult<Value> {
    let invalid = || CmdbError::InvalidValue {
        field: name.to_string(),
        value: raw.to_string(),
    };
    let value = match column_type {
        ColumnType::TinyInteger | ColumnType::SmallInteger => as_i64(raw)
            .and_then(|n| i16::try_from(n).ok())
            .map(Value::from),
        ColumnType::Integer => as_i64(raw)
            .and_then(|n| i32::try_from(n).ok())
            .map(Value::from),
        ColumnType::BigInteger => as_i64(raw).map(Value::from),
        ColumnType::Float | ColumnType::Double | ColumnType::Decimal(_) => {
            as_f64(raw).map(Value::from)
        }
        ColumnType::Boolean => as_bool(raw).map(Value::from),
        ColumnType::TimestampWithTimeZone | ColumnType::Timestamp | ColumnType::DateTime => raw
            .as_str()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| Value::from(dt.with_timezone(&Utc))),
        _ => match raw {
            JsonValue::String(s) => Some(Value::from(s.clone())),
            JsonValue::Number(n) => Some(Value::from(n.to_string())),
            JsonValue::Bool(b) => Some(Value::from(b.to_string())),
            _ => None,
        },
    };
    value.ok_or_else(invalid)
}

fn as_i64(raw: &JsonValue) -> Option<i64> {
    match raw {
        JsonValue::Number(n) => n.as_i64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(raw: &JsonValue) -> Option<f64> {
    match raw {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_bool(raw: &JsonValue) -> Option<bool> {
    match raw {
        JsonValue::Bool(b) => Some(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        JsonValue::String(s) => match s.as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Pairs sort fields with directions. Legal shapes: one direction per field,
/// or a single direction shared by every field. Directions are checked before
/// field names.
fn build_sort(sort_by: &[String], order: &[String]) -> CmdbResult<Vec<SortKey>> {
    if sort_by.is_empty() {
        if !order.is_empty() {
            return Err(CmdbError::InvalidSortSpec(
                "unused 'order' fields".to_string(),
            ));
        }
        return Ok(Vec::new());
    }

    let directions = if sort_by.len() == order.len() {
        order
            .iter()
            .map(|token| SortDirection::parse(token))
            .collect::<CmdbResult<Vec<_>>>()?
    } else if order.len() == 1 {
        vec![SortDirection::parse(&order[0])?; sort_by.len()]
    } else {
        return Err(CmdbError::InvalidSortSpec(
            "'sort_by', 'order' sizes mismatch or 'order' size is not 1".to_string(),
        ));
    };

    sort_by
        .iter()
        .zip(directions)
        .map(|(name, direction)| {
            Ok(SortKey {
                field: fields::resolve(name)?,
                direction,
            })
        })
        .collect()
}

/// One row of a query result: the full record, or only the projected fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum HostRow {
    Full(host::Model),
    Projected(serde_json::Map<String, JsonValue>),
}

#[derive(Debug, Clone)]
pub struct QueryPlan {
    pub predicates: Vec<Predicate>,
    pub joins: Vec<host::Relation>,
    pub sort: Vec<SortKey>,
    pub offset: u64,
    pub limit: Option<u64>,
    pub projection: Option<Vec<&'static HostField>>,
}

impl QueryPlan {
    pub fn build(query: &HostQuery) -> CmdbResult<Self> {
        let mut predicates = Vec::with_capacity(query.filters.len() + query.excludes.len());
        for (name, raw) in &query.filters {
            predicates.push(Predicate::new(name, PredicateOp::Equals, raw)?);
        }
        for (name, raw) in &query.excludes {
            predicates.push(Predicate::new(name, PredicateOp::NotEquals, raw)?);
        }

        let sort = build_sort(&query.sort_by, &query.order)?;

        let projection = if query.fields.is_empty() {
            None
        } else {
            Some(
                query
                    .fields
                    .iter()
                    .map(|name| fields::host_field(name))
                    .collect::<CmdbResult<Vec<_>>>()?,
            )
        };

        let mut joins: Vec<host::Relation> = Vec::new();
        let referenced = predicates
            .iter()
            .map(|p| p.field)
            .chain(sort.iter().map(|k| k.field));
        for relation in referenced.filter_map(|f| f.relation()) {
            if !joins.contains(&relation) {
                joins.push(relation);
            }
        }

        Ok(QueryPlan {
            predicates,
            joins,
            sort,
            offset: query.offset.min(UNBOUNDED_LIMIT),
            limit: query
                .limit
                .filter(|l| *l > 0)
                .map(|l| l.min(UNBOUNDED_LIMIT)),
            projection,
        })
    }

    pub fn condition(&self) -> Condition {
        self.predicates
            .iter()
            .fold(Condition::all(), |cond, p| cond.add(p.to_expr()))
    }

    pub fn apply(&self, select: Select<host::Entity>) -> Select<host::Entity> {
        let mut select = select;
        for relation in &self.joins {
            select = select.join(JoinType::InnerJoin, relation.def());
        }
        select = select.filter(self.condition());
        for key in &self.sort {
            select = select.order_by(key.field.expr(), key.direction.order());
        }
        select
            .offset(self.offset)
            .limit(self.limit.unwrap_or(UNBOUNDED_LIMIT))
    }

    /// Shapes fetched models into result rows, keeping storage order.
    pub fn materialize(&self, models: Vec<host::Model>) -> Vec<HostRow> {
        match &self.projection {
            None => models.into_iter().map(HostRow::Full).collect(),
            Some(fields) => models
                .iter()
                .map(|m| HostRow::Projected(fields::project(m, fields)))
                .collect(),
        }
    }
}
