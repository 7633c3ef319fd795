//! Query constraints and their evaluation.
//!
//! A constraint list compiles into a [`QueryPlan`]. Backends that evaluate
//! queries themselves only need [`QueryPlan::matches`] and the ordering;
//! [`QueryPlan::apply`] runs the whole pipeline over an in-memory set.

use std::cmp::Ordering;

use crewdesk_core::DocumentId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::RawDocument;
use crate::cursor::Cursor;
use crate::error::StoreError;
use crate::value;

/// Pseudo-field addressing the document id in filters and orderings.
pub const DOCUMENT_ID_FIELD: &str = "__name__";

/// Maximum number of values in an `in`, `not-in` or `array-contains-any` list.
pub const MAX_DISJUNCTION_VALUES: usize = 30;

/// Comparison operator of a field filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
    #[serde(rename = "array-contains")]
    ArrayContains,
    #[serde(rename = "array-contains-any")]
    ArrayContainsAny,
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::NotIn => "not-in",
            Self::ArrayContains => "array-contains",
            Self::ArrayContainsAny => "array-contains-any",
        }
    }

    fn takes_list(&self) -> bool {
        matches!(self, Self::In | Self::NotIn | Self::ArrayContainsAny)
    }
}

impl std::fmt::Display for FilterOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FilterOp {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "==" => Self::Eq,
            "!=" => Self::Ne,
            "<" => Self::Lt,
            "<=" => Self::Le,
            ">" => Self::Gt,
            ">=" => Self::Ge,
            "in" => Self::In,
            "not-in" => Self::NotIn,
            "array-contains" => Self::ArrayContains,
            "array-contains-any" => Self::ArrayContainsAny,
            other => return Err(format!("unknown filter operator: {other}")),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    fn orient(&self, ord: Ordering) -> Ordering {
        match self {
            Self::Asc => ord,
            Self::Desc => ord.reverse(),
        }
    }
}

/// One element of a query.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    Where {
        field: String,
        op: FilterOp,
        value: Value,
    },
    OrderBy {
        field: String,
        direction: Direction,
    },
    Limit(usize),
    StartAfter(Cursor),
}

/// `field op value` filter.
pub fn filter(field: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Constraint {
    Constraint::Where {
        field: field.into(),
        op,
        value: value.into(),
    }
}

pub fn order_by(field: impl Into<String>, direction: Direction) -> Constraint {
    Constraint::OrderBy {
        field: field.into(),
        direction,
    }
}

pub fn limit(n: usize) -> Constraint {
    Constraint::Limit(n)
}

#[derive(Debug, Clone, PartialEq)]
struct Filter {
    field: String,
    op: FilterOp,
    value: Value,
}

/// A validated, evaluable constraint list.
///
/// Orderings compose in the order given: the first is the primary sort key.
/// The document id is always appended as the final key, in the direction of
/// the last explicit ordering (ascending when there is none). When several
/// limits or start positions are given, the last one applies.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct QueryPlan {
    filters: Vec<Filter>,
    orders: Vec<(String, Direction)>,
    limit: Option<usize>,
    start_after: Option<Cursor>,
}

impl QueryPlan {
    pub fn compile(collection: &str, constraints: &[Constraint]) -> Result<Self, StoreError> {
        let invalid = |reason: String| StoreError::InvalidQuery {
            collection: collection.to_string(),
            reason,
        };
        let mut plan = QueryPlan::default();
        for constraint in constraints {
            match constraint {
                Constraint::Where { field, op, value } => {
                    if field.is_empty() {
                        return Err(invalid("filter on an empty field path".into()));
                    }
                    if op.takes_list() {
                        let list = value
                            .as_array()
                            .ok_or_else(|| invalid(format!("'{op}' on {field} needs a list value")))?;
                        if list.is_empty() || list.len() > MAX_DISJUNCTION_VALUES {
                            return Err(invalid(format!(
                                "'{op}' on {field} takes 1 to {MAX_DISJUNCTION_VALUES} values, got {}",
                                list.len()
                            )));
                        }
                    }
                    plan.filters.push(Filter {
                        field: field.clone(),
                        op: *op,
                        value: value.clone(),
                    });
                }
                Constraint::OrderBy { field, direction } => {
                    if field.is_empty() {
                        return Err(invalid("ordering on an empty field path".into()));
                    }
                    plan.orders.push((field.clone(), *direction));
                }
                Constraint::Limit(0) => return Err(invalid("limit must be positive".into())),
                Constraint::Limit(n) => plan.limit = Some(*n),
                Constraint::StartAfter(cursor) => plan.start_after = Some(cursor.clone()),
            }
        }
        if let Some(cursor) = &plan.start_after {
            if cursor.values().len() != plan.orders.len() {
                return Err(StoreError::InvalidCursor(format!(
                    "cursor has {} sort values, query orders by {}",
                    cursor.values().len(),
                    plan.orders.len()
                )));
            }
        }
        Ok(plan)
    }

    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Whether `doc` passes every filter and has every ordered field.
    pub fn matches(&self, doc: &RawDocument) -> bool {
        self.filters.iter().all(|f| filter_matches(f, doc)) && self.sort_values(doc).is_some()
    }

    /// Filter, order, skip to the start position and truncate.
    pub fn apply(&self, docs: impl IntoIterator<Item = RawDocument>) -> Vec<RawDocument> {
        let mut keyed: Vec<(Vec<Value>, RawDocument)> = docs
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| filter_matches(f, doc)))
            .filter_map(|doc| self.sort_values(&doc).map(|key| (key, doc)))
            .collect();
        keyed.sort_by(|(ka, a), (kb, b)| self.compare_keys(ka, &a.id, kb, &b.id));

        let start = match &self.start_after {
            Some(cursor) => keyed
                .iter()
                .position(|(k, d)| {
                    self.compare_keys(k, &d.id, cursor.values(), cursor.id()) == Ordering::Greater
                })
                .unwrap_or(keyed.len()),
            None => 0,
        };
        let take = self.limit.unwrap_or(usize::MAX);
        keyed.into_iter().skip(start).take(take).map(|(_, d)| d).collect()
    }

    /// Cursor positioned just after `doc` under this ordering.
    pub fn cursor_after(&self, doc: &RawDocument) -> Cursor {
        let values = self
            .orders
            .iter()
            .map(|(field, _)| field_value(doc, field).unwrap_or(Value::Null))
            .collect();
        Cursor::new(values, doc.id.clone())
    }

    fn sort_values(&self, doc: &RawDocument) -> Option<Vec<Value>> {
        self.orders
            .iter()
            .map(|(field, _)| field_value(doc, field))
            .collect()
    }

    fn id_direction(&self) -> Direction {
        self.orders.last().map(|(_, d)| *d).unwrap_or_default()
    }

    fn compare_keys(
        &self,
        a: &[Value],
        a_id: &DocumentId,
        b: &[Value],
        b_id: &DocumentId,
    ) -> Ordering {
        for (((_, direction), x), y) in self.orders.iter().zip(a).zip(b) {
            let ord = direction.orient(value::compare(x, y));
            if ord != Ordering::Equal {
                return ord;
            }
        }
        self.id_direction().orient(a_id.cmp(b_id))
    }
}

fn field_value(doc: &RawDocument, field: &str) -> Option<Value> {
    if field == DOCUMENT_ID_FIELD {
        return Some(Value::String(doc.id.as_str().to_string()));
    }
    value::get_path(&doc.fields, field).cloned()
}

fn filter_matches(filter: &Filter, doc: &RawDocument) -> bool {
    let Some(actual) = field_value(doc, &filter.field) else {
        return false;
    };
    let expected = &filter.value;
    let list = || expected.as_array().map(Vec::as_slice).unwrap_or_default();
    let range = |accept: fn(Ordering) -> bool| {
        value::same_kind(&actual, expected) && accept(value::compare(&actual, expected))
    };
    match filter.op {
        FilterOp::Eq => value::equal(&actual, expected),
        FilterOp::Ne => !value::equal(&actual, expected),
        FilterOp::Lt => range(Ordering::is_lt),
        FilterOp::Le => range(Ordering::is_le),
        FilterOp::Gt => range(Ordering::is_gt),
        FilterOp::Ge => range(Ordering::is_ge),
        FilterOp::In => list().iter().any(|v| value::equal(&actual, v)),
        FilterOp::NotIn => !list().iter().any(|v| value::equal(&actual, v)),
        FilterOp::ArrayContains => actual
            .as_array()
            .is_some_and(|items| items.iter().any(|v| value::equal(v, expected))),
        FilterOp::ArrayContainsAny => actual.as_array().is_some_and(|items| {
            items
                .iter()
                .any(|v| list().iter().any(|w| value::equal(v, w)))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map};

    fn doc(id: &str, fields: Value) -> RawDocument {
        let fields: Map<String, Value> = fields.as_object().cloned().unwrap();
        RawDocument {
            id: DocumentId::new(id).unwrap(),
            fields,
        }
    }

    fn ids(docs: &[RawDocument]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    fn sample() -> Vec<RawDocument> {
        vec![
            doc("c", json!({ "n": 2, "tags": ["x"], "status": "done" })),
            doc("a", json!({ "n": 3, "tags": ["y", "z"], "status": "planned" })),
            doc("b", json!({ "n": 1, "status": "planned", "nested": { "k": true } })),
            doc("d", json!({ "n": 2, "status": "cancelled" })),
        ]
    }

    fn run(constraints: &[Constraint]) -> Vec<RawDocument> {
        QueryPlan::compile("t", constraints).unwrap().apply(sample())
    }

    #[test]
    fn natural_order_is_by_id() {
        assert_eq!(ids(&run(&[])), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn orderings_compose_with_id_tie_break() {
        let docs = run(&[order_by("n", Direction::Asc)]);
        assert_eq!(ids(&docs), vec!["b", "c", "d", "a"]);

        let docs = run(&[order_by("n", Direction::Desc)]);
        assert_eq!(ids(&docs), vec!["a", "d", "c", "b"]);

        let docs = run(&[order_by("n", Direction::Asc), order_by("status", Direction::Asc)]);
        assert_eq!(ids(&docs), vec!["b", "d", "c", "a"]);
    }

    #[test]
    fn ordering_on_a_missing_field_excludes_the_document() {
        let docs = run(&[order_by("nested.k", Direction::Asc)]);
        assert_eq!(ids(&docs), vec!["b"]);
    }

    #[test]
    fn operators() {
        assert_eq!(ids(&run(&[filter("status", FilterOp::Eq, "planned")])), vec!["a", "b"]);
        assert_eq!(ids(&run(&[filter("status", FilterOp::Ne, "planned")])), vec!["c", "d"]);
        assert_eq!(ids(&run(&[filter("n", FilterOp::Ge, 2)])), vec!["a", "c", "d"]);
        assert_eq!(ids(&run(&[filter("n", FilterOp::Lt, 2.5)])), vec!["b", "c", "d"]);
        assert!(run(&[filter("status", FilterOp::Gt, 1)]).is_empty());
        assert_eq!(
            ids(&run(&[filter("status", FilterOp::In, json!(["done", "cancelled"]))])),
            vec!["c", "d"]
        );
        assert_eq!(
            ids(&run(&[filter("status", FilterOp::NotIn, json!(["done", "cancelled"]))])),
            vec!["a", "b"]
        );
        assert_eq!(ids(&run(&[filter("tags", FilterOp::ArrayContains, "z")])), vec!["a"]);
        assert_eq!(
            ids(&run(&[filter("tags", FilterOp::ArrayContainsAny, json!(["x", "y"]))])),
            vec!["a", "c"]
        );
        assert_eq!(ids(&run(&[filter("nested.k", FilterOp::Eq, true)])), vec!["b"]);
        assert_eq!(ids(&run(&[filter(DOCUMENT_ID_FIELD, FilterOp::Eq, "d")])), vec!["d"]);
    }

    #[test]
    fn last_limit_wins() {
        assert_eq!(run(&[limit(1), limit(3)]).len(), 3);
        assert_eq!(run(&[limit(3), limit(1)]).len(), 1);
    }

    #[test]
    fn start_after_skips_through_the_cursor() {
        let plan = QueryPlan::compile("t", &[order_by("n", Direction::Asc)]).unwrap();
        let first = plan.apply(sample());
        let cursor = plan.cursor_after(&first[1]);
        let rest = run(&[order_by("n", Direction::Asc), Constraint::StartAfter(cursor)]);
        assert_eq!(ids(&rest), vec!["d", "a"]);
    }

    #[test]
    fn cursor_must_match_the_ordering() {
        let cursor = Cursor::new(vec![json!(1)], DocumentId::new("a").unwrap());
        let err = QueryPlan::compile("t", &[Constraint::StartAfter(cursor)]).unwrap_err();
        assert!(matches!(err, StoreError::InvalidCursor(_)));
    }

    #[test]
    fn invalid_constraints_are_rejected() {
        for constraints in [
            vec![limit(0)],
            vec![filter("s", FilterOp::In, "x")],
            vec![filter("s", FilterOp::In, json!([]))],
            vec![filter("", FilterOp::Eq, 1)],
        ] {
            assert!(matches!(
                QueryPlan::compile("t", &constraints),
                Err(StoreError::InvalidQuery { .. })
            ));
        }
    }

    #[test]
    fn operator_wire_names_parse() {
        for op in [FilterOp::Eq, FilterOp::NotIn, FilterOp::ArrayContainsAny] {
            assert_eq!(op.as_str().parse::<FilterOp>().unwrap(), op);
            assert_eq!(serde_json::to_value(op).unwrap(), json!(op.as_str()));
        }
        assert!("like".parse::<FilterOp>().is_err());
    }
}
