//! # Collection Queries
//!
//! Equality filters, one sort field and an optional limit over a single
//! collection. Evaluated in process after the collection scan.
//!
//! ## Example
//! ```rust
//! use serde_json::json;
//! use zf_store::{CollectionPath, Direction, Query};
//!
//! let orders = CollectionPath::new("orders").unwrap();
//! let mine = Query::new(orders)
//!     .where_eq("ownerId", json!("u1"))
//!     .order_by("createdAt", Direction::Descending)
//!     .limit(20);
//! assert_eq!(mine.key(), r#"orders|ownerId=="u1"|createdAt desc|limit 20"#);
//! ```

use serde_json::Value;
use std::cmp::Ordering;

use crate::document::Document;
use crate::path::CollectionPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// `field == value` on a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A query over one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filters: Vec<Filter>,
    pub order_by: Option<OrderBy>,
    pub limit: Option<usize>,
}

impl Query {
    /// Every document in the collection, ordered by id.
    pub fn new(collection: CollectionPath) -> Self {
        Query {
            collection,
            filters: Vec::new(),
            order_by: None,
            limit: None,
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value,
        });
        self
    }

    /// Sorts by `field`. Documents without the field are left out.
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Stable identity of the query, used to decide whether a subscription
    /// has to be re-established.
    pub fn key(&self) -> String {
        let mut key = self.collection.to_string();
        for filter in &self.filters {
            key.push_str(&format!("|{}=={}", filter.field, filter.value));
        }
        if let Some(order) = &self.order_by {
            let dir = match order.direction {
                Direction::Ascending => "asc",
                Direction::Descending => "desc",
            };
            key.push_str(&format!("|{} {}", order.field, dir));
        }
        if let Some(limit) = self.limit {
            key.push_str(&format!("|limit {}", limit));
        }
        key
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.filters
            .iter()
            .all(|f| doc.fields.get(&f.field) == Some(&f.value))
    }

    /// Filters, sorts and truncates a collection scan.
    pub fn apply(&self, docs: Vec<Document>) -> Vec<Document> {
        let mut docs: Vec<Document> = docs.into_iter().filter(|d| self.matches(d)).collect();

        if let Some(order) = &self.order_by {
            docs.retain(|d| d.fields.contains_key(&order.field));
            docs.sort_by(|a, b| {
                let ord = compare_values(&a.fields[&order.field], &b.fields[&order.field]);
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            docs.truncate(limit);
        }
        docs
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}

/// Orders values by type first, then by value within a type.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let (x, y) = (x.as_f64().unwrap_or(0.0), y.as_f64().unwrap_or(0.0));
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        (Value::Array(x), Value::Array(y)) => {
            for (l, r) in x.iter().zip(y) {
                let ord = compare_values(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::path::DocPath;

    fn doc(id: &str, fields: Value) -> Document {
        Document {
            path: DocPath::new(format!("orders/{}", id)).unwrap(),
            fields: fields.as_object().cloned().unwrap(),
            create_time: Utc::now(),
            update_time: Utc::now(),
        }
    }

    fn orders() -> Query {
        Query::new(CollectionPath::new("orders").unwrap())
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id()).collect()
    }

    #[test]
    fn test_equality_filter() {
        let docs = vec![
            doc("a", json!({ "ownerId": "u1" })),
            doc("b", json!({ "ownerId": "u2" })),
            doc("c", json!({ "ownerId": "u1" })),
            doc("d", json!({})),
        ];
        let result = orders().where_eq("ownerId", json!("u1")).apply(docs);
        assert_eq!(ids(&result), vec!["a", "c"]);
    }

    #[test]
    fn test_order_and_limit() {
        let docs = vec![
            doc("a", json!({ "createdAt": "2024-01-02T00:00:00Z" })),
            doc("b", json!({ "createdAt": "2024-01-03T00:00:00Z" })),
            doc("c", json!({})),
            doc("d", json!({ "createdAt": "2024-01-01T00:00:00Z" })),
        ];
        let result = orders()
            .order_by("createdAt", Direction::Descending)
            .limit(2)
            .apply(docs);
        assert_eq!(ids(&result), vec!["b", "a"]);
    }

    #[test]
    fn test_numeric_ordering() {
        let docs = vec![
            doc("a", json!({ "n": 10 })),
            doc("b", json!({ "n": 2.5 })),
            doc("c", json!({ "n": -1 })),
        ];
        let result = orders().order_by("n", Direction::Ascending).apply(docs);
        assert_eq!(ids(&result), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_mixed_types_order_by_rank() {
        assert_eq!(compare_values(&json!(null), &json!(false)), Ordering::Less);
        assert_eq!(compare_values(&json!(1), &json!("1")), Ordering::Less);
        assert_eq!(compare_values(&json!([1, 2]), &json!([1])), Ordering::Greater);
    }

    #[test]
    fn test_key_distinguishes_filters() {
        let a = orders().where_eq("ownerId", json!("u1"));
        let b = orders().where_eq("ownerId", json!("u2"));
        assert_ne!(a.key(), b.key());
        assert_eq!(a.key(), a.clone().key());
        assert_eq!(orders().key(), "orders");
    }
}
