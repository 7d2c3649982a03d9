//! Document-style persistence.
//!
//! The application only needs a small slice of a document database: fetch by
//! id, write at an id, insert with a generated id, and simple filtered queries.
//! [`DocumentStore`] captures that slice so the orchestrator and repository can
//! run against memory in tests and a file (or a hosted database) in production.

mod file;
mod memory;

pub use file::JsonlStore;
pub use memory::MemoryStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::DateTime;
#[cfg(test)]
use mockall::automock;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Value,
}

impl Document {
    /// The document body with its id merged in under `"id"`.
    pub fn into_value(self) -> Value {
        match self.data {
            Value::Object(mut map) => {
                map.insert("id".to_string(), Value::String(self.id));
                Value::Object(map)
            }
            other => other,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    pub fn matches(&self, data: &Value) -> bool {
        let field = data.get(&self.field);
        match self.op {
            FilterOp::Eq => field == Some(&self.value),
            // A missing field is not "not equal"; it is excluded, as in most
            // document databases.
            FilterOp::Ne => field.is_some_and(|v| v != &self.value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op: FilterOp::Eq,
            value: value.into(),
        });
        self
    }

    pub fn where_ne(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.to_string(),
            op: FilterOp::Ne,
            value: value.into(),
        });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Applies filters, ordering and limit to an in-memory set of documents.
    pub fn apply(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut matched: Vec<Document> = docs
            .into_iter()
            .filter(|doc| self.filters.iter().all(|f| f.matches(&doc.data)))
            .collect();

        if let Some((field, direction)) = &self.order_by {
            matched.sort_by(|a, b| {
                let ord = compare_values(a.data.get(field), b.data.get(field));
                match direction {
                    Direction::Asc => ord,
                    Direction::Desc => ord.reverse(),
                }
            });
        }

        if let Some(limit) = self.limit {
            matched.truncate(limit);
        }
        matched
    }
}

/// Orders missing < null < bool < number < string; other kinds compare equal.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    fn kind(v: Option<&Value>) -> u8 {
        match v {
            None => 0,
            Some(Value::Null) => 1,
            Some(Value::Bool(_)) => 2,
            Some(Value::Number(_)) => 3,
            Some(Value::String(_)) => 4,
            Some(_) => 5,
        }
    }

    match (a, b) {
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        // Timestamps may differ in fractional precision, so compare them as instants.
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(x), Ok(y)) => x.cmp(&y),
                _ => x.cmp(y),
            }
        }
        _ => kind(a).cmp(&kind(b)),
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Writes `data` at `id`, replacing any existing document.
    async fn set(&self, collection: &str, id: &str, data: Value) -> Result<()>;

    /// Inserts `data` under a newly generated id and returns that id.
    async fn add(&self, collection: &str, data: Value) -> Result<String>;

    async fn query(&self, collection: &str, query: Query) -> Result<Vec<Document>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(id: &str, data: Value) -> Document {
        Document {
            id: id.to_string(),
            data,
        }
    }

    fn docs() -> Vec<Document> {
        vec![
            doc("a", json!({"userId": "u1", "createdAt": "2025-01-02T00:00:00Z", "finalized": true})),
            doc("b", json!({"userId": "u2", "createdAt": "2025-01-03T00:00:00Z", "finalized": true})),
            doc("c", json!({"userId": "u1", "createdAt": "2025-01-01T00:00:00Z", "finalized": false})),
            doc("d", json!({"createdAt": "2025-01-04T00:00:00Z", "finalized": true})),
        ]
    }

    fn ids(docs: &[Document]) -> Vec<&str> {
        docs.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_equality_filter_and_order() {
        let query = Query::new()
            .where_eq("userId", "u1")
            .order_by("createdAt", Direction::Desc);
        assert_eq!(ids(&query.apply(docs())), vec!["a", "c"]);
    }

    #[test]
    fn test_inequality_excludes_missing_field() {
        let query = Query::new()
            .where_eq("finalized", true)
            .where_ne("userId", "u1")
            .order_by("createdAt", Direction::Asc);
        assert_eq!(ids(&query.apply(docs())), vec!["b"]);
    }

    #[test]
    fn test_limit_after_ordering() {
        let query = Query::new()
            .order_by("createdAt", Direction::Desc)
            .limit(2);
        assert_eq!(ids(&query.apply(docs())), vec!["d", "b"]);
    }

    #[test]
    fn test_timestamps_order_as_instants() {
        let docs = vec![
            doc("whole", json!({"createdAt": "2025-01-01T10:00:00Z"})),
            doc("fraction", json!({"createdAt": "2025-01-01T10:00:00.500Z"})),
        ];
        let query = Query::new().order_by("createdAt", Direction::Desc);
        assert_eq!(ids(&query.apply(docs)), vec!["fraction", "whole"]);
    }

    #[test]
    fn test_into_value_merges_id() {
        let value = doc("x", json!({"role": "Backend"})).into_value();
        assert_eq!(value, json!({"id": "x", "role": "Backend"}));
    }
}
