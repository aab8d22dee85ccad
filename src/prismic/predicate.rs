//! Query predicates in Prismic's `q` syntax

use serde::Serialize;

/// Value compared by a predicate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PredicateValue {
    Text(String),
    Number(i64),
}

impl From<&str> for PredicateValue {
    fn from(s: &str) -> Self {
        PredicateValue::Text(s.to_string())
    }
}

impl From<String> for PredicateValue {
    fn from(s: String) -> Self {
        PredicateValue::Text(s)
    }
}

impl From<i64> for PredicateValue {
    fn from(n: i64) -> Self {
        PredicateValue::Number(n)
    }
}

impl PredicateValue {
    fn render(&self) -> String {
        match self {
            // JSON string encoding matches Prismic's quoting and escaping rules
            PredicateValue::Text(s) => serde_json::Value::String(s.clone()).to_string(),
            PredicateValue::Number(n) => n.to_string(),
        }
    }
}

/// A single query predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `[at(path, value)]`
    At(String, PredicateValue),
    /// `[not(path, value)]`
    Not(String, PredicateValue),
    /// `[any(path, [v1, v2])]`
    Any(String, Vec<PredicateValue>),
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        Predicate::At(path.into(), value.into())
    }

    pub fn not(path: impl Into<String>, value: impl Into<PredicateValue>) -> Self {
        Predicate::Not(path.into(), value.into())
    }

    pub fn any<V: Into<PredicateValue>>(
        path: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        Predicate::Any(path.into(), values.into_iter().map(Into::into).collect())
    }

    /// Match documents of a custom type
    pub fn document_type(doc_type: &str) -> Self {
        Self::at("document.type", doc_type)
    }

    /// Match a document by its UID within a custom type
    pub fn uid(doc_type: &str, uid: &str) -> Self {
        Self::at(format!("my.{}.uid", doc_type), uid)
    }

    /// Render as `[op(path, value)]`
    pub fn render(&self) -> String {
        match self {
            Predicate::At(path, value) => format!("[at({}, {})]", path, value.render()),
            Predicate::Not(path, value) => format!("[not({}, {})]", path, value.render()),
            Predicate::Any(path, values) => {
                let values: Vec<String> = values.iter().map(|v| v.render()).collect();
                format!("[any({}, [{}])]", path, values.join(", "))
            }
        }
    }
}

/// Combine predicates into one `q` parameter value
pub fn render_query(predicates: &[Predicate]) -> String {
    let inner: String = predicates.iter().map(Predicate::render).collect();
    format!("[{}]", inner)
}
