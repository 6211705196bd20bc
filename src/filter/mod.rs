//! Filter expressions over documents
//!
//! Filters are a small AST instead of closures so that a store adapter can
//! translate them into the store's own query language
//! ([`Filter::to_query_document`]) while the in-memory store evaluates them
//! directly ([`Filter::matches`]).
//!
//! - `mod.rs` - AST and builders
//! - `eval.rs` - evaluation against a document's JSON image
//! - `query.rs` - MongoDB-style query document rendering

mod eval;
mod query;

use std::fmt;

use crate::core::Value;
use crate::document::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
        };
        f.write_str(symbol)
    }
}

/// Boolean filter over a document.
///
/// Field names are dot-separated paths into the serialized document
/// (`"address.city"`).
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    Compare {
        field: String,
        op: CompareOp,
        value: Value,
    },
    In {
        field: String,
        values: Vec<Value>,
    },
    Exists {
        field: String,
        exists: bool,
    },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    fn compare(field: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Self::Compare {
            field: field.into(),
            op,
            value: value.into(),
        }
    }

    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Eq, value)
    }

    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Ne, value)
    }

    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gt, value)
    }

    pub fn gte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Gte, value)
    }

    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lt, value)
    }

    pub fn lte(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(field, CompareOp::Lte, value)
    }

    pub fn in_list<I, V>(field: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn exists(field: impl Into<String>, exists: bool) -> Self {
        Self::Exists {
            field: field.into(),
            exists,
        }
    }

    /// Matches the document of type `D` whose key equals `key`.
    pub fn key<D: Document>(key: &D::Key) -> Self {
        Self::eq(D::KEY_FIELD, key.clone())
    }

    /// Matches documents of type `D` whose key is one of `keys`.
    pub fn keys<'a, D: Document>(keys: impl IntoIterator<Item = &'a D::Key>) -> Self {
        Self::in_list(D::KEY_FIELD, keys.into_iter().cloned())
    }

    /// Conjunction of `filters`; an empty input matches everything.
    pub fn all_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut parts = Vec::new();
        for filter in filters {
            match filter {
                Filter::All => {}
                Filter::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }

        match parts.len() {
            0 => Filter::All,
            1 => parts.remove(0),
            _ => Filter::And(parts),
        }
    }

    /// Disjunction of `filters`; an empty input matches nothing.
    pub fn any_of(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut parts = Vec::new();
        for filter in filters {
            match filter {
                Filter::Or(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }

        if parts.len() == 1 {
            parts.remove(0)
        } else {
            Filter::Or(parts)
        }
    }

    pub fn and(self, other: Filter) -> Self {
        Self::all_of([self, other])
    }

    pub fn or(self, other: Filter) -> Self {
        Self::any_of([self, other])
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        match self {
            Filter::Not(inner) => *inner,
            other => Filter::Not(Box::new(other)),
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Filter::All
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::All => write!(f, "TRUE"),
            Filter::Compare { field, op, value } => write!(f, "{} {} {}", field, op, value),
            Filter::In { field, values } => {
                write!(f, "{} IN (", field)?;
                for (idx, value) in values.iter().enumerate() {
                    if idx > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, ")")
            }
            Filter::Exists { field, exists } => {
                if *exists {
                    write!(f, "{} EXISTS", field)
                } else {
                    write!(f, "{} NOT EXISTS", field)
                }
            }
            Filter::And(parts) => write_joined(f, parts, " AND ", "TRUE"),
            Filter::Or(parts) => write_joined(f, parts, " OR ", "FALSE"),
            Filter::Not(inner) => write!(f, "NOT ({})", inner),
        }
    }
}

fn write_joined(
    f: &mut fmt::Formatter<'_>,
    parts: &[Filter],
    separator: &str,
    empty: &str,
) -> fmt::Result {
    if parts.is_empty() {
        return f.write_str(empty);
    }
    write!(f, "(")?;
    for (idx, part) in parts.iter().enumerate() {
        if idx > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{}", part)?;
    }
    write!(f, ")")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_of_flattens_and_drops_all() {
        let filter = Filter::all_of([
            Filter::All,
            Filter::eq("a", 1),
            Filter::And(vec![Filter::eq("b", 2), Filter::eq("c", 3)]),
        ]);

        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::eq("a", 1),
                Filter::eq("b", 2),
                Filter::eq("c", 3)
            ])
        );
        assert_eq!(Filter::all_of(Vec::new()), Filter::All);
        assert_eq!(Filter::all_of([Filter::eq("a", 1)]), Filter::eq("a", 1));
    }

    #[test]
    fn test_double_negation_collapses() {
        let filter = Filter::eq("a", 1);
        assert_eq!(filter.clone().not().not(), filter);
    }

    #[test]
    fn test_display() {
        let filter = Filter::eq("name", "x").and(Filter::in_list("age", [1, 2]));
        assert_eq!(filter.to_string(), "(name = \"x\" AND age IN (1, 2))");
    }
}
