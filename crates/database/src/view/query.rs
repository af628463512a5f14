//! Projection terms.

use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

/// One term of a view projection.
///
/// Plain strings convert with `"*"` meaning every plain column, `"id"` the
/// row id and anything else a column name.
#[derive(Clone, Debug, PartialEq)]
pub enum Query {
    /// Every plain column.
    All,
    /// The row id.
    Id,
    /// A named column. Naming a reference column projects it with an empty
    /// sub-projection.
    Column(String),
    /// A join. `name` is a reference column, `"*"` for every reference
    /// column, or `"<column>#<Table>"` for rows of `Table` whose `column`
    /// points back at the projected row.
    Join { name: String, terms: Vec<Query> },
}

/// How a join name is resolved.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum JoinKind<'a> {
    Forward(&'a str),
    AllReferences,
    Reverse { column: &'a str, table: &'a str },
}

impl Query {
    pub fn column(name: impl Into<String>) -> Query {
        Query::Column(name.into())
    }

    pub fn join<T: Into<Query>>(name: impl Into<String>, terms: impl IntoIterator<Item = T>) -> Query {
        Query::Join {
            name: name.into(),
            terms: terms.into_iter().map(Into::into).collect(),
        }
    }

    /// Joins rows of `table` whose `column` references the projected row.
    pub fn reverse<T: Into<Query>>(column: &str, table: &str, terms: impl IntoIterator<Item = T>) -> Query {
        Query::join(format!("{}#{}", column, table), terms)
    }

    pub(crate) fn join_kind(name: &str) -> JoinKind<'_> {
        match name.split_once('#') {
            Some((column, table)) => JoinKind::Reverse { column, table },
            None if name == "*" => JoinKind::AllReferences,
            None => JoinKind::Forward(name),
        }
    }
}

impl From<&str> for Query {
    fn from(term: &str) -> Self {
        match term {
            "*" => Query::All,
            "id" => Query::Id,
            name => Query::Column(name.into()),
        }
    }
}

impl From<String> for Query {
    fn from(term: String) -> Self {
        Query::from(term.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_str() {
        assert_eq!(Query::from("*"), Query::All);
        assert_eq!(Query::from("id"), Query::Id);
        assert_eq!(Query::from("name"), Query::Column("name".into()));
    }

    #[test]
    fn test_join_kind() {
        assert_eq!(Query::join_kind("author"), JoinKind::Forward("author"));
        assert_eq!(Query::join_kind("*"), JoinKind::AllReferences);
        assert_eq!(
            Query::join_kind("authorId#Posts"),
            JoinKind::Reverse {
                column: "authorId",
                table: "Posts"
            }
        );
    }

    #[test]
    fn test_reverse_builds_name() {
        let query = Query::reverse("authorId", "Posts", ["title"]);
        assert_eq!(
            query,
            Query::Join {
                name: "authorId#Posts".into(),
                terms: vec![Query::Column("title".into())],
            }
        );
    }
}
