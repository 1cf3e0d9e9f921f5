use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::InvalidEdge;

/// Which side of the foreign key the edge was discovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    /// Declared by the source table, leads child -> parent.
    Imported,
    /// Declared by another table referencing the source, leads parent -> child.
    Exported,
}

/// A foreign-key relationship between two tables.
///
/// Equality, hashing and ordering cover the four relationship fields only.
/// The same foreign key seen from either end compares equal.
#[derive(Debug, Clone)]
pub struct Edge {
    parent_table: String,
    child_table: String,
    fk_column: String,
    pk_column: String,
    kind: EdgeKind,
}

impl Edge {
    /// `child_table.fk_column` references `parent_table.pk_column`.
    pub fn new(
        parent_table: impl Into<String>,
        child_table: impl Into<String>,
        fk_column: impl Into<String>,
        pk_column: impl Into<String>,
        kind: EdgeKind,
    ) -> Result<Self, InvalidEdge> {
        let edge = Self {
            parent_table: parent_table.into(),
            child_table: child_table.into(),
            fk_column: fk_column.into(),
            pk_column: pk_column.into(),
            kind,
        };
        for (field, value) in [
            ("parent_table", &edge.parent_table),
            ("child_table", &edge.child_table),
            ("fk_column", &edge.fk_column),
            ("pk_column", &edge.pk_column),
        ] {
            if value.is_empty() {
                return Err(InvalidEdge { field });
            }
        }
        Ok(edge)
    }

    pub fn parent_table(&self) -> &str {
        &self.parent_table
    }

    pub fn child_table(&self) -> &str {
        &self.child_table
    }

    pub fn fk_column(&self) -> &str {
        &self.fk_column
    }

    pub fn pk_column(&self) -> &str {
        &self.pk_column
    }

    pub fn kind(&self) -> EdgeKind {
        self.kind
    }

    /// Table the edge was discovered from.
    pub fn source(&self) -> &str {
        match self.kind {
            EdgeKind::Imported => &self.child_table,
            EdgeKind::Exported => &self.parent_table,
        }
    }

    /// Table the edge leads to.
    pub fn target(&self) -> &str {
        match self.kind {
            EdgeKind::Imported => &self.parent_table,
            EdgeKind::Exported => &self.child_table,
        }
    }

    fn fields(&self) -> (&str, &str, &str, &str) {
        (
            self.parent_table.as_str(),
            self.child_table.as_str(),
            self.fk_column.as_str(),
            self.pk_column.as_str(),
        )
    }
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.fields() == other.fields()
    }
}

impl Eq for Edge {}

impl Hash for Edge {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields().hash(state);
    }
}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fields().cmp(&other.fields())
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.child_table, self.fk_column, self.parent_table, self.pk_column
        )
    }
}
