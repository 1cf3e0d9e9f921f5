//! Error types for dependency search.
//!
//! Collaborators (schema metadata, row sources) report a
//! [`CollaboratorError`]. The search layer never recovers from one: it wraps
//! it in a [`SearchError`] naming the table and the operation that failed
//! and aborts the whole call.

use std::fmt;

use thiserror::Error;

/// An edge was built with an empty field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("foreign key field `{field}` is empty")]
pub struct InvalidEdge {
    pub field: &'static str,
}

/// Failure reported by a schema metadata or row collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("table not found: {table}")]
    TableNotFound { table: String },
    #[error("column `{column}` not found in table {table}")]
    ColumnNotFound { table: String, column: String },
    #[error("table {table} has no primary key")]
    NoPrimaryKey { table: String },
    #[error(transparent)]
    InvalidEdge(#[from] InvalidEdge),
    #[error("metadata lookup failed: {message}")]
    Metadata { message: String },
    #[error("row query failed: {message}")]
    Rows { message: String },
}

impl CollaboratorError {
    pub fn table_not_found(table: impl Into<String>) -> Self {
        CollaboratorError::TableNotFound {
            table: table.into(),
        }
    }

    pub fn is_table_not_found(&self) -> bool {
        matches!(self, CollaboratorError::TableNotFound { .. })
    }
}

/// What the search was doing when a collaborator failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    CheckTable,
    ResolveImportedKeys,
    ResolveExportedKeys,
    ResolveReachableKeys,
    MaterializeRows,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::CheckTable => "checking existence",
            Operation::ResolveImportedKeys => "resolving imported foreign keys",
            Operation::ResolveExportedKeys => "resolving exported foreign keys",
            Operation::ResolveReachableKeys => "resolving reachable primary keys",
            Operation::MaterializeRows => "materializing rows",
        };
        f.write_str(s)
    }
}

/// A dependency search could not complete.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} for table {table} failed: {cause}")]
pub struct SearchError {
    pub table: String,
    pub operation: Operation,
    #[source]
    pub cause: CollaboratorError,
}

impl SearchError {
    pub fn new(table: impl Into<String>, operation: Operation, cause: CollaboratorError) -> Self {
        Self {
            table: table.into(),
            operation,
            cause,
        }
    }
}

pub type SearchResult<T> = Result<T, SearchError>;

/// Attach table and operation context to a collaborator result.
pub(crate) trait WithContext<T> {
    fn context(self, table: &str, operation: Operation) -> SearchResult<T>;
}

impl<T> WithContext<T> for Result<T, CollaboratorError> {
    fn context(self, table: &str, operation: Operation) -> SearchResult<T> {
        self.map_err(|cause| SearchError::new(table, operation, cause))
    }
}
