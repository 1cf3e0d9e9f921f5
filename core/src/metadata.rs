//! Collaborator interfaces: schema metadata and row access.
//!
//! The search engine only reads through these traits. [`crate::MemoryDatabase`]
//! implements both for fixtures; the PostgreSQL extension implements them over
//! the system catalogs.

use std::collections::BTreeSet;

use crate::dataset::TableData;
use crate::error::CollaboratorError;
use crate::name::CaseSensitivity;
use crate::value::{PkValue, Value};

/// A foreign key declared on a table, pointing at the table it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportedKey {
    pub fk_column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// A foreign key declared on another table that references this one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedKey {
    pub referencing_table: String,
    pub referencing_column: String,
    pub pk_column: String,
}

/// Read-only view of a schema's foreign-key graph.
pub trait SchemaMetadata {
    fn table_exists(&self, table: &str) -> Result<bool, CollaboratorError>;

    /// Foreign keys declared by `table`. Errors with `TableNotFound` for
    /// unknown tables.
    fn foreign_keys_declared_by(&self, table: &str) -> Result<Vec<ImportedKey>, CollaboratorError>;

    /// Foreign keys on other tables referencing `table`.
    fn foreign_keys_referencing(&self, table: &str) -> Result<Vec<ExportedKey>, CollaboratorError>;

    fn case_sensitivity(&self) -> CaseSensitivity {
        CaseSensitivity::Insensitive
    }
}

/// Which rows of a table to materialize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowFilter<'a> {
    All,
    Keys(&'a BTreeSet<PkValue>),
}

/// Read-only row access.
pub trait RowSource {
    fn rows_of(&self, table: &str, filter: RowFilter<'_>) -> Result<TableData, CollaboratorError>;

    /// Distinct non-null values of `column` in the rows of `table` whose
    /// primary key is in `pk_filter`.
    fn referenced_key_values(
        &self,
        table: &str,
        column: &str,
        pk_filter: &BTreeSet<PkValue>,
    ) -> Result<BTreeSet<Value>, CollaboratorError>;

    /// Primary keys of the rows of `table` whose `column` holds one of
    /// `values`.
    fn keys_referencing(
        &self,
        table: &str,
        column: &str,
        values: &BTreeSet<Value>,
    ) -> Result<BTreeSet<PkValue>, CollaboratorError>;
}
