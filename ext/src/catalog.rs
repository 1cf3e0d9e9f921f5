//! Foreign-key metadata read from `pg_constraint` and `pg_attribute`.
//!
//! Only foreign keys between tables of the configured schema become edges.
//! A composite key yields one `fk_column -> pk_column` pair per column, in
//! key order.

use pgrx::prelude::*;
use pgrx::spi::{quote_literal, SpiClient, SpiError, SpiHeapTupleData};
use tabledeps_core::{CaseSensitivity, CollaboratorError, ExportedKey, ImportedKey, SchemaMetadata};

use crate::guc;

/// [`SchemaMetadata`] over the system catalogs of one schema.
pub struct PgCatalog {
    schema: String,
    case: CaseSensitivity,
}

impl PgCatalog {
    pub fn new(schema: impl Into<String>, case: CaseSensitivity) -> Self {
        Self {
            schema: schema.into(),
            case,
        }
    }

    /// Catalog for `tabledeps.schema` / `tabledeps.case_sensitive`.
    pub fn from_gucs() -> Self {
        Self::new(guc::schema(), guc::case_sensitivity())
    }

    /// Resolve `table` to its catalog name, or TableNotFound.
    fn relname(&self, client: &SpiClient<'_>, table: &str) -> Result<String, CollaboratorError> {
        resolve_relation(client, &self.schema, table, self.case)
            .map_err(metadata_error)?
            .ok_or_else(|| CollaboratorError::table_not_found(table))
    }
}

impl SchemaMetadata for PgCatalog {
    fn table_exists(&self, table: &str) -> Result<bool, CollaboratorError> {
        Spi::connect(|client| resolve_relation(&client, &self.schema, table, self.case))
            .map(|relname| relname.is_some())
            .map_err(metadata_error)
    }

    fn foreign_keys_declared_by(&self, table: &str) -> Result<Vec<ImportedKey>, CollaboratorError> {
        Spi::connect(|client| {
            let relname = self.relname(&client, table)?;
            let keys = foreign_keys(&client, &self.schema, Side::Referencing, &relname)
                .map_err(metadata_error)?;
            Ok(keys
                .into_iter()
                .map(|fk| ImportedKey {
                    fk_column: fk.referencing_column,
                    referenced_table: fk.referenced_table,
                    referenced_column: fk.referenced_column,
                })
                .collect())
        })
    }

    fn foreign_keys_referencing(&self, table: &str) -> Result<Vec<ExportedKey>, CollaboratorError> {
        Spi::connect(|client| {
            let relname = self.relname(&client, table)?;
            let keys = foreign_keys(&client, &self.schema, Side::Referenced, &relname)
                .map_err(metadata_error)?;
            Ok(keys
                .into_iter()
                .map(|fk| ExportedKey {
                    referencing_table: fk.referencing_table,
                    referencing_column: fk.referencing_column,
                    pk_column: fk.referenced_column,
                })
                .collect())
        })
    }

    fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }
}

fn metadata_error(e: SpiError) -> CollaboratorError {
    CollaboratorError::Metadata {
        message: e.to_string(),
    }
}

/// Look up an ordinary or partitioned table of `schema` by name.
///
/// Case-insensitive lookups that match several tables pick the first by
/// catalog name so the answer is stable.
pub(crate) fn resolve_relation(
    client: &SpiClient<'_>,
    schema: &str,
    table: &str,
    case: CaseSensitivity,
) -> Result<Option<String>, SpiError> {
    let name_match = match case {
        CaseSensitivity::Sensitive => format!("c.relname = {}", quote_literal(table)),
        CaseSensitivity::Insensitive => {
            format!("lower(c.relname) = lower({})", quote_literal(table))
        }
    };
    let query = format!(
        "SELECT c.relname::text AS relname \
         FROM pg_catalog.pg_class c \
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
         WHERE n.nspname = {} \
           AND c.relkind IN ('r', 'p') \
           AND {} \
         ORDER BY c.relname \
         LIMIT 1",
        quote_literal(schema),
        name_match
    );

    let mut rows = client.select(&query, None, &[])?;
    match rows.next() {
        Some(row) => row.get_by_name::<String, _>("relname"),
        None => Ok(None),
    }
}

// ---------------------------------------------------------------------------
// Foreign keys
// ---------------------------------------------------------------------------

#[derive(Clone, Copy)]
enum Side {
    /// Keys declared by the table.
    Referencing,
    /// Keys of other tables pointing at the table.
    Referenced,
}

struct ForeignKeyRow {
    referencing_table: String,
    referencing_column: String,
    referenced_table: String,
    referenced_column: String,
}

fn foreign_keys(
    client: &SpiClient<'_>,
    schema: &str,
    side: Side,
    relname: &str,
) -> Result<Vec<ForeignKeyRow>, SpiError> {
    let side_column = match side {
        Side::Referencing => "c.relname",
        Side::Referenced => "rc.relname",
    };
    let query = format!(
        "SELECT c.relname::text AS referencing_table, \
                a.attname::text AS referencing_column, \
                rc.relname::text AS referenced_table, \
                ra.attname::text AS referenced_column \
         FROM pg_catalog.pg_constraint con \
         JOIN pg_catalog.pg_class c ON c.oid = con.conrelid \
         JOIN pg_catalog.pg_namespace n ON n.oid = c.relnamespace \
         JOIN pg_catalog.pg_class rc ON rc.oid = con.confrelid \
         JOIN pg_catalog.pg_namespace rn ON rn.oid = rc.relnamespace \
         CROSS JOIN LATERAL unnest(con.conkey, con.confkey) \
           WITH ORDINALITY AS k(attnum, ref_attnum, ord) \
         JOIN pg_catalog.pg_attribute a \
           ON a.attrelid = con.conrelid AND a.attnum = k.attnum \
         JOIN pg_catalog.pg_attribute ra \
           ON ra.attrelid = con.confrelid AND ra.attnum = k.ref_attnum \
         WHERE con.contype = 'f' \
           AND n.nspname = {schema} \
           AND rn.nspname = {schema} \
           AND {side_column} = {relname} \
         ORDER BY con.conname, k.ord",
        schema = quote_literal(schema),
        side_column = side_column,
        relname = quote_literal(relname),
    );

    let mut keys = Vec::new();
    for row in client.select(&query, None, &[])? {
        keys.push(ForeignKeyRow {
            referencing_table: text(&row, "referencing_table")?,
            referencing_column: text(&row, "referencing_column")?,
            referenced_table: text(&row, "referenced_table")?,
            referenced_column: text(&row, "referenced_column")?,
        });
    }
    Ok(keys)
}

fn text(row: &SpiHeapTupleData<'_>, column: &str) -> Result<String, SpiError> {
    Ok(row.get_by_name::<String, _>(column)?.unwrap_or_default())
}
