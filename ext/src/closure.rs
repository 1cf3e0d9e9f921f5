use pgrx::prelude::*;

use crate::catalog::PgCatalog;
use crate::util::{numbered, raise};

/// Tables the seeds reference, transitively (parent tables).
#[pg_extern]
fn tabledeps_dependent_tables(
    tables: Vec<String>,
) -> TableIterator<'static, (name!(position, i64), name!(table_name, String))> {
    let catalog = PgCatalog::from_gucs();
    let result = tabledeps_core::dependent_tables(&catalog, &tables).unwrap_or_else(|e| raise(e));
    TableIterator::new(numbered(result))
}

/// Tables referencing the seeds, transitively (child tables).
#[pg_extern]
fn tabledeps_depends_on_tables(
    tables: Vec<String>,
) -> TableIterator<'static, (name!(position, i64), name!(table_name, String))> {
    let catalog = PgCatalog::from_gucs();
    let result = tabledeps_core::depends_on_tables(&catalog, &tables).unwrap_or_else(|e| raise(e));
    TableIterator::new(numbered(result))
}

/// Closure over foreign keys in both directions.
#[pg_extern]
fn tabledeps_all_dependent_tables(
    tables: Vec<String>,
) -> TableIterator<'static, (name!(position, i64), name!(table_name, String))> {
    let catalog = PgCatalog::from_gucs();
    let result =
        tabledeps_core::all_dependent_tables(&catalog, &tables).unwrap_or_else(|e| raise(e));
    TableIterator::new(numbered(result))
}

/// One-hop neighbours of `source_table`, without the table itself.
#[pg_extern]
fn tabledeps_direct_dependencies(
    source_table: String,
    direction: default!(String, "'imported'"),
) -> TableIterator<'static, (name!(position, i64), name!(table_name, String))> {
    let catalog = PgCatalog::from_gucs();
    let result = match direction.to_lowercase().as_str() {
        "imported" | "parents" => tabledeps_core::direct_dependent_tables(&catalog, &source_table),
        "exported" | "children" => {
            tabledeps_core::direct_depends_on_tables(&catalog, &source_table)
        }
        other => {
            error!(
                "tabledeps: invalid direction '{}', use 'imported' or 'exported'",
                other
            );
        }
    }
    .unwrap_or_else(|e| raise(e));
    TableIterator::new(numbered(result))
}
