//! Dataset extraction: the rows that must travel with a set of primary
//! keys, or with a whole table, for the copy to stay referentially sound.

use pgrx::prelude::*;
use pgrx::JsonB;
use serde_json::json;
use tabledeps_core::{PkTableMap, SchemaMetadata, TableSet};

use crate::catalog::PgCatalog;
use crate::rows::PgRows;
use crate::util::{dataset_to_json, parse_pk_map, raise};

/// Rows reachable from `{"table": [pk, ...], ...}`.
///
/// Returns `{"tables": [...], "keys": {"table": [pk, ...]}}`, the second
/// part being the accumulated key map after the search.
#[pg_extern]
fn tabledeps_dataset(primary_keys: JsonB) -> JsonB {
    let catalog = PgCatalog::from_gucs();
    let rows = PgRows::from_gucs();

    let mut pks = PkTableMap::new(catalog.case_sensitivity());
    parse_pk_map(&primary_keys.0, &mut pks).unwrap_or_else(|e| raise(e));
    if pks.is_empty() {
        notice!("tabledeps: no primary keys given, dataset is empty");
    }

    let dataset = tabledeps_core::dataset(&catalog, &rows, &mut pks).unwrap_or_else(|e| raise(e));

    let keys: serde_json::Map<String, serde_json::Value> = pks
        .iter()
        .map(|(table, values)| {
            let list: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            (table.to_string(), json!(list))
        })
        .collect();

    JsonB(json!({
        "tables": dataset_to_json(&dataset),
        "keys": keys,
    }))
}

/// Every row of every table connected to `source_table`, skipping tables
/// listed in `already_seen`.
///
/// Returns `{"tables": [...], "already_seen": [...]}`; feed `already_seen`
/// back in when extracting from several roots.
#[pg_extern]
fn tabledeps_all_dataset(
    source_table: String,
    already_seen: default!(Vec<String>, "'{}'"),
) -> JsonB {
    let catalog = PgCatalog::from_gucs();
    let rows = PgRows::from_gucs();

    let mut seen = TableSet::from_names(catalog.case_sensitivity(), &already_seen);
    let dataset = tabledeps_core::all_dataset(&catalog, &rows, &source_table, &mut seen)
        .unwrap_or_else(|e| raise(e));

    JsonB(json!({
        "tables": dataset_to_json(&dataset),
        "already_seen": seen.into_vec(),
    }))
}
