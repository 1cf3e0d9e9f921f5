//! Row access over SPI.
//!
//! Every cell is read as `::text`, so keys and values are `Value::Text`
//! (or `Value::Null`) on this side. Key sets flowing between queries stay
//! comparable because both ends compare text renderings.

use std::collections::BTreeSet;

use pgrx::prelude::*;
use pgrx::spi::{quote_identifier, quote_literal, SpiClient, SpiError};
use tabledeps_core::{CaseSensitivity, CollaboratorError, PkValue, RowFilter, RowSource, TableData, Value};

use crate::catalog::resolve_relation;
use crate::guc;

/// [`RowSource`] reading the tables of one schema.
pub struct PgRows {
    schema: String,
    case: CaseSensitivity,
}

struct Relation {
    name: String,
    qualified: String,
    columns: Vec<String>,
    primary_key: Option<String>,
}

impl Relation {
    fn primary_key(&self) -> Result<&str, CollaboratorError> {
        self.primary_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::NoPrimaryKey {
                table: self.name.clone(),
            })
    }

    fn column(&self, column: &str) -> Result<&str, CollaboratorError> {
        self.columns
            .iter()
            .find(|c| c.as_str() == column)
            .map(String::as_str)
            .ok_or_else(|| CollaboratorError::ColumnNotFound {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }
}

impl PgRows {
    pub fn new(schema: impl Into<String>, case: CaseSensitivity) -> Self {
        Self {
            schema: schema.into(),
            case,
        }
    }

    pub fn from_gucs() -> Self {
        Self::new(guc::schema(), guc::case_sensitivity())
    }

    fn describe(&self, client: &SpiClient<'_>, table: &str) -> Result<Relation, CollaboratorError> {
        let name = resolve_relation(client, &self.schema, table, self.case)
            .map_err(rows_error)?
            .ok_or_else(|| CollaboratorError::table_not_found(table))?;
        let qualified = format!("{}.{}", quote_identifier(&self.schema), quote_identifier(&name));
        let regclass = format!("{}::regclass", quote_literal(&qualified));

        let columns_query = format!(
            "SELECT a.attname::text AS attname \
             FROM pg_catalog.pg_attribute a \
             WHERE a.attrelid = {} AND a.attnum > 0 AND NOT a.attisdropped \
             ORDER BY a.attnum",
            regclass
        );
        let columns = select_text(client, &columns_query).map_err(rows_error)?;

        let pk_query = format!(
            "SELECT a.attname::text AS attname \
             FROM pg_catalog.pg_index i \
             JOIN pg_catalog.pg_attribute a \
               ON a.attrelid = i.indrelid AND a.attnum = i.indkey[0] \
             WHERE i.indrelid = {} AND i.indisprimary AND i.indnatts = 1",
            regclass
        );
        let primary_key = select_text(client, &pk_query).map_err(rows_error)?.into_iter().next();

        Ok(Relation {
            name,
            qualified,
            columns,
            primary_key,
        })
    }
}

impl RowSource for PgRows {
    fn rows_of(&self, table: &str, filter: RowFilter<'_>) -> Result<TableData, CollaboratorError> {
        Spi::connect(|client| {
            let rel = self.describe(&client, table)?;
            let mut data = TableData::new(rel.name.clone(), rel.columns.clone());

            let select_list = rel
                .columns
                .iter()
                .map(|c| format!("{}::text", quote_identifier(c)))
                .collect::<Vec<_>>()
                .join(", ");
            let mut query = format!("SELECT {} FROM {}", select_list, rel.qualified);

            if let RowFilter::Keys(keys) = filter {
                let pk = rel.primary_key()?;
                if keys.iter().all(Value::is_null) {
                    return Ok(data);
                }
                query.push_str(&format!(
                    " WHERE {}::text IN ({})",
                    quote_identifier(pk),
                    in_list(keys)
                ));
            }
            if let Some(pk) = &rel.primary_key {
                query.push_str(&format!(" ORDER BY {}", quote_identifier(pk)));
            }

            let width = rel.columns.len();
            for row in client.select(&query, None, &[]).map_err(rows_error)? {
                let mut values = Vec::with_capacity(width);
                for ordinal in 1..=width {
                    let cell: Option<String> = row.get(ordinal).map_err(rows_error)?;
                    values.push(cell.map_or(Value::Null, Value::Text));
                }
                data.rows.push(values);
            }
            Ok(data)
        })
    }

    fn referenced_key_values(
        &self,
        table: &str,
        column: &str,
        pk_filter: &BTreeSet<PkValue>,
    ) -> Result<BTreeSet<Value>, CollaboratorError> {
        if pk_filter.iter().all(Value::is_null) {
            return Ok(BTreeSet::new());
        }
        Spi::connect(|client| {
            let rel = self.describe(&client, table)?;
            let pk = rel.primary_key()?;
            let col = rel.column(column)?;
            let query = format!(
                "SELECT DISTINCT {col}::text AS v FROM {rel} \
                 WHERE {pk}::text IN ({keys}) AND {col} IS NOT NULL",
                col = quote_identifier(col),
                rel = rel.qualified,
                pk = quote_identifier(pk),
                keys = in_list(pk_filter),
            );
            Ok(select_text(&client, &query)
                .map_err(rows_error)?
                .into_iter()
                .map(Value::Text)
                .collect())
        })
    }

    fn keys_referencing(
        &self,
        table: &str,
        column: &str,
        values: &BTreeSet<Value>,
    ) -> Result<BTreeSet<PkValue>, CollaboratorError> {
        if values.iter().all(Value::is_null) {
            return Ok(BTreeSet::new());
        }
        Spi::connect(|client| {
            let rel = self.describe(&client, table)?;
            let pk = rel.primary_key()?;
            let col = rel.column(column)?;
            let query = format!(
                "SELECT DISTINCT {pk}::text AS v FROM {rel} \
                 WHERE {col}::text IN ({values}) AND {pk} IS NOT NULL",
                pk = quote_identifier(pk),
                rel = rel.qualified,
                col = quote_identifier(col),
                values = in_list(values),
            );
            Ok(select_text(&client, &query)
                .map_err(rows_error)?
                .into_iter()
                .map(Value::Text)
                .collect())
        })
    }
}

fn rows_error(e: SpiError) -> CollaboratorError {
    CollaboratorError::Rows {
        message: e.to_string(),
    }
}

/// Comma-separated text literals for the non-null values.
fn in_list(values: &BTreeSet<Value>) -> String {
    values
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| quote_literal(&v.to_string()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// First column of every row, nulls dropped.
fn select_text(client: &SpiClient<'_>, query: &str) -> Result<Vec<String>, SpiError> {
    let mut out = Vec::new();
    for row in client.select(query, None, &[])? {
        if let Some(v) = row.get::<String>(1)? {
            out.push(v);
        }
    }
    Ok(out)
}
