use std::fmt::Display;

use pgrx::prelude::*;
use serde_json::{json, Map, Value as Json};
use tabledeps_core::{Dataset, PkTableMap, PkValue, TableData, Value};

/// Raise a PostgreSQL ERROR carrying `err`'s message.
pub fn raise(err: impl Display) -> ! {
    error!("tabledeps: {}", err);
}

/// Number result tables from 1 in search order.
pub fn numbered(tables: Vec<String>) -> Vec<(i64, String)> {
    tables
        .into_iter()
        .enumerate()
        .map(|(i, name)| (i64::try_from(i + 1).unwrap_or(i64::MAX), name))
        .collect()
}

/// Convert a cell to JSON. Cells read over SPI are text.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Bool(b) => Json::Bool(*b),
        Value::Int(i) => json!(i),
        Value::Text(s) => Json::String(s.clone()),
    }
}

/// Convert a JSON scalar to the text form a `::text` cast produces.
/// Arrays and objects are not keys.
pub fn json_to_pk(json: &Json) -> Option<PkValue> {
    match json {
        Json::String(s) => Some(Value::Text(s.clone())),
        Json::Number(n) => Some(Value::Text(n.to_string())),
        Json::Bool(b) => Some(Value::Text(b.to_string())),
        Json::Null | Json::Array(_) | Json::Object(_) => None,
    }
}

/// Parse `{"table": [pk, ...], ...}` into a key map. A bare scalar stands
/// for a one-element list.
pub fn parse_pk_map(input: &Json, map: &mut PkTableMap) -> Result<(), String> {
    let object = input
        .as_object()
        .ok_or_else(|| "primary keys must be a JSON object of table -> [keys]".to_string())?;

    for (table, keys) in object {
        let list: Vec<&Json> = match keys {
            Json::Array(items) => items.iter().collect(),
            scalar => vec![scalar],
        };
        let mut values = Vec::with_capacity(list.len());
        for key in list {
            let value = json_to_pk(key)
                .ok_or_else(|| format!("invalid primary key {} for table {}", key, table))?;
            values.push(value);
        }
        map.add_input(table, values);
    }
    Ok(())
}

fn table_to_json(table: &TableData) -> Json {
    let rows: Vec<Json> = table
        .rows
        .iter()
        .map(|row| {
            let mut object = Map::new();
            for (column, value) in table.columns.iter().zip(row) {
                object.insert(column.clone(), value_to_json(value));
            }
            Json::Object(object)
        })
        .collect();
    json!({
        "table": table.name,
        "columns": table.columns,
        "rows": rows,
    })
}

/// Dataset as a JSON array, one element per table in search order.
pub fn dataset_to_json(dataset: &Dataset) -> Json {
    Json::Array(dataset.tables().iter().map(table_to_json).collect())
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use super::*;
    use pgrx::prelude::*;
    use tabledeps_core::CaseSensitivity;

    #[pg_test]
    fn test_json_keys_become_text() {
        assert_eq!(json_to_pk(&json!(7)), Some(Value::Text("7".into())));
        assert_eq!(json_to_pk(&json!("A1")), Some(Value::Text("A1".into())));
        assert_eq!(json_to_pk(&json!(true)), Some(Value::Text("true".into())));
        assert_eq!(json_to_pk(&json!(null)), None);
    }

    #[pg_test]
    fn test_parse_pk_map() {
        let mut map = PkTableMap::new(CaseSensitivity::Sensitive);
        parse_pk_map(&json!({"orders": [1, 2], "customer": "7"}), &mut map).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("orders").map(|s| s.len()), Some(2));
        assert!(map.get("customer").unwrap().contains(&Value::Text("7".into())));
    }

    #[pg_test]
    fn test_parse_pk_map_rejects_non_object() {
        let mut map = PkTableMap::new(CaseSensitivity::Sensitive);
        assert!(parse_pk_map(&json!([1, 2]), &mut map).is_err());
        assert!(parse_pk_map(&json!({"t": [[1]]}), &mut map).is_err());
    }

    #[pg_test]
    fn test_numbered_starts_at_one() {
        let n = numbered(vec!["c".into(), "b".into()]);
        assert_eq!(n, vec![(1, "c".to_string()), (2, "b".to_string())]);
    }

    #[pg_test]
    fn test_numbered_positions_are_bigint() {
        let n = numbered((0..3).map(|i| i.to_string()).collect());
        let last: i64 = n.last().map(|(pos, _)| *pos).unwrap();
        assert_eq!(last, 3);
    }
}
