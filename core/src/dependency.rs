//! Table-dependency queries built on [`depth_first_search`].
//!
//! Table-list queries walk foreign keys only. Dataset queries additionally
//! track primary keys in a [`PkTableMap`] and then read the rows of every
//! table in search order through a [`RowSource`].

use log::info;

use crate::callback::{KeyCallback, KeyDirection, PkFilteredCallback, SearchCallback};
use crate::dataset::Dataset;
use crate::error::{Operation, SearchResult, WithContext};
use crate::metadata::{RowSource, SchemaMetadata};
use crate::name::TableSet;
use crate::pk_map::PkTableMap;
use crate::search::depth_first_search;
use crate::value::PkValue;

fn closure<S, I, T>(schema: &S, tables: I, direction: KeyDirection) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    let seeds: Vec<T> = tables.into_iter().collect();
    let mut callback = KeyCallback::new(schema, direction);
    let result = depth_first_search(&seeds, &mut callback)?;
    info!(
        "{:?} closure of {} seed(s): {} table(s)",
        direction,
        seeds.len(),
        result.len()
    );
    Ok(result.into_vec())
}

/// Tables the seeds depend on through their own foreign keys, seeds first.
///
/// Follows imported keys only: `C -> B -> A` for a chain where C references
/// B and B references A.
pub fn dependent_tables<S, I, T>(schema: &S, tables: I) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    closure(schema, tables, KeyDirection::Imported)
}

/// Tables depending on the seeds through foreign keys declared elsewhere.
pub fn depends_on_tables<S, I, T>(schema: &S, tables: I) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    closure(schema, tables, KeyDirection::Exported)
}

/// Every table tied to the seeds by foreign keys in either direction.
pub fn all_dependent_tables<S, I, T>(schema: &S, tables: I) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    closure(schema, tables, KeyDirection::Both)
}

fn direct<S>(schema: &S, table: &str, direction: KeyDirection) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
{
    let case = schema.case_sensitivity();
    let mut neighbours = TableSet::new(case);
    for edge in KeyCallback::new(schema, direction).edges_from(table)? {
        if !case.eq(edge.target(), table) {
            neighbours.insert(edge.target());
        }
    }
    Ok(neighbours.into_vec())
}

/// Tables `table` references directly, without the transitive closure.
pub fn direct_dependent_tables<S>(schema: &S, table: &str) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
{
    direct(schema, table, KeyDirection::Imported)
}

/// Tables that reference `table` directly.
pub fn direct_depends_on_tables<S>(schema: &S, table: &str) -> SearchResult<Vec<String>>
where
    S: SchemaMetadata + ?Sized,
{
    direct(schema, table, KeyDirection::Exported)
}

/// Rows reachable from the primary keys recorded in `pks`.
///
/// Seeds the search with every table in `pks`, follows foreign keys in both
/// directions, and grows `pks` with the keys of every row reached until no
/// table gains keys. Tables first reached by keys found after the search are
/// appended in discovery order. Each table is then read in full or
/// restricted to its accumulated keys. `pks` keeps the accumulated keys for
/// the caller.
pub fn dataset<S, R>(schema: &S, rows: &R, pks: &mut PkTableMap) -> SearchResult<Dataset>
where
    S: SchemaMetadata + ?Sized,
    R: RowSource + ?Sized,
{
    let seeds: Vec<String> = pks.table_names().into_iter().map(String::from).collect();
    let (mut tables, late) = {
        let mut callback = PkFilteredCallback::new(KeyCallback::both(schema), rows, pks);
        let tables = depth_first_search(&seeds, &mut callback)?;
        (tables, callback.expand_pending()?)
    };
    for table in &late {
        tables.insert(table);
    }

    let mut data = Dataset::new();
    for table in &tables {
        let filter = pks.row_filter(table);
        data.push(rows.rows_of(table, filter).context(table, Operation::MaterializeRows)?);
    }

    info!(
        "dataset from {} seed table(s): {} table(s), {} row(s)",
        seeds.len(),
        data.len(),
        data.row_count()
    );
    Ok(data)
}

/// [`dataset`] seeded with a single row set.
pub fn dataset_for_row<S, R, I>(schema: &S, rows: &R, table: &str, pk_values: I) -> SearchResult<Dataset>
where
    S: SchemaMetadata + ?Sized,
    R: RowSource + ?Sized,
    I: IntoIterator<Item = PkValue>,
{
    let mut pks = PkTableMap::new(schema.case_sensitivity());
    pks.add_input(table, pk_values);
    dataset(schema, rows, &mut pks)
}

/// Every row of every table related to `table`, skipping tables already in
/// `already_seen`.
///
/// The tables materialized here are added to `already_seen` once all of them
/// have been read, so successive calls over several roots never repeat a
/// table. On error `already_seen` is left untouched.
pub fn all_dataset<S, R>(
    schema: &S,
    rows: &R,
    table: &str,
    already_seen: &mut TableSet,
) -> SearchResult<Dataset>
where
    S: SchemaMetadata + ?Sized,
    R: RowSource + ?Sized,
{
    let mut pks = PkTableMap::new(schema.case_sensitivity());
    pks.mark_full(table);
    let tables = {
        let mut callback = PkFilteredCallback::new(KeyCallback::both(schema), rows, &mut pks);
        depth_first_search([table], &mut callback)?
    };

    let mut data = Dataset::new();
    for name in tables.iter().filter(|t| !already_seen.contains(t)) {
        let filter = pks.row_filter(name);
        data.push(rows.rows_of(name, filter).context(name, Operation::MaterializeRows)?);
    }

    for name in &tables {
        already_seen.insert(name);
    }

    info!(
        "full dataset from {}: {} of {} table(s) new, {} row(s)",
        table,
        data.len(),
        tables.len(),
        data.row_count()
    );
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use crate::dataset::TableData;
    use crate::error::CollaboratorError;
    use crate::fixtures;
    use crate::memory::{MemoryDatabase, TableDef};
    use crate::metadata::RowFilter;
    use crate::name::CaseSensitivity;
    use crate::value::Value;

    fn pk_column(data: &Dataset, table: &str) -> Vec<Value> {
        data.table(table)
            .unwrap()
            .column_values("id")
            .unwrap()
            .into_iter()
            .cloned()
            .collect()
    }

    fn text(values: &[&str]) -> Vec<Value> {
        values.iter().map(|v| Value::from(*v)).collect()
    }

    /// Every non-null `fk` value of `child` is a key of `parent` in `data`.
    fn assert_parents_present(data: &Dataset, child: &str, fk: &str, parent: &str) {
        let keys: BTreeSet<Value> = pk_column(data, parent).into_iter().collect();
        for value in data.table(child).unwrap().column_values(fk).unwrap() {
            if !value.is_null() {
                assert!(keys.contains(value), "dangling {child}.{fk} {value}");
            }
        }
    }

    /// Row source that fails to read one table.
    struct FailingRows<'a> {
        db: &'a MemoryDatabase,
        table: &'a str,
    }

    impl RowSource for FailingRows<'_> {
        fn rows_of(&self, table: &str, filter: RowFilter<'_>) -> Result<TableData, CollaboratorError> {
            if table == self.table {
                return Err(CollaboratorError::Rows {
                    message: "connection lost".into(),
                });
            }
            self.db.rows_of(table, filter)
        }

        fn referenced_key_values(
            &self,
            table: &str,
            column: &str,
            pk_filter: &BTreeSet<PkValue>,
        ) -> Result<BTreeSet<Value>, CollaboratorError> {
            self.db.referenced_key_values(table, column, pk_filter)
        }

        fn keys_referencing(
            &self,
            table: &str,
            column: &str,
            values: &BTreeSet<Value>,
        ) -> Result<BTreeSet<PkValue>, CollaboratorError> {
            self.db.keys_referencing(table, column, values)
        }
    }

    // --- table lists ---

    #[test]
    fn test_dependent_tables_chain() {
        let db = fixtures::chain();
        assert_eq!(dependent_tables(&db, ["C"]).unwrap(), vec!["C", "B", "A"]);
        assert_eq!(dependent_tables(&db, ["A"]).unwrap(), vec!["A"]);
    }

    #[test]
    fn test_depends_on_tables_chain() {
        let db = fixtures::chain();
        assert_eq!(depends_on_tables(&db, ["A"]).unwrap(), vec!["A", "B", "C"]);
        assert_eq!(depends_on_tables(&db, ["C"]).unwrap(), vec!["C"]);
    }

    #[test]
    fn test_all_dependent_tables_chain() {
        let db = fixtures::chain();
        assert_eq!(all_dependent_tables(&db, ["A"]).unwrap(), vec!["A", "B", "C"]);
        assert_eq!(all_dependent_tables(&db, ["B"]).unwrap(), vec!["B", "A", "C"]);
    }

    #[test]
    fn test_dependent_tables_is_deterministic() {
        let db = fixtures::shop();
        let first = dependent_tables(&db, ["order_line"]).unwrap();
        let second = dependent_tables(&db, ["order_line"]).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec!["order_line", "orders", "customer", "product"]);
    }

    #[test]
    fn test_all_dependent_tables_is_closed() {
        let db = fixtures::shop();
        let result = all_dependent_tables(&db, ["product"]).unwrap();
        assert_eq!(result, vec!["product", "order_line", "orders", "customer"]);

        let members = TableSet::from_names(CaseSensitivity::Insensitive, &result);
        for table in &result {
            let mut cb = KeyCallback::both(&db);
            for edge in cb.edges_from(table).unwrap() {
                assert!(members.contains(edge.target()), "{} missing", edge.target());
            }
        }
        assert!(!members.contains("audit"));
    }

    #[test]
    fn test_no_duplicates_with_repeated_seeds() {
        let db = fixtures::shop();
        let result = all_dependent_tables(&db, ["orders", "CUSTOMER", "orders", "audit"]).unwrap();
        assert_eq!(result, vec!["orders", "customer", "order_line", "product", "audit"]);
    }

    #[test]
    fn test_cycle_from_each_member() {
        let db = fixtures::cycle();
        for seed in ["A", "B", "C"] {
            let result = dependent_tables(&db, [seed]).unwrap();
            assert_eq!(result.len(), 3, "seed {seed}");
            assert_eq!(result[0], seed);
        }
    }

    #[test]
    fn test_unknown_table_fails() {
        let db = fixtures::chain();
        let err = dependent_tables(&db, ["nope"]).unwrap_err();
        assert_eq!(err.table, "nope");
        assert_eq!(err.cause, CollaboratorError::table_not_found("nope"));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn test_dangling_foreign_key_fails() {
        let mut db = fixtures::chain();
        db.add_table(
            TableDef::new("D", ["id", "x_id"])
                .primary_key("id")
                .foreign_key("x_id", "X", "id"),
        )
        .unwrap();
        let err = dependent_tables(&db, ["D"]).unwrap_err();
        assert_eq!(err.table, "X");
        assert!(err.cause.is_table_not_found());
    }

    #[test]
    fn test_direct_neighbours() {
        let db = fixtures::shop();
        assert_eq!(
            direct_dependent_tables(&db, "order_line").unwrap(),
            vec!["orders", "product"]
        );
        assert_eq!(direct_depends_on_tables(&db, "customer").unwrap(), vec!["orders"]);
        assert!(direct_dependent_tables(&db, "customer").unwrap().is_empty());
    }

    #[test]
    fn test_direct_neighbours_skip_self_reference() {
        let db = fixtures::employees();
        assert!(direct_dependent_tables(&db, "employee").unwrap().is_empty());
    }

    // --- datasets ---

    #[test]
    fn test_dataset_filters_by_root_key() {
        let db = fixtures::chain_with_rows();
        let mut pks = PkTableMap::new(CaseSensitivity::Insensitive);
        pks.add_input("A", [Value::from("A1")]);

        let data = dataset(&db, &db, &mut pks).unwrap();

        assert_eq!(data.table_names(), vec!["A", "B", "C"]);
        assert_eq!(pk_column(&data, "A"), text(&["A1"]));
        assert_eq!(pk_column(&data, "B"), text(&["B1", "B2"]));
        assert_eq!(pk_column(&data, "C"), text(&["C1", "C2"]));
        // accumulated keys stay with the caller
        assert_eq!(pks.get("C").map(BTreeSet::len), Some(2));
    }

    #[test]
    fn test_dataset_from_leaf_pulls_parents() {
        let db = fixtures::chain_with_rows();
        let data = dataset_for_row(&db, &db, "C", [Value::from("C4")]).unwrap();
        assert_eq!(data.table_names(), vec!["C", "B", "A"]);
        assert_eq!(pk_column(&data, "B"), text(&["B3"]));
        assert_eq!(pk_column(&data, "A"), text(&["A2"]));
        // B3 also has C3, reached back through the exported edge
        assert_eq!(pk_column(&data, "C"), text(&["C3", "C4"]));
    }

    #[test]
    fn test_dataset_skips_tables_without_matching_rows() {
        let db = fixtures::chain_with_rows();
        let data = dataset_for_row(&db, &db, "A", [Value::from("A3")]).unwrap();
        assert_eq!(data.table_names(), vec!["A"]);
        assert_eq!(data.row_count(), 1);
    }

    #[test]
    fn test_dataset_shop_order() {
        let db = fixtures::shop_with_rows();
        let data = dataset_for_row(&db, &db, "orders", [Value::Int(12)]).unwrap();
        assert_eq!(
            data.table_names(),
            vec!["orders", "customer", "order_line", "product"]
        );
        assert_eq!(pk_column(&data, "orders"), vec![Value::Int(12)]);
        assert_eq!(pk_column(&data, "customer"), vec![Value::Int(2)]);
        assert_eq!(pk_column(&data, "order_line"), vec![Value::Int(1002)]);
        assert_eq!(pk_column(&data, "product"), vec![Value::Int(102)]);
        assert!(data.table("audit").is_none());
    }

    #[test]
    fn test_dataset_accumulates_sibling_keys() {
        let db = fixtures::shop_with_rows();
        let data = dataset_for_row(&db, &db, "orders", [Value::Int(10)]).unwrap();
        // customer 1 also owns order 11, which is unioned in
        assert_eq!(pk_column(&data, "orders"), vec![Value::Int(10), Value::Int(11)]);
        assert_eq!(
            pk_column(&data, "order_line"),
            vec![Value::Int(1000), Value::Int(1001)]
        );
        assert_eq!(
            pk_column(&data, "product"),
            vec![Value::Int(100), Value::Int(101)]
        );
    }

    #[test]
    fn test_dataset_unfiltered_seed_keeps_targets_full() {
        let db = fixtures::chain_with_rows();
        let mut pks = PkTableMap::new(CaseSensitivity::Insensitive);
        pks.mark_full("B");
        let data = dataset(&db, &db, &mut pks).unwrap();
        assert_eq!(data.table_names(), vec!["B", "A", "C"]);
        assert_eq!(data.row_count(), 10);
    }

    #[test]
    fn test_dataset_merges_multiple_seeds() {
        let db = fixtures::chain_with_rows();
        let mut pks = PkTableMap::new(CaseSensitivity::Insensitive);
        pks.add_input("C", [Value::from("C1")]);
        pks.add_input("C", [Value::from("C3")]);
        let data = dataset(&db, &db, &mut pks).unwrap();
        // A1 leads back to B2 through the exported edge
        assert_eq!(pk_column(&data, "B"), text(&["B1", "B2", "B3"]));
        assert_eq!(pk_column(&data, "A"), text(&["A1", "A2"]));
        assert_eq!(pk_column(&data, "C"), text(&["C1", "C2", "C3", "C4"]));
        assert_parents_present(&data, "B", "a_id", "A");
        assert_parents_present(&data, "C", "b_id", "B");
    }

    #[test]
    fn test_dataset_self_reference() {
        let db = fixtures::employees();
        let data = dataset_for_row(&db, &db, "employee", [Value::Int(3)]).unwrap();
        // the self-reference is a single imported edge: the whole chain of
        // managers is pulled in, reports are not
        assert_eq!(
            pk_column(&data, "employee"),
            vec![Value::Int(1), Value::Int(2), Value::Int(3)]
        );
        assert_parents_present(&data, "employee", "manager_id", "employee");
    }

    #[test]
    fn test_dataset_follows_keys_added_after_visit() {
        let db = fixtures::two_parents();
        let data = dataset_for_row(&db, &db, "C", [Value::from("C1")]).unwrap();
        assert_eq!(data.table_names(), vec!["C", "B", "D"]);
        // C2 arrives through B1 after C was entered; its D2 must follow
        assert!(pk_column(&data, "C").contains(&Value::from("C2")));
        assert!(pk_column(&data, "D").contains(&Value::from("D2")));
        assert_parents_present(&data, "C", "b_id", "B");
        assert_parents_present(&data, "C", "d_id", "D");
    }

    #[test]
    fn test_dataset_enters_table_reached_by_late_keys() {
        let db = fixtures::two_parents();
        // C3 has no D parent, so D is only reached through C4
        let data = dataset_for_row(&db, &db, "C", [Value::from("C3")]).unwrap();
        assert_eq!(data.table_names(), vec!["C", "B", "D"]);
        assert!(pk_column(&data, "D").contains(&Value::from("D2")));
        assert_parents_present(&data, "C", "b_id", "B");
        assert_parents_present(&data, "C", "d_id", "D");
    }

    #[test]
    fn test_dataset_missing_primary_key_fails_on_reachable_keys() {
        let mut db = fixtures::chain_with_rows();
        db.add_table(TableDef::new("note", ["a_id", "body"]).foreign_key("a_id", "A", "id"))
            .unwrap();
        db.insert("note", vec![Value::from("A1"), Value::from("hi")]).unwrap();

        let err = dataset_for_row(&db, &db, "A", [Value::from("A1")]).unwrap_err();
        assert_eq!(err.table, "note");
        assert_eq!(err.operation, Operation::ResolveReachableKeys);
        assert_eq!(err.cause, CollaboratorError::NoPrimaryKey { table: "note".into() });
    }

    #[test]
    fn test_dataset_missing_primary_key_fails_on_materialize() {
        let mut db = fixtures::chain_with_rows();
        db.add_table(TableDef::new("log", ["msg"])).unwrap();
        db.insert("log", vec![Value::from("started")]).unwrap();

        let err = dataset_for_row(&db, &db, "log", [Value::from("started")]).unwrap_err();
        assert_eq!(err.table, "log");
        assert_eq!(err.operation, Operation::MaterializeRows);
        assert_eq!(err.cause, CollaboratorError::NoPrimaryKey { table: "log".into() });
    }

    #[test]
    fn test_dataset_empty_map() {
        let db = fixtures::chain_with_rows();
        let mut pks = PkTableMap::new(CaseSensitivity::Insensitive);
        let data = dataset(&db, &db, &mut pks).unwrap();
        assert!(data.is_empty());
    }

    #[test]
    fn test_dataset_unknown_seed_fails() {
        let db = fixtures::chain_with_rows();
        let err = dataset_for_row(&db, &db, "ghost", [Value::Int(1)]).unwrap_err();
        assert_eq!(err.table, "ghost");
    }

    #[test]
    fn test_all_dataset_reads_everything_related() {
        let db = fixtures::shop_with_rows();
        let mut seen = TableSet::new(CaseSensitivity::Insensitive);
        let data = all_dataset(&db, &db, "customer", &mut seen).unwrap();
        assert_eq!(
            data.table_names(),
            vec!["customer", "orders", "order_line", "product"]
        );
        assert_eq!(data.row_count(), 2 + 3 + 3 + 3);
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_all_dataset_skips_already_seen() {
        let db = fixtures::shop_with_rows();
        let mut seen = TableSet::from_names(CaseSensitivity::Insensitive, ["ORDERS"]);
        let data = all_dataset(&db, &db, "product", &mut seen).unwrap();
        assert_eq!(data.table_names(), vec!["product", "order_line", "customer"]);

        let again = all_dataset(&db, &db, "customer", &mut seen).unwrap();
        assert!(again.is_empty());

        let audit = all_dataset(&db, &db, "audit", &mut seen).unwrap();
        assert_eq!(audit.table_names(), vec!["audit"]);
    }

    #[test]
    fn test_all_dataset_leaves_seen_untouched_on_read_error() {
        let db = fixtures::shop_with_rows();
        let rows = FailingRows {
            db: &db,
            table: "order_line",
        };
        let mut seen = TableSet::from_names(CaseSensitivity::Insensitive, ["audit"]);

        let err = all_dataset(&db, &rows, "customer", &mut seen).unwrap_err();
        assert_eq!(err.table, "order_line");
        assert_eq!(err.operation, Operation::MaterializeRows);
        assert_eq!(seen.as_slice(), ["audit"]);
    }

    #[test]
    fn test_all_dataset_leaves_seen_untouched_on_search_error() {
        let mut db = fixtures::chain_with_rows();
        db.add_table(TableDef::new("D", ["id", "x_id"]).primary_key("id").foreign_key("x_id", "X", "id"))
            .unwrap();
        let mut seen = TableSet::new(CaseSensitivity::Insensitive);

        let err = all_dataset(&db, &db, "D", &mut seen).unwrap_err();
        assert!(err.cause.is_table_not_found());
        assert!(seen.is_empty());
    }
}
