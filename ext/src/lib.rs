//! tabledeps: PostgreSQL extension for foreign-key dependency search.
//!
//! Wraps tabledeps-core to provide SQL functions for the dependency closure
//! of a set of tables and for extracting the rows that must travel with a
//! set of primary keys. Schema metadata comes from the system catalogs of
//! the schema named by `tabledeps.schema`.

use pgrx::prelude::*;

mod catalog;
mod closure;
mod extract;
mod guc;
mod rows;
mod util;

pg_module_magic!();

#[allow(non_snake_case)]
#[pg_guard]
pub extern "C-unwind" fn _PG_init() {
    guc::register_gucs();
}

#[cfg(any(test, feature = "pg_test"))]
#[pg_schema]
mod tests {
    use pgrx::prelude::*;
    use pgrx::JsonB;

    /// customer <- orders <- order_line -> product, audit unrelated.
    fn create_shop() {
        Spi::run(
            "CREATE SCHEMA shop;
             CREATE TABLE shop.customer (id int PRIMARY KEY, name text);
             CREATE TABLE shop.orders (id int PRIMARY KEY, customer_id int REFERENCES shop.customer(id));
             CREATE TABLE shop.product (id int PRIMARY KEY, name text);
             CREATE TABLE shop.order_line (
                 id int PRIMARY KEY,
                 order_id int REFERENCES shop.orders(id),
                 product_id int REFERENCES shop.product(id)
             );
             CREATE TABLE shop.audit (id int PRIMARY KEY, msg text);
             INSERT INTO shop.customer VALUES (1, 'alice'), (2, 'bob');
             INSERT INTO shop.orders VALUES (10, 1), (11, 1), (12, 2);
             INSERT INTO shop.product VALUES (100, 'pen'), (101, 'ink'), (102, 'pad');
             INSERT INTO shop.order_line VALUES (1000, 10, 100), (1001, 10, 101), (1002, 12, 102);
             INSERT INTO shop.audit VALUES (1, 'created');
             SET tabledeps.schema = 'shop';",
        )
        .expect("create shop schema");
    }

    fn tables(query: &str) -> Vec<String> {
        Spi::connect(|client| {
            let mut out = Vec::new();
            for row in client.select(query, None, &[])? {
                if let Some(name) = row.get_by_name::<String, _>("table_name")? {
                    out.push(name);
                }
            }
            Ok::<_, pgrx::spi::SpiError>(out)
        })
        .expect("select tables")
    }

    #[pg_test]
    fn test_guc_defaults() {
        let schema = Spi::get_one::<String>("SHOW tabledeps.schema");
        assert_eq!(schema, Ok(Some("public".to_string())));

        let case = Spi::get_one::<String>("SHOW tabledeps.case_sensitive");
        assert_eq!(case, Ok(Some("on".to_string())));
    }

    #[pg_test]
    fn test_dependent_tables_follows_references() {
        create_shop();
        let result = tables(
            "SELECT table_name FROM tabledeps_dependent_tables(ARRAY['order_line']) ORDER BY position",
        );
        assert_eq!(result, vec!["order_line", "orders", "customer", "product"]);
    }

    #[pg_test]
    fn test_depends_on_tables() {
        create_shop();
        let result = tables(
            "SELECT table_name FROM tabledeps_depends_on_tables(ARRAY['customer']) ORDER BY position",
        );
        assert_eq!(result, vec!["customer", "orders", "order_line"]);
    }

    #[pg_test]
    fn test_all_dependent_tables_skips_unrelated() {
        create_shop();
        let result = tables(
            "SELECT table_name FROM tabledeps_all_dependent_tables(ARRAY['customer']) ORDER BY position",
        );
        assert_eq!(result.len(), 4);
        assert!(!result.contains(&"audit".to_string()));
    }

    #[pg_test]
    fn test_case_insensitive_lookup() {
        create_shop();
        Spi::run("SET tabledeps.case_sensitive = off").expect("set guc");
        let result = tables(
            "SELECT table_name FROM tabledeps_dependent_tables(ARRAY['ORDERS']) ORDER BY position",
        );
        // seeds keep the caller's spelling
        assert_eq!(result, vec!["ORDERS", "customer"]);
    }

    #[pg_test]
    #[should_panic(expected = "ghost")]
    fn test_unknown_table_errors() {
        create_shop();
        let _ = Spi::get_one::<String>(
            "SELECT table_name FROM tabledeps_dependent_tables(ARRAY['ghost'])",
        );
    }

    #[pg_test]
    fn test_direct_dependencies() {
        create_shop();
        let result = tables(
            "SELECT table_name FROM tabledeps_direct_dependencies('order_line') ORDER BY position",
        );
        assert_eq!(result, vec!["orders", "product"]);

        let result = tables(
            "SELECT table_name FROM tabledeps_direct_dependencies('orders', 'exported') ORDER BY position",
        );
        assert_eq!(result, vec!["order_line"]);
    }

    #[pg_test]
    fn test_composite_foreign_key_is_followed() {
        Spi::run(
            "CREATE SCHEMA comp;
             CREATE TABLE comp.region (country text, code text, PRIMARY KEY (country, code));
             CREATE TABLE comp.store (
                 id int PRIMARY KEY,
                 country text,
                 code text,
                 FOREIGN KEY (country, code) REFERENCES comp.region (country, code)
             );
             SET tabledeps.schema = 'comp';",
        )
        .expect("create comp schema");

        let result = tables(
            "SELECT table_name FROM tabledeps_dependent_tables(ARRAY['store']) ORDER BY position",
        );
        assert_eq!(result, vec!["store", "region"]);

        let result = tables(
            "SELECT table_name FROM tabledeps_direct_dependencies('store') ORDER BY position",
        );
        assert_eq!(result, vec!["region"]);

        let pairs = Spi::get_one::<i64>(
            "SELECT count(*) FROM tabledeps_direct_dependencies('region', 'exported')",
        );
        assert_eq!(pairs, Ok(Some(1)));
    }

    #[pg_test]
    fn test_dataset_filters_by_primary_key() {
        create_shop();
        let JsonB(out) = Spi::get_one::<JsonB>(
            r#"SELECT tabledeps_dataset('{"customer": [2]}'::jsonb)"#,
        )
        .expect("spi")
        .expect("not null");

        let tables = out["tables"].as_array().expect("tables array");
        let rows_of = |name: &str| {
            tables
                .iter()
                .find(|t| t["table"] == name)
                .and_then(|t| t["rows"].as_array())
                .map(|r| r.len())
        };
        assert_eq!(rows_of("customer"), Some(1));
        assert_eq!(rows_of("orders"), Some(1));
        assert_eq!(rows_of("order_line"), Some(1));
        assert_eq!(rows_of("product"), Some(1));
        assert_eq!(rows_of("audit"), None);
        assert_eq!(out["keys"]["orders"], serde_json::json!(["12"]));
    }

    #[pg_test]
    fn test_all_dataset_tracks_seen_tables() {
        create_shop();
        let JsonB(out) = Spi::get_one::<JsonB>(
            "SELECT tabledeps_all_dataset('customer', ARRAY['product'])",
        )
        .expect("spi")
        .expect("not null");

        let names: Vec<&str> = out["tables"]
            .as_array()
            .expect("tables array")
            .iter()
            .filter_map(|t| t["table"].as_str())
            .collect();
        assert_eq!(names, vec!["customer", "orders", "order_line"]);
        assert_eq!(out["already_seen"].as_array().map(|a| a.len()), Some(4));
    }
}
