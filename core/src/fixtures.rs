//! Schemas shared by the unit tests.

use crate::memory::{MemoryDatabase, TableDef};
use crate::name::CaseSensitivity;
use crate::value::Value;

fn row(values: &[&str]) -> Vec<Value> {
    values.iter().map(|v| Value::from(*v)).collect()
}

/// A <- B <- C, no rows.
pub fn chain() -> MemoryDatabase {
    let mut db = MemoryDatabase::new(CaseSensitivity::Insensitive);
    db.add_table(TableDef::new("A", ["id"]).primary_key("id")).unwrap();
    db.add_table(TableDef::new("B", ["id", "a_id"]).primary_key("id").foreign_key("a_id", "A", "id"))
        .unwrap();
    db.add_table(TableDef::new("C", ["id", "b_id"]).primary_key("id").foreign_key("b_id", "B", "id"))
        .unwrap();
    db
}

/// A <- B <- C with rows:
///
/// ```text
/// A: A1 A2 A3
/// B: B1(A1) B2(A1) B3(A2)
/// C: C1(B1) C2(B2) C3(B3) C4(B3)
/// ```
pub fn chain_with_rows() -> MemoryDatabase {
    let mut db = chain();
    db.insert_rows("A", [row(&["A1"]), row(&["A2"]), row(&["A3"])]).unwrap();
    db.insert_rows(
        "B",
        [row(&["B1", "A1"]), row(&["B2", "A1"]), row(&["B3", "A2"])],
    )
    .unwrap();
    db.insert_rows(
        "C",
        [
            row(&["C1", "B1"]),
            row(&["C2", "B2"]),
            row(&["C3", "B3"]),
            row(&["C4", "B3"]),
        ],
    )
    .unwrap();
    db
}

/// A references B, B references C, C references A.
pub fn cycle() -> MemoryDatabase {
    let mut db = MemoryDatabase::new(CaseSensitivity::Insensitive);
    db.add_table(TableDef::new("A", ["id", "b_id"]).primary_key("id").foreign_key("b_id", "B", "id"))
        .unwrap();
    db.add_table(TableDef::new("B", ["id", "c_id"]).primary_key("id").foreign_key("c_id", "C", "id"))
        .unwrap();
    db.add_table(TableDef::new("C", ["id", "a_id"]).primary_key("id").foreign_key("a_id", "A", "id"))
        .unwrap();
    db
}

/// customer <- orders <- order_line -> product, plus an unrelated audit table.
pub fn shop() -> MemoryDatabase {
    let mut db = MemoryDatabase::new(CaseSensitivity::Insensitive);
    db.add_table(TableDef::new("customer", ["id", "name"]).primary_key("id")).unwrap();
    db.add_table(
        TableDef::new("orders", ["id", "customer_id"])
            .primary_key("id")
            .foreign_key("customer_id", "customer", "id"),
    )
    .unwrap();
    db.add_table(TableDef::new("product", ["id", "name"]).primary_key("id")).unwrap();
    db.add_table(
        TableDef::new("order_line", ["id", "order_id", "product_id"])
            .primary_key("id")
            .foreign_key("order_id", "orders", "id")
            .foreign_key("product_id", "product", "id"),
    )
    .unwrap();
    db.add_table(TableDef::new("audit", ["id", "msg"]).primary_key("id")).unwrap();
    db
}

/// Self-referencing hierarchy: 1 <- 2 <- 3, 1 <- 4.
pub fn employees() -> MemoryDatabase {
    let mut db = MemoryDatabase::new(CaseSensitivity::Insensitive);
    db.add_table(
        TableDef::new("employee", ["id", "manager_id"])
            .primary_key("id")
            .foreign_key("manager_id", "employee", "id"),
    )
    .unwrap();
    db.insert_rows(
        "employee",
        [
            vec![Value::Int(1), Value::Null],
            vec![Value::Int(2), Value::Int(1)],
            vec![Value::Int(3), Value::Int(2)],
            vec![Value::Int(4), Value::Int(1)],
        ],
    )
    .unwrap();
    db
}

/// [`shop`] with rows:
///
/// ```text
/// customer: 1, 2
/// orders:   10(1) 11(1) 12(2)
/// product:  100 101 102
/// line:     1000(10,100) 1001(10,101) 1002(12,102)
/// ```
pub fn shop_with_rows() -> MemoryDatabase {
    let mut db = shop();
    db.insert_rows(
        "customer",
        [
            vec![Value::Int(1), "alice".into()],
            vec![Value::Int(2), "bob".into()],
        ],
    )
    .unwrap();
    db.insert_rows(
        "orders",
        [
            vec![Value::Int(10), Value::Int(1)],
            vec![Value::Int(11), Value::Int(1)],
            vec![Value::Int(12), Value::Int(2)],
        ],
    )
    .unwrap();
    db.insert_rows(
        "product",
        [
            vec![Value::Int(100), "pen".into()],
            vec![Value::Int(101), "ink".into()],
            vec![Value::Int(102), "pad".into()],
        ],
    )
    .unwrap();
    db.insert_rows(
        "order_line",
        [
            vec![Value::Int(1000), Value::Int(10), Value::Int(100)],
            vec![Value::Int(1001), Value::Int(10), Value::Int(101)],
            vec![Value::Int(1002), Value::Int(12), Value::Int(102)],
        ],
    )
    .unwrap();
    db.insert("audit", vec![Value::Int(1), "created".into()]).unwrap();
    db
}

/// C references both B and D:
///
/// ```text
/// B: B1 B2
/// D: D1 D2
/// C: C1(B1,D1) C2(B1,D2) C3(B2,-) C4(B2,D2)
/// ```
pub fn two_parents() -> MemoryDatabase {
    let mut db = MemoryDatabase::new(CaseSensitivity::Insensitive);
    db.add_table(TableDef::new("B", ["id"]).primary_key("id")).unwrap();
    db.add_table(TableDef::new("D", ["id"]).primary_key("id")).unwrap();
    db.add_table(
        TableDef::new("C", ["id", "b_id", "d_id"])
            .primary_key("id")
            .foreign_key("b_id", "B", "id")
            .foreign_key("d_id", "D", "id"),
    )
    .unwrap();
    db.insert_rows("B", [row(&["B1"]), row(&["B2"])]).unwrap();
    db.insert_rows("D", [row(&["D1"]), row(&["D2"])]).unwrap();
    db.insert_rows(
        "C",
        [
            row(&["C1", "B1", "D1"]),
            row(&["C2", "B1", "D2"]),
            vec!["C3".into(), "B2".into(), Value::Null],
            row(&["C4", "B2", "D2"]),
        ],
    )
    .unwrap();
    db
}
