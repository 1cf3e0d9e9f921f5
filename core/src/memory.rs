use std::collections::{BTreeSet, HashMap};

use crate::dataset::TableData;
use crate::error::CollaboratorError;
use crate::metadata::{ExportedKey, ImportedKey, RowFilter, RowSource, SchemaMetadata};
use crate::name::CaseSensitivity;
use crate::value::{PkValue, Value};

/// Table declaration for [`MemoryDatabase`].
#[derive(Debug, Clone)]
pub struct TableDef {
    pub name: String,
    pub columns: Vec<String>,
    pub primary_key: Option<String>,
    pub foreign_keys: Vec<ImportedKey>,
}

impl TableDef {
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            primary_key: None,
            foreign_keys: Vec::new(),
        }
    }

    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// `fk_column` references `referenced_table.referenced_column`.
    pub fn foreign_key(
        mut self,
        fk_column: impl Into<String>,
        referenced_table: impl Into<String>,
        referenced_column: impl Into<String>,
    ) -> Self {
        self.foreign_keys.push(ImportedKey {
            fk_column: fk_column.into(),
            referenced_table: referenced_table.into(),
            referenced_column: referenced_column.into(),
        });
        self
    }
}

struct StoredTable {
    def: TableDef,
    rows: Vec<Vec<Value>>,
}

/// In-memory schema and rows.
///
/// Foreign keys are indexed in both directions on load: each table keeps
/// its own keys in its [`TableDef`], `exported` holds the keys of other
/// tables pointing at it. A key may reference a table that is added later,
/// or never; the search reports the missing table when it gets there.
pub struct MemoryDatabase {
    tables: HashMap<String, StoredTable>,
    order: Vec<String>,
    exported: HashMap<String, Vec<ExportedKey>>,
    case: CaseSensitivity,
}

impl MemoryDatabase {
    pub fn new(case: CaseSensitivity) -> Self {
        Self {
            tables: HashMap::new(),
            order: Vec::new(),
            exported: HashMap::new(),
            case,
        }
    }

    fn key(&self, table: &str) -> String {
        self.case.fold(table).into_owned()
    }

    /// Register a table. Primary and foreign key columns must be declared
    /// columns of the table.
    pub fn add_table(&mut self, def: TableDef) -> Result<(), CollaboratorError> {
        let key = self.key(&def.name);
        if self.tables.contains_key(&key) {
            return Err(CollaboratorError::Metadata {
                message: format!("table {} already defined", def.name),
            });
        }
        if let Some(pk) = &def.primary_key {
            self.column_position(&def, pk)?;
        }
        for fk in &def.foreign_keys {
            self.column_position(&def, &fk.fk_column)?;
        }

        for fk in &def.foreign_keys {
            let referenced = self.key(&fk.referenced_table);
            self.exported
                .entry(referenced)
                .or_default()
                .push(ExportedKey {
                    referencing_table: def.name.clone(),
                    referencing_column: fk.fk_column.clone(),
                    pk_column: fk.referenced_column.clone(),
                });
        }

        self.order.push(key.clone());
        self.tables.insert(key, StoredTable { def, rows: Vec::new() });
        Ok(())
    }

    /// Append one row; values follow the declared column order.
    pub fn insert(&mut self, table: &str, row: Vec<Value>) -> Result<(), CollaboratorError> {
        let key = self.key(table);
        let stored = self
            .tables
            .get_mut(&key)
            .ok_or_else(|| CollaboratorError::table_not_found(table))?;
        if row.len() != stored.def.columns.len() {
            return Err(CollaboratorError::Rows {
                message: format!(
                    "table {} has {} column(s), row has {}",
                    stored.def.name,
                    stored.def.columns.len(),
                    row.len()
                ),
            });
        }
        stored.rows.push(row);
        Ok(())
    }

    pub fn insert_rows<I>(&mut self, table: &str, rows: I) -> Result<(), CollaboratorError>
    where
        I: IntoIterator<Item = Vec<Value>>,
    {
        for row in rows {
            self.insert(table, row)?;
        }
        Ok(())
    }

    /// Table names in registration order.
    pub fn table_names(&self) -> Vec<&str> {
        self.order
            .iter()
            .filter_map(|k| self.tables.get(k))
            .map(|t| t.def.name.as_str())
            .collect()
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }

    pub fn row_count(&self) -> usize {
        self.tables.values().map(|t| t.rows.len()).sum()
    }

    pub fn foreign_key_count(&self) -> usize {
        self.tables.values().map(|t| t.def.foreign_keys.len()).sum()
    }

    fn table(&self, table: &str) -> Result<&StoredTable, CollaboratorError> {
        self.tables
            .get(self.case.fold(table).as_ref())
            .ok_or_else(|| CollaboratorError::table_not_found(table))
    }

    fn column_position(&self, def: &TableDef, column: &str) -> Result<usize, CollaboratorError> {
        def.columns
            .iter()
            .position(|c| self.case.eq(c, column))
            .ok_or_else(|| CollaboratorError::ColumnNotFound {
                table: def.name.clone(),
                column: column.to_string(),
            })
    }

    fn pk_position(&self, def: &TableDef) -> Result<usize, CollaboratorError> {
        let pk = def
            .primary_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::NoPrimaryKey {
                table: def.name.clone(),
            })?;
        self.column_position(def, pk)
    }
}

impl SchemaMetadata for MemoryDatabase {
    fn table_exists(&self, table: &str) -> Result<bool, CollaboratorError> {
        Ok(self.tables.contains_key(self.case.fold(table).as_ref()))
    }

    fn foreign_keys_declared_by(&self, table: &str) -> Result<Vec<ImportedKey>, CollaboratorError> {
        Ok(self.table(table)?.def.foreign_keys.clone())
    }

    fn foreign_keys_referencing(&self, table: &str) -> Result<Vec<ExportedKey>, CollaboratorError> {
        self.table(table)?;
        Ok(self
            .exported
            .get(self.case.fold(table).as_ref())
            .cloned()
            .unwrap_or_default())
    }

    fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }
}

impl RowSource for MemoryDatabase {
    fn rows_of(&self, table: &str, filter: RowFilter<'_>) -> Result<TableData, CollaboratorError> {
        let stored = self.table(table)?;
        let mut data = TableData::new(stored.def.name.clone(), stored.def.columns.clone());
        match filter {
            RowFilter::All => data.rows = stored.rows.clone(),
            RowFilter::Keys(keys) => {
                let pk = self.pk_position(&stored.def)?;
                data.rows = stored
                    .rows
                    .iter()
                    .filter(|row| keys.contains(&row[pk]))
                    .cloned()
                    .collect();
            }
        }
        Ok(data)
    }

    fn referenced_key_values(
        &self,
        table: &str,
        column: &str,
        pk_filter: &BTreeSet<PkValue>,
    ) -> Result<BTreeSet<Value>, CollaboratorError> {
        let stored = self.table(table)?;
        let pk = self.pk_position(&stored.def)?;
        let col = self.column_position(&stored.def, column)?;
        Ok(stored
            .rows
            .iter()
            .filter(|row| pk_filter.contains(&row[pk]))
            .map(|row| &row[col])
            .filter(|v| !v.is_null())
            .cloned()
            .collect())
    }

    fn keys_referencing(
        &self,
        table: &str,
        column: &str,
        values: &BTreeSet<Value>,
    ) -> Result<BTreeSet<PkValue>, CollaboratorError> {
        let stored = self.table(table)?;
        let pk = self.pk_position(&stored.def)?;
        let col = self.column_position(&stored.def, column)?;
        Ok(stored
            .rows
            .iter()
            .filter(|row| values.contains(&row[col]))
            .map(|row| &row[pk])
            .filter(|v| !v.is_null())
            .cloned()
            .collect())
    }
}
