use crate::value::Value;

/// Materialized rows of one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableData {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TableData {
    pub fn new(name: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Position of `column`, matched exactly as the row source spelled it.
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == column)
    }

    /// All values of one column, in row order.
    pub fn column_values(&self, column: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(column)?;
        Some(self.rows.iter().map(|row| &row[idx]).collect())
    }
}

/// Tables in dependency-search order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    tables: Vec<TableData>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, table: TableData) {
        self.tables.push(table);
    }

    /// Table by its materialized name, matched exactly.
    pub fn table(&self, name: &str) -> Option<&TableData> {
        self.tables.iter().find(|t| t.name == name)
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.tables.iter().map(|t| t.name.as_str()).collect()
    }

    pub fn tables(&self) -> &[TableData] {
        &self.tables
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.tables.iter().map(TableData::row_count).sum()
    }
}

impl IntoIterator for Dataset {
    type Item = TableData;
    type IntoIter = std::vec::IntoIter<TableData>;

    fn into_iter(self) -> Self::IntoIter {
        self.tables.into_iter()
    }
}
