use std::collections::{BTreeSet, HashMap, HashSet};

use crate::metadata::RowFilter;
use crate::name::CaseSensitivity;
use crate::value::PkValue;

/// Primary-key values of interest, per table.
///
/// Keys keep first-insertion order and compare under the map's case
/// sensitivity. Every operation only ever adds: value sets grow by union and
/// a table marked fully included stays that way.
#[derive(Debug, Clone, Default)]
pub struct PkTableMap {
    entries: Vec<(String, BTreeSet<PkValue>)>,
    index: HashMap<String, usize>,
    full: HashSet<String>,
    case: CaseSensitivity,
}

impl PkTableMap {
    pub fn new(case: CaseSensitivity) -> Self {
        Self {
            entries: Vec::new(),
            index: HashMap::new(),
            full: HashSet::new(),
            case,
        }
    }

    fn slot(&mut self, table: &str) -> usize {
        let key = self.case.fold(table).into_owned();
        if let Some(&idx) = self.index.get(&key) {
            return idx;
        }
        let idx = self.entries.len();
        self.entries.push((table.to_string(), BTreeSet::new()));
        self.index.insert(key, idx);
        idx
    }

    /// Union `values` into the set for `table`, creating the entry if needed.
    pub fn add_input<I>(&mut self, table: &str, values: I)
    where
        I: IntoIterator<Item = PkValue>,
    {
        let idx = self.slot(table);
        self.entries[idx].1.extend(values);
    }

    /// Record that every row of `table` is included.
    pub fn mark_full(&mut self, table: &str) {
        self.slot(table);
        self.full.insert(self.case.fold(table).into_owned());
    }

    /// Union every entry of `other` into this map.
    pub fn merge(&mut self, other: &PkTableMap) {
        for (table, values) in &other.entries {
            self.add_input(table, values.iter().cloned());
            if other.is_full(table) {
                self.mark_full(table);
            }
        }
    }

    pub fn get(&self, table: &str) -> Option<&BTreeSet<PkValue>> {
        self.index
            .get(self.case.fold(table).as_ref())
            .map(|&idx| &self.entries[idx].1)
    }

    pub fn contains(&self, table: &str) -> bool {
        self.index.contains_key(self.case.fold(table).as_ref())
    }

    pub fn is_full(&self, table: &str) -> bool {
        self.full.contains(self.case.fold(table).as_ref())
    }

    /// Rows to materialize for `table`: all of them unless the table has a
    /// recorded key set and was never marked full.
    pub fn row_filter(&self, table: &str) -> RowFilter<'_> {
        if self.is_full(table) {
            return RowFilter::All;
        }
        match self.get(table) {
            Some(keys) => RowFilter::Keys(keys),
            None => RowFilter::All,
        }
    }

    pub fn table_names(&self) -> Vec<&str> {
        self.entries.iter().map(|(t, _)| t.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<PkValue>)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v))
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Content equality: same tables, same key sets, same full marks.
/// Key order is not compared.
impl PartialEq for PkTableMap {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.entries.iter().all(|(table, values)| {
                other.get(table) == Some(values) && self.is_full(table) == other.is_full(table)
            })
    }
}

impl Eq for PkTableMap {}
