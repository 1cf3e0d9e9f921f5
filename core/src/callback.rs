//! Search callbacks: how the depth-first search discovers edges.
//!
//! [`KeyCallback`] walks foreign keys in one or both directions. It is the
//! single implementation behind the three standard variants (imported,
//! exported, both), selected by [`KeyDirection`] the same way traversal
//! direction is selected elsewhere: by flags, not by separate types.
//!
//! [`PkFilteredCallback`] decorates any callback with row-level filtering
//! against a caller-owned [`PkTableMap`].

use std::collections::{BTreeSet, HashMap};

use log::{debug, trace};

use crate::edge::{Edge, EdgeKind};
use crate::error::{CollaboratorError, Operation, SearchError, SearchResult, WithContext};
use crate::metadata::{RowFilter, RowSource, SchemaMetadata};
use crate::name::{CaseSensitivity, TableSet};
use crate::pk_map::PkTableMap;
use crate::value::PkValue;

/// Capability consulted by [`crate::depth_first_search`].
pub trait SearchCallback {
    /// Outbound edges of `table`, in the order they should be followed.
    fn edges_from(&mut self, table: &str) -> SearchResult<Vec<Edge>>;

    /// Whether a newly discovered table should be entered.
    fn accepts(&mut self, table: &str) -> SearchResult<bool>;

    /// Name comparison used for the visited set.
    fn case_sensitivity(&self) -> CaseSensitivity;
}

/// Which foreign keys a [`KeyCallback`] follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDirection {
    /// Keys declared by the table: what it depends on.
    Imported,
    /// Keys declared by other tables referencing it: what depends on it.
    Exported,
    Both,
}

impl KeyDirection {
    fn flags(self) -> (bool, bool) {
        match self {
            KeyDirection::Imported => (true, false),
            KeyDirection::Exported => (false, true),
            KeyDirection::Both => (true, true),
        }
    }
}

/// Follows foreign keys read from a [`SchemaMetadata`] source.
///
/// Edges come back sorted by [`Edge`] ordering and deduplicated, so sibling
/// order does not depend on how the metadata source iterates.
pub struct KeyCallback<'a, S: ?Sized> {
    schema: &'a S,
    direction: KeyDirection,
    excluded: TableSet,
}

impl<'a, S: SchemaMetadata + ?Sized> KeyCallback<'a, S> {
    pub fn new(schema: &'a S, direction: KeyDirection) -> Self {
        Self {
            schema,
            direction,
            excluded: TableSet::new(schema.case_sensitivity()),
        }
    }

    pub fn imported(schema: &'a S) -> Self {
        Self::new(schema, KeyDirection::Imported)
    }

    pub fn exported(schema: &'a S) -> Self {
        Self::new(schema, KeyDirection::Exported)
    }

    pub fn both(schema: &'a S) -> Self {
        Self::new(schema, KeyDirection::Both)
    }

    /// Never traverse into these tables. Seeds are still visited.
    pub fn excluding<I, T>(mut self, tables: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        for table in tables {
            self.excluded.insert(table.as_ref());
        }
        self
    }
}

impl<S: SchemaMetadata + ?Sized> SearchCallback for KeyCallback<'_, S> {
    fn edges_from(&mut self, table: &str) -> SearchResult<Vec<Edge>> {
        if !self.schema.table_exists(table).context(table, Operation::CheckTable)? {
            return Err(SearchError::new(
                table,
                Operation::CheckTable,
                CollaboratorError::table_not_found(table),
            ));
        }

        let (use_imported, use_exported) = self.direction.flags();
        let mut edges = BTreeSet::new();

        if use_imported {
            let op = Operation::ResolveImportedKeys;
            for key in self.schema.foreign_keys_declared_by(table).context(table, op)? {
                let edge = Edge::new(
                    key.referenced_table,
                    table,
                    key.fk_column,
                    key.referenced_column,
                    EdgeKind::Imported,
                )
                .map_err(|e| SearchError::new(table, op, e.into()))?;
                edges.insert(edge);
            }
        }

        if use_exported {
            let op = Operation::ResolveExportedKeys;
            for key in self.schema.foreign_keys_referencing(table).context(table, op)? {
                let edge = Edge::new(
                    table,
                    key.referencing_table,
                    key.referencing_column,
                    key.pk_column,
                    EdgeKind::Exported,
                )
                .map_err(|e| SearchError::new(table, op, e.into()))?;
                edges.insert(edge);
            }
        }

        trace!("{} edge(s) from {} ({:?})", edges.len(), table, self.direction);
        Ok(edges.into_iter().collect())
    }

    fn accepts(&mut self, table: &str) -> SearchResult<bool> {
        Ok(!self.excluded.contains(table))
    }

    fn case_sensitivity(&self) -> CaseSensitivity {
        self.schema.case_sensitivity()
    }
}

/// Restricts traversal to rows reachable from recorded primary keys.
///
/// A table with a recorded key set only follows edges that lead to at least
/// one row, and the keys of those rows are unioned into the map for the
/// target. A fully included table (no entry, or marked full) follows every
/// edge and passes full inclusion on to targets that have no entry yet.
///
/// The search enters each table once, with the keys it holds at that point.
/// Keys unioned into an already entered table are followed afterwards by
/// [`PkFilteredCallback::expand_pending`].
pub struct PkFilteredCallback<'a, C, R: ?Sized> {
    inner: C,
    rows: &'a R,
    pks: &'a mut PkTableMap,
    entered: TableSet,
    edges: HashMap<String, Vec<Edge>>,
    followed: HashMap<String, BTreeSet<PkValue>>,
}

impl<'a, C: SearchCallback, R: RowSource + ?Sized> PkFilteredCallback<'a, C, R> {
    pub fn new(inner: C, rows: &'a R, pks: &'a mut PkTableMap) -> Self {
        let case = inner.case_sensitivity();
        Self {
            inner,
            rows,
            pks,
            entered: TableSet::new(case),
            edges: HashMap::new(),
            followed: HashMap::new(),
        }
    }

    fn key(&self, table: &str) -> String {
        self.entered.case_sensitivity().fold(table).into_owned()
    }

    /// Follow keys that reached entered tables after they were entered,
    /// until no table gains keys.
    ///
    /// Edges dropped earlier for lack of rows may become reachable here;
    /// their targets are entered and returned in discovery order.
    pub fn expand_pending(&mut self) -> SearchResult<Vec<String>> {
        let mut discovered = Vec::new();
        loop {
            let mut changed = false;
            let mut idx = 0;
            while idx < self.entered.len() {
                let table = self.entered.as_slice()[idx].clone();
                idx += 1;

                let pending = self.pending_keys(&table);
                if pending.is_empty() {
                    continue;
                }
                changed = true;
                trace!("following {} late key(s) of {}", pending.len(), table);

                let key = self.key(&table);
                self.followed.entry(key.clone()).or_default().extend(pending.iter().cloned());
                let edges = self.edges.get(&key).cloned().unwrap_or_default();
                for edge in self.follow(&table, edges, &pending)? {
                    self.enter(edge.target(), &mut discovered)?;
                }
            }
            if !changed {
                return Ok(discovered);
            }
        }
    }

    /// Recorded keys of an entered table that its edges were not yet
    /// followed from.
    fn pending_keys(&self, table: &str) -> BTreeSet<PkValue> {
        if self.pks.is_full(table) {
            return BTreeSet::new();
        }
        let Some(keys) = self.pks.get(table) else {
            return BTreeSet::new();
        };
        match self.followed.get(&self.key(table)) {
            Some(done) => keys.difference(done).cloned().collect(),
            None => keys.clone(),
        }
    }

    /// Pre-order walk from a table first reached while expanding late keys.
    fn enter(&mut self, root: &str, discovered: &mut Vec<String>) -> SearchResult<()> {
        let mut stack = vec![root.to_string()];
        while let Some(table) = stack.pop() {
            if self.entered.contains(&table) || !self.accepts(&table)? {
                continue;
            }
            let kept = self.edges_from(&table)?;
            debug!("visiting {} (late keys)", table);
            discovered.push(table);
            stack.extend(kept.iter().rev().map(|e| e.target().to_string()));
        }
        Ok(())
    }

    /// Edges of `table` that lead to rows reachable from `keys`, recording
    /// the reached keys for each target.
    fn follow(
        &mut self,
        table: &str,
        edges: Vec<Edge>,
        keys: &BTreeSet<PkValue>,
    ) -> SearchResult<Vec<Edge>> {
        let mut kept = Vec::with_capacity(edges.len());
        for edge in edges {
            if self.pks.is_full(edge.target()) {
                kept.push(edge);
                continue;
            }
            let reachable = self.reachable_keys(&edge, keys)?;
            if reachable.is_empty() {
                trace!("dropping {}: no rows reachable from {}", edge, table);
                continue;
            }
            trace!("{} key(s) of {} reachable via {}", reachable.len(), edge.target(), edge);
            self.pks.add_input(edge.target(), reachable);
            kept.push(edge);
        }
        Ok(kept)
    }

    /// Keys of `edge.target()` rows related to the `current` keys of
    /// `edge.source()`.
    fn reachable_keys(
        &self,
        edge: &Edge,
        current: &BTreeSet<PkValue>,
    ) -> SearchResult<BTreeSet<PkValue>> {
        let (source_column, target_column) = match edge.kind() {
            EdgeKind::Imported => (edge.fk_column(), edge.pk_column()),
            EdgeKind::Exported => (edge.pk_column(), edge.fk_column()),
        };
        let op = Operation::ResolveReachableKeys;

        let values = self
            .rows
            .referenced_key_values(edge.source(), source_column, current)
            .context(edge.source(), op)?;
        if values.is_empty() {
            return Ok(BTreeSet::new());
        }

        self.rows
            .keys_referencing(edge.target(), target_column, &values)
            .context(edge.target(), op)
    }
}

impl<C: SearchCallback, R: RowSource + ?Sized> SearchCallback for PkFilteredCallback<'_, C, R> {
    fn edges_from(&mut self, table: &str) -> SearchResult<Vec<Edge>> {
        let edges = self.inner.edges_from(table)?;
        let key = self.key(table);
        self.entered.insert(table);
        self.edges.insert(key.clone(), edges.clone());

        let current = match self.pks.row_filter(table) {
            RowFilter::Keys(keys) => keys.clone(),
            RowFilter::All => {
                for edge in &edges {
                    if !self.pks.contains(edge.target()) {
                        trace!("{} fully included via {}", edge.target(), edge);
                        self.pks.mark_full(edge.target());
                    }
                }
                return Ok(edges);
            }
        };

        self.followed.insert(key, current.clone());
        self.follow(table, edges, &current)
    }

    fn accepts(&mut self, table: &str) -> SearchResult<bool> {
        if let RowFilter::Keys(keys) = self.pks.row_filter(table) {
            if keys.is_empty() {
                return Ok(false);
            }
        }
        self.inner.accepts(table)
    }

    fn case_sensitivity(&self) -> CaseSensitivity {
        self.inner.case_sensitivity()
    }
}
