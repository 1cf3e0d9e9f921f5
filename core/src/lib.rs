//! tabledeps-core: foreign-key dependency search.
//!
//! Given a schema's foreign-key graph and a set of seed tables, computes the
//! closure of tables that must travel together for an extracted or mutated
//! dataset to stay referentially consistent, optionally narrowed to the rows
//! reachable from specific primary-key values.
//!
//! The schema and its rows are reached through the [`SchemaMetadata`] and
//! [`RowSource`] traits. [`MemoryDatabase`] implements both in memory; the
//! `tabledeps` PostgreSQL extension implements them over the system catalogs.
//! No PostgreSQL dependencies here; this crate compiles standalone.

mod callback;
mod dataset;
mod dependency;
mod edge;
mod error;
mod memory;
mod metadata;
mod name;
mod pk_map;
mod search;
mod value;

#[cfg(test)]
mod fixtures;

pub use callback::{KeyCallback, KeyDirection, PkFilteredCallback, SearchCallback};
pub use dataset::{Dataset, TableData};
pub use dependency::{
    all_dataset, all_dependent_tables, dataset, dataset_for_row, dependent_tables,
    depends_on_tables, direct_dependent_tables, direct_depends_on_tables,
};
pub use edge::{Edge, EdgeKind};
pub use error::{CollaboratorError, InvalidEdge, Operation, SearchError, SearchResult};
pub use memory::{MemoryDatabase, TableDef};
pub use metadata::{ExportedKey, ImportedKey, RowFilter, RowSource, SchemaMetadata};
pub use name::{CaseSensitivity, TableSet};
pub use pk_map::PkTableMap;
pub use search::depth_first_search;
pub use value::{PkValue, Value};
