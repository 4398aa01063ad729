//! Storage backend boundary.
//!
//! The interpreter talks to storage through this trait only. Implementors
//! decide identifier generation: return `Some(id)` from `insert` when the
//! store keyed the row itself, `None` when the supplied row already carried
//! its identifier.

mod memory;

pub use memory::MemoryBackend;

use crate::{
    error::InternalError,
    path::PropertyPath,
    plan::action::{AdditionalValues, Row},
    value::Value,
};

///
/// Backend
///

pub trait Backend {
    /// Insert one row, merged with its additional columns. Returns the
    /// store-generated identifier, if the store produced one.
    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        additional: &AdditionalValues,
    ) -> Result<Option<Value>, InternalError>;

    /// Update the columns of rows matching an identifier. Returns the
    /// number of rows that matched.
    fn update(
        &mut self,
        table: &str,
        id_column: &str,
        id: &Value,
        row: &Row,
    ) -> Result<u64, InternalError>;

    /// Delete the row matching an identifier.
    fn delete_by_id(
        &mut self,
        table: &str,
        id_column: &str,
        id: &Value,
    ) -> Result<u64, InternalError>;

    /// Delete every row at a path that belongs to one aggregate.
    fn delete_owned(
        &mut self,
        path: &PropertyPath,
        root_id: &Value,
    ) -> Result<u64, InternalError>;

    /// Delete every row at a path across all aggregates.
    fn delete_all_owned(&mut self, path: &PropertyPath) -> Result<u64, InternalError>;

    /// Delete every row of a table.
    fn delete_all(&mut self, table: &str) -> Result<u64, InternalError>;

    /// Number of rows currently stored in a table.
    fn count(&self, table: &str) -> Result<u64, InternalError>;
}
