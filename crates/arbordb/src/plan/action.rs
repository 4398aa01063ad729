//! Fully resolved storage actions.
//!
//! Every action carries the table, column and identifier strings it needs,
//! so execution is purely mechanical and never consults the schema.

use crate::{
    path::{PropertyPath, node::NodeId},
    value::Value,
};
use derive_more::{Deref, DerefMut, IntoIterator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Index of an action in its change's list. Dependencies always point at a
/// smaller index.
pub type ActionId = usize;

///
/// Row
///
/// Scalar column values for one stored row.
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, IntoIterator, PartialEq, Serialize,
)]
#[into_iterator(owned, ref, ref_mut)]
pub struct Row(BTreeMap<String, Value>);

impl Row {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

///
/// AdditionalValues
///
/// Columns attached to an insert beyond the entity's own properties: the
/// back-reference to the owning row and, for qualified paths, the list
/// index or map key. The back-reference may be filled in after planning,
/// once the owning insert has produced an identifier.
///

#[derive(
    Clone, Debug, Default, Deref, DerefMut, Deserialize, Eq, IntoIterator, PartialEq, Serialize,
)]
#[into_iterator(owned, ref, ref_mut)]
pub struct AdditionalValues(BTreeMap<String, Value>);

impl AdditionalValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

///
/// DbAction
///
/// One planned storage operation. Root actions carry no dependency; child
/// inserts name the action that must produce their owner's identifier.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum DbAction {
    /// Insert the aggregate root's row.
    InsertRoot {
        entity_type: String,
        table: String,
        id_column: String,
        row: Row,
    },
    /// Insert one child row at a path occurrence.
    Insert {
        node: NodeId,
        path: PropertyPath,
        entity_type: String,
        table: String,
        id_column: String,
        back_reference: String,
        row: Row,
        depends_on: ActionId,
        additional: AdditionalValues,
    },
    /// Update the aggregate root's row by identifier.
    UpdateRoot {
        entity_type: String,
        table: String,
        id_column: String,
        id: Value,
        row: Row,
    },
    /// Update a row by identifier.
    Update {
        entity_type: String,
        table: String,
        id_column: String,
        id: Value,
        row: Row,
    },
    /// Update the root's row, inserting it instead when no row matched.
    Merge {
        entity_type: String,
        table: String,
        id_column: String,
        id: Value,
        row: Row,
        additional: AdditionalValues,
    },
    /// Delete every row owned by one aggregate at a path.
    Delete { path: PropertyPath, root_id: Value },
    /// Delete the aggregate root's row by identifier.
    DeleteRoot {
        entity_type: String,
        table: String,
        id_column: String,
        id: Value,
    },
    /// Delete every row at a path across all aggregates.
    DeleteAll { path: PropertyPath },
    /// Delete every root row of a type.
    DeleteAllRoot { entity_type: String, table: String },
}

impl DbAction {
    /// Whether executing this action may yield a store-generated identifier.
    #[must_use]
    pub const fn with_generated_id(&self) -> bool {
        matches!(
            self,
            Self::InsertRoot { .. } | Self::Insert { .. } | Self::Merge { .. }
        )
    }

    /// The producing action whose identifier this one consumes, if any.
    #[must_use]
    pub const fn depends_on(&self) -> Option<ActionId> {
        match self {
            Self::Insert { depends_on, .. } => Some(*depends_on),
            _ => None,
        }
    }

    #[must_use]
    pub const fn path(&self) -> Option<&PropertyPath> {
        match self {
            Self::Insert { path, .. } | Self::Delete { path, .. } | Self::DeleteAll { path } => {
                Some(path)
            }
            _ => None,
        }
    }

    /// Short label used in logs and metrics.
    #[must_use]
    pub const fn kind_label(&self) -> &'static str {
        match self {
            Self::InsertRoot { .. } => "insert_root",
            Self::Insert { .. } => "insert",
            Self::UpdateRoot { .. } => "update_root",
            Self::Update { .. } => "update",
            Self::Merge { .. } => "merge",
            Self::Delete { .. } => "delete",
            Self::DeleteRoot { .. } => "delete_root",
            Self::DeleteAll { .. } => "delete_all",
            Self::DeleteAllRoot { .. } => "delete_all_root",
        }
    }
}
