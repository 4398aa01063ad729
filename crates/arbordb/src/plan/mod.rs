//! Change planning.
//!
//! The planner walks an aggregate instance against its schema and produces
//! an [`AggregateChange`]: a topologically ordered action list in which
//! every dependency points at an earlier action. Saving an existing
//! aggregate replaces its owned rows wholesale (delete deepest-first, then
//! re-insert); no per-row diffing is attempted.

pub mod action;

use crate::{
    change::{AggregateChange, ChangeKind},
    entity::{Entity, PropertyValue},
    error::InternalError,
    model::{CollectionKind, EntityModel},
    obs::sink::{self, MetricsEvent},
    path::{
        PropertyPath, enumerate_paths,
        node::{ElementRef, LocatorStep, NodeArena, NodeId, NodeKey, PathNode},
    },
    plan::action::{ActionId, AdditionalValues, DbAction},
    schema::AggregateSchema,
    value::Value,
};
use std::collections::BTreeMap;

///
/// Planner
///
/// Stateless plan builder over a schema reference.
///

pub struct Planner<'s> {
    schema: &'s AggregateSchema,
}

///
/// RootMode
///
/// How the root row itself is written.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum RootMode {
    Insert,
    Update,
    Upsert,
}

///
/// PlanState
///
/// Mutable state threaded through one plan build.
///

#[derive(Default)]
struct PlanState {
    actions: Vec<DbAction>,
    nodes: NodeArena,
    nodes_by_path: BTreeMap<String, Vec<NodeId>>,
    producer_of: BTreeMap<NodeId, ActionId>,
}

impl<'s> Planner<'s> {
    #[must_use]
    pub const fn new(schema: &'s AggregateSchema) -> Self {
        Self { schema }
    }

    /// Plan a save, choosing insert or update semantics by the root's
    /// newness (null identifier means new).
    pub fn plan_save(&self, root: &Entity) -> Result<AggregateChange, InternalError> {
        if self.schema.is_new(root)? {
            self.plan_insert(root)
        } else {
            self.plan_update(root)
        }
    }

    /// Plan the first save of a new aggregate.
    pub fn plan_insert(&self, root: &Entity) -> Result<AggregateChange, InternalError> {
        self.plan_root_change(root, RootMode::Insert)
    }

    /// Plan the save of an existing aggregate. The root must carry an
    /// identifier; its owned rows are deleted and re-inserted.
    pub fn plan_update(&self, root: &Entity) -> Result<AggregateChange, InternalError> {
        self.plan_root_change(root, RootMode::Update)
    }

    /// Plan a save whose root update falls back to an insert when no
    /// stored row matches the identifier.
    pub fn plan_upsert(&self, root: &Entity) -> Result<AggregateChange, InternalError> {
        self.plan_root_change(root, RootMode::Upsert)
    }

    /// Plan the deletion of one aggregate by its root identifier.
    pub fn plan_delete_by_id(
        &self,
        entity_type: &str,
        id: &Value,
    ) -> Result<AggregateChange, InternalError> {
        if id.is_null() {
            return Err(InternalError::plan_invariant(format!(
                "cannot delete '{entity_type}' by a null identifier"
            )));
        }
        let model = self.schema.entity(entity_type)?;
        let paths = enumerate_paths(self.schema, entity_type)?;

        let mut actions = Vec::with_capacity(paths.len() + 1);
        for path in paths.iter().rev() {
            actions.push(DbAction::Delete {
                path: path.clone(),
                root_id: id.clone(),
            });
        }
        actions.push(DbAction::DeleteRoot {
            entity_type: model.name.clone(),
            table: model.table.clone(),
            id_column: model.id_column.clone(),
            id: id.clone(),
        });

        sink::record(&MetricsEvent::PlanBuilt {
            entity_type: model.name.clone(),
            actions: actions.len(),
        });

        Ok(AggregateChange::new(
            ChangeKind::Delete,
            model.name.clone(),
            actions,
            NodeArena::default(),
        ))
    }

    /// Plan the deletion of every aggregate of a type.
    pub fn plan_delete_all(&self, entity_type: &str) -> Result<AggregateChange, InternalError> {
        let model = self.schema.entity(entity_type)?;
        let paths = enumerate_paths(self.schema, entity_type)?;

        let mut actions = Vec::with_capacity(paths.len() + 1);
        for path in paths.iter().rev() {
            actions.push(DbAction::DeleteAll { path: path.clone() });
        }
        actions.push(DbAction::DeleteAllRoot {
            entity_type: model.name.clone(),
            table: model.table.clone(),
        });

        sink::record(&MetricsEvent::PlanBuilt {
            entity_type: model.name.clone(),
            actions: actions.len(),
        });

        Ok(AggregateChange::new(
            ChangeKind::Delete,
            model.name.clone(),
            actions,
            NodeArena::default(),
        ))
    }

    fn plan_root_change(
        &self,
        root: &Entity,
        mode: RootMode,
    ) -> Result<AggregateChange, InternalError> {
        let model = self.schema.entity(root.entity_type())?;
        let paths = enumerate_paths(self.schema, &model.name)?;

        let mut state = PlanState::default();

        // Existing aggregates get their owned rows replaced wholesale:
        // delete deepest-first so child rows never outlive their owner.
        if mode != RootMode::Insert {
            let root_id = self.schema.id_of(root)?;
            if root_id.is_null() {
                return Err(InternalError::plan_invariant(format!(
                    "cannot {} '{}' without an identifier",
                    if mode == RootMode::Update {
                        "update"
                    } else {
                        "upsert"
                    },
                    model.name
                )));
            }
            for path in paths.iter().rev() {
                state.actions.push(DbAction::Delete {
                    path: path.clone(),
                    root_id: root_id.clone(),
                });
            }
        }

        let root_action: ActionId = state.actions.len();
        match mode {
            RootMode::Insert => state.actions.push(DbAction::InsertRoot {
                entity_type: model.name.clone(),
                table: model.table.clone(),
                id_column: model.id_column.clone(),
                row: root.columns_row(model),
            }),
            RootMode::Update => state.actions.push(DbAction::UpdateRoot {
                entity_type: model.name.clone(),
                table: model.table.clone(),
                id_column: model.id_column.clone(),
                id: self.schema.id_of(root)?,
                row: root.columns_row(model),
            }),
            RootMode::Upsert => state.actions.push(DbAction::Merge {
                entity_type: model.name.clone(),
                table: model.table.clone(),
                id_column: model.id_column.clone(),
                id: self.schema.id_of(root)?,
                row: root.columns_row(model),
                additional: AdditionalValues::new(),
            }),
        }

        // Fan out over paths in enumeration order: every owner node of a
        // path already exists when the path is resolved.
        for path in &paths {
            let parents: Vec<Option<NodeId>> = match path.parent() {
                None => vec![None],
                Some(parent) => state
                    .nodes_by_path
                    .get(&parent.to_string())
                    .map(|ids| ids.iter().copied().map(Some).collect())
                    .unwrap_or_default(),
            };

            for parent in parents {
                self.plan_path_occurrences(root, path, parent, root_action, &mut state)?;
            }
        }

        sink::record(&MetricsEvent::PlanBuilt {
            entity_type: model.name.clone(),
            actions: state.actions.len(),
        });

        Ok(AggregateChange::new(
            ChangeKind::Save,
            model.name.clone(),
            state.actions,
            state.nodes,
        ))
    }

    /// Plan the insert actions for every element one owner holds at `path`.
    fn plan_path_occurrences(
        &self,
        root: &Entity,
        path: &PropertyPath,
        parent: Option<NodeId>,
        root_action: ActionId,
        state: &mut PlanState,
    ) -> Result<(), InternalError> {
        let leaf = path.leaf()?;
        let owner_model = self.schema.entity(&leaf.owner_type)?;
        let target_model = self.schema.target_of(path)?;

        let parent_locator: Vec<LocatorStep> = match parent {
            None => Vec::new(),
            Some(id) => state
                .nodes
                .get(id)
                .map(|n| n.locator.clone())
                .ok_or_else(|| InternalError::plan_invariant("dangling parent node"))?,
        };
        let owner = root.resolve(&parent_locator).ok_or_else(|| {
            InternalError::plan_invariant(format!("owner instance vanished while planning '{path}'"))
        })?;

        let Some(slot) = owner.property(&leaf.property) else {
            return Ok(());
        };

        let elements: Vec<(ElementRef, Option<NodeKey>, &Entity)> = match (slot, leaf.collection) {
            // An explicit null column in an entity slot reads as empty.
            (PropertyValue::Column(Value::Null), _) => return Ok(()),
            (PropertyValue::One(child), CollectionKind::One) => {
                vec![(ElementRef::One, None, child.as_ref())]
            }
            (PropertyValue::List(items), CollectionKind::List) => items
                .iter()
                .enumerate()
                .map(|(i, e)| (ElementRef::Index(i), Some(NodeKey::Index(i)), e))
                .collect(),
            (PropertyValue::Set(members), CollectionKind::Set) => {
                check_set_members(path, target_model, members)?;
                members
                    .iter()
                    .enumerate()
                    .map(|(i, e)| (ElementRef::Member(i), None, e))
                    .collect()
            }
            (PropertyValue::Map(entries), CollectionKind::Map) => entries
                .iter()
                .map(|(k, e)| {
                    (
                        ElementRef::Key(k.clone()),
                        Some(NodeKey::Key(k.clone())),
                        e,
                    )
                })
                .collect(),
            _ => {
                return Err(InternalError::plan_invariant(format!(
                    "property '{path}' holds a value of the wrong shape for a {} reference",
                    leaf.collection
                )));
            }
        };

        let owner_id = owner.column(&owner_model.id_column).cloned();
        let back_reference = self.schema.back_reference_column(path)?;
        let key_column = if path.is_qualified() {
            Some(self.schema.key_column(path)?)
        } else {
            None
        };

        for (element, key, child) in elements {
            if child.entity_type() != leaf.target_type {
                return Err(InternalError::plan_invariant(format!(
                    "property '{path}' expects '{}' but holds '{}'",
                    leaf.target_type,
                    child.entity_type()
                )));
            }

            let mut locator = parent_locator.clone();
            locator.push(LocatorStep {
                property: leaf.property.clone(),
                element,
            });
            let node_id = state.nodes.push(PathNode {
                path: path.clone(),
                parent,
                key: key.clone(),
                locator,
            });

            let mut additional = AdditionalValues::new();
            if let (Some(column), Some(key)) = (&key_column, &key) {
                additional.insert(column.clone(), key.to_value());
            }
            // The back-reference is filled now when the owner's identifier
            // is already known, otherwise after the owning insert runs.
            if let Some(id) = &owner_id
                && !id.is_null()
            {
                additional.insert(back_reference.clone(), id.clone());
            }

            let depends_on = match parent {
                None => root_action,
                Some(pid) => state.producer_of.get(&pid).copied().ok_or_else(|| {
                    InternalError::plan_invariant(format!(
                        "no producing action for the owner of '{path}'"
                    ))
                })?,
            };

            state.actions.push(DbAction::Insert {
                node: node_id,
                path: path.clone(),
                entity_type: target_model.name.clone(),
                table: target_model.table.clone(),
                id_column: target_model.id_column.clone(),
                back_reference: back_reference.clone(),
                row: child.columns_row(target_model),
                depends_on,
                additional,
            });

            state.producer_of.insert(node_id, state.actions.len() - 1);
            state
                .nodes_by_path
                .entry(path.to_string())
                .or_default()
                .push(node_id);
        }

        Ok(())
    }
}

/// Set members are located by position and written back by position; equal
/// members without identifiers would become indistinguishable rows, so they
/// are rejected up front.
fn check_set_members(
    path: &PropertyPath,
    target_model: &EntityModel,
    members: &[Entity],
) -> Result<(), InternalError> {
    let mut unidentified: Vec<&Entity> = Vec::new();
    for member in members {
        let is_new = member
            .column(&target_model.id_column)
            .is_none_or(Value::is_null);
        if is_new {
            if unidentified.contains(&member) {
                return Err(InternalError::plan_invariant(format!(
                    "set property '{path}' holds equal members with no identifier"
                )));
            }
            unidentified.push(member);
        }
    }
    Ok(())
}
