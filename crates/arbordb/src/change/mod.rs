//! Aggregate changes and their execution protocol.
//!
//! An [`AggregateChange`] is the unit handed to execution: an ordered
//! action list plus the node arena describing where each planned row lives
//! in the aggregate instance. Execution applies actions front to back and
//! flows store-generated identifiers both into later actions and back into
//! the live instance.


use crate::{
    backend::Backend,
    entity::Entity,
    error::InternalError,
    executor::Interpreter,
    obs::sink::{self, ExecKind, MetricsEvent},
    path::node::{ElementRef, NodeArena, NodeId},
    plan::action::{ActionId, DbAction},
    value::Value,
};

///
/// ChangeKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ChangeKind {
    Save,
    Delete,
}

///
/// ChangeReport
///
/// What execution produced: the root identifier (generated or supplied)
/// and the total number of stored rows touched.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ChangeReport {
    pub root_id: Value,
    pub rows_affected: u64,
}

impl Default for ChangeReport {
    fn default() -> Self {
        Self {
            root_id: Value::Null,
            rows_affected: 0,
        }
    }
}

///
/// AggregateChange
///
/// Ordered, topologically sorted action list for one aggregate. Every
/// dependency points at an earlier action; consumers may rely on that.
///

#[derive(Debug)]
pub struct AggregateChange {
    kind: ChangeKind,
    entity_type: String,
    actions: Vec<DbAction>,
    nodes: NodeArena,
}

impl AggregateChange {
    pub(crate) const fn new(
        kind: ChangeKind,
        entity_type: String,
        actions: Vec<DbAction>,
        nodes: NodeArena,
    ) -> Self {
        Self {
            kind,
            entity_type,
            actions,
            nodes,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ChangeKind {
        self.kind
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub fn actions(&self) -> &[DbAction] {
        &self.actions
    }

    /// Execute a delete change. Save changes need the live instance for
    /// identifier write-back and go through [`Self::execute_save_with`].
    pub fn execute_with<B: Backend>(
        self,
        interpreter: &mut Interpreter<'_, B>,
    ) -> Result<ChangeReport, InternalError> {
        if self.kind != ChangeKind::Delete {
            return Err(InternalError::change_invariant(
                "save changes carry identifier write-back; use execute_save_with",
            ));
        }

        sink::record(&MetricsEvent::ExecStart {
            kind: ExecKind::Delete,
            entity_type: self.entity_type.clone(),
        });

        let mut report = ChangeReport::default();
        for action in &self.actions {
            let outcome = interpreter.apply(action)?;
            report.rows_affected = report.rows_affected.saturating_add(outcome.rows);
        }

        sink::record(&MetricsEvent::ExecFinish {
            kind: ExecKind::Delete,
            entity_type: self.entity_type,
            rows_touched: report.rows_affected,
        });

        Ok(report)
    }

    /// Execute a save change against the live aggregate instance.
    ///
    /// Actions run front to back. When an insert yields a generated
    /// identifier it is written into the instance the action came from and
    /// into the back-reference slot of every dependent action still ahead.
    /// A root that stays new after its insert is fatal and aborts the run.
    pub fn execute_save_with<B: Backend>(
        self,
        root: &mut Entity,
        interpreter: &mut Interpreter<'_, B>,
    ) -> Result<ChangeReport, InternalError> {
        if self.kind != ChangeKind::Save {
            return Err(InternalError::change_invariant(
                "delete changes carry no instance; use execute_with",
            ));
        }
        if root.entity_type() != self.entity_type {
            return Err(InternalError::change_invariant(format!(
                "change for '{}' executed against a '{}' instance",
                self.entity_type,
                root.entity_type()
            )));
        }

        sink::record(&MetricsEvent::ExecStart {
            kind: ExecKind::Save,
            entity_type: self.entity_type.clone(),
        });

        let mut report = ChangeReport::default();
        let mut actions = self.actions;

        for index in 0..actions.len() {
            let outcome = interpreter.apply(&actions[index])?;
            report.rows_affected = report.rows_affected.saturating_add(outcome.rows);

            let (head, tail) = actions.split_at_mut(index + 1);
            match &head[index] {
                DbAction::InsertRoot {
                    entity_type,
                    id_column,
                    row,
                    ..
                } => {
                    let id = match &outcome.generated {
                        Some(id) => id.clone(),
                        None => row.get(id_column).cloned().unwrap_or(Value::Null),
                    };
                    if id.is_null() {
                        return Err(InternalError::change_config(format!(
                            "aggregate '{entity_type}' is still new after insert: no identifier was generated or supplied"
                        )));
                    }
                    if outcome.generated.is_some() {
                        sink::record(&MetricsEvent::GeneratedId {
                            entity_type: entity_type.clone(),
                        });
                    }
                    root.set_column(id_column.clone(), id.clone());
                    fill_dependents(tail, index, &id);
                    report.root_id = id;
                }
                DbAction::UpdateRoot { id, .. } | DbAction::Merge { id, .. } => {
                    let id = outcome.generated.clone().unwrap_or_else(|| id.clone());
                    fill_dependents(tail, index, &id);
                    report.root_id = id;
                }
                DbAction::Insert {
                    node,
                    entity_type,
                    id_column,
                    ..
                } => {
                    if let Some(id) = &outcome.generated {
                        sink::record(&MetricsEvent::GeneratedId {
                            entity_type: entity_type.clone(),
                        });
                        place_generated_id(root, &self.nodes, *node, id_column, id)?;
                        fill_dependents(tail, index, id);
                    }
                }
                _ => {}
            }
        }

        sink::record(&MetricsEvent::ExecFinish {
            kind: ExecKind::Save,
            entity_type: self.entity_type,
            rows_touched: report.rows_affected,
        });

        Ok(report)
    }
}

/// Write a freshly produced identifier into the back-reference slot of
/// every insert that depends on `producer` and does not already carry one.
fn fill_dependents(tail: &mut [DbAction], producer: ActionId, id: &Value) {
    for action in tail {
        if let DbAction::Insert {
            depends_on,
            back_reference,
            additional,
            ..
        } = action
            && *depends_on == producer
            && !additional.contains_key(back_reference)
        {
            additional.insert(back_reference.clone(), id.clone());
        }
    }
}

/// Write a generated identifier into the live instance a node points at.
fn place_generated_id(
    root: &mut Entity,
    nodes: &NodeArena,
    node: NodeId,
    id_column: &str,
    id: &Value,
) -> Result<(), InternalError> {
    let locator = nodes
        .get(node)
        .map(|n| n.locator.clone())
        .ok_or_else(|| InternalError::change_invariant("action references an unknown node"))?;
    let Some((last, prefix)) = locator.split_last() else {
        return Err(InternalError::change_invariant(
            "child insert carries an empty locator",
        ));
    };

    let owner = root.resolve_mut(prefix).ok_or_else(|| {
        InternalError::change_invariant("owner instance vanished during identifier write-back")
    })?;

    match &last.element {
        ElementRef::Member(position) => {
            place_in_set(owner, &last.property, *position, id_column, id)
        }
        element => {
            let child = owner.child_mut(&last.property, element).ok_or_else(|| {
                InternalError::change_invariant(
                    "planned element no longer present during identifier write-back",
                )
            })?;
            child.set_column(id_column.to_string(), id.clone());
            Ok(())
        }
    }
}

/// Assign an identifier to a set member in place. The member keeps its
/// position; an identifier collision inside the set is a conflict.
fn place_in_set(
    owner: &mut Entity,
    property: &str,
    position: usize,
    id_column: &str,
    id: &Value,
) -> Result<(), InternalError> {
    use crate::entity::PropertyValue;

    let Some(PropertyValue::Set(members)) = owner.property_mut(property) else {
        return Err(InternalError::change_invariant(format!(
            "set property '{property}' no longer present during identifier write-back"
        )));
    };
    if position >= members.len() {
        return Err(InternalError::change_invariant(format!(
            "set property '{property}' shrank during identifier write-back"
        )));
    }

    let mut member = members.remove(position);
    member.set_column(id_column.to_string(), id.clone());
    if members.contains(&member) {
        return Err(InternalError::change_conflict(format!(
            "set property '{property}' already holds a member with identifier {id}"
        )));
    }
    members.insert(position, member);
    Ok(())
}
