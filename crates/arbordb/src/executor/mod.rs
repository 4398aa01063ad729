//! Action interpretation against a storage backend.
//!
//! The interpreter is deliberately mechanical: every action arrives fully
//! resolved, so each arm is one backend call. The only branching behavior
//! lives in the merge arm, which falls back to exactly one insert when the
//! update matched no stored row.


use crate::{
    backend::Backend,
    error::InternalError,
    obs::sink::{self, MetricsEvent},
    plan::action::{AdditionalValues, DbAction},
    value::Value,
};

///
/// Outcome
///
/// What one applied action produced.
///

#[derive(Debug, Default)]
pub(crate) struct Outcome {
    /// Store-generated identifier, for inserts the backend keyed itself.
    pub generated: Option<Value>,
    /// Stored rows touched.
    pub rows: u64,
}

///
/// Interpreter
///
/// Applies actions one at a time against a backend.
///

pub struct Interpreter<'a, B: Backend> {
    backend: &'a mut B,
    debug: bool,
}

impl<'a, B: Backend> Interpreter<'a, B> {
    pub fn new(backend: &'a mut B) -> Self {
        Self {
            backend,
            debug: false,
        }
    }

    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    fn debug_log(&self, text: &str) {
        if self.debug {
            println!("[debug] {text}");
        }
    }

    pub(crate) fn apply(&mut self, action: &DbAction) -> Result<Outcome, InternalError> {
        self.debug_log(action.kind_label());

        match action {
            DbAction::InsertRoot { table, row, .. } => {
                let generated = self.backend.insert(table, row, &AdditionalValues::new())?;
                Ok(Outcome { generated, rows: 1 })
            }
            DbAction::Insert {
                table,
                row,
                additional,
                ..
            } => {
                let generated = self.backend.insert(table, row, additional)?;
                Ok(Outcome { generated, rows: 1 })
            }
            DbAction::UpdateRoot {
                entity_type,
                table,
                id_column,
                id,
                row,
            }
            | DbAction::Update {
                entity_type,
                table,
                id_column,
                id,
                row,
            } => {
                let rows = self.backend.update(table, id_column, id, row)?;
                if rows == 0 {
                    return Err(InternalError::no_rows_updated(entity_type));
                }
                Ok(Outcome {
                    generated: None,
                    rows,
                })
            }
            DbAction::Merge {
                entity_type,
                table,
                id_column,
                id,
                row,
                additional,
            } => {
                let rows = self.backend.update(table, id_column, id, row)?;
                if rows > 0 {
                    return Ok(Outcome {
                        generated: None,
                        rows,
                    });
                }
                // No stored row matched: insert once, never retry.
                self.debug_log(&format!("merge fallback: inserting '{entity_type}'"));
                sink::record(&MetricsEvent::MergeFallback {
                    entity_type: entity_type.clone(),
                });
                let generated = self.backend.insert(table, row, additional)?;
                Ok(Outcome { generated, rows: 1 })
            }
            DbAction::Delete { path, root_id } => {
                let rows = self.backend.delete_owned(path, root_id)?;
                Ok(Outcome {
                    generated: None,
                    rows,
                })
            }
            DbAction::DeleteRoot {
                table,
                id_column,
                id,
                ..
            } => {
                let rows = self.backend.delete_by_id(table, id_column, id)?;
                Ok(Outcome {
                    generated: None,
                    rows,
                })
            }
            DbAction::DeleteAll { path } => {
                let rows = self.backend.delete_all_owned(path)?;
                Ok(Outcome {
                    generated: None,
                    rows,
                })
            }
            DbAction::DeleteAllRoot { table, .. } => {
                let rows = self.backend.delete_all(table)?;
                Ok(Outcome {
                    generated: None,
                    rows,
                })
            }
        }
    }
}
