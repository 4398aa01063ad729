//! In-memory backend.
//!
//! Tables are plain row vectors; identifiers are generated from a single
//! monotonic counter whenever an inserted row arrives without one. Owned
//! deletes resolve multi-level paths by walking owner identifiers level by
//! level through the back-reference columns.

use crate::{
    error::InternalError,
    path::PropertyPath,
    plan::action::{AdditionalValues, Row},
    schema::AggregateSchema,
    value::Value,
};
use std::collections::BTreeMap;

use super::Backend;

///
/// MemoryBackend
///

#[derive(Debug)]
pub struct MemoryBackend {
    schema: AggregateSchema,
    tables: BTreeMap<String, Vec<Row>>,
    next_id: u64,
}

impl MemoryBackend {
    #[must_use]
    pub fn new(schema: AggregateSchema) -> Self {
        Self {
            schema,
            tables: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// The stored rows of a table, in insertion order.
    #[must_use]
    pub fn rows(&self, table: &str) -> &[Row] {
        self.tables.get(table).map_or(&[], Vec::as_slice)
    }

    fn table_mut(&mut self, table: &str) -> &mut Vec<Row> {
        self.tables.entry(table.to_string()).or_default()
    }

    /// Identifiers of the rows in `table` whose `back_reference` column
    /// matches one of `owner_ids`.
    fn owned_ids(
        &self,
        table: &str,
        id_column: &str,
        back_reference: &str,
        owner_ids: &[Value],
    ) -> Vec<Value> {
        self.rows(table)
            .iter()
            .filter(|row| row.get(back_reference).is_some_and(|v| owner_ids.contains(v)))
            .filter_map(|row| row.get(id_column).cloned())
            .collect()
    }
}

impl Backend for MemoryBackend {
    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        additional: &AdditionalValues,
    ) -> Result<Option<Value>, InternalError> {
        let id_column = self.schema.entity_by_table(table)?.id_column.clone();

        let mut stored = row.clone();
        for (column, value) in additional {
            stored.insert(column.clone(), value.clone());
        }

        let generated = if stored.get(&id_column).is_none_or(Value::is_null) {
            let id = Value::Uint(self.next_id);
            self.next_id = self.next_id.saturating_add(1);
            stored.insert(id_column, id.clone());
            Some(id)
        } else {
            None
        };

        self.table_mut(table).push(stored);
        Ok(generated)
    }

    fn update(
        &mut self,
        table: &str,
        id_column: &str,
        id: &Value,
        row: &Row,
    ) -> Result<u64, InternalError> {
        let mut matched: u64 = 0;
        for stored in self.table_mut(table) {
            if stored.get(id_column) == Some(id) {
                for (column, value) in row {
                    stored.insert(column.clone(), value.clone());
                }
                matched = matched.saturating_add(1);
            }
        }
        Ok(matched)
    }

    fn delete_by_id(
        &mut self,
        table: &str,
        id_column: &str,
        id: &Value,
    ) -> Result<u64, InternalError> {
        let rows = self.table_mut(table);
        let before = rows.len();
        rows.retain(|row| row.get(id_column) != Some(id));
        Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX))
    }

    fn delete_owned(
        &mut self,
        path: &PropertyPath,
        root_id: &Value,
    ) -> Result<u64, InternalError> {
        let mut owner_ids = vec![root_id.clone()];

        // Walk down the path: each level narrows the owning identifiers
        // until the final level's rows can be removed directly.
        for depth in 1..=path.len() {
            let prefix = path.prefix(depth);
            let target = self.schema.target_of(&prefix)?;
            let back_reference = self.schema.back_reference_column(&prefix)?;

            if depth < path.len() {
                owner_ids =
                    self.owned_ids(&target.table, &target.id_column, &back_reference, &owner_ids);
                if owner_ids.is_empty() {
                    return Ok(0);
                }
            } else {
                let table = target.table.clone();
                let rows = self.table_mut(&table);
                let before = rows.len();
                rows.retain(|row| {
                    !row.get(&back_reference)
                        .is_some_and(|v| owner_ids.contains(v))
                });
                return Ok(u64::try_from(before - rows.len()).unwrap_or(u64::MAX));
            }
        }

        Ok(0)
    }

    fn delete_all_owned(&mut self, path: &PropertyPath) -> Result<u64, InternalError> {
        let table = self.schema.target_of(path)?.table.clone();
        self.delete_all(&table)
    }

    fn delete_all(&mut self, table: &str) -> Result<u64, InternalError> {
        let rows = self.table_mut(table);
        let removed = rows.len();
        rows.clear();
        Ok(u64::try_from(removed).unwrap_or(u64::MAX))
    }

    fn count(&self, table: &str) -> Result<u64, InternalError> {
        Ok(u64::try_from(self.rows(table).len()).unwrap_or(u64::MAX))
    }
}

///
/// TESTS
///
