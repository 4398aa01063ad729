//! Aggregate store facade.
//!
//! Ties planning and execution together behind the save/delete surface a
//! caller actually uses. Each call plans one change and executes it to
//! completion against the configured backend.

use crate::{
    backend::Backend,
    change::ChangeReport,
    entity::Entity,
    error::InternalError,
    executor::Interpreter,
    plan::Planner,
    schema::AggregateSchema,
    value::Value,
};

///
/// AggregateStore
///

pub struct AggregateStore<'s, B: Backend> {
    schema: &'s AggregateSchema,
    backend: B,
    debug: bool,
}

impl<'s, B: Backend> AggregateStore<'s, B> {
    pub const fn new(schema: &'s AggregateSchema, backend: B) -> Self {
        Self {
            schema,
            backend,
            debug: false,
        }
    }

    /// Enable per-action logging during execution.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    pub const fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn into_backend(self) -> B {
        self.backend
    }

    /// Save an aggregate, inserting when it is new and replacing it
    /// otherwise. Generated identifiers are written back into `root`.
    pub fn save(&mut self, root: &mut Entity) -> Result<ChangeReport, InternalError> {
        let change = Planner::new(self.schema).plan_save(root)?;
        let mut interpreter = Interpreter::new(&mut self.backend).with_debug(self.debug);
        change.execute_save_with(root, &mut interpreter)
    }

    /// Save an aggregate as new, regardless of its identifier state.
    pub fn insert(&mut self, root: &mut Entity) -> Result<ChangeReport, InternalError> {
        let change = Planner::new(self.schema).plan_insert(root)?;
        let mut interpreter = Interpreter::new(&mut self.backend).with_debug(self.debug);
        change.execute_save_with(root, &mut interpreter)
    }

    /// Save an existing aggregate. Fails when no stored root row matches.
    pub fn update(&mut self, root: &mut Entity) -> Result<ChangeReport, InternalError> {
        let change = Planner::new(self.schema).plan_update(root)?;
        let mut interpreter = Interpreter::new(&mut self.backend).with_debug(self.debug);
        change.execute_save_with(root, &mut interpreter)
    }

    /// Save an aggregate whose root row may or may not exist yet: the root
    /// update falls back to one insert when no stored row matches.
    pub fn upsert(&mut self, root: &mut Entity) -> Result<ChangeReport, InternalError> {
        let change = Planner::new(self.schema).plan_upsert(root)?;
        let mut interpreter = Interpreter::new(&mut self.backend).with_debug(self.debug);
        change.execute_save_with(root, &mut interpreter)
    }

    /// Delete one aggregate and everything it owns.
    pub fn delete_by_id(
        &mut self,
        entity_type: &str,
        id: &Value,
    ) -> Result<ChangeReport, InternalError> {
        let change = Planner::new(self.schema).plan_delete_by_id(entity_type, id)?;
        let mut interpreter = Interpreter::new(&mut self.backend).with_debug(self.debug);
        change.execute_with(&mut interpreter)
    }

    /// Delete every aggregate of a type.
    pub fn delete_all(&mut self, entity_type: &str) -> Result<ChangeReport, InternalError> {
        let change = Planner::new(self.schema).plan_delete_all(entity_type)?;
        let mut interpreter = Interpreter::new(&mut self.backend).with_debug(self.debug);
        change.execute_with(&mut interpreter)
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        backend::MemoryBackend,
        test_support::{new_order, order_schema},
    };

    #[test]
    fn save_round_trip_populates_every_identifier() {
        let schema = order_schema();
        let mut store = AggregateStore::new(&schema, MemoryBackend::new(schema.clone()));

        let mut order = new_order();
        let report = store.save(&mut order).expect("save succeeds");

        assert!(!report.root_id.is_null());
        assert_eq!(order.column("id"), Some(&report.root_id));

        // Every stored child row carries a back-reference and an id.
        for table in ["address", "lineitem", "coupon", "note", "adjustment"] {
            for row in store.backend().rows(table) {
                assert!(row.get("id").is_some(), "{table} row has an id");
            }
        }
        assert_eq!(store.backend().count("lineitem").expect("count"), 2);
        assert_eq!(store.backend().count("adjustment").expect("count"), 1);
    }

    #[test]
    fn resave_replaces_owned_rows() {
        let schema = order_schema();
        let mut store = AggregateStore::new(&schema, MemoryBackend::new(schema.clone()));

        let mut order = new_order();
        store.save(&mut order).expect("first save");
        let lineitems_before = store.backend().count("lineitem").expect("count");

        store.save(&mut order).expect("second save");
        // Whole replacement: same number of rows, not doubled.
        assert_eq!(
            store.backend().count("lineitem").expect("count"),
            lineitems_before
        );
    }

    #[test]
    fn delete_by_id_empties_owned_tables() {
        let schema = order_schema();
        let mut store = AggregateStore::new(&schema, MemoryBackend::new(schema.clone()));

        let mut order = new_order();
        let report = store.save(&mut order).expect("save");

        store
            .delete_by_id("Order", &report.root_id)
            .expect("delete succeeds");

        for table in ["order", "address", "lineitem", "coupon", "note", "adjustment"] {
            assert_eq!(store.backend().count(table).expect("count"), 0, "{table}");
        }
    }

    #[test]
    fn delete_all_clears_the_aggregate_type() {
        let schema = order_schema();
        let mut store = AggregateStore::new(&schema, MemoryBackend::new(schema.clone()));

        for _ in 0..3 {
            let mut order = new_order();
            store.save(&mut order).expect("save");
        }
        assert_eq!(store.backend().count("order").expect("count"), 3);

        store.delete_all("Order").expect("delete_all");
        assert_eq!(store.backend().count("order").expect("count"), 0);
        assert_eq!(store.backend().count("lineitem").expect("count"), 0);
    }
}
