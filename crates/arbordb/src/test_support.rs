//! Shared fixtures for unit tests.

use crate::{
    backend::Backend,
    entity::Entity,
    error::InternalError,
    model::{CollectionKind, EntityModel},
    path::PropertyPath,
    plan::action::{AdditionalValues, Row},
    schema::AggregateSchema,
    value::{MapKey, Value},
};

/// A reference schema exercising every collection kind and a two-level
/// nesting (Order -> LineItem -> Adjustment).
pub fn order_schema() -> AggregateSchema {
    AggregateSchema::builder()
        .entity(
            EntityModel::new("Order", "id")
                .with_column("customer")
                .with_entity("shipping_address", "Address", CollectionKind::One)
                .with_entity("line_items", "LineItem", CollectionKind::List)
                .with_entity("coupons", "Coupon", CollectionKind::Set)
                .with_entity("notes", "Note", CollectionKind::Map),
        )
        .entity(EntityModel::new("Address", "id").with_column("street"))
        .entity(
            EntityModel::new("LineItem", "id")
                .with_column("sku")
                .with_column("quantity")
                .with_entity("adjustments", "Adjustment", CollectionKind::List),
        )
        .entity(EntityModel::new("Coupon", "id").with_column("code"))
        .entity(EntityModel::new("Note", "id").with_column("body"))
        .entity(EntityModel::new("Adjustment", "id").with_column("amount"))
        .build()
        .expect("fixture schema is valid")
}

/// A fully populated new order: one address, two line items (the first
/// carrying an adjustment), one coupon and one note.
pub fn new_order() -> Entity {
    Entity::new("Order")
        .with_column("customer", "ada")
        .with_one(
            "shipping_address",
            Entity::new("Address").with_column("street", "34 Carriage Row"),
        )
        .with_list(
            "line_items",
            vec![
                line_item("sku-1", 1).with_list("adjustments", vec![adjustment(-5)]),
                line_item("sku-2", 3),
            ],
        )
        .with_set("coupons", vec![coupon("WELCOME")])
        .with_map(
            "notes",
            [(MapKey::Text("gift".to_string()), note("wrap it"))],
        )
}

pub fn line_item(sku: &str, quantity: u64) -> Entity {
    Entity::new("LineItem")
        .with_column("sku", sku)
        .with_column("quantity", quantity)
}

pub fn coupon(code: &str) -> Entity {
    Entity::new("Coupon").with_column("code", code)
}

pub fn note(body: &str) -> Entity {
    Entity::new("Note").with_column("body", body)
}

pub fn adjustment(amount: i64) -> Entity {
    Entity::new("Adjustment").with_column("amount", amount)
}

///
/// BackendCall
///
/// One recorded backend invocation, for asserting on execution order and
/// the columns each call carried.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BackendCall {
    Insert {
        table: String,
        row: Row,
        additional: AdditionalValues,
    },
    Update {
        table: String,
        id: Value,
        row: Row,
    },
    DeleteById {
        table: String,
        id: Value,
    },
    DeleteOwned {
        path: String,
        root_id: Value,
    },
    DeleteAllOwned {
        path: String,
    },
    DeleteAll {
        table: String,
    },
}

///
/// RecordingBackend
///
/// Records every call, then acts per its knobs: generated identifiers come
/// from a counter, updates report a configurable match count, and inserts
/// can be made to fail after recording.
///

#[derive(Debug)]
pub struct RecordingBackend {
    pub calls: Vec<BackendCall>,
    pub next_id: u64,
    pub generate_ids: bool,
    pub update_rows: u64,
    pub fail_inserts: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            next_id: 1,
            generate_ids: true,
            update_rows: 1,
            fail_inserts: false,
        }
    }

    /// The recorded inserts, in call order.
    pub fn inserts(&self) -> Vec<&BackendCall> {
        self.calls
            .iter()
            .filter(|c| matches!(c, BackendCall::Insert { .. }))
            .collect()
    }
}

impl Backend for RecordingBackend {
    fn insert(
        &mut self,
        table: &str,
        row: &Row,
        additional: &AdditionalValues,
    ) -> Result<Option<Value>, InternalError> {
        self.calls.push(BackendCall::Insert {
            table: table.to_string(),
            row: row.clone(),
            additional: additional.clone(),
        });
        if self.fail_inserts {
            return Err(InternalError::backend_internal("injected insert failure"));
        }
        // Fixture models all key on an "id" column.
        if self.generate_ids && row.get("id").is_none_or(Value::is_null) {
            let id = Value::Uint(self.next_id);
            self.next_id += 1;
            return Ok(Some(id));
        }
        Ok(None)
    }

    fn update(
        &mut self,
        table: &str,
        _id_column: &str,
        id: &Value,
        row: &Row,
    ) -> Result<u64, InternalError> {
        self.calls.push(BackendCall::Update {
            table: table.to_string(),
            id: id.clone(),
            row: row.clone(),
        });
        Ok(self.update_rows)
    }

    fn delete_by_id(
        &mut self,
        table: &str,
        _id_column: &str,
        id: &Value,
    ) -> Result<u64, InternalError> {
        self.calls.push(BackendCall::DeleteById {
            table: table.to_string(),
            id: id.clone(),
        });
        Ok(1)
    }

    fn delete_owned(
        &mut self,
        path: &PropertyPath,
        root_id: &Value,
    ) -> Result<u64, InternalError> {
        self.calls.push(BackendCall::DeleteOwned {
            path: path.to_string(),
            root_id: root_id.clone(),
        });
        Ok(0)
    }

    fn delete_all_owned(&mut self, path: &PropertyPath) -> Result<u64, InternalError> {
        self.calls.push(BackendCall::DeleteAllOwned {
            path: path.to_string(),
        });
        Ok(0)
    }

    fn delete_all(&mut self, table: &str) -> Result<u64, InternalError> {
        self.calls.push(BackendCall::DeleteAll {
            table: table.to_string(),
        });
        Ok(0)
    }

    fn count(&self, _table: &str) -> Result<u64, InternalError> {
        Ok(0)
    }
}
