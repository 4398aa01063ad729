//! Schema registry: resolved per-type metadata consumed by the planner.
//!
//! The registry answers every metadata question the core asks (identifier
//! access, newness, back-reference and key column names) so planning and
//! execution never re-derive naming rules.

use crate::{
    entity::Entity,
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::{EntityModel, PropertyKind, PropertyModel},
    path::PropertyPath,
    value::Value,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// AggregateSchema
///
/// Immutable registry of entity models, validated on build.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct AggregateSchema {
    entities: BTreeMap<String, EntityModel>,
}

impl AggregateSchema {
    #[must_use]
    pub fn builder() -> AggregateSchemaBuilder {
        AggregateSchemaBuilder::default()
    }

    pub fn entity(&self, name: &str) -> Result<&EntityModel, InternalError> {
        self.entities
            .get(name)
            .ok_or_else(|| InternalError::unknown_entity_type(name))
    }

    /// Resolve a model by its storage table name (backend-side lookups).
    pub fn entity_by_table(&self, table: &str) -> Result<&EntityModel, InternalError> {
        self.entities
            .values()
            .find(|model| model.table == table)
            .ok_or_else(|| {
                InternalError::schema_unsupported(format!("no entity mapped to table '{table}'"))
            })
    }

    /// Whether the instance has no identifier yet (id column null or absent).
    pub fn is_new(&self, entity: &Entity) -> Result<bool, InternalError> {
        Ok(self.id_of(entity)?.is_null())
    }

    /// The identifier value of an instance; `Value::Null` when unset.
    pub fn id_of(&self, entity: &Entity) -> Result<Value, InternalError> {
        let model = self.entity(entity.entity_type())?;
        Ok(entity
            .column(&model.id_column)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Write the identifier into an instance's id column.
    pub fn set_id(&self, entity: &mut Entity, id: Value) -> Result<(), InternalError> {
        let model = self.entity(entity.entity_type())?;
        entity.set_column(model.id_column.clone(), id);
        Ok(())
    }

    /// Foreign-key column on the target table of a path, pointing at the
    /// owning row. Defaults to the owner's table name.
    pub fn back_reference_column(&self, path: &PropertyPath) -> Result<String, InternalError> {
        let (owner, property) = self.property_at(path)?;
        if let PropertyKind::Entity {
            back_reference: Some(column),
            ..
        } = &property.kind
        {
            return Ok(column.clone());
        }
        Ok(owner.table.clone())
    }

    /// Position/key column for a qualified (List/Map) path. Defaults to
    /// `<property>_key`.
    pub fn key_column(&self, path: &PropertyPath) -> Result<String, InternalError> {
        if !path.is_qualified() {
            return Err(InternalError::schema_invariant(format!(
                "path '{path}' is not qualified: only List and Map rows carry a key column"
            )));
        }
        let (_, property) = self.property_at(path)?;
        if let PropertyKind::Entity {
            key_column: Some(column),
            ..
        } = &property.kind
        {
            return Ok(column.clone());
        }
        Ok(format!("{}_key", property.name))
    }

    /// The entity model a path's leaf property points at.
    pub fn target_of(&self, path: &PropertyPath) -> Result<&EntityModel, InternalError> {
        let leaf = path.leaf()?;
        self.entity(&leaf.target_type)
    }

    /// The owning model and property model at a path's leaf.
    fn property_at(&self, path: &PropertyPath) -> Result<(&EntityModel, &PropertyModel), InternalError> {
        let leaf = path.leaf()?;
        let owner = self.entity(&leaf.owner_type)?;
        let property = owner.property(&leaf.property).ok_or_else(|| {
            InternalError::schema_invariant(format!(
                "type '{}' has no property '{}'",
                leaf.owner_type, leaf.property
            ))
        })?;
        Ok((owner, property))
    }
}

///
/// AggregateSchemaBuilder
///

#[derive(Debug, Default)]
pub struct AggregateSchemaBuilder {
    entities: Vec<EntityModel>,
}

impl AggregateSchemaBuilder {
    #[must_use]
    pub fn entity(mut self, model: EntityModel) -> Self {
        self.entities.push(model);
        self
    }

    /// Validate and freeze the registry.
    pub fn build(self) -> Result<AggregateSchema, InternalError> {
        let mut entities = BTreeMap::new();
        for model in self.entities {
            if entities.contains_key(&model.name) {
                return Err(InternalError::new(
                    ErrorClass::Conflict,
                    ErrorOrigin::Schema,
                    format!("duplicate entity type: '{}'", model.name),
                ));
            }
            entities.insert(model.name.clone(), model);
        }

        let schema = AggregateSchema { entities };
        for model in schema.entities.values() {
            validate_model(&schema, model)?;
        }

        Ok(schema)
    }
}

fn validate_model(schema: &AggregateSchema, model: &EntityModel) -> Result<(), InternalError> {
    let mut seen = BTreeMap::new();
    for property in &model.properties {
        if seen.insert(property.name.as_str(), ()).is_some() {
            return Err(InternalError::schema_config(format!(
                "type '{}' declares property '{}' twice",
                model.name, property.name
            )));
        }
        if property.name == model.id_column && property.is_entity_valued() {
            return Err(InternalError::schema_config(format!(
                "type '{}' maps its id column '{}' to an entity-valued property",
                model.name, model.id_column
            )));
        }
        if let PropertyKind::Entity {
            target,
            collection,
            key_column,
            ..
        } = &property.kind
        {
            if !schema.entities.contains_key(target) {
                return Err(InternalError::schema_config(format!(
                    "property '{}.{}' targets unregistered type '{target}'",
                    model.name, property.name
                )));
            }
            if key_column.is_some() && !collection.is_qualified() {
                return Err(InternalError::schema_config(format!(
                    "property '{}.{}' is {collection}-typed and cannot carry a key column",
                    model.name, property.name
                )));
            }
        }
    }

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::{ErrorClass, ErrorOrigin},
        model::CollectionKind,
        path::enumerate_paths,
    };

    fn two_level_schema() -> AggregateSchema {
        AggregateSchema::builder()
            .entity(
                EntityModel::new("Order", "id")
                    .with_entity("line_items", "LineItem", CollectionKind::List),
            )
            .entity(EntityModel::new("LineItem", "id").with_column("sku"))
            .build()
            .expect("schema is valid")
    }

    #[test]
    fn builder_rejects_unknown_target() {
        let err = AggregateSchema::builder()
            .entity(
                EntityModel::new("Order", "id").with_entity("ghost", "Ghost", CollectionKind::One),
            )
            .build()
            .expect_err("unregistered target must fail");

        assert_eq!(err.class, ErrorClass::Config);
        assert_eq!(err.origin, ErrorOrigin::Schema);
    }

    #[test]
    fn builder_rejects_duplicate_types() {
        let err = AggregateSchema::builder()
            .entity(EntityModel::new("Order", "id"))
            .entity(EntityModel::new("Order", "id"))
            .build()
            .expect_err("duplicate type must fail");

        assert_eq!(err.class, ErrorClass::Conflict);
    }

    #[test]
    fn builder_rejects_key_column_on_unqualified_property() {
        let model = EntityModel::new("Order", "id");
        let mut model = model.with_entity("address", "Address", CollectionKind::One);
        let property = model.properties.pop().expect("property just added");
        model.properties.push(property.with_key_column("address_key"));

        let err = AggregateSchema::builder()
            .entity(model)
            .entity(EntityModel::new("Address", "id"))
            .build()
            .expect_err("key column on a single reference must fail");

        assert_eq!(err.class, ErrorClass::Config);
    }

    #[test]
    fn default_column_names_derive_from_owner_and_property() {
        let schema = two_level_schema();
        let paths = enumerate_paths(&schema, "Order").expect("paths");
        let path = &paths[0];

        assert_eq!(
            schema.back_reference_column(path).expect("back ref"),
            "order"
        );
        assert_eq!(schema.key_column(path).expect("key"), "line_items_key");
    }

    #[test]
    fn key_column_is_refused_for_unqualified_paths() {
        let schema = AggregateSchema::builder()
            .entity(
                EntityModel::new("Order", "id")
                    .with_entity("address", "Address", CollectionKind::One),
            )
            .entity(EntityModel::new("Address", "id"))
            .build()
            .expect("schema is valid");
        let paths = enumerate_paths(&schema, "Order").expect("paths");

        let err = schema.key_column(&paths[0]).expect_err("must be refused");
        assert_eq!(err.class, ErrorClass::InvariantViolation);
    }

    #[test]
    fn is_new_tracks_the_id_column() {
        let schema = two_level_schema();
        let mut order = Entity::new("Order");
        assert!(schema.is_new(&order).expect("is_new"));

        schema
            .set_id(&mut order, Value::Uint(9))
            .expect("set_id succeeds");
        assert!(!schema.is_new(&order).expect("is_new"));
        assert_eq!(schema.id_of(&order).expect("id"), Value::Uint(9));
    }
}
