//! Runtime metadata models describing mapped entity types.
//!
//! Models are plain data; resolution, validation, and column naming live in
//! the [`crate::schema`] registry built from them.

use serde::{Deserialize, Serialize};
use std::fmt;

///
/// EntityModel
/// Runtime model for one mapped entity type.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityModel {
    /// Stable type name used in instances and routing.
    pub name: String,
    /// Storage table name (defaults to the type name, lowercased).
    pub table: String,
    /// Identifier column. Absence of a value here is what makes an
    /// instance "new".
    pub id_column: String,
    /// Ordered property list (order is significant for path enumeration).
    pub properties: Vec<PropertyModel>,
}

impl EntityModel {
    #[must_use]
    pub fn new(name: impl Into<String>, id_column: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            table: name.to_lowercase(),
            name,
            id_column: id_column.into(),
            properties: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    /// Add a plain scalar column property.
    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        self.properties.push(PropertyModel {
            name: name.into(),
            kind: PropertyKind::Column,
        });
        self
    }

    /// Add an entity-valued property.
    #[must_use]
    pub fn with_entity(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        collection: CollectionKind,
    ) -> Self {
        self.properties.push(PropertyModel {
            name: name.into(),
            kind: PropertyKind::Entity {
                target: target.into(),
                collection,
                back_reference: None,
                key_column: None,
            },
        });
        self
    }

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyModel> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Entity-valued properties in declaration order.
    pub fn entity_properties(&self) -> impl Iterator<Item = &PropertyModel> {
        self.properties
            .iter()
            .filter(|p| matches!(p.kind, PropertyKind::Entity { .. }))
    }
}

///
/// PropertyModel
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropertyModel {
    pub name: String,
    pub kind: PropertyKind,
}

impl PropertyModel {
    #[must_use]
    pub const fn is_entity_valued(&self) -> bool {
        matches!(self.kind, PropertyKind::Entity { .. })
    }

    /// Override the back-reference (foreign-key) column for this property.
    #[must_use]
    pub fn with_back_reference(mut self, column: impl Into<String>) -> Self {
        if let PropertyKind::Entity { back_reference, .. } = &mut self.kind {
            *back_reference = Some(column.into());
        }
        self
    }

    /// Override the key column for a qualified (List/Map) property.
    #[must_use]
    pub fn with_key_column(mut self, column: impl Into<String>) -> Self {
        if let PropertyKind::Entity { key_column, .. } = &mut self.kind {
            *key_column = Some(column.into());
        }
        self
    }
}

///
/// PropertyKind
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PropertyKind {
    /// A scalar column stored inline in the owning row.
    Column,
    /// A nested entity (or collection of entities) stored in its own table.
    Entity {
        target: String,
        collection: CollectionKind,
        /// FK column on the target table; defaults to the owner's table name.
        back_reference: Option<String>,
        /// Position/key column for qualified properties; defaults to
        /// `<property>_key`.
        key_column: Option<String>,
    },
}

///
/// CollectionKind
///
/// How an entity-valued property holds its target(s). List and Map are
/// "qualified": their rows carry an extra position or key column.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum CollectionKind {
    One,
    List,
    Set,
    Map,
}

impl CollectionKind {
    #[must_use]
    pub const fn is_qualified(self) -> bool {
        matches!(self, Self::List | Self::Map)
    }
}

impl fmt::Display for CollectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::One => "one",
            Self::List => "list",
            Self::Set => "set",
            Self::Map => "map",
        };
        write!(f, "{label}")
    }
}
