//! Dynamic aggregate instance graph.
//!
//! An [`Entity`] owns everything reachable from it through entity-valued
//! properties, forming a tree. The planner reads this tree to build change
//! plans and writes generated identifiers back into it after execution.

use crate::{
    model::EntityModel,
    path::node::{ElementRef, LocatorStep},
    plan::action::Row,
    value::{MapKey, Value},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Entity
///
/// One concrete instance of a mapped type. Scalar columns and nested
/// entities live in the same property map; the schema decides which is
/// which when planning.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct Entity {
    entity_type: String,
    properties: BTreeMap<String, PropertyValue>,
}

impl Entity {
    #[must_use]
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            properties: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    // ─────────────────────────────────────────────
    // Builder-style constructors
    // ─────────────────────────────────────────────

    #[must_use]
    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Column(value.into()));
        self
    }

    #[must_use]
    pub fn with_one(mut self, name: impl Into<String>, child: Self) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::One(Box::new(child)));
        self
    }

    #[must_use]
    pub fn with_list(mut self, name: impl Into<String>, children: Vec<Self>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::List(children));
        self
    }

    #[must_use]
    pub fn with_set(mut self, name: impl Into<String>, members: Vec<Self>) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Set(members));
        self
    }

    #[must_use]
    pub fn with_map(
        mut self,
        name: impl Into<String>,
        entries: impl IntoIterator<Item = (MapKey, Self)>,
    ) -> Self {
        self.properties
            .insert(name.into(), PropertyValue::Map(entries.into_iter().collect()));
        self
    }

    // ─────────────────────────────────────────────
    // Accessors
    // ─────────────────────────────────────────────

    #[must_use]
    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn property_mut(&mut self, name: &str) -> Option<&mut PropertyValue> {
        self.properties.get_mut(name)
    }

    pub fn set_property(&mut self, name: impl Into<String>, value: PropertyValue) {
        self.properties.insert(name.into(), value);
    }

    /// A scalar column value, if the property is present and scalar.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Value> {
        match self.properties.get(name) {
            Some(PropertyValue::Column(v)) => Some(v),
            _ => None,
        }
    }

    pub fn set_column(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.properties
            .insert(name.into(), PropertyValue::Column(value.into()));
    }

    /// Snapshot of the scalar columns this entity carries, restricted to
    /// what the model declares (id column plus `Column` properties).
    #[must_use]
    pub(crate) fn columns_row(&self, model: &EntityModel) -> Row {
        let mut row = Row::default();
        if let Some(id) = self.column(&model.id_column)
            && !id.is_null()
        {
            row.insert(model.id_column.clone(), id.clone());
        }
        for property in &model.properties {
            if property.is_entity_valued() {
                continue;
            }
            if let Some(value) = self.column(&property.name) {
                row.insert(property.name.clone(), value.clone());
            }
        }
        row
    }

    // ─────────────────────────────────────────────
    // Locator navigation
    // ─────────────────────────────────────────────

    /// Resolve one locator step to the child entity it selects.
    #[must_use]
    pub(crate) fn child(&self, property: &str, element: &ElementRef) -> Option<&Self> {
        match (self.properties.get(property)?, element) {
            (PropertyValue::One(child), ElementRef::One) => Some(child),
            (PropertyValue::List(items), ElementRef::Index(i)) => items.get(*i),
            (PropertyValue::Set(members), ElementRef::Member(i)) => members.get(*i),
            (PropertyValue::Map(entries), ElementRef::Key(key)) => entries.get(key),
            _ => None,
        }
    }

    /// Mutable variant of [`Self::child`].
    pub(crate) fn child_mut(&mut self, property: &str, element: &ElementRef) -> Option<&mut Self> {
        match (self.properties.get_mut(property)?, element) {
            (PropertyValue::One(child), ElementRef::One) => Some(child),
            (PropertyValue::List(items), ElementRef::Index(i)) => items.get_mut(*i),
            (PropertyValue::Set(members), ElementRef::Member(i)) => members.get_mut(*i),
            (PropertyValue::Map(entries), ElementRef::Key(key)) => entries.get_mut(key),
            _ => None,
        }
    }

    /// Walk a locator from this entity to the instance it selects.
    #[must_use]
    pub(crate) fn resolve(&self, steps: &[LocatorStep]) -> Option<&Self> {
        let mut cur = self;
        for step in steps {
            cur = cur.child(&step.property, &step.element)?;
        }
        Some(cur)
    }

    /// Mutable variant of [`Self::resolve`].
    pub(crate) fn resolve_mut(&mut self, steps: &[LocatorStep]) -> Option<&mut Self> {
        let mut cur = self;
        for step in steps {
            cur = cur.child_mut(&step.property, &step.element)?;
        }
        Some(cur)
    }
}

///
/// PropertyValue
///
/// Value of one property slot. Sets are insertion-ordered vectors unique by
/// structural equality; maps are ordered by key.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum PropertyValue {
    Column(Value),
    One(Box<Entity>),
    List(Vec<Entity>),
    Set(Vec<Entity>),
    Map(BTreeMap<MapKey, Entity>),
}

impl PropertyValue {
    /// Number of concrete entity occurrences in this slot.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        match self {
            Self::Column(_) => 0,
            Self::One(_) => 1,
            Self::List(items) | Self::Set(items) => items.len(),
            Self::Map(entries) => entries.len(),
        }
    }
}
