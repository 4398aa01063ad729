//! arbordb
//!
//! Aggregate change planning and generated-key propagation for relational
//! stores. An aggregate (a root entity plus everything it owns through
//! entity-valued properties) is saved and deleted as one unit: the planner
//! turns an instance into a topologically ordered action list, and
//! execution flows store-generated identifiers into dependent actions and
//! back into the live instance.

pub mod backend;
pub mod change;
pub mod entity;
pub mod error;
pub mod executor;
pub mod model;
pub mod obs;
pub mod path;
pub mod plan;
pub mod schema;
pub mod store;
pub mod value;

#[cfg(test)]
pub(crate) mod test_support;

/// Maximum supported property path depth. Aggregates nesting deeper than
/// this are rejected at path enumeration time.
pub const MAX_PATH_DEPTH: usize = 16;

pub mod prelude {
    pub use crate::{
        change::{ChangeKind, ChangeReport},
        entity::{Entity, PropertyValue},
        model::{CollectionKind, EntityModel, PropertyModel},
        schema::AggregateSchema,
        store::AggregateStore,
        value::{MapKey, Value},
    };
}
