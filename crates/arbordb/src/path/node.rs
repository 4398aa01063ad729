//! Concrete occurrences of values at property paths.
//!
//! One `PathNode` exists per reachable child instance: a single reference
//! yields one node, a list one node per element (keyed by index), a map one
//! node per entry (keyed by map key), a set one node per member (no key).

use crate::{
    path::PropertyPath,
    value::{MapKey, Value},
};

/// Index of a node in its [`NodeArena`].
pub type NodeId = usize;

///
/// NodeKey
///
/// The qualifying position of a node inside a List or Map property; stored
/// under the path's key column on insert.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum NodeKey {
    Index(usize),
    Key(MapKey),
}

impl NodeKey {
    /// The key as a storable column value.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::Index(i) => Value::Uint(u64::try_from(*i).unwrap_or(u64::MAX)),
            Self::Key(key) => key.to_value(),
        }
    }
}

///
/// ElementRef
///
/// Selector for one element inside a property slot, resolved against the
/// live aggregate when identifiers are written back.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ElementRef {
    /// The single referenced entity.
    One,
    /// List element at this index.
    Index(usize),
    /// Set member at this insertion position.
    Member(usize),
    /// Map entry under this key.
    Key(MapKey),
}

///
/// LocatorStep
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocatorStep {
    pub property: String,
    pub element: ElementRef,
}

///
/// PathNode
///
/// One concrete value occurrence at a path. `locator` resolves the live
/// instance from the aggregate root; `parent` links into the arena so the
/// planner can chain action dependencies.
///

#[derive(Clone, Debug)]
pub struct PathNode {
    pub path: PropertyPath,
    pub parent: Option<NodeId>,
    pub key: Option<NodeKey>,
    pub locator: Vec<LocatorStep>,
}

///
/// NodeArena
///

#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<PathNode>,
}

impl NodeArena {
    pub(crate) fn push(&mut self, node: PathNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> Option<&PathNode> {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
