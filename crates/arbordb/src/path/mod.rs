//! Persistent property paths and their breadth-first enumeration.
//!
//! A path names one entity-valued property chain from the aggregate root
//! type. Enumeration order (strictly non-decreasing length) is a contract
//! consumed by the planner: all nodes of a shorter path exist before any
//! longer path is resolved.

pub mod node;
#[cfg(test)]
mod tests;

use crate::{
    MAX_PATH_DEPTH,
    error::InternalError,
    model::{CollectionKind, PropertyKind},
    schema::AggregateSchema,
};
use serde::{Deserialize, Serialize};
use std::{collections::VecDeque, fmt};

///
/// PropertyPath
///
/// Ordered chain of entity-valued property names from the root type.
/// Always at least one segment long; built only by [`enumerate_paths`].
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PropertyPath {
    root_type: String,
    segments: Vec<PathSegment>,
}

impl PropertyPath {
    fn first(root_type: impl Into<String>, segment: PathSegment) -> Self {
        Self {
            root_type: root_type.into(),
            segments: vec![segment],
        }
    }

    fn extend(&self, segment: PathSegment) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment);
        Self {
            root_type: self.root_type.clone(),
            segments,
        }
    }

    #[must_use]
    pub fn root_type(&self) -> &str {
        &self.root_type
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// The final segment. Paths are non-empty by construction; an empty
    /// path is a corrupted plan and surfaces as an invariant violation.
    pub(crate) fn leaf(&self) -> Result<&PathSegment, InternalError> {
        self.segments
            .last()
            .ok_or_else(|| InternalError::path_invariant("property path has no segments"))
    }

    /// The length-(n-1) prefix, or `None` for root-level paths.
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            root_type: self.root_type.clone(),
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// The first `depth` segments as a path. `depth` is clamped to the
    /// full length.
    #[must_use]
    pub fn prefix(&self, depth: usize) -> Self {
        let depth = depth.min(self.segments.len());
        Self {
            root_type: self.root_type.clone(),
            segments: self.segments[..depth].to_vec(),
        }
    }

    /// Whether the leaf property is List- or Map-typed (its rows carry an
    /// extra position or key column).
    #[must_use]
    pub fn is_qualified(&self) -> bool {
        self.segments
            .last()
            .is_some_and(|s| s.collection.is_qualified())
    }

    #[must_use]
    pub fn collection_kind(&self) -> Option<CollectionKind> {
        self.segments.last().map(|s| s.collection)
    }

    #[must_use]
    pub fn leaf_property(&self) -> Option<&str> {
        self.segments.last().map(|s| s.property.as_str())
    }

    #[must_use]
    pub fn target_type(&self) -> Option<&str> {
        self.segments.last().map(|s| s.target_type.as_str())
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{}", segment.property)?;
        }
        Ok(())
    }
}

///
/// PathSegment
///
/// One resolved hop: `owner_type.property -> target_type`.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct PathSegment {
    pub property: String,
    pub owner_type: String,
    pub target_type: String,
    pub collection: CollectionKind,
}

/// Enumerate every entity-valued property path reachable from `root_type`,
/// in strictly non-decreasing path-length order (breadth-first).
///
/// Cyclic ownership in the type graph is rejected: the whole-replace
/// delete/insert strategy does not compose with cycles.
pub fn enumerate_paths(
    schema: &AggregateSchema,
    root_type: &str,
) -> Result<Vec<PropertyPath>, InternalError> {
    let root = schema.entity(root_type)?;

    let mut queue: VecDeque<PropertyPath> = VecDeque::new();
    for property in root.entity_properties() {
        if let PropertyKind::Entity {
            target, collection, ..
        } = &property.kind
        {
            queue.push_back(PropertyPath::first(
                root.name.clone(),
                PathSegment {
                    property: property.name.clone(),
                    owner_type: root.name.clone(),
                    target_type: target.clone(),
                    collection: *collection,
                },
            ));
        }
    }

    let mut out = Vec::new();
    while let Some(path) = queue.pop_front() {
        let leaf = path.leaf()?;
        let ancestor_count = path.len() - 1;
        let mut ancestors = std::iter::once(path.root_type()).chain(
            path.segments()[..ancestor_count]
                .iter()
                .map(|s| s.target_type.as_str()),
        );
        if ancestors.any(|t| t == leaf.target_type) {
            return Err(InternalError::path_unsupported(format!(
                "cyclic ownership at '{path}': type '{}' owns itself transitively",
                leaf.target_type
            )));
        }
        if path.len() > MAX_PATH_DEPTH {
            return Err(InternalError::path_unsupported(format!(
                "property path '{path}' exceeds the supported depth of {MAX_PATH_DEPTH}"
            )));
        }

        let target = schema.entity(&leaf.target_type)?;
        let owner_type = target.name.clone();
        for property in target.entity_properties() {
            if let PropertyKind::Entity {
                target: next_target,
                collection,
                ..
            } = &property.kind
            {
                queue.push_back(path.extend(PathSegment {
                    property: property.name.clone(),
                    owner_type: owner_type.clone(),
                    target_type: next_target.clone(),
                    collection: *collection,
                }));
            }
        }

        out.push(path);
    }

    // Contract: consumers rely on shorter paths being fully resolved first.
    debug_assert!(
        out.windows(2).all(|w| w[0].len() <= w[1].len()),
        "path enumeration must be non-decreasing in length"
    );

    Ok(out)
}
