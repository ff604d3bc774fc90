//! Resource identifiers and membership sets.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum IdError {
    #[error("invalid resource id {value:?}: {source}")]
    InvalidUuid { value: String, source: uuid::Error },
}

/// Opaque identifier of a console resource.
///
/// The backend issues UUIDs, but nothing outside [`ResourceId::parse_uuid`] relies on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Accept `value` only if it is a UUID, normalized to lowercase hyphenated form.
    pub fn parse_uuid(value: &str) -> Result<Self, IdError> {
        Uuid::parse_str(value)
            .map(Self::from)
            .map_err(|source| IdError::InvalidUuid {
                value: value.to_string(),
                source,
            })
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for ResourceId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<Uuid> for ResourceId {
    fn from(value: Uuid) -> Self {
        Self(value.hyphenated().to_string())
    }
}

impl From<&ResourceId> for ResourceId {
    fn from(value: &ResourceId) -> Self {
        value.clone()
    }
}

impl AsRef<str> for ResourceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ResourceId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Members of one relation attached to one parent at some point in time.
///
/// A true set: duplicates are dropped on insertion and equality ignores order.
/// Iteration follows first-insertion order so derived lists are reproducible.
#[derive(Debug, Clone, Default)]
pub struct MembershipSet {
    order: Vec<ResourceId>,
    index: HashSet<ResourceId>,
}

impl MembershipSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from embedded related-resource summaries (`[{ "id": ..., ... }]`).
    ///
    /// Items without a string `id` are skipped.
    pub fn from_summaries(items: &[serde_json::Value]) -> Self {
        items
            .iter()
            .filter_map(|item| item.get("id").and_then(|id| id.as_str()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ResourceId> {
        self.order.iter()
    }

    /// Returns `false` if `id` was already a member.
    pub fn insert(&mut self, id: impl Into<ResourceId>) -> bool {
        let id = id.into();
        if !self.index.insert(id.clone()) {
            return false;
        }
        self.order.push(id);
        true
    }

    /// Returns `false` if `id` was not a member.
    pub fn remove(&mut self, id: &str) -> bool {
        if !self.index.remove(id) {
            return false;
        }
        self.order.retain(|member| member.as_str() != id);
        true
    }

    /// Flip membership of `id`; returns whether it is a member afterwards.
    pub fn toggle(&mut self, id: impl Into<ResourceId>) -> bool {
        let id = id.into();
        if self.remove(id.as_str()) {
            false
        } else {
            self.insert(id)
        }
    }

    /// `self \ other`, in `self` iteration order.
    pub fn difference(&self, other: &MembershipSet) -> Vec<ResourceId> {
        self.order
            .iter()
            .filter(|id| !other.contains(id.as_str()))
            .cloned()
            .collect()
    }

    pub fn into_vec(self) -> Vec<ResourceId> {
        self.order
    }
}

impl PartialEq for MembershipSet {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.order.iter().all(|id| other.contains(id.as_str()))
    }
}

impl Eq for MembershipSet {}

impl<I: Into<ResourceId>> FromIterator<I> for MembershipSet {
    fn from_iter<T: IntoIterator<Item = I>>(iter: T) -> Self {
        let mut set = MembershipSet::new();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

impl<I: Into<ResourceId>> Extend<I> for MembershipSet {
    fn extend<T: IntoIterator<Item = I>>(&mut self, iter: T) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl<'a> IntoIterator for &'a MembershipSet {
    type Item = &'a ResourceId;
    type IntoIter = std::slice::Iter<'a, ResourceId>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

impl Serialize for MembershipSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.order.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MembershipSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Vec::<ResourceId>::deserialize(deserializer)?
            .into_iter()
            .collect())
    }
}
