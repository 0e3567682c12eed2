use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use taskdesk_core::RoleId;

/// Role as it appears in a user profile payload.
///
/// The users endpoint is not consistent about the shape: some deployments
/// return bare role ids, others return role objects. Both are accepted here
/// and collapsed into plain ids by [`normalize_roles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RoleEntry {
    Id(RoleId),
    Object { id: RoleId },
}

impl RoleEntry {
    pub fn id(&self) -> RoleId {
        match self {
            RoleEntry::Id(id) | RoleEntry::Object { id } => *id,
        }
    }
}

/// Collapse profile role entries into a role set.
pub fn normalize_roles<'a, I>(entries: I) -> RoleSet
where
    I: IntoIterator<Item = &'a RoleEntry>,
{
    entries.into_iter().map(RoleEntry::id).collect()
}

/// The set of roles granted to the current user.
///
/// Serialized as a JSON array of integers (the `user_roles` storage format).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoleSet(BTreeSet<RoleId>);

impl RoleSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = RoleId> + '_ {
        self.0.iter().copied()
    }

    pub fn contains(&self, role: RoleId) -> bool {
        self.0.contains(&role)
    }

    /// True if at least one of `required` is granted. False for an empty list.
    pub fn contains_any(&self, required: &[RoleId]) -> bool {
        required.iter().any(|r| self.contains(*r))
    }

    /// True if every one of `required` is granted. Vacuously true for an empty list.
    pub fn contains_all(&self, required: &[RoleId]) -> bool {
        required.iter().all(|r| self.contains(*r))
    }

    /// Encode for durable storage.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }

    /// Decode from durable storage; anything unparseable yields an empty set.
    pub fn from_json_lossy(raw: &str) -> Self {
        serde_json::from_str(raw).unwrap_or_default()
    }
}

impl FromIterator<RoleId> for RoleSet {
    fn from_iter<T: IntoIterator<Item = RoleId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[i64; N]> for RoleSet {
    fn from(ids: [i64; N]) -> Self {
        ids.into_iter().map(RoleId::new).collect()
    }
}
