use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};
use std::hash::Hash;

use super::EcoIdentity;

/// Problem-specific kind of relation, carrying the conflict rule.
///
/// The engine trusts `is_conflict` as-is. It should be symmetric: two
/// relations that cannot both hold are in conflict whichever is asked first.
pub trait RelationKind: Clone + Debug + Eq + Ord + Hash + Send + Sync + 'static {
    fn is_conflict(first: &EcoRelation<Self>, second: &EcoRelation<Self>) -> bool;
}

/// Directed relation `kind(master, slave)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EcoRelation<K> {
    pub master: EcoIdentity,
    pub slave: EcoIdentity,
    pub kind: K,
}

impl<K: RelationKind> EcoRelation<K> {
    pub fn new(master: impl Into<EcoIdentity>, slave: impl Into<EcoIdentity>, kind: K) -> Self {
        Self {
            master: master.into(),
            slave: slave.into(),
            kind,
        }
    }

    pub fn is_conflict(&self, other: &EcoRelation<K>) -> bool {
        K::is_conflict(self, other)
    }

    pub fn involves(&self, identity: &EcoIdentity) -> bool {
        &self.master == identity || &self.slave == identity
    }

    pub fn other_participant(&self, identity: &EcoIdentity) -> Option<EcoIdentity> {
        if &self.master == identity {
            Some(self.slave)
        } else if &self.slave == identity {
            Some(self.master)
        } else {
            None
        }
    }

    /// Replaces every occurrence of `identity` with the `Any` wildcard.
    pub fn to_pattern(&self, identity: &EcoIdentity) -> Self {
        let wildcard = |id: EcoIdentity| if &id == identity { EcoIdentity::Any } else { id };
        Self {
            master: wildcard(self.master),
            slave: wildcard(self.slave),
            kind: self.kind.clone(),
        }
    }

    /// Wildcard-aware equality, used to answer feedback requests.
    pub fn matches(&self, other: &EcoRelation<K>) -> bool {
        self.kind == other.kind && self.master.matches(&other.master) && self.slave.matches(&other.slave)
    }
}

impl<K: Debug> fmt::Display for EcoRelation<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({}, {})", self.kind, self.master, self.slave)
    }
}
