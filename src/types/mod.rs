pub mod attack;
pub mod message;
pub mod relation;

pub use attack::EcoAttack;
pub use message::{DependencyUpdate, EcoMessage, Envelope};
pub use relation::{EcoRelation, RelationKind};

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

pub type AgentId = Uuid;

/// Identity of a participant as it appears inside relations.
///
/// `Any` and `Nobody` are wildcards for relation patterns and are never the
/// address of a live participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EcoIdentity {
    Agent(AgentId),
    Any,
    Nobody,
}

impl EcoIdentity {
    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            EcoIdentity::Agent(id) => Some(*id),
            EcoIdentity::Any | EcoIdentity::Nobody => None,
        }
    }

    pub fn is_wildcard(&self) -> bool {
        !matches!(self, EcoIdentity::Agent(_))
    }

    /// Pattern equality: `Any` on either side matches every identity.
    pub fn matches(&self, other: &EcoIdentity) -> bool {
        matches!(self, EcoIdentity::Any) || matches!(other, EcoIdentity::Any) || self == other
    }
}

impl From<AgentId> for EcoIdentity {
    fn from(id: AgentId) -> Self {
        EcoIdentity::Agent(id)
    }
}

impl fmt::Display for EcoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EcoIdentity::Agent(id) => write!(f, "{}", id),
            EcoIdentity::Any => f.write_str("*"),
            EcoIdentity::Nobody => f.write_str("-"),
        }
    }
}
