use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AgentId, EcoRelation};

/// Assertion that `assailant` obstructs `defender`.
///
/// `constraints` name the relations the assailant needs the defender to give
/// up; an empty list is an unconstrained attack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EcoAttack<K> {
    pub assailant: AgentId,
    pub defender: AgentId,
    pub constraints: Vec<EcoRelation<K>>,
}

impl<K> EcoAttack<K> {
    pub fn new(assailant: AgentId, defender: AgentId) -> Self {
        Self {
            assailant,
            defender,
            constraints: Vec::new(),
        }
    }

    pub fn with_constraint(mut self, constraint: EcoRelation<K>) -> Self {
        self.constraints.push(constraint);
        self
    }

    pub fn is_constrained(&self) -> bool {
        !self.constraints.is_empty()
    }
}

impl<K: fmt::Debug> fmt::Display for EcoAttack<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.constraints.is_empty() {
            write!(f, "{} attacks {}", self.assailant, self.defender)
        } else {
            write!(f, "{} attacks {} on [", self.assailant, self.defender)?;
            for (index, constraint) in self.constraints.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", constraint)?;
            }
            f.write_str("]")
        }
    }
}
