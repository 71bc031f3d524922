use serde::{Deserialize, Serialize};

use super::{AgentId, EcoAttack, EcoRelation};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyUpdate<K> {
    /// `dependency` now has a goal whose slave is the receiver. The receiver
    /// answers with every acquaintance matching `feedback_pattern`.
    Add {
        dependency: AgentId,
        feedback_pattern: EcoRelation<K>,
    },
    Remove {
        dependency: AgentId,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EcoMessage<K> {
    PresenceAnnouncement,
    AcknowledgeReady,
    StartSolving,
    AcquaintanceUpdate {
        relation: EcoRelation<K>,
        is_addition: bool,
    },
    Attack(EcoAttack<K>),
    DependencyUpdate(DependencyUpdate<K>),
    ProblemSolved,
}

impl<K> EcoMessage<K> {
    pub fn name(&self) -> &'static str {
        match self {
            EcoMessage::PresenceAnnouncement => "PresenceAnnouncement",
            EcoMessage::AcknowledgeReady => "AcknowledgeReady",
            EcoMessage::StartSolving => "StartSolving",
            EcoMessage::AcquaintanceUpdate { .. } => "AcquaintanceUpdate",
            EcoMessage::Attack(_) => "Attack",
            EcoMessage::DependencyUpdate(_) => "DependencyUpdate",
            EcoMessage::ProblemSolved => "ProblemSolved",
        }
    }
}

/// A message together with the address of its sender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope<K> {
    pub sender: AgentId,
    pub message: EcoMessage<K>,
}

impl<K> Envelope<K> {
    pub fn new(sender: AgentId, message: EcoMessage<K>) -> Self {
        Self { sender, message }
    }
}
