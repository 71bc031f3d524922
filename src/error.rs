use thiserror::Error;

use crate::lifecycle::EcoState;
use crate::types::{AgentId, EcoIdentity};

#[derive(Debug, Error)]
pub enum EcoError {
    #[error("goal master {master} is not the owning entity {owner}")]
    ForeignGoal { master: EcoIdentity, owner: AgentId },

    #[error("invalid state transition from {from:?} on {event}")]
    InvalidTransition { from: EcoState, event: String },

    #[error("unknown participant {0}")]
    UnknownParticipant(AgentId),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type EcoResult<T> = std::result::Result<T, EcoError>;
