use crate::types::{AgentId, EcoAttack, EcoRelation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcoEvent<K> {
    GoalChanged {
        old: Option<EcoRelation<K>>,
        new: Option<EcoRelation<K>>,
    },
    AcquaintanceAdded(EcoRelation<K>),
    AcquaintanceRemoved(EcoRelation<K>),
    AttackReceived(EcoAttack<K>),
    AttacksCleared(Vec<EcoAttack<K>>),
    DependencyAdded(AgentId),
    DependencyRemoved(AgentId),
    ProblemSolvingStarted,
    ProblemSolved,
}

pub trait EcoEntityListener<K>: Send {
    fn on_event(&mut self, entity: AgentId, event: &EcoEvent<K>);
}

impl<K, F> EcoEntityListener<K> for F
where
    F: FnMut(AgentId, &EcoEvent<K>) + Send,
{
    fn on_event(&mut self, entity: AgentId, event: &EcoEvent<K>) {
        self(entity, event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ListenerId(pub(crate) u64);
