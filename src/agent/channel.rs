use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock, Weak};

use crate::engine::{EcoEntity, ListenerId};
use crate::lifecycle::EcoState;
use crate::types::{AgentId, EcoRelation, RelationKind};

/// Read-only picture of one eco-agent, refreshed after each of its ticks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "K: Serialize", deserialize = "K: Deserialize<'de> + Ord"))]
pub struct ChannelSnapshot<K> {
    pub owner: AgentId,
    pub label: String,
    pub state: EcoState,
    pub goal: Option<EcoRelation<K>>,
    pub acquaintances: BTreeSet<EcoRelation<K>>,
    pub dependencies: BTreeSet<AgentId>,
    pub solving_started: bool,
    pub updated_at: DateTime<Utc>,
}

impl<K: RelationKind> ChannelSnapshot<K> {
    pub(crate) fn capture(label: &str, state: EcoState, entity: &EcoEntity<K>) -> Self {
        Self {
            owner: entity.identity(),
            label: label.to_string(),
            state,
            goal: entity.goal().cloned(),
            acquaintances: entity.acquaintances().clone(),
            dependencies: entity.dependencies().clone(),
            solving_started: entity.is_solving_started(),
            updated_at: Utc::now(),
        }
    }

    /// Same observable content, ignoring the refresh time.
    pub fn same_content(&self, other: &Self) -> bool {
        self.owner == other.owner
            && self.state == other.state
            && self.goal == other.goal
            && self.acquaintances == other.acquaintances
            && self.dependencies == other.dependencies
            && self.solving_started == other.solving_started
    }
}

pub trait EcoChannelListener<K>: Send + Sync {
    fn channel_content_changed(&self, snapshot: &ChannelSnapshot<K>);
}

impl<K, F> EcoChannelListener<K> for F
where
    F: Fn(&ChannelSnapshot<K>) + Send + Sync,
{
    fn channel_content_changed(&self, snapshot: &ChannelSnapshot<K>) {
        self(snapshot)
    }
}

pub(crate) struct ChannelShared<K> {
    snapshot: ChannelSnapshot<K>,
    listeners: Vec<(ListenerId, Arc<dyn EcoChannelListener<K>>)>,
    next_listener: u64,
}

impl<K: RelationKind> ChannelShared<K> {
    pub(crate) fn new(snapshot: ChannelSnapshot<K>) -> Arc<RwLock<Self>> {
        Arc::new(RwLock::new(Self {
            snapshot,
            listeners: Vec::new(),
            next_listener: 0,
        }))
    }

    pub(crate) fn publish(shared: &RwLock<Self>, snapshot: ChannelSnapshot<K>, notify: bool) {
        let listeners: Vec<Arc<dyn EcoChannelListener<K>>> = {
            let mut guard = shared.write().unwrap_or_else(PoisonError::into_inner);
            guard.snapshot = snapshot.clone();
            if !notify {
                return;
            }
            guard.listeners.iter().map(|(_, listener)| listener.clone()).collect()
        };
        for listener in listeners {
            listener.channel_content_changed(&snapshot);
        }
    }
}

/// Observation handle on an eco-agent.
///
/// Holds no ownership of the agent: once the agent is gone every accessor
/// returns `None` and listener registration fails.
pub struct EcoChannel<K> {
    owner: AgentId,
    shared: Weak<RwLock<ChannelShared<K>>>,
}

impl<K> Clone for EcoChannel<K> {
    fn clone(&self) -> Self {
        Self {
            owner: self.owner,
            shared: self.shared.clone(),
        }
    }
}

impl<K: RelationKind> EcoChannel<K> {
    pub(crate) fn new(owner: AgentId, shared: &Arc<RwLock<ChannelShared<K>>>) -> Self {
        Self {
            owner,
            shared: Arc::downgrade(shared),
        }
    }

    pub fn owner(&self) -> AgentId {
        self.owner
    }

    pub fn is_connected(&self) -> bool {
        self.shared.strong_count() > 0
    }

    pub fn snapshot(&self) -> Option<ChannelSnapshot<K>> {
        let shared = self.shared.upgrade()?;
        let guard = shared.read().unwrap_or_else(PoisonError::into_inner);
        Some(guard.snapshot.clone())
    }

    pub fn eco_state(&self) -> Option<EcoState> {
        let shared = self.shared.upgrade()?;
        let guard = shared.read().unwrap_or_else(PoisonError::into_inner);
        Some(guard.snapshot.state)
    }

    pub fn acquaintances(&self) -> Option<BTreeSet<EcoRelation<K>>> {
        self.snapshot().map(|snapshot| snapshot.acquaintances)
    }

    pub fn add_listener(&self, listener: Arc<dyn EcoChannelListener<K>>) -> Option<ListenerId> {
        let shared = self.shared.upgrade()?;
        let mut guard = shared.write().unwrap_or_else(PoisonError::into_inner);
        let id = ListenerId(guard.next_listener);
        guard.next_listener += 1;
        guard.listeners.push((id, listener));
        Some(id)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let Some(shared) = self.shared.upgrade() else {
            return false;
        };
        let mut guard = shared.write().unwrap_or_else(PoisonError::into_inner);
        let before = guard.listeners.len();
        guard.listeners.retain(|(listener_id, _)| *listener_id != id);
        guard.listeners.len() != before
    }
}

impl<K> std::fmt::Debug for EcoChannel<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcoChannel")
            .field("owner", &self.owner)
            .field("connected", &(self.shared.strong_count() > 0))
            .finish()
    }
}
