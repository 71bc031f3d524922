use log::trace;
use std::collections::HashMap;

use super::traits::EcoTransport;
use crate::agent::EcoChannel;
use crate::types::{AgentId, EcoMessage, Envelope, RelationKind};

/// Everything an agent may touch during one tick: its drained mailbox, an
/// outbox flushed by the kernel after the tick, and read-only views of the
/// population.
pub struct AgentContext<'a, K: RelationKind> {
    address: AgentId,
    inbox: Vec<Envelope<K>>,
    outbox: Vec<(AgentId, Envelope<K>)>,
    participants: &'a [AgentId],
    channels: &'a HashMap<AgentId, EcoChannel<K>>,
    killed: bool,
}

impl<'a, K: RelationKind> AgentContext<'a, K> {
    pub fn new(
        address: AgentId,
        inbox: Vec<Envelope<K>>,
        participants: &'a [AgentId],
        channels: &'a HashMap<AgentId, EcoChannel<K>>,
    ) -> Self {
        Self {
            address,
            inbox,
            outbox: Vec::new(),
            participants,
            channels,
            killed: false,
        }
    }

    /// Every other participant alive when the tick started.
    pub fn participants(&self) -> impl Iterator<Item = AgentId> + '_ {
        self.participants
            .iter()
            .copied()
            .filter(move |id| *id != self.address)
    }

    pub fn broadcast(&mut self, message: EcoMessage<K>) -> usize {
        let receivers: Vec<AgentId> = self.participants().collect();
        self.broadcast_to(receivers, message)
    }

    pub fn broadcast_to(
        &mut self,
        receivers: impl IntoIterator<Item = AgentId>,
        message: EcoMessage<K>,
    ) -> usize {
        let mut count = 0;
        for receiver in receivers {
            self.send(receiver, message.clone());
            count += 1;
        }
        count
    }

    pub fn channel(&self, address: AgentId) -> Option<EcoChannel<K>> {
        self.channels.get(&address).cloned()
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    pub fn pending_messages(&self) -> usize {
        self.inbox.len()
    }

    pub fn into_parts(self) -> (Vec<(AgentId, Envelope<K>)>, bool) {
        (self.outbox, self.killed)
    }
}

impl<K: RelationKind> EcoTransport<K> for AgentContext<'_, K> {
    fn address(&self) -> AgentId {
        self.address
    }

    fn take_messages(&mut self) -> Vec<Envelope<K>> {
        std::mem::take(&mut self.inbox)
    }

    fn send(&mut self, receiver: AgentId, message: EcoMessage<K>) {
        trace!("{} -> {}: {}", self.address, receiver, message.name());
        self.outbox
            .push((receiver, Envelope::new(self.address, message)));
    }

    fn kill_me(&mut self) {
        self.killed = true;
    }
}
