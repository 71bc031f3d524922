use anyhow::Result;

use crate::agent::EcoChannel;
use crate::types::{AgentId, EcoMessage, Envelope, RelationKind};

/// Mailbox access of one participant during its tick.
pub trait EcoTransport<K> {
    fn address(&self) -> AgentId;

    /// Drains every message delivered since the previous tick, in arrival order.
    fn take_messages(&mut self) -> Vec<Envelope<K>>;

    /// Fire-and-forget: the receiver sees the message on a later tick.
    fn send(&mut self, receiver: AgentId, message: EcoMessage<K>);

    fn kill_me(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelEvent {
    AgentLaunched(AgentId),
    AgentKilled(AgentId),
}

/// A participant scheduled by a kernel, invoked once per tick.
pub trait KernelAgent<K: RelationKind>: Send {
    fn address(&self) -> AgentId;

    /// Runs one tick. Returns whether the agent did anything observable.
    fn live(&mut self, ctx: &mut super::AgentContext<'_, K>) -> Result<bool>;

    fn on_kernel_event(&mut self, _event: &KernelEvent) {}

    fn eco_channel(&self) -> Option<EcoChannel<K>> {
        None
    }
}

/// Host services consumed by the problem bootstrap.
pub trait Kernel<K: RelationKind> {
    /// Registers an agent to be launched by the next [`Kernel::launch_deferred`].
    fn submit(&mut self, agent: Box<dyn KernelAgent<K>>);

    fn launch_deferred(&mut self) -> Vec<AgentId>;

    fn launch(&mut self, agent: Box<dyn KernelAgent<K>>) -> AgentId;

    fn kill(&mut self, address: AgentId) -> bool;

    /// Delivers a message from outside the agent population.
    fn post(&mut self, receiver: AgentId, envelope: Envelope<K>) -> bool;

    fn channel(&self, address: AgentId) -> Option<EcoChannel<K>>;

    fn is_alive(&self, address: AgentId) -> bool;
}
