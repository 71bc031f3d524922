use anyhow::{Context, Result};
use std::sync::{Arc, RwLock};

use super::channel::{ChannelShared, ChannelSnapshot, EcoChannel};
use crate::engine::{EcoBehavior, EcoEntity, EcoEntityListener, ListenerId};
use crate::kernel::{AgentContext, KernelAgent};
use crate::lifecycle::{EcoState, EcoStateMachine};
use crate::types::{AgentId, EcoIdentity, RelationKind};

/// Binds an entity, its state machine and its decision hooks to the kernel
/// tick, and publishes its state on an [`EcoChannel`].
pub struct EcoAgent<K: RelationKind> {
    label: String,
    entity: EcoEntity<K>,
    machine: EcoStateMachine,
    behavior: Box<dyn EcoBehavior<K>>,
    channel: Arc<RwLock<ChannelShared<K>>>,
}

impl<K: RelationKind> EcoAgent<K> {
    pub fn new(label: impl Into<String>, behavior: Box<dyn EcoBehavior<K>>) -> Self {
        Self::with_address(AgentId::new_v4(), label, behavior)
    }

    pub fn with_address(
        address: AgentId,
        label: impl Into<String>,
        behavior: Box<dyn EcoBehavior<K>>,
    ) -> Self {
        let label = label.into();
        let entity = EcoEntity::new(address);
        let machine = EcoStateMachine::new();
        let channel = ChannelShared::new(ChannelSnapshot::capture(&label, machine.state(), &entity));
        Self {
            label,
            entity,
            machine,
            behavior,
            channel,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn eco_identity(&self) -> EcoIdentity {
        self.entity.eco_identity()
    }

    pub fn entity(&self) -> &EcoEntity<K> {
        &self.entity
    }

    pub(crate) fn entity_mut(&mut self) -> &mut EcoEntity<K> {
        &mut self.entity
    }

    /// Subscribes to the entity's protocol events. Listeners travel with the
    /// agent into the kernel.
    pub fn add_entity_listener(&mut self, listener: Box<dyn EcoEntityListener<K>>) -> ListenerId {
        self.entity.add_listener(listener)
    }

    pub fn remove_entity_listener(&mut self, id: ListenerId) -> bool {
        self.entity.remove_listener(id)
    }

    pub fn eco_state(&self) -> EcoState {
        self.machine.state()
    }

    pub fn is_satisfied(&self) -> bool {
        self.machine.is_satisfied()
    }

    pub fn channel(&self) -> EcoChannel<K> {
        EcoChannel::new(self.entity.identity(), &self.channel)
    }

    fn publish(&self, notify: bool) {
        let snapshot = ChannelSnapshot::capture(&self.label, self.machine.state(), &self.entity);
        ChannelShared::publish(&self.channel, snapshot, notify);
    }
}

impl<K: RelationKind> KernelAgent<K> for EcoAgent<K> {
    fn address(&self) -> AgentId {
        self.entity.identity()
    }

    fn live(&mut self, ctx: &mut AgentContext<'_, K>) -> Result<bool> {
        let changed = self
            .machine
            .run(&mut self.entity, self.behavior.as_mut(), ctx)
            .with_context(|| format!("eco-agent {} ({})", self.label, self.entity.identity()))?;
        self.publish(changed);
        Ok(changed)
    }

    fn eco_channel(&self) -> Option<EcoChannel<K>> {
        Some(self.channel())
    }
}

impl<K: RelationKind> std::fmt::Debug for EcoAgent<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcoAgent")
            .field("label", &self.label)
            .field("state", &self.machine.state())
            .field("entity", &self.entity)
            .finish()
    }
}
