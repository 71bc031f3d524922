#![allow(dead_code)]

use anyhow::Result;
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use ecoresolution::agent::{ChannelSnapshot, EcoAgent, EcoChannel};
use ecoresolution::config::KernelConfig;
use ecoresolution::engine::{EcoBehavior, EntityContext};
use ecoresolution::kernel::{AgentContext, EcoTransport, InMemoryKernel, KernelAgent};
use ecoresolution::problems::OnTopOf;
use ecoresolution::types::{AgentId, EcoAttack, EcoMessage, Envelope};

pub fn kernel() -> InMemoryKernel<OnTopOf> {
    InMemoryKernel::new(KernelConfig {
        max_iterations: 200,
        quiescent_iterations: 5,
        tick_interval_ms: 0,
    })
}

/// Never attacks, never moves: knowledge only changes through messages.
pub struct Passive;

impl EcoBehavior<OnTopOf> for Passive {
    fn select_satisfaction_intruder(&self, _entity: &EntityContext<'_, OnTopOf>) -> Option<EcoAttack<OnTopOf>> {
        None
    }

    fn select_escaping_intruders(
        &self,
        _entity: &EntityContext<'_, OnTopOf>,
        _attacks: &BTreeSet<EcoAttack<OnTopOf>>,
    ) -> Vec<EcoAttack<OnTopOf>> {
        Vec::new()
    }

    fn do_satisfaction_increasing(&mut self, _entity: &mut EntityContext<'_, OnTopOf>) {}

    fn do_escaping(&mut self, _entity: &mut EntityContext<'_, OnTopOf>, _attacks: &BTreeSet<EcoAttack<OnTopOf>>) {}
}

/// Passive until satisfied, then drops its goal.
pub struct Settler;

impl EcoBehavior<OnTopOf> for Settler {
    fn select_satisfaction_intruder(&self, _entity: &EntityContext<'_, OnTopOf>) -> Option<EcoAttack<OnTopOf>> {
        None
    }

    fn select_escaping_intruders(
        &self,
        _entity: &EntityContext<'_, OnTopOf>,
        _attacks: &BTreeSet<EcoAttack<OnTopOf>>,
    ) -> Vec<EcoAttack<OnTopOf>> {
        Vec::new()
    }

    fn do_satisfaction_increasing(&mut self, _entity: &mut EntityContext<'_, OnTopOf>) {}

    fn do_satisfied(&mut self, entity: &mut EntityContext<'_, OnTopOf>) {
        entity.clear_goal();
    }

    fn do_escaping(&mut self, _entity: &mut EntityContext<'_, OnTopOf>, _attacks: &BTreeSet<EcoAttack<OnTopOf>>) {}
}

pub fn passive_agent(label: &str) -> EcoAgent<OnTopOf> {
    EcoAgent::new(label, Box::new(Passive))
}

/// Every snapshot published by one channel, in order.
pub fn record_snapshots(channel: &EcoChannel<OnTopOf>) -> Arc<Mutex<Vec<ChannelSnapshot<OnTopOf>>>> {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = log.clone();
    channel
        .add_listener(Arc::new(move |snapshot: &ChannelSnapshot<OnTopOf>| {
            sink.lock().unwrap().push(snapshot.clone());
        }))
        .unwrap();
    log
}

/// Stand-in participant: acknowledges the first presence announcement and
/// records every message it receives.
pub struct Probe {
    address: AgentId,
    acknowledges: bool,
    acknowledged: bool,
    received: Arc<Mutex<Vec<Envelope<OnTopOf>>>>,
}

impl Probe {
    pub fn new() -> Self {
        Self::with_acknowledgement(true)
    }

    pub fn silent() -> Self {
        Self::with_acknowledgement(false)
    }

    fn with_acknowledgement(acknowledges: bool) -> Self {
        Self {
            address: AgentId::new_v4(),
            acknowledges,
            acknowledged: false,
            received: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn address(&self) -> AgentId {
        self.address
    }

    pub fn inbox(&self) -> Arc<Mutex<Vec<Envelope<OnTopOf>>>> {
        self.received.clone()
    }
}

pub fn count(inbox: &Arc<Mutex<Vec<Envelope<OnTopOf>>>>, message: &EcoMessage<OnTopOf>) -> usize {
    inbox
        .lock()
        .unwrap()
        .iter()
        .filter(|envelope| &envelope.message == message)
        .count()
}

impl KernelAgent<OnTopOf> for Probe {
    fn address(&self) -> AgentId {
        self.address
    }

    fn live(&mut self, ctx: &mut AgentContext<'_, OnTopOf>) -> Result<bool> {
        let messages = ctx.take_messages();
        let active = !messages.is_empty();
        for envelope in messages {
            if envelope.message == EcoMessage::PresenceAnnouncement && self.acknowledges && !self.acknowledged {
                ctx.send(envelope.sender, EcoMessage::AcknowledgeReady);
                self.acknowledged = true;
            }
            self.received.lock().unwrap().push(envelope);
        }
        Ok(active)
    }
}

impl Default for Probe {
    fn default() -> Self {
        Self::new()
    }
}
