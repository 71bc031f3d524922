use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use super::context::AgentContext;
use super::traits::{Kernel, KernelAgent, KernelEvent};
use crate::agent::EcoChannel;
use crate::config::KernelConfig;
use crate::types::{AgentId, Envelope, RelationKind};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IterationReport {
    pub ticked: usize,
    pub active: usize,
    pub delivered: usize,
    pub terminated: usize,
}

impl IterationReport {
    pub fn is_quiescent(&self) -> bool {
        self.active == 0 && self.delivered == 0 && self.terminated == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    AllTerminated,
    Quiescent,
    IterationLimit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    pub outcome: RunOutcome,
    pub iterations: u64,
}

/// Cooperative single-process kernel.
///
/// Each iteration ticks every live agent once, in address order. Messages
/// sent during a tick are appended to the receivers' FIFO mailboxes when the
/// tick ends.
pub struct InMemoryKernel<K: RelationKind> {
    config: KernelConfig,
    agents: BTreeMap<AgentId, Box<dyn KernelAgent<K>>>,
    deferred: Vec<Box<dyn KernelAgent<K>>>,
    mailboxes: HashMap<AgentId, VecDeque<Envelope<K>>>,
    channels: HashMap<AgentId, EcoChannel<K>>,
    iteration: u64,
}

impl<K: RelationKind> InMemoryKernel<K> {
    pub fn new(config: KernelConfig) -> Self {
        Self {
            config,
            agents: BTreeMap::new(),
            deferred: Vec::new(),
            mailboxes: HashMap::new(),
            channels: HashMap::new(),
            iteration: 0,
        }
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    pub fn addresses(&self) -> Vec<AgentId> {
        self.agents.keys().copied().collect()
    }

    pub fn channels(&self) -> impl Iterator<Item = &EcoChannel<K>> {
        self.channels.values()
    }

    pub fn mailbox_len(&self, address: AgentId) -> usize {
        self.mailboxes.get(&address).map(VecDeque::len).unwrap_or(0)
    }

    pub fn run_single_iteration(&mut self) -> Result<IterationReport> {
        let addresses: Vec<AgentId> = self.agents.keys().copied().collect();
        let mut report = IterationReport::default();

        for address in &addresses {
            let Some(agent) = self.agents.get_mut(address) else {
                continue;
            };
            let inbox: Vec<Envelope<K>> = self
                .mailboxes
                .get_mut(address)
                .map(|mailbox| mailbox.drain(..).collect())
                .unwrap_or_default();

            let mut ctx = AgentContext::new(*address, inbox, &addresses, &self.channels);
            let active = agent
                .live(&mut ctx)
                .with_context(|| format!("agent {} failed during iteration {}", address, self.iteration))?;
            let (outbox, killed) = ctx.into_parts();

            report.ticked += 1;
            if active {
                report.active += 1;
            }
            for (receiver, envelope) in outbox {
                if self.deliver(receiver, envelope) {
                    report.delivered += 1;
                }
            }
            if killed && self.terminate(*address) {
                report.terminated += 1;
            }
        }

        self.iteration += 1;
        Ok(report)
    }

    pub async fn run_coordination_loop(&mut self) -> Result<RunSummary> {
        let mut iterations = 0;
        let mut quiescent = 0;

        loop {
            if self.agents.is_empty() {
                return Ok(RunSummary {
                    outcome: RunOutcome::AllTerminated,
                    iterations,
                });
            }
            if iterations >= self.config.max_iterations {
                warn!("iteration limit {} reached", self.config.max_iterations);
                return Ok(RunSummary {
                    outcome: RunOutcome::IterationLimit,
                    iterations,
                });
            }

            let report = self.run_single_iteration()?;
            iterations += 1;

            if report.is_quiescent() {
                quiescent += 1;
                if quiescent >= self.config.quiescent_iterations {
                    debug!("quiescent after {} iterations", iterations);
                    return Ok(RunSummary {
                        outcome: RunOutcome::Quiescent,
                        iterations,
                    });
                }
            } else {
                quiescent = 0;
            }

            if self.config.tick_interval_ms > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.tick_interval_ms)).await;
            } else {
                tokio::task::yield_now().await;
            }
        }
    }

    fn deliver(&mut self, receiver: AgentId, envelope: Envelope<K>) -> bool {
        if !self.agents.contains_key(&receiver) {
            warn!(
                "dropping {} from {} to unknown address {}",
                envelope.message.name(),
                envelope.sender,
                receiver
            );
            return false;
        }
        self.mailboxes.entry(receiver).or_default().push_back(envelope);
        true
    }

    fn terminate(&mut self, address: AgentId) -> bool {
        if self.agents.remove(&address).is_none() {
            return false;
        }
        self.mailboxes.remove(&address);
        self.channels.remove(&address);
        debug!("agent {} terminated", address);
        self.notify(KernelEvent::AgentKilled(address));
        true
    }

    fn notify(&mut self, event: KernelEvent) {
        for agent in self.agents.values_mut() {
            agent.on_kernel_event(&event);
        }
    }
}

impl<K: RelationKind> Default for InMemoryKernel<K> {
    fn default() -> Self {
        Self::new(KernelConfig::default())
    }
}

impl<K: RelationKind> Kernel<K> for InMemoryKernel<K> {
    fn submit(&mut self, agent: Box<dyn KernelAgent<K>>) {
        self.deferred.push(agent);
    }

    fn launch_deferred(&mut self) -> Vec<AgentId> {
        let deferred = std::mem::take(&mut self.deferred);
        deferred.into_iter().map(|agent| self.launch(agent)).collect()
    }

    fn launch(&mut self, agent: Box<dyn KernelAgent<K>>) -> AgentId {
        let address = agent.address();
        if let Some(channel) = agent.eco_channel() {
            self.channels.insert(address, channel);
        }
        if self.agents.insert(address, agent).is_some() {
            warn!("agent {} relaunched, previous instance replaced", address);
        }
        self.mailboxes.entry(address).or_default();
        debug!("agent {} launched", address);

        let event = KernelEvent::AgentLaunched(address);
        for (other, agent) in self.agents.iter_mut() {
            if *other != address {
                agent.on_kernel_event(&event);
            }
        }
        address
    }

    fn kill(&mut self, address: AgentId) -> bool {
        self.terminate(address)
    }

    fn post(&mut self, receiver: AgentId, envelope: Envelope<K>) -> bool {
        self.deliver(receiver, envelope)
    }

    fn channel(&self, address: AgentId) -> Option<EcoChannel<K>> {
        self.channels.get(&address).cloned()
    }

    fn is_alive(&self, address: AgentId) -> bool {
        self.agents.contains_key(&address)
    }
}
