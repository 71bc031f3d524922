use anyhow::Result;
use log::{debug, info};
use std::collections::BTreeSet;

use super::channel::ChannelSnapshot;
use crate::kernel::{AgentContext, EcoTransport, KernelAgent, KernelEvent};
use crate::lifecycle::EcoState;
use crate::types::{AgentId, EcoMessage, RelationKind};

/// Problem-level solved test, consulted once per monitor tick after start.
pub trait ProblemMonitor<K>: Send {
    fn is_problem_solved(&mut self, participants: &[ChannelSnapshot<K>]) -> bool;
}

impl<K, F> ProblemMonitor<K> for F
where
    F: FnMut(&[ChannelSnapshot<K>]) -> bool + Send,
{
    fn is_problem_solved(&mut self, participants: &[ChannelSnapshot<K>]) -> bool {
        self(participants)
    }
}

pub enum SolutionCheck<K> {
    /// Solved once every observable acknowledged participant is SATISFACTED.
    AllSatisfied,
    Custom(Box<dyn ProblemMonitor<K>>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Starting,
    ProblemInitializing,
    ProblemInitialized,
    ProblemSolving,
    ProblemSolved,
}

/// One-shot coordinator: presence barrier, then the start signal.
pub struct EcoMonitorAgent<K: RelationKind> {
    address: AgentId,
    expected: usize,
    state: MonitorState,
    acknowledged: BTreeSet<AgentId>,
    late_joiner: bool,
    watch: Option<SolutionCheck<K>>,
}

impl<K: RelationKind> EcoMonitorAgent<K> {
    pub fn new(expected: usize) -> Self {
        Self {
            address: AgentId::new_v4(),
            expected,
            state: MonitorState::Starting,
            acknowledged: BTreeSet::new(),
            late_joiner: false,
            watch: None,
        }
    }

    /// Keeps the monitor alive after the start signal until the problem is
    /// solved, then tears every acknowledged participant down.
    pub fn with_solution_watch(mut self, check: SolutionCheck<K>) -> Self {
        self.watch = Some(check);
        self
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn expected(&self) -> usize {
        self.expected
    }

    pub fn acknowledged(&self) -> &BTreeSet<AgentId> {
        &self.acknowledged
    }

    fn collect_acknowledgements(&mut self, ctx: &mut AgentContext<'_, K>) -> bool {
        let mut collected = false;
        for envelope in ctx.take_messages() {
            match envelope.message {
                EcoMessage::AcknowledgeReady
                    if matches!(
                        self.state,
                        MonitorState::Starting | MonitorState::ProblemInitializing
                    ) =>
                {
                    if self.acknowledged.insert(envelope.sender) {
                        debug!(
                            "monitor {} acknowledged by {} ({}/{})",
                            self.address,
                            envelope.sender,
                            self.acknowledged.len(),
                            self.expected
                        );
                        collected = true;
                    }
                }
                other => {
                    debug!("monitor {} ignores {} from {}", self.address, other.name(), envelope.sender);
                }
            }
        }
        collected
    }

    fn is_problem_solved(&mut self, ctx: &AgentContext<'_, K>) -> bool {
        let snapshots: Vec<ChannelSnapshot<K>> = self
            .acknowledged
            .iter()
            .filter_map(|address| ctx.channel(*address))
            .filter_map(|channel| channel.snapshot())
            .collect();
        match &mut self.watch {
            Some(SolutionCheck::Custom(monitor)) => monitor.is_problem_solved(&snapshots),
            Some(SolutionCheck::AllSatisfied) => snapshots
                .iter()
                .all(|snapshot| snapshot.state == EcoState::Satisfacted),
            None => false,
        }
    }
}

impl<K: RelationKind> KernelAgent<K> for EcoMonitorAgent<K> {
    fn address(&self) -> AgentId {
        self.address
    }

    fn live(&mut self, ctx: &mut AgentContext<'_, K>) -> Result<bool> {
        let collected = self.collect_acknowledgements(ctx);

        let active = match self.state {
            MonitorState::Starting => {
                self.late_joiner = false;
                let count = ctx.broadcast(EcoMessage::PresenceAnnouncement);
                debug!("monitor {} announced presence to {} participants", self.address, count);
                self.state = if self.acknowledged.len() >= self.expected {
                    MonitorState::ProblemInitialized
                } else {
                    MonitorState::ProblemInitializing
                };
                true
            }
            MonitorState::ProblemInitializing => {
                if self.acknowledged.len() >= self.expected {
                    info!("monitor {}: all {} participants ready", self.address, self.expected);
                    self.state = MonitorState::ProblemInitialized;
                    true
                } else if self.late_joiner {
                    debug!("monitor {} saw a late joiner, announcing again", self.address);
                    self.state = MonitorState::Starting;
                    true
                } else {
                    collected
                }
            }
            MonitorState::ProblemInitialized => {
                let receivers: Vec<AgentId> = self.acknowledged.iter().copied().collect();
                ctx.broadcast_to(receivers.iter().copied(), EcoMessage::StartSolving);
                info!("monitor {} started solving with {} participants", self.address, receivers.len());
                if self.watch.is_some() {
                    self.state = MonitorState::ProblemSolving;
                } else {
                    self.acknowledged.clear();
                    ctx.kill_me();
                }
                true
            }
            MonitorState::ProblemSolving => {
                if self.is_problem_solved(ctx) {
                    let receivers: Vec<AgentId> = self.acknowledged.iter().copied().collect();
                    ctx.broadcast_to(receivers, EcoMessage::ProblemSolved);
                    info!("monitor {}: problem solved", self.address);
                    self.state = MonitorState::ProblemSolved;
                    true
                } else {
                    false
                }
            }
            MonitorState::ProblemSolved => {
                self.acknowledged.clear();
                ctx.kill_me();
                true
            }
        };

        Ok(active)
    }

    fn on_kernel_event(&mut self, event: &KernelEvent) {
        if let KernelEvent::AgentLaunched(address) = event {
            if *address != self.address && !self.acknowledged.contains(address) {
                self.late_joiner = true;
            }
        }
    }
}
