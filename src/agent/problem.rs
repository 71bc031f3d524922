use log::info;
use std::collections::BTreeMap;

use super::eco_agent::EcoAgent;
use super::monitor::{EcoMonitorAgent, SolutionCheck};
use crate::error::{EcoError, EcoResult};
use crate::kernel::Kernel;
use crate::types::{AgentId, EcoRelation, RelationKind};

/// Assembles the initial population of a problem and hands it to a kernel.
pub struct EcoProblem<K: RelationKind> {
    agents: BTreeMap<AgentId, EcoAgent<K>>,
    watch: Option<SolutionCheck<K>>,
}

impl<K: RelationKind> EcoProblem<K> {
    pub fn new() -> Self {
        Self {
            agents: BTreeMap::new(),
            watch: None,
        }
    }

    pub fn with_solution_watch(mut self, check: SolutionCheck<K>) -> Self {
        self.watch = Some(check);
        self
    }

    /// Registers `agent` with its goal and initial acquaintances committed
    /// directly.
    pub fn init(
        &mut self,
        mut agent: EcoAgent<K>,
        goal: Option<EcoRelation<K>>,
        acquaintances: impl IntoIterator<Item = EcoRelation<K>>,
    ) -> EcoResult<AgentId> {
        agent.entity_mut().initialize(goal, acquaintances)?;
        let address = agent.entity().identity();
        self.agents.insert(address, agent);
        Ok(address)
    }

    /// Adds an initial relation to every registered participant it names.
    pub fn init_relation(&mut self, relation: EcoRelation<K>) -> EcoResult<()> {
        let named: Vec<AgentId> = [relation.master.agent_id(), relation.slave.agent_id()]
            .into_iter()
            .flatten()
            .collect();
        if let Some(unknown) = named.iter().find(|id| !self.agents.contains_key(id)) {
            return Err(EcoError::UnknownParticipant(*unknown));
        }
        for id in named {
            if let Some(agent) = self.agents.get_mut(&id) {
                agent.entity_mut().initialize_acquaintance(relation.clone());
            }
        }
        Ok(())
    }

    pub fn agent(&self, address: AgentId) -> Option<&EcoAgent<K>> {
        self.agents.get(&address)
    }

    pub fn agent_mut(&mut self, address: AgentId) -> Option<&mut EcoAgent<K>> {
        self.agents.get_mut(&address)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Launches every registered agent, then one monitor expecting exactly
    /// that many acknowledgements. Returns the monitor's address.
    pub fn solve(&mut self, kernel: &mut impl Kernel<K>) -> AgentId {
        let agents = std::mem::take(&mut self.agents);
        let count = agents.len();
        for (_, agent) in agents {
            kernel.submit(Box::new(agent));
        }
        kernel.launch_deferred();

        let mut monitor = EcoMonitorAgent::new(count);
        if let Some(check) = self.watch.take() {
            monitor = monitor.with_solution_watch(check);
        }
        let address = kernel.launch(Box::new(monitor));
        info!("problem launched with {} participants, monitor {}", count, address);
        address
    }
}

impl<K: RelationKind> Default for EcoProblem<K> {
    fn default() -> Self {
        Self::new()
    }
}
