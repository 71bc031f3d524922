use log::{debug, trace};
use std::collections::BTreeSet;

use super::event::{EcoEntityListener, EcoEvent, ListenerId};
use super::pending::{PendingChanges, PendingGoal};
use crate::error::{EcoError, EcoResult};
use crate::kernel::EcoTransport;
use crate::types::{
    AgentId, DependencyUpdate, EcoAttack, EcoIdentity, EcoMessage, EcoRelation, Envelope,
    RelationKind,
};

/// Local knowledge of one participant.
///
/// Every mutation requested by the owner is staged and applied by
/// [`EcoEntity::update_goal`] / [`EcoEntity::update_knowledge`], which are
/// also the only places where messages are sent or consumed.
pub struct EcoEntity<K: RelationKind> {
    identity: AgentId,
    monitor: Option<AgentId>,
    solving_started: bool,
    goal: Option<EcoRelation<K>>,
    goal_announced: bool,
    acquaintances: BTreeSet<EcoRelation<K>>,
    dependencies: BTreeSet<AgentId>,
    attacks: BTreeSet<EcoAttack<K>>,
    pending: PendingChanges<K>,
    listeners: Vec<(ListenerId, Box<dyn EcoEntityListener<K>>)>,
    next_listener: u64,
}

impl<K: RelationKind> EcoEntity<K> {
    pub fn new(identity: AgentId) -> Self {
        Self {
            identity,
            monitor: None,
            solving_started: false,
            goal: None,
            goal_announced: false,
            acquaintances: BTreeSet::new(),
            dependencies: BTreeSet::new(),
            attacks: BTreeSet::new(),
            pending: PendingChanges::new(),
            listeners: Vec::new(),
            next_listener: 0,
        }
    }

    pub fn identity(&self) -> AgentId {
        self.identity
    }

    pub fn eco_identity(&self) -> EcoIdentity {
        EcoIdentity::Agent(self.identity)
    }

    pub fn monitor(&self) -> Option<AgentId> {
        self.monitor
    }

    pub fn is_participant_ready(&self) -> bool {
        self.monitor.is_some()
    }

    pub fn is_solving_started(&self) -> bool {
        self.solving_started
    }

    pub fn goal(&self) -> Option<&EcoRelation<K>> {
        self.goal.as_ref()
    }

    pub fn acquaintances(&self) -> &BTreeSet<EcoRelation<K>> {
        &self.acquaintances
    }

    pub fn dependencies(&self) -> &BTreeSet<AgentId> {
        &self.dependencies
    }

    pub fn attacks(&self) -> &BTreeSet<EcoAttack<K>> {
        &self.attacks
    }

    pub fn pending(&self) -> &PendingChanges<K> {
        &self.pending
    }

    /// Goal satisfied: no goal, or the goal relation is known to hold.
    pub fn is_goal_satisfied(&self) -> bool {
        self.goal
            .as_ref()
            .map(|goal| self.acquaintances.contains(goal))
            .unwrap_or(true)
    }

    pub fn add_listener(&mut self, listener: Box<dyn EcoEntityListener<K>>) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        self.listeners.len() != before
    }

    fn fire(&mut self, event: EcoEvent<K>) {
        let identity = self.identity;
        for (_, listener) in self.listeners.iter_mut() {
            listener.on_event(identity, &event);
        }
    }

    /// Installs pre-solve knowledge directly, without staging or messages.
    pub fn initialize(
        &mut self,
        goal: Option<EcoRelation<K>>,
        acquaintances: impl IntoIterator<Item = EcoRelation<K>>,
    ) -> EcoResult<()> {
        if let Some(goal) = &goal {
            self.check_goal_master(goal)?;
        }
        self.goal = goal;
        self.goal_announced = false;
        for relation in acquaintances {
            self.initialize_acquaintance(relation);
        }
        Ok(())
    }

    /// Installs one pre-solve acquaintance, dropping the ones it conflicts
    /// with.
    pub fn initialize_acquaintance(&mut self, relation: EcoRelation<K>) {
        self.acquaintances
            .retain(|old| old == &relation || !relation.is_conflict(old));
        self.acquaintances.insert(relation);
    }

    fn check_goal_master(&self, goal: &EcoRelation<K>) -> EcoResult<()> {
        if goal.master != self.eco_identity() {
            return Err(EcoError::ForeignGoal {
                master: goal.master,
                owner: self.identity,
            });
        }
        Ok(())
    }

    pub fn set_goal(&mut self, goal: EcoRelation<K>) -> EcoResult<()> {
        self.check_goal_master(&goal)?;
        self.pending.stage_goal(PendingGoal::Set(goal));
        Ok(())
    }

    pub fn clear_goal(&mut self) {
        self.pending.stage_goal(PendingGoal::Clear);
    }

    pub fn add_acquaintance(&mut self, relation: EcoRelation<K>) {
        self.pending.stage_addition(relation);
    }

    pub fn remove_acquaintance(&mut self, relation: EcoRelation<K>) {
        self.pending.stage_removal(relation);
    }

    pub fn do_attack(&self, attack: EcoAttack<K>, transport: &mut dyn EcoTransport<K>) {
        debug!("{} attacks {}", self.identity, attack.defender);
        transport.send(attack.defender, EcoMessage::Attack(attack));
    }

    pub fn do_initialization_commitment(&self, transport: &mut dyn EcoTransport<K>) {
        if let Some(monitor) = self.monitor {
            debug!("{} acknowledges monitor {}", self.identity, monitor);
            transport.send(monitor, EcoMessage::AcknowledgeReady);
        }
    }

    /// Hands the current attack batch to the caller and forgets it.
    pub fn take_attacks(&mut self) -> BTreeSet<EcoAttack<K>> {
        let attacks = std::mem::take(&mut self.attacks);
        if !attacks.is_empty() {
            self.fire(EcoEvent::AttacksCleared(attacks.iter().cloned().collect()));
        }
        attacks
    }

    /// Commits the staged goal. Returns whether the committed goal changed.
    ///
    /// Dependency messages are only sent once solving has started; a goal
    /// committed earlier is announced by the first call after the start.
    pub fn update_goal(&mut self, transport: &mut dyn EcoTransport<K>) -> bool {
        let mut changed = false;

        if let Some(pending) = self.pending.take_goal() {
            let new_goal = pending.into_goal();
            if new_goal != self.goal {
                let old_goal = std::mem::replace(&mut self.goal, new_goal);
                if self.goal_announced {
                    if let Some(old_goal) = &old_goal {
                        self.send_dependency_removal(old_goal, transport);
                    }
                    self.goal_announced = false;
                }
                let new_goal = self.goal.clone();
                self.fire(EcoEvent::GoalChanged {
                    old: old_goal,
                    new: new_goal,
                });
                changed = true;
            }
        }

        if self.solving_started && !self.goal_announced {
            if let Some(goal) = self.goal.clone() {
                self.send_dependency_addition(&goal, transport);
            }
            self.goal_announced = true;
        }

        changed
    }

    fn send_dependency_addition(&self, goal: &EcoRelation<K>, transport: &mut dyn EcoTransport<K>) {
        if let Some(slave) = goal.slave.agent_id() {
            debug!("{} depends on {} for {}", self.identity, slave, goal);
            transport.send(
                slave,
                EcoMessage::DependencyUpdate(DependencyUpdate::Add {
                    dependency: self.identity,
                    feedback_pattern: goal.to_pattern(&self.eco_identity()),
                }),
            );
        }
    }

    fn send_dependency_removal(&self, goal: &EcoRelation<K>, transport: &mut dyn EcoTransport<K>) {
        if let Some(slave) = goal.slave.agent_id() {
            debug!("{} no longer depends on {}", self.identity, slave);
            transport.send(
                slave,
                EcoMessage::DependencyUpdate(DependencyUpdate::Remove {
                    dependency: self.identity,
                }),
            );
        }
    }

    /// Applies staged acquaintance changes, then one tick's worth of inbound
    /// messages. Returns whether anything changed.
    pub fn update_knowledge(&mut self, transport: &mut dyn EcoTransport<K>) -> bool {
        let changed = self.update_knowledge_from_pending_changes(transport);
        self.update_knowledge_from_mailbox(transport) || changed
    }

    fn update_knowledge_from_pending_changes(&mut self, transport: &mut dyn EcoTransport<K>) -> bool {
        let mut changed = false;
        let (added, removed) = self.pending.take_acquaintances();

        for relation in added {
            changed |= self.remove_conflicting_acquaintances(&relation, transport);
            if self.acquaintances.insert(relation.clone()) {
                changed = true;
                self.notify_acquaintance_change(&relation, true, transport);
                self.fire(EcoEvent::AcquaintanceAdded(relation));
            }
        }

        for relation in removed {
            if self.acquaintances.remove(&relation) {
                changed = true;
                self.notify_acquaintance_change(&relation, false, transport);
                self.fire(EcoEvent::AcquaintanceRemoved(relation));
            }
        }

        changed
    }

    fn update_knowledge_from_mailbox(&mut self, transport: &mut dyn EcoTransport<K>) -> bool {
        let mut changed = false;

        for Envelope { sender, message } in transport.take_messages() {
            trace!("{} <- {}: {}", self.identity, sender, message.name());
            match message {
                EcoMessage::PresenceAnnouncement => {
                    if self.monitor.is_none() {
                        debug!("{} registered monitor {}", self.identity, sender);
                        self.monitor = Some(sender);
                        changed = true;
                    }
                }
                EcoMessage::StartSolving => {
                    if self.monitor == Some(sender) && !self.solving_started {
                        debug!("{} starts solving", self.identity);
                        self.solving_started = true;
                        changed = true;
                        self.fire(EcoEvent::ProblemSolvingStarted);
                    }
                }
                EcoMessage::Attack(attack) => {
                    if self.attacks.insert(attack.clone()) {
                        changed = true;
                        self.fire(EcoEvent::AttackReceived(attack));
                    }
                }
                EcoMessage::AcquaintanceUpdate {
                    relation,
                    is_addition: true,
                } => {
                    changed |= self.remove_conflicting_acquaintances(&relation, transport);
                    if self.acquaintances.insert(relation.clone()) {
                        changed = true;
                        self.forward_to_dependencies(&relation, true, transport);
                        self.fire(EcoEvent::AcquaintanceAdded(relation));
                    }
                }
                EcoMessage::AcquaintanceUpdate {
                    relation,
                    is_addition: false,
                } => {
                    if self.acquaintances.remove(&relation) {
                        changed = true;
                        self.forward_to_dependencies(&relation, false, transport);
                        self.fire(EcoEvent::AcquaintanceRemoved(relation));
                    }
                }
                EcoMessage::DependencyUpdate(DependencyUpdate::Add {
                    dependency,
                    feedback_pattern,
                }) => {
                    if self.dependencies.insert(dependency) {
                        debug!("{} gained dependency {}", self.identity, dependency);
                        changed = true;
                        self.fire(EcoEvent::DependencyAdded(dependency));
                        for relation in self
                            .acquaintances
                            .iter()
                            .filter(|relation| feedback_pattern.matches(relation))
                        {
                            transport.send(
                                dependency,
                                EcoMessage::AcquaintanceUpdate {
                                    relation: relation.clone(),
                                    is_addition: true,
                                },
                            );
                        }
                    }
                }
                EcoMessage::DependencyUpdate(DependencyUpdate::Remove { dependency }) => {
                    if self.dependencies.remove(&dependency) {
                        debug!("{} lost dependency {}", self.identity, dependency);
                        changed = true;
                        self.fire(EcoEvent::DependencyRemoved(dependency));
                    }
                }
                EcoMessage::ProblemSolved => {
                    debug!("{} tears down: problem solved", self.identity);
                    self.fire(EcoEvent::ProblemSolved);
                    transport.kill_me();
                    break;
                }
                EcoMessage::AcknowledgeReady => {
                    trace!("{} ignores acknowledgement from {}", self.identity, sender);
                }
            }
        }

        changed
    }

    fn remove_conflicting_acquaintances(
        &mut self,
        relation: &EcoRelation<K>,
        transport: &mut dyn EcoTransport<K>,
    ) -> bool {
        let conflicting: Vec<EcoRelation<K>> = self
            .acquaintances
            .iter()
            .filter(|old| *old != relation && relation.is_conflict(old))
            .cloned()
            .collect();

        for old in &conflicting {
            self.acquaintances.remove(old);
            self.notify_acquaintance_change(old, false, transport);
        }
        let changed = !conflicting.is_empty();
        for old in conflicting {
            self.fire(EcoEvent::AcquaintanceRemoved(old));
        }
        changed
    }

    fn notify_acquaintance_change(
        &self,
        relation: &EcoRelation<K>,
        is_addition: bool,
        transport: &mut dyn EcoTransport<K>,
    ) {
        let other_party = relation
            .other_participant(&self.eco_identity())
            .and_then(|identity| identity.agent_id())
            .filter(|id| *id != self.identity);
        if let Some(other_party) = other_party {
            transport.send(
                other_party,
                EcoMessage::AcquaintanceUpdate {
                    relation: relation.clone(),
                    is_addition,
                },
            );
        }
        self.forward_to_dependencies(relation, is_addition, transport);
    }

    fn forward_to_dependencies(
        &self,
        relation: &EcoRelation<K>,
        is_addition: bool,
        transport: &mut dyn EcoTransport<K>,
    ) {
        for dependency in &self.dependencies {
            transport.send(
                *dependency,
                EcoMessage::AcquaintanceUpdate {
                    relation: relation.clone(),
                    is_addition,
                },
            );
        }
    }
}

impl<K: RelationKind> std::fmt::Debug for EcoEntity<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EcoEntity")
            .field("identity", &self.identity)
            .field("monitor", &self.monitor)
            .field("solving_started", &self.solving_started)
            .field("goal", &self.goal)
            .field("acquaintances", &self.acquaintances)
            .field("dependencies", &self.dependencies)
            .field("attacks", &self.attacks)
            .finish()
    }
}
