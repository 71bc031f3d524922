use std::collections::BTreeSet;

use super::entity::EcoEntity;
use crate::error::EcoResult;
use crate::types::{AgentId, EcoAttack, EcoIdentity, EcoRelation, RelationKind};

/// Problem-specific decision hooks driven by the satisfaction state machine.
pub trait EcoBehavior<K: RelationKind>: Send {
    /// An entity obstructing the goal, or `None` to work on the goal directly.
    fn select_satisfaction_intruder(&self, entity: &EntityContext<'_, K>) -> Option<EcoAttack<K>>;

    /// Attackers to push back on before giving way. Empty means escape now.
    fn select_escaping_intruders(
        &self,
        entity: &EntityContext<'_, K>,
        attacks: &BTreeSet<EcoAttack<K>>,
    ) -> Vec<EcoAttack<K>>;

    fn do_satisfaction_increasing(&mut self, entity: &mut EntityContext<'_, K>);

    fn do_satisfied(&mut self, _entity: &mut EntityContext<'_, K>) {}

    /// Runs once per attack batch; the batch is forgotten afterwards.
    fn do_escaping(&mut self, entity: &mut EntityContext<'_, K>, attacks: &BTreeSet<EcoAttack<K>>);
}

/// The view of an entity handed to decision hooks: committed knowledge for
/// reading, staging operations for writing.
pub struct EntityContext<'a, K: RelationKind> {
    entity: &'a mut EcoEntity<K>,
}

impl<'a, K: RelationKind> EntityContext<'a, K> {
    pub fn new(entity: &'a mut EcoEntity<K>) -> Self {
        Self { entity }
    }

    pub fn identity(&self) -> AgentId {
        self.entity.identity()
    }

    pub fn eco_identity(&self) -> EcoIdentity {
        self.entity.eco_identity()
    }

    pub fn goal(&self) -> Option<&EcoRelation<K>> {
        self.entity.goal()
    }

    pub fn acquaintances(&self) -> &BTreeSet<EcoRelation<K>> {
        self.entity.acquaintances()
    }

    /// First committed acquaintance matching `pattern`.
    pub fn acquaintance(&self, pattern: &EcoRelation<K>) -> Option<&EcoRelation<K>> {
        self.entity
            .acquaintances()
            .iter()
            .find(|relation| pattern.matches(relation))
    }

    pub fn acquaintances_matching<'p>(
        &'p self,
        pattern: &'p EcoRelation<K>,
    ) -> impl Iterator<Item = &'p EcoRelation<K>> + 'p {
        self.entity
            .acquaintances()
            .iter()
            .filter(move |relation| pattern.matches(relation))
    }

    pub fn attack(&self, defender: AgentId) -> EcoAttack<K> {
        EcoAttack::new(self.identity(), defender)
    }

    pub fn set_goal(&mut self, goal: EcoRelation<K>) -> EcoResult<()> {
        self.entity.set_goal(goal)
    }

    pub fn clear_goal(&mut self) {
        self.entity.clear_goal();
    }

    pub fn add_acquaintance(&mut self, relation: EcoRelation<K>) {
        self.entity.add_acquaintance(relation);
    }

    pub fn remove_acquaintance(&mut self, relation: EcoRelation<K>) {
        self.entity.remove_acquaintance(relation);
    }
}
