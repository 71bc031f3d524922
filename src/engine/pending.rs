use crate::types::{EcoRelation, RelationKind};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingGoal<K> {
    Set(EcoRelation<K>),
    Clear,
}

impl<K> PendingGoal<K> {
    pub fn into_goal(self) -> Option<EcoRelation<K>> {
        match self {
            PendingGoal::Set(goal) => Some(goal),
            PendingGoal::Clear => None,
        }
    }
}

/// Changes requested between two commits.
///
/// Additions and removals cancel each other when they are equal or in
/// conflict, so the last request of a tick wins.
#[derive(Debug, Clone)]
pub struct PendingChanges<K> {
    goal: Option<PendingGoal<K>>,
    added: Vec<EcoRelation<K>>,
    removed: Vec<EcoRelation<K>>,
}

impl<K: RelationKind> PendingChanges<K> {
    pub fn new() -> Self {
        Self {
            goal: None,
            added: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn stage_goal(&mut self, goal: PendingGoal<K>) {
        self.goal = Some(goal);
    }

    pub fn stage_addition(&mut self, relation: EcoRelation<K>) {
        self.removed
            .retain(|old| old != &relation && !old.is_conflict(&relation));
        self.added.retain(|old| old != &relation);
        self.added.push(relation);
    }

    pub fn stage_removal(&mut self, relation: EcoRelation<K>) {
        self.added
            .retain(|old| old != &relation && !old.is_conflict(&relation));
        self.removed.retain(|old| old != &relation);
        self.removed.push(relation);
    }

    pub fn take_goal(&mut self) -> Option<PendingGoal<K>> {
        self.goal.take()
    }

    pub fn take_acquaintances(&mut self) -> (Vec<EcoRelation<K>>, Vec<EcoRelation<K>>) {
        (
            std::mem::take(&mut self.added),
            std::mem::take(&mut self.removed),
        )
    }

    pub fn pending_goal(&self) -> Option<&PendingGoal<K>> {
        self.goal.as_ref()
    }

    pub fn added(&self) -> &[EcoRelation<K>] {
        &self.added
    }

    pub fn removed(&self) -> &[EcoRelation<K>] {
        &self.removed
    }

    pub fn is_empty(&self) -> bool {
        self.goal.is_none() && self.added.is_empty() && self.removed.is_empty()
    }
}

impl<K: RelationKind> Default for PendingChanges<K> {
    fn default() -> Self {
        Self::new()
    }
}
