use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::engine::{EcoBehavior, EcoEntity, EntityContext};
use crate::error::{EcoError, EcoResult};
use crate::kernel::EcoTransport;
use crate::types::RelationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EcoState {
    Initializing,
    Initialized,
    Satisfacting,
    Satisfacted,
    Escaping,
    Escaped,
}

impl EcoState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EcoState::Initializing => "INITIALIZING",
            EcoState::Initialized => "INITIALIZED",
            EcoState::Satisfacting => "SATISFACTING",
            EcoState::Satisfacted => "SATISFACTED",
            EcoState::Escaping => "ESCAPING",
            EcoState::Escaped => "ESCAPED",
        }
    }
}

impl fmt::Display for EcoState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcoStateEvent {
    ParticipantReady,
    SolvingStarted,
    GoalSatisfied,
    Attacked,
    Escaped,
    AttacksResolved,
}

impl EcoStateEvent {
    pub fn transition(state: EcoState, event: EcoStateEvent) -> EcoResult<EcoState> {
        let next = match (state, event) {
            (EcoState::Initializing, EcoStateEvent::ParticipantReady) => EcoState::Initialized,
            (EcoState::Initialized, EcoStateEvent::SolvingStarted) => EcoState::Satisfacting,
            (EcoState::Satisfacting, EcoStateEvent::GoalSatisfied) => EcoState::Satisfacted,
            (
                EcoState::Satisfacting | EcoState::Satisfacted | EcoState::Escaped,
                EcoStateEvent::Attacked,
            ) => EcoState::Escaping,
            (EcoState::Escaping, EcoStateEvent::Escaped) => EcoState::Escaped,
            (EcoState::Escaped, EcoStateEvent::AttacksResolved) => EcoState::Satisfacting,
            _ => {
                return Err(EcoError::InvalidTransition {
                    from: state,
                    event: format!("{:?}", event),
                })
            }
        };
        Ok(next)
    }
}

/// Satisfaction state machine of one entity.
///
/// Each call to [`EcoStateMachine::run`] is one tick: commit the goal,
/// commit knowledge, then evaluate the current state if it is new or the
/// commit changed something.
#[derive(Debug)]
pub struct EcoStateMachine {
    state: EcoState,
    is_new_state: bool,
}

impl EcoStateMachine {
    pub fn new() -> Self {
        Self {
            state: EcoState::Initializing,
            is_new_state: true,
        }
    }

    pub fn state(&self) -> EcoState {
        self.state
    }

    pub fn is_satisfied(&self) -> bool {
        self.state == EcoState::Satisfacted
    }

    /// Returns whether the tick changed the entity or the machine.
    pub fn run<K: RelationKind>(
        &mut self,
        entity: &mut EcoEntity<K>,
        behavior: &mut dyn EcoBehavior<K>,
        transport: &mut dyn EcoTransport<K>,
    ) -> EcoResult<bool> {
        let goal_changed = entity.update_goal(transport);
        let knowledge_changed = entity.update_knowledge(transport);
        let is_new_state = std::mem::replace(&mut self.is_new_state, false);

        let ran = if is_new_state || goal_changed || knowledge_changed {
            self.evaluate(entity, behavior, transport)?
        } else if self.state == EcoState::Initializing && entity.is_participant_ready() {
            self.apply(entity, EcoStateEvent::ParticipantReady)?;
            entity.do_initialization_commitment(transport);
            true
        } else {
            false
        };

        Ok(ran || goal_changed || knowledge_changed)
    }

    fn evaluate<K: RelationKind>(
        &mut self,
        entity: &mut EcoEntity<K>,
        behavior: &mut dyn EcoBehavior<K>,
        transport: &mut dyn EcoTransport<K>,
    ) -> EcoResult<bool> {
        match self.state {
            EcoState::Initializing => Ok(false),
            EcoState::Initialized => {
                if entity.is_solving_started() {
                    self.apply(entity, EcoStateEvent::SolvingStarted)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            EcoState::Satisfacting => {
                if !entity.attacks().is_empty() {
                    self.apply(entity, EcoStateEvent::Attacked)?;
                } else if entity.is_goal_satisfied() {
                    self.apply(entity, EcoStateEvent::GoalSatisfied)?;
                    behavior.do_satisfied(&mut EntityContext::new(entity));
                } else {
                    let intruder = behavior.select_satisfaction_intruder(&EntityContext::new(entity));
                    match intruder {
                        Some(attack) => entity.do_attack(attack, transport),
                        None => behavior.do_satisfaction_increasing(&mut EntityContext::new(entity)),
                    }
                }
                Ok(true)
            }
            EcoState::Satisfacted => {
                if !entity.attacks().is_empty() {
                    self.apply(entity, EcoStateEvent::Attacked)?;
                }
                Ok(true)
            }
            EcoState::Escaping => {
                let attacks = entity.attacks().clone();
                let intruders =
                    behavior.select_escaping_intruders(&EntityContext::new(entity), &attacks);
                if intruders.is_empty() {
                    let attacks = entity.take_attacks();
                    behavior.do_escaping(&mut EntityContext::new(entity), &attacks);
                    self.apply(entity, EcoStateEvent::Escaped)?;
                } else {
                    for attack in intruders {
                        entity.do_attack(attack, transport);
                    }
                }
                Ok(true)
            }
            EcoState::Escaped => {
                let event = if entity.attacks().is_empty() {
                    EcoStateEvent::AttacksResolved
                } else {
                    EcoStateEvent::Attacked
                };
                self.apply(entity, event)?;
                Ok(true)
            }
        }
    }

    fn apply<K: RelationKind>(&mut self, entity: &EcoEntity<K>, event: EcoStateEvent) -> EcoResult<()> {
        let next = EcoStateEvent::transition(self.state, event)?;
        debug!("{} {} -> {}", entity.identity(), self.state, next);
        self.state = next;
        self.is_new_state = true;
        Ok(())
    }
}

impl Default for EcoStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
