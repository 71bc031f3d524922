//! Cube world: labelled cubes stacked on a table, each wanting to rest on a
//! given support.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::agent::{EcoAgent, EcoProblem};
use crate::engine::{EcoBehavior, EntityContext};
use crate::error::EcoResult;
use crate::types::{AgentId, EcoAttack, EcoIdentity, EcoRelation, RelationKind};

/// `OnTopOf(upper, lower)`. The table is carried so the conflict rule can
/// tell it apart: the table holds any number of cubes.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OnTopOf {
    pub table: AgentId,
}

impl fmt::Debug for OnTopOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OnTopOf")
    }
}

impl RelationKind for OnTopOf {
    /// A cube rests on one support and a cube supports one cube.
    fn is_conflict(first: &EcoRelation<Self>, second: &EcoRelation<Self>) -> bool {
        let table = EcoIdentity::Agent(first.kind.table);
        let same_lower = first.slave == second.slave;
        if same_lower && first.slave == table {
            return false;
        }
        let same_upper = first.master == second.master;
        same_upper ^ same_lower
    }
}

pub fn on_top_of(upper: AgentId, lower: AgentId, table: AgentId) -> EcoRelation<OnTopOf> {
    EcoRelation::new(upper, lower, OnTopOf { table })
}

/// Pattern for "something on `lower`".
fn anything_on(lower: EcoIdentity, table: AgentId) -> EcoRelation<OnTopOf> {
    EcoRelation::new(EcoIdentity::Any, lower, OnTopOf { table })
}

pub struct CubeBehavior {
    table: AgentId,
}

impl CubeBehavior {
    pub fn new(table: AgentId) -> Self {
        Self { table }
    }

    fn cube_on(&self, entity: &EntityContext<'_, OnTopOf>, lower: EcoIdentity) -> Option<AgentId> {
        let pattern = anything_on(lower, self.table);
        let upper = entity
            .acquaintances_matching(&pattern)
            .filter_map(|relation| relation.master.agent_id())
            .find(|upper| *upper != entity.identity());
        upper
    }
}

impl EcoBehavior<OnTopOf> for CubeBehavior {
    fn select_satisfaction_intruder(&self, entity: &EntityContext<'_, OnTopOf>) -> Option<EcoAttack<OnTopOf>> {
        let goal = entity.goal()?;
        if let Some(upper) = self.cube_on(entity, entity.eco_identity()) {
            return Some(entity.attack(upper));
        }
        if goal.slave == EcoIdentity::Agent(self.table) {
            return None;
        }
        self.cube_on(entity, goal.slave).map(|upper| {
            entity
                .attack(upper)
                .with_constraint(EcoRelation::new(upper, goal.slave, OnTopOf { table: self.table }))
        })
    }

    fn select_escaping_intruders(
        &self,
        entity: &EntityContext<'_, OnTopOf>,
        _attacks: &BTreeSet<EcoAttack<OnTopOf>>,
    ) -> Vec<EcoAttack<OnTopOf>> {
        self.cube_on(entity, entity.eco_identity())
            .map(|upper| entity.attack(upper))
            .into_iter()
            .collect()
    }

    fn do_satisfaction_increasing(&mut self, entity: &mut EntityContext<'_, OnTopOf>) {
        if let Some(goal) = entity.goal().cloned() {
            entity.add_acquaintance(goal);
        }
    }

    fn do_escaping(&mut self, entity: &mut EntityContext<'_, OnTopOf>, _attacks: &BTreeSet<EcoAttack<OnTopOf>>) {
        let on_table = on_top_of(entity.identity(), self.table, self.table);
        entity.add_acquaintance(on_table);
    }
}

/// The table never acts; it only relays what rests on it.
pub struct GroundBehavior;

impl EcoBehavior<OnTopOf> for GroundBehavior {
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

/// Builder for cube-world problems.
pub struct CubeWorld {
    table: AgentId,
    cubes: Vec<(String, AgentId)>,
    problem: EcoProblem<OnTopOf>,
}

impl CubeWorld {
    pub fn new() -> EcoResult<Self> {
        let mut problem = EcoProblem::new();
        let table = problem.init(EcoAgent::new("table", Box::new(GroundBehavior)), None, Vec::new())?;
        Ok(Self {
            table,
            cubes: Vec::new(),
            problem,
        })
    }

    /// The classic demo: cube 0 on the table and each cube `i` wanting to
    /// rest on cube `i - 1`, starting from the tower built the other way up
    /// above cube 0.
    pub fn inverted_tower(count: usize) -> EcoResult<Self> {
        let mut world = Self::new()?;
        let mut ids = Vec::with_capacity(count);
        for index in 0..count {
            let target = ids.last().copied();
            ids.push(world.add_cube(cube_label(index), target)?);
        }

        let mut lower = world.table;
        for &upper in ids.first().into_iter().chain(ids.iter().skip(1).rev()) {
            world.place(upper, lower)?;
            lower = upper;
        }
        Ok(world)
    }

    pub fn table(&self) -> AgentId {
        self.table
    }

    pub fn cubes(&self) -> &[(String, AgentId)] {
        &self.cubes
    }

    pub fn cube(&self, label: &str) -> Option<AgentId> {
        self.cubes
            .iter()
            .find(|(cube_label, _)| cube_label == label)
            .map(|(_, id)| *id)
    }

    /// Adds a cube whose goal is to rest on `target`, or on the table.
    pub fn add_cube(&mut self, label: impl Into<String>, target: Option<AgentId>) -> EcoResult<AgentId> {
        let label = label.into();
        let agent = EcoAgent::new(label.clone(), Box::new(CubeBehavior::new(self.table)));
        let me = agent.entity().identity();
        let goal = on_top_of(me, target.unwrap_or(self.table), self.table);
        let id = self.problem.init(agent, Some(goal), Vec::new())?;
        self.cubes.push((label, id));
        Ok(id)
    }

    pub fn place(&mut self, upper: AgentId, lower: AgentId) -> EcoResult<()> {
        self.problem.init_relation(on_top_of(upper, lower, self.table))
    }

    pub fn relation(&self, upper: AgentId, lower: AgentId) -> EcoRelation<OnTopOf> {
        on_top_of(upper, lower, self.table)
    }

    pub fn problem_mut(&mut self) -> &mut EcoProblem<OnTopOf> {
        &mut self.problem
    }

    pub fn into_problem(self) -> EcoProblem<OnTopOf> {
        self.problem
    }
}

fn cube_label(index: usize) -> String {
    match u8::try_from(index) {
        Ok(offset) if offset < 26 => char::from(b'A' + offset).to_string(),
        _ => format!("C{}", index),
    }
}
