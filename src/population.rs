//! Agents and the population-wide counts of agents in each disease state.
//!
//! Agents are created once, in bulk, by the generator and are addressed by
//! `AgentId`. Their mutable state (disease state, location, infection
//! generation) is only changed from scheduled event handlers.
use std::fmt::{Display, Formatter};
use std::ops::Index;

use serde::Serialize;
use strum::{EnumCount, IntoEnumIterator};

use crate::context::Context;
use crate::define_data_plugin;
use crate::disease::DiseaseState;
use crate::places::PlaceId;
use crate::roles::RoleId;
use crate::schedule::Schedule;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct AgentId(usize);

impl AgentId {
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for AgentId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent {}", self.0)
    }
}

/// A place an agent is attached to, with the schedule it follows there.
/// The visit without a schedule is the agent's home.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Visit {
    pub place: PlaceId,
    pub schedule: Option<Schedule>,
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub role: RoleId,
    pub home: Option<PlaceId>,
    pub visits: Vec<Visit>,
    pub state: DiseaseState,
    pub location: Option<PlaceId>,
    /// Incremented whenever a pending infection is superseded. A scheduled
    /// infection only applies if it carries the current value.
    pub infection_generation: u64,
}

/// Number of agents in each disease state, in `DiseaseState` order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct StateCounts([usize; DiseaseState::COUNT]);

impl StateCounts {
    #[must_use]
    pub fn get(&self, state: DiseaseState) -> usize {
        self.0[state as usize]
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    /// `(state, count)` pairs in the fixed enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (DiseaseState, usize)> + '_ {
        DiseaseState::iter().map(|state| (state, self.get(state)))
    }

    #[must_use]
    pub fn as_array(&self) -> [usize; DiseaseState::COUNT] {
        self.0
    }

    fn increment(&mut self, state: DiseaseState) {
        self.0[state as usize] += 1;
    }

    fn decrement(&mut self, state: DiseaseState) {
        self.0[state as usize] -= 1;
    }
}

impl Index<DiseaseState> for StateCounts {
    type Output = usize;

    fn index(&self, state: DiseaseState) -> &usize {
        &self.0[state as usize]
    }
}

#[derive(Default)]
struct PopulationData {
    agents: Vec<Agent>,
    counts: StateCounts,
}

impl PopulationData {
    fn agent_mut(&mut self, agent_id: AgentId) -> &mut Agent {
        self.agents
            .get_mut(agent_id.0)
            .unwrap_or_else(|| panic!("{agent_id} does not exist"))
    }
}

define_data_plugin!(PopulationPlugin, PopulationData, PopulationData::default());

pub trait ContextPopulationExt {
    /// Creates an uninfected agent of the given role with no places yet.
    fn add_agent(&mut self, role: RoleId) -> AgentId;

    fn get_population_size(&self) -> usize;

    /// # Panics
    ///
    /// Panics if the agent does not exist.
    fn get_agent(&self, agent_id: AgentId) -> &Agent;

    fn get_disease_state(&self, agent_id: AgentId) -> DiseaseState;

    /// Moves the agent to `state`, keeping the population counts in step.
    /// Returns the previous state.
    ///
    /// # Panics
    ///
    /// Panics unless `state` is a later state than the current one.
    fn set_disease_state(&mut self, agent_id: AgentId, state: DiseaseState) -> DiseaseState;

    /// The current number of agents in each disease state.
    fn get_state_counts(&self) -> StateCounts;

    fn get_location(&self, agent_id: AgentId) -> Option<PlaceId>;

    fn get_home(&self, agent_id: AgentId) -> Option<PlaceId>;

    /// Attaches the agent to a place. A visit without a schedule fixes the
    /// agent's home.
    ///
    /// # Panics
    ///
    /// Panics if the visit is a home and the agent already has one.
    fn add_visit(&mut self, agent_id: AgentId, visit: Visit);

    fn get_infection_generation(&self, agent_id: AgentId) -> u64;

    /// Supersedes any pending infection and returns the new generation.
    fn next_infection_generation(&mut self, agent_id: AgentId) -> u64;

    fn iter_agents(&self) -> impl Iterator<Item = AgentId>;
}

impl ContextPopulationExt for Context {
    fn add_agent(&mut self, role: RoleId) -> AgentId {
        let data_container = self.get_data_container_mut(PopulationPlugin);
        let agent_id = AgentId(data_container.agents.len());
        data_container.agents.push(Agent {
            role,
            home: None,
            visits: Vec::new(),
            state: DiseaseState::Uninfected,
            location: None,
            infection_generation: 0,
        });
        data_container.counts.increment(DiseaseState::Uninfected);
        agent_id
    }

    fn get_population_size(&self) -> usize {
        self.get_data_container(PopulationPlugin)
            .map_or(0, |data_container| data_container.agents.len())
    }

    fn get_agent(&self, agent_id: AgentId) -> &Agent {
        self.get_data_container(PopulationPlugin)
            .and_then(|data_container| data_container.agents.get(agent_id.0))
            .unwrap_or_else(|| panic!("{agent_id} does not exist"))
    }

    fn get_disease_state(&self, agent_id: AgentId) -> DiseaseState {
        self.get_agent(agent_id).state
    }

    fn set_disease_state(&mut self, agent_id: AgentId, state: DiseaseState) -> DiseaseState {
        let data_container = self.get_data_container_mut(PopulationPlugin);
        let agent = data_container.agent_mut(agent_id);
        let previous = agent.state;
        assert!(
            previous.can_advance_to(state),
            "{agent_id} cannot move from {previous} to {state}"
        );
        agent.state = state;
        data_container.counts.decrement(previous);
        data_container.counts.increment(state);
        previous
    }

    fn get_state_counts(&self) -> StateCounts {
        self.get_data_container(PopulationPlugin)
            .map(|data_container| data_container.counts)
            .unwrap_or_default()
    }

    fn get_location(&self, agent_id: AgentId) -> Option<PlaceId> {
        self.get_agent(agent_id).location
    }

    fn get_home(&self, agent_id: AgentId) -> Option<PlaceId> {
        self.get_agent(agent_id).home
    }

    fn add_visit(&mut self, agent_id: AgentId, visit: Visit) {
        let agent = self
            .get_data_container_mut(PopulationPlugin)
            .agent_mut(agent_id);
        if visit.schedule.is_none() {
            assert!(agent.home.is_none(), "{agent_id} already has a home");
            agent.home = Some(visit.place);
        }
        agent.visits.push(visit);
    }

    fn get_infection_generation(&self, agent_id: AgentId) -> u64 {
        self.get_agent(agent_id).infection_generation
    }

    fn next_infection_generation(&mut self, agent_id: AgentId) -> u64 {
        let agent = self
            .get_data_container_mut(PopulationPlugin)
            .agent_mut(agent_id);
        agent.infection_generation += 1;
        agent.infection_generation
    }

    fn iter_agents(&self) -> impl Iterator<Item = AgentId> {
        (0..self.get_population_size()).map(AgentId)
    }
}

pub(crate) trait ContextLocationExt {
    fn set_location(&mut self, agent_id: AgentId, location: Option<PlaceId>);
}

impl ContextLocationExt for Context {
    fn set_location(&mut self, agent_id: AgentId, location: Option<PlaceId>) {
        self.get_data_container_mut(PopulationPlugin)
            .agent_mut(agent_id)
            .location = location;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_agents_are_uninfected() {
        let mut context = Context::new();
        assert_eq!(context.get_population_size(), 0);
        assert_eq!(context.get_state_counts().total(), 0);

        let first = context.add_agent(RoleId::new(0));
        let second = context.add_agent(RoleId::new(0));
        assert_ne!(first, second);
        assert_eq!(context.get_population_size(), 2);
        assert_eq!(context.get_disease_state(first), DiseaseState::Uninfected);
        assert_eq!(context.get_state_counts()[DiseaseState::Uninfected], 2);
        assert_eq!(
            context.iter_agents().collect::<Vec<_>>(),
            vec![first, second]
        );
    }

    #[test]
    fn counts_follow_state_changes() {
        let mut context = Context::new();
        let agent = context.add_agent(RoleId::new(0));
        context.add_agent(RoleId::new(0));

        let previous = context.set_disease_state(agent, DiseaseState::Latent);
        assert_eq!(previous, DiseaseState::Uninfected);
        context.set_disease_state(agent, DiseaseState::Recovered);

        let counts = context.get_state_counts();
        assert_eq!(counts.get(DiseaseState::Uninfected), 1);
        assert_eq!(counts.get(DiseaseState::Latent), 0);
        assert_eq!(counts.get(DiseaseState::Recovered), 1);
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.as_array(), [1, 0, 0, 0, 0, 1, 0]);
    }

    #[test]
    #[should_panic(expected = "cannot move from recovered to latent")]
    fn states_never_regress() {
        let mut context = Context::new();
        let agent = context.add_agent(RoleId::new(0));
        context.set_disease_state(agent, DiseaseState::Latent);
        context.set_disease_state(agent, DiseaseState::Recovered);
        context.set_disease_state(agent, DiseaseState::Latent);
    }

    #[test]
    #[should_panic(expected = "does not exist")]
    fn unknown_agent() {
        let context = Context::new();
        context.get_agent(AgentId(3));
    }

    #[test]
    fn home_is_the_unscheduled_visit() {
        let mut context = Context::new();
        let agent = context.add_agent(RoleId::new(0));
        let schedule = Schedule::new(8.0, 2.0, 1.0).unwrap();
        context.add_visit(
            agent,
            Visit {
                place: PlaceId::new(4),
                schedule: Some(schedule),
            },
        );
        assert_eq!(context.get_home(agent), None);
        context.add_visit(
            agent,
            Visit {
                place: PlaceId::new(2),
                schedule: None,
            },
        );
        assert_eq!(context.get_home(agent), Some(PlaceId::new(2)));
        assert_eq!(context.get_agent(agent).visits.len(), 2);
    }

    #[test]
    fn generations_advance() {
        let mut context = Context::new();
        let agent = context.add_agent(RoleId::new(0));
        assert_eq!(context.get_infection_generation(agent), 0);
        assert_eq!(context.next_infection_generation(agent), 1);
        assert_eq!(context.next_infection_generation(agent), 2);
        assert_eq!(context.get_infection_generation(agent), 2);
    }
}
