//! Per-agent disease progression.
//!
//! ```text
//! uninfected -> latent -> asymptomatic -> {recovered | symptomatic}
//!            -> {recovered | bedridden} -> {recovered | dead}
//! ```
//!
//! Every transition is a scheduled plan. On entering `latent`,
//! `asymptomatic`, `symptomatic` or `bedridden` the stage's `InfectionRule`
//! draws how long the stage lasts and whether it ends in recovery or in the
//! next stage.
//!
//! Pending infections are never cancelled in the queue. Each agent carries
//! an infection generation; `schedule_infect` bumps it and the scheduled
//! `infect` only applies if it still carries the current generation.
use rand::Rng;
use rand_distr::{Distribution, Exp};
use serde::Serialize;
use strum::{Display, EnumCount, EnumIter};

use crate::contagion::ContextContagionExt;
use crate::context::Context;
use crate::lognormal::LogNormal;
use crate::population::{AgentId, ContextPopulationExt};
use crate::random::ContextRandomExt;
use crate::{define_data_plugin, define_rng, trace};

define_rng!(DiseaseRng);
define_rng!(InfectionTimeRng);

#[derive(
    Copy,
    Clone,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Display,
    EnumIter,
    EnumCount,
    Serialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum DiseaseState {
    Uninfected,
    Latent,
    Asymptomatic,
    Symptomatic,
    Bedridden,
    Recovered,
    Dead,
}

impl DiseaseState {
    /// Asymptomatic, symptomatic and bedridden agents transmit.
    #[must_use]
    pub fn is_infectious(self) -> bool {
        DiseaseState::Asymptomatic <= self && self <= DiseaseState::Bedridden
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, DiseaseState::Recovered | DiseaseState::Dead)
    }

    /// Whether `next` is reachable in a single transition.
    #[must_use]
    pub fn can_advance_to(self, next: DiseaseState) -> bool {
        use DiseaseState::{
            Asymptomatic, Bedridden, Dead, Latent, Recovered, Symptomatic, Uninfected,
        };
        matches!(
            (self, next),
            (Uninfected, Latent)
                | (Latent, Asymptomatic | Recovered)
                | (Asymptomatic, Symptomatic | Recovered)
                | (Symptomatic, Bedridden | Recovered)
                | (Bedridden, Dead | Recovered)
        )
    }
}

/// Governs one disease stage: how long it lasts and whether it ends in
/// recovery.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InfectionRule {
    duration: LogNormal,
    recovery_probability: f64,
}

impl InfectionRule {
    /// `median` and `scatter` share a time unit; `sigma` is derived from
    /// them here and the scatter is discarded.
    ///
    /// # Panics
    ///
    /// Panics if `recovery_probability` is outside `[0, 1]`.
    #[must_use]
    pub fn new(median: f64, scatter: f64, recovery_probability: f64) -> InfectionRule {
        assert!(
            (0.0..=1.0).contains(&recovery_probability),
            "recovery probability {recovery_probability} is outside [0, 1]"
        );
        InfectionRule {
            duration: LogNormal::from_scatter(median, scatter),
            recovery_probability,
        }
    }

    #[must_use]
    pub fn median(&self) -> f64 {
        self.duration.median()
    }

    #[must_use]
    pub fn sigma(&self) -> f64 {
        self.duration.sigma()
    }

    #[must_use]
    pub fn recovery_probability(&self) -> f64 {
        self.recovery_probability
    }

    /// Draws the stage duration, then whether the stage ends in recovery.
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> (f64, bool) {
        let duration = self.duration.sample(rng);
        let recovers = rng.random_bool(self.recovery_probability);
        (duration, recovers)
    }
}

/// One rule per stage that has a duration.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DiseaseRules {
    pub latent: InfectionRule,
    pub asymptomatic: InfectionRule,
    pub symptomatic: InfectionRule,
    pub bedridden: InfectionRule,
}

impl DiseaseRules {
    /// # Panics
    ///
    /// Panics if `state` has no duration (uninfected or terminal).
    #[must_use]
    pub fn rule_for(&self, state: DiseaseState) -> &InfectionRule {
        match state {
            DiseaseState::Latent => &self.latent,
            DiseaseState::Asymptomatic => &self.asymptomatic,
            DiseaseState::Symptomatic => &self.symptomatic,
            DiseaseState::Bedridden => &self.bedridden,
            _ => panic!("{state} has no infection rule"),
        }
    }
}

define_data_plugin!(DiseasePlugin, Option<DiseaseRules>, None);

pub trait ContextDiseaseExt {
    fn set_disease_rules(&mut self, rules: DiseaseRules);

    /// # Panics
    ///
    /// Panics if `set_disease_rules` was never called.
    fn get_disease_rules(&self) -> &DiseaseRules;

    /// Schedules an infection after an exponential delay with mean
    /// `mean_delay`, superseding any infection already pending for the
    /// agent. Does nothing unless the agent is uninfected.
    fn schedule_infect(&mut self, agent_id: AgentId, mean_delay: f64);

    /// Supersedes any pending infection without scheduling a new one.
    fn cancel_pending_infection(&mut self, agent_id: AgentId);

    /// Infects the agent at the current time. Used to seed the epidemic.
    ///
    /// # Panics
    ///
    /// Panics if the agent is not uninfected.
    fn seed_infection(&mut self, agent_id: AgentId);

    /// Applies a scheduled infection. A no-op unless the agent is still
    /// uninfected and `generation` is its current infection generation.
    fn infect(&mut self, agent_id: AgentId, generation: u64);
}

impl ContextDiseaseExt for Context {
    fn set_disease_rules(&mut self, rules: DiseaseRules) {
        *self.get_data_container_mut(DiseasePlugin) = Some(rules);
    }

    fn get_disease_rules(&self) -> &DiseaseRules {
        self.get_data_container(DiseasePlugin)
            .and_then(Option::as_ref)
            .expect("Disease rules must be set before agents are infected")
    }

    fn schedule_infect(&mut self, agent_id: AgentId, mean_delay: f64) {
        if self.get_disease_state(agent_id) != DiseaseState::Uninfected {
            return;
        }
        assert!(
            mean_delay > 0.0 && mean_delay.is_finite(),
            "mean infection delay {mean_delay} must be positive"
        );
        let rate = 1.0 / mean_delay;
        let delay = self.sample_distr(
            InfectionTimeRng,
            Exp::new(rate).expect("infection hazard must be a positive rate"),
        );
        let infection_time = self.get_current_time() + delay;
        let generation = self.next_infection_generation(agent_id);
        trace!("{agent_id}: infection pending at t={infection_time} (generation {generation})");
        self.add_plan(infection_time, move |context| {
            context.infect(agent_id, generation);
        });
    }

    fn cancel_pending_infection(&mut self, agent_id: AgentId) {
        if self.get_disease_state(agent_id) == DiseaseState::Uninfected {
            self.next_infection_generation(agent_id);
        }
    }

    fn seed_infection(&mut self, agent_id: AgentId) {
        expect_state(self, agent_id, DiseaseState::Uninfected);
        let generation = self.next_infection_generation(agent_id);
        self.infect(agent_id, generation);
    }

    fn infect(&mut self, agent_id: AgentId, generation: u64) {
        if self.get_disease_state(agent_id) != DiseaseState::Uninfected
            || self.get_infection_generation(agent_id) != generation
        {
            trace!("{agent_id}: superseded infection ignored");
            return;
        }
        enter_stage(self, agent_id, DiseaseState::Latent, become_contagious);
    }
}

/// Moves the agent into `stage` and schedules the end of that stage:
/// recovery, or `progress` into the next stage.
fn enter_stage(
    context: &mut Context,
    agent_id: AgentId,
    stage: DiseaseState,
    progress: fn(&mut Context, AgentId),
) {
    context.set_disease_state(agent_id, stage);
    let rule = *context.get_disease_rules().rule_for(stage);
    let (duration, recovers) = context.sample(DiseaseRng, |rng| rule.draw(rng));
    let end_time = context.get_current_time() + duration;
    trace!(
        "{agent_id}: {stage} at t={} until t={end_time} (recovers: {recovers})",
        context.get_current_time()
    );
    if recovers {
        context.add_plan(end_time, move |context| recover(context, agent_id));
    } else {
        context.add_plan(end_time, move |context| progress(context, agent_id));
    }
}

fn expect_state(context: &Context, agent_id: AgentId, expected: DiseaseState) {
    let state = context.get_disease_state(agent_id);
    assert_eq!(
        state, expected,
        "{agent_id} is {state}, expected {expected}"
    );
}

fn become_contagious(context: &mut Context, agent_id: AgentId) {
    expect_state(context, agent_id, DiseaseState::Latent);
    enter_stage(context, agent_id, DiseaseState::Asymptomatic, feel_sick);
    if let Some(place_id) = context.get_location(agent_id) {
        context.add_contagious_occupant(place_id);
    }
}

fn feel_sick(context: &mut Context, agent_id: AgentId) {
    expect_state(context, agent_id, DiseaseState::Asymptomatic);
    enter_stage(context, agent_id, DiseaseState::Symptomatic, go_to_bed);
}

fn go_to_bed(context: &mut Context, agent_id: AgentId) {
    expect_state(context, agent_id, DiseaseState::Symptomatic);
    enter_stage(context, agent_id, DiseaseState::Bedridden, die);
}

fn recover(context: &mut Context, agent_id: AgentId) {
    let previous = context.set_disease_state(agent_id, DiseaseState::Recovered);
    trace!("{agent_id}: recovered at t={}", context.get_current_time());
    if previous.is_infectious() {
        if let Some(place_id) = context.get_location(agent_id) {
            context.remove_contagious_occupant(place_id);
        }
    }
}

fn die(context: &mut Context, agent_id: AgentId) {
    expect_state(context, agent_id, DiseaseState::Bedridden);
    // Leave while still counted as contagious so the place's hazard drops.
    context.depart(agent_id);
    context.set_disease_state(agent_id, DiseaseState::Dead);
    trace!("{agent_id}: died at t={}", context.get_current_time());
}
