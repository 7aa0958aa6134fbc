//! Builds the population and the places it lives in.
//!
//! Agents are created role by role. Each is registered against every place
//! kind of its role; once everyone exists, each kind's registrations are
//! shuffled and dealt into places, so housemates and colleagues are random
//! with respect to role and creation order.
use rand::seq::SliceRandom;

use crate::context::{Context, ExecutionPhase};
use crate::contagion::ContextContagionExt;
use crate::disease::ContextDiseaseExt;
use crate::places::{ContextPlacesExt, PlaceKindId};
use crate::population::{AgentId, ContextPopulationExt, Visit};
use crate::random::ContextRandomExt;
use crate::roles::{ContextRolesExt, RoleId};
use crate::schedule::{ContextScheduleExt, Schedule};
use crate::{debug, define_rng, info};

define_rng!(PopulationRng);

/// Splits `population` over roles in proportion to their fractions. Each
/// share is rounded on its own, so the total may differ slightly from
/// `population`.
#[must_use]
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
pub fn role_sizes(fractions: &[f64], population: usize) -> Vec<usize> {
    let sum: f64 = fractions.iter().sum();
    fractions
        .iter()
        .map(|fraction| (fraction / sum * population as f64).round() as usize)
        .collect()
}

/// Creates the agents of every registered role, seeds `initial_infected`
/// of them at the current time and distributes everyone into places.
/// Returns the number of agents created.
///
/// # Panics
///
/// Panics if no roles have been added.
pub fn generate_population(
    context: &mut Context,
    population: usize,
    initial_infected: usize,
) -> usize {
    let role_count = context.get_role_count();
    assert!(role_count > 0, "no roles to populate");
    let roles: Vec<RoleId> = (0..role_count).map(RoleId::new).collect();
    let fractions: Vec<f64> = roles
        .iter()
        .map(|role_id| context.get_role(*role_id).fraction)
        .collect();
    let sizes = role_sizes(&fractions, population);

    let mut registrations: Vec<Vec<(AgentId, Option<Schedule>)>> =
        vec![Vec::new(); context.get_place_kind_count()];
    let mut population_remaining = population;
    let mut infected_remaining = initial_infected;
    let mut created = 0;

    for (role_id, size) in roles.into_iter().zip(sizes) {
        let entries = context.get_role(role_id).entries.clone();
        debug!(
            "creating {size} agents for role `{}`",
            context.get_role(role_id).name
        );
        for _ in 0..size {
            let agent_id = context.add_agent(role_id);
            if should_infect(context, infected_remaining, population_remaining) {
                context.seed_infection(agent_id);
                infected_remaining -= 1;
            }
            population_remaining = population_remaining.saturating_sub(1);
            for entry in &entries {
                registrations[entry.kind.index()].push((agent_id, entry.schedule));
            }
            created += 1;
        }
    }

    for (index, mut kind_registrations) in registrations.into_iter().enumerate() {
        context.sample(PopulationRng, |rng| kind_registrations.shuffle(rng));
        distribute(context, PlaceKindId::new(index), &kind_registrations);
    }

    info!(
        "generated {created} agents ({} infected) in {} places",
        initial_infected - infected_remaining,
        context.get_place_count()
    );
    created
}

/// Infects with probability `infected_remaining / population_remaining`.
/// Once the nominal population is used up (rounding can add agents), the
/// remaining infections go to the next agents.
fn should_infect(context: &Context, infected_remaining: usize, population_remaining: usize) -> bool {
    if infected_remaining == 0 {
        return false;
    }
    if population_remaining == 0 {
        return true;
    }
    #[allow(clippy::cast_precision_loss)]
    let probability = infected_remaining as f64 / population_remaining as f64;
    context.sample_range(PopulationRng, 0.0..1.0) < probability
}

fn distribute(
    context: &mut Context,
    kind_id: PlaceKindId,
    registrations: &[(AgentId, Option<Schedule>)],
) {
    for (agent_id, schedule) in registrations {
        let agent_id = *agent_id;
        let place_id = context.assign_to_place(kind_id, agent_id);
        context.add_visit(
            agent_id,
            Visit {
                place: place_id,
                schedule: *schedule,
            },
        );
        match schedule {
            Some(schedule) => {
                context.commit_to_schedule(agent_id, place_id, *schedule);
            }
            None => {
                let now = context.get_current_time();
                context.add_plan_with_phase(
                    now,
                    move |context| context.arrive(agent_id, place_id),
                    ExecutionPhase::First,
                );
            }
        }
    }
    debug!(
        "{} registrations dealt into {} places of {kind_id:?}",
        registrations.len(),
        context.get_places_of_kind(kind_id).len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disease::{DiseaseRules, DiseaseState, InfectionRule};
    use crate::places::PlaceKind;
    use crate::roles::Role;
    use crate::HashSet;

    fn setup(seed: u64) -> (Context, PlaceKindId, PlaceKindId) {
        let mut context = Context::new();
        context.init_random(seed);
        let rule = InfectionRule::new(48.0, 0.0, 0.0);
        context.set_disease_rules(DiseaseRules {
            latent: rule,
            asymptomatic: rule,
            symptomatic: rule,
            bedridden: rule,
        });
        let home = context.add_place_kind(PlaceKind::new("home", 4.0, 0.0, 0.0));
        let work = context.add_place_kind(PlaceKind::new("work", 10.0, 3.0, 0.0));
        (context, home, work)
    }

    #[test]
    fn role_sizes_round_independently() {
        assert_eq!(role_sizes(&[1.0, 1.0], 10), vec![5, 5]);
        assert_eq!(role_sizes(&[0.3, 0.7], 100), vec![30, 70]);
        // 10/3 rounds down for every role.
        assert_eq!(role_sizes(&[1.0, 1.0, 1.0], 10), vec![3, 3, 3]);
        assert_eq!(role_sizes(&[2.0], 7), vec![7]);
    }

    #[test]
    fn everyone_has_a_home_and_is_placed() {
        let (mut context, home, work) = setup(11);
        let schedule = Schedule::new(9.0, 8.0, 1.0).unwrap();
        context
            .add_role(Role::new("worker", 3.0).with_home(home).with_visit(work, schedule))
            .unwrap();
        context.add_role(Role::new("child", 1.0).with_home(home)).unwrap();

        let created = generate_population(&mut context, 40, 0);
        assert_eq!(created, 40);
        assert_eq!(context.get_population_size(), 40);

        let mut members = 0;
        for place in context.get_places_of_kind(home) {
            members += context.get_place(place).members.len();
        }
        assert_eq!(members, 40);
        for place in context.get_places_of_kind(work) {
            let place = context.get_place(place);
            assert!(place
                .members
                .iter()
                .all(|agent| context.get_agent(*agent).role == RoleId::new(0)));
        }
        for agent in context.iter_agents() {
            let visits = context.get_agent(agent).visits.len();
            assert!(context.get_home(agent).is_some());
            let expected = if context.get_agent(agent).role == RoleId::new(0) { 2 } else { 1 };
            assert_eq!(visits, expected);
        }

        // Nobody is anywhere until the arrival plans run.
        assert!(context.iter_agents().all(|agent| context.get_location(agent).is_none()));
        context.shutdown_at(1.0);
        context.execute();
        for agent in context.iter_agents() {
            assert_eq!(context.get_location(agent), context.get_home(agent));
        }
    }

    #[test]
    fn seeds_exactly_the_initial_infected() {
        for seed in 0..10 {
            let (mut context, home, _) = setup(seed);
            context.add_role(Role::new("resident", 1.0).with_home(home)).unwrap();
            generate_population(&mut context, 100, 10);
            let counts = context.get_state_counts();
            assert_eq!(counts[DiseaseState::Uninfected], 90);
            assert_eq!(counts[DiseaseState::Latent], 10);
        }
    }

    #[test]
    fn everyone_infected() {
        let (mut context, home, _) = setup(5);
        context.add_role(Role::new("resident", 1.0).with_home(home)).unwrap();
        generate_population(&mut context, 12, 12);
        assert_eq!(context.get_state_counts()[DiseaseState::Latent], 12);
    }

    #[test]
    fn households_are_shuffled() {
        let (mut context, home, _) = setup(8);
        context.add_role(Role::new("resident", 1.0).with_home(home)).unwrap();
        generate_population(&mut context, 400, 0);
        let first = context.get_places_of_kind(home)[0];
        let members: HashSet<AgentId> = context.get_place(first).members.iter().copied().collect();
        let in_creation_order: HashSet<AgentId> = context.iter_agents().take(4).collect();
        assert_eq!(members.len(), 4);
        assert_ne!(members, in_creation_order);
    }

    #[test]
    fn same_seed_same_topology() {
        let build = || {
            let (mut context, home, work) = setup(99);
            let schedule = Schedule::new(8.0, 8.0, 0.5).unwrap();
            context
                .add_role(Role::new("worker", 1.0).with_home(home).with_visit(work, schedule))
                .unwrap();
            generate_population(&mut context, 60, 6);
            context
                .iter_agents()
                .map(|agent| {
                    (
                        context.get_home(agent),
                        context.get_disease_state(agent),
                        context.get_agent(agent).visits.clone(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(build(), build());
    }

    #[test]
    #[should_panic(expected = "no roles to populate")]
    fn needs_roles() {
        let (mut context, _, _) = setup(1);
        generate_population(&mut context, 10, 0);
    }
}
