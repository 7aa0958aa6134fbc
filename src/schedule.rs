//! Recurring daily visits.
//!
//! A `Schedule` is a window of the day (start hour and duration) plus a
//! compliance probability. Committing an agent to a schedule decides once,
//! by a single draw, whether the agent ever follows it. An agent that does
//! travels to the place at the start of the window every day and travels
//! home when the window closes.
use std::fmt::{Display, Formatter};

use crate::contagion::ContextContagionExt;
use crate::context::{Context, ExecutionPhase};
use crate::disease::DiseaseState;
use crate::error::SimError;
use crate::places::PlaceId;
use crate::population::{AgentId, ContextPopulationExt};
use crate::random::ContextRandomExt;
use crate::{define_rng, trace};

define_rng!(ScheduleRng);

pub const HOURS_PER_DAY: f64 = 24.0;

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Schedule {
    start: f64,
    duration: f64,
    compliance: f64,
}

impl Schedule {
    /// A daily visit starting `start` hours after midnight and lasting
    /// `duration` hours, followed with probability `compliance`.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` listing every violated constraint:
    /// `0 <= start < 24`, a positive finite `duration`, and
    /// `0 <= compliance <= 1`. A visit may run past midnight.
    pub fn new(start: f64, duration: f64, compliance: f64) -> Result<Schedule, SimError> {
        let mut errors = Vec::new();
        if !(0.0..HOURS_PER_DAY).contains(&start) {
            errors.push(format!("start hour {start} is outside [0, 24)"));
        }
        if !duration.is_finite() || duration <= 0.0 {
            errors.push(format!("duration {duration} must be positive"));
        }
        if !(0.0..=1.0).contains(&compliance) {
            errors.push(format!("compliance {compliance} is outside [0, 1]"));
        }
        if errors.is_empty() {
            Ok(Schedule {
                start,
                duration,
                compliance,
            })
        } else {
            Err(SimError::Validation(errors))
        }
    }

    #[must_use]
    pub fn start(&self) -> f64 {
        self.start
    }

    #[must_use]
    pub fn duration(&self) -> f64 {
        self.duration
    }

    #[must_use]
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    #[must_use]
    pub fn compliance(&self) -> f64 {
        self.compliance
    }

    /// Whether either window starts inside the other. Both ends are
    /// inclusive, so `(8-10)` and `(10-12)` overlap.
    #[must_use]
    pub fn overlaps(&self, other: &Schedule) -> bool {
        (self.start <= other.start && other.start <= self.end())
            || (other.start <= self.start && self.start <= other.end())
    }
}

impl Display for Schedule {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}-{}", self.start, self.end())?;
        if self.compliance < 1.0 {
            write!(f, " {}", self.compliance)?;
        }
        write!(f, ")")
    }
}

pub trait ContextScheduleExt {
    /// Decides whether the agent follows `schedule` at `place` and, if it
    /// does, starts the daily round trips from the next time the window
    /// opens. Returns whether it follows.
    fn commit_to_schedule(&mut self, agent_id: AgentId, place_id: PlaceId, schedule: Schedule)
        -> bool;

    /// Moves the agent to the place unless it is dead, or bedridden and the
    /// place is not its home.
    fn travel_to(&mut self, agent_id: AgentId, place_id: PlaceId);

    fn go_home(&mut self, agent_id: AgentId);
}

impl ContextScheduleExt for Context {
    fn commit_to_schedule(
        &mut self,
        agent_id: AgentId,
        place_id: PlaceId,
        schedule: Schedule,
    ) -> bool {
        let follows = self.sample_bool(ScheduleRng, schedule.compliance);
        if !follows {
            trace!("{agent_id} ignores {schedule} at {place_id}");
            return false;
        }
        let now = self.get_current_time();
        let mut start = (now / HOURS_PER_DAY).floor() * HOURS_PER_DAY + schedule.start;
        if start < now {
            start += HOURS_PER_DAY;
        }
        self.add_periodic_plan_with_phase(
            start,
            HOURS_PER_DAY,
            move |context| {
                context.travel_to(agent_id, place_id);
                let return_time = context.get_current_time() + schedule.duration;
                context.add_plan(return_time, move |context| context.go_home(agent_id));
            },
            ExecutionPhase::Normal,
        );
        true
    }

    fn travel_to(&mut self, agent_id: AgentId, place_id: PlaceId) {
        let state = self.get_disease_state(agent_id);
        let home = self.get_home(agent_id);
        if state == DiseaseState::Dead
            || (state == DiseaseState::Bedridden && home != Some(place_id))
        {
            trace!("{agent_id} is {state} and stays put");
            return;
        }
        self.move_agent(agent_id, place_id);
    }

    fn go_home(&mut self, agent_id: AgentId) {
        if let Some(home) = self.get_home(agent_id) {
            self.travel_to(agent_id, home);
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::define_data_plugin;
    use crate::disease::{ContextDiseaseExt, DiseaseRules, InfectionRule};
    use crate::places::{ContextPlacesExt, PlaceKind};
    use crate::population::Visit;
    use crate::roles::RoleId;

    #[test]
    fn rejects_out_of_range_fields() {
        assert!(Schedule::new(0.0, 1.0, 0.0).is_ok());
        assert!(Schedule::new(23.5, 0.5, 1.0).is_ok());
        let Err(SimError::Validation(errors)) = Schedule::new(24.0, 0.0, 1.5) else {
            panic!("expected validation failures");
        };
        assert_eq!(errors.len(), 3);
        assert!(Schedule::new(-1.0, 2.0, 1.0).is_err());
        assert!(Schedule::new(20.0, 6.0, 1.0).is_ok());
        assert!(Schedule::new(8.0, f64::INFINITY, 1.0).is_err());
        assert!(Schedule::new(8.0, f64::NAN, 1.0).is_err());
    }

    #[test]
    fn overlap_is_symmetric_and_inclusive() {
        let morning = Schedule::new(8.0, 2.0, 1.0).unwrap();
        let late_morning = Schedule::new(10.0, 2.0, 1.0).unwrap();
        let afternoon = Schedule::new(14.0, 2.0, 1.0).unwrap();
        let all_day = Schedule::new(7.0, 10.0, 1.0).unwrap();

        assert!(morning.overlaps(&late_morning));
        assert!(late_morning.overlaps(&morning));
        assert!(!morning.overlaps(&afternoon));
        assert!(!afternoon.overlaps(&morning));
        assert!(all_day.overlaps(&afternoon));
        assert!(afternoon.overlaps(&all_day));
        assert!(morning.overlaps(&morning));
    }

    #[test]
    fn display() {
        assert_eq!(Schedule::new(8.0, 8.0, 1.0).unwrap().to_string(), "(8-16)");
        assert_eq!(
            Schedule::new(9.5, 1.0, 0.25).unwrap().to_string(),
            "(9.5-10.5 0.25)"
        );
    }

    define_data_plugin!(Trail, Vec<(f64, Option<PlaceId>)>, vec![]);

    struct Town {
        context: Context,
        agent: AgentId,
        home: PlaceId,
        work: PlaceId,
        gym: PlaceId,
    }

    fn town() -> Town {
        let mut context = Context::new();
        context.init_random(3);
        let rule = InfectionRule::new(1000.0, 0.0, 0.0);
        context.set_disease_rules(DiseaseRules {
            latent: rule,
            asymptomatic: rule,
            symptomatic: rule,
            bedridden: rule,
        });
        let agent = context.add_agent(RoleId::new(0));
        let place = |context: &mut Context, name: &str| {
            let kind = context.add_place_kind(PlaceKind::new(name, 1.0, 0.0, 0.0));
            context.assign_to_place(kind, agent)
        };
        let home = place(&mut context, "home");
        let work = place(&mut context, "work");
        let gym = place(&mut context, "gym");
        context.add_visit(
            agent,
            Visit {
                place: home,
                schedule: None,
            },
        );
        context.arrive(agent, home);
        Town {
            context,
            agent,
            home,
            work,
            gym,
        }
    }

    fn record_every_hour(context: &mut Context, agent: AgentId) {
        context.add_periodic_plan_with_phase(
            0.0,
            1.0,
            move |context| {
                let entry = (context.get_current_time(), context.get_location(agent));
                context.get_data_container_mut(Trail).push(entry);
            },
            ExecutionPhase::Last,
        );
    }

    fn location_at(context: &Context, time: f64) -> Option<PlaceId> {
        context
            .get_data_container(Trail)
            .unwrap()
            .iter()
            .find(|(t, _)| *t == time)
            .unwrap()
            .1
    }

    #[test]
    fn two_daily_round_trips() {
        let Town {
            mut context,
            agent,
            home,
            work,
            gym,
        } = town();
        assert!(context.commit_to_schedule(agent, work, Schedule::new(6.0, 2.0, 1.0).unwrap()));
        assert!(context.commit_to_schedule(agent, gym, Schedule::new(14.0, 2.0, 1.0).unwrap()));
        record_every_hour(&mut context, agent);
        context.shutdown_at(48.0);
        context.execute();

        for day in [0.0, 24.0] {
            assert_eq!(location_at(&context, day + 5.0), Some(home));
            assert_eq!(location_at(&context, day + 6.0), Some(work));
            assert_eq!(location_at(&context, day + 7.0), Some(work));
            assert_eq!(location_at(&context, day + 8.0), Some(home));
            assert_eq!(location_at(&context, day + 13.0), Some(home));
            assert_eq!(location_at(&context, day + 14.0), Some(gym));
            assert_eq!(location_at(&context, day + 16.0), Some(home));
        }
        assert_eq!(context.get_location(agent), Some(home));
    }

    #[test]
    fn night_shift_crosses_midnight() {
        let Town {
            mut context,
            agent,
            home,
            work,
            ..
        } = town();
        let night = Schedule::new(22.0, 4.0, 1.0).unwrap();
        assert_eq!(night.end(), 26.0);
        assert!(context.commit_to_schedule(agent, work, night));
        record_every_hour(&mut context, agent);
        context.shutdown_at(72.0);
        context.execute();

        assert_eq!(location_at(&context, 21.0), Some(home));
        assert_eq!(location_at(&context, 22.0), Some(work));
        assert_eq!(location_at(&context, 25.0), Some(work));
        assert_eq!(location_at(&context, 26.0), Some(home));
        assert_eq!(location_at(&context, 45.0), Some(home));
        assert_eq!(location_at(&context, 46.0), Some(work));
        assert_eq!(location_at(&context, 50.0), Some(home));
    }

    #[test]
    fn zero_compliance_never_leaves_home() {
        let Town {
            mut context,
            agent,
            home,
            work,
            ..
        } = town();
        assert!(!context.commit_to_schedule(agent, work, Schedule::new(9.0, 8.0, 0.0).unwrap()));
        record_every_hour(&mut context, agent);
        context.shutdown_at(72.0);
        context.execute();
        assert!(context
            .get_data_container(Trail)
            .unwrap()
            .iter()
            .all(|(_, location)| *location == Some(home)));
    }

    #[test]
    fn bedridden_agents_stay_home() {
        let Town {
            mut context,
            agent,
            home,
            work,
            ..
        } = town();
        context.set_disease_state(agent, DiseaseState::Latent);
        context.set_disease_state(agent, DiseaseState::Asymptomatic);
        context.set_disease_state(agent, DiseaseState::Symptomatic);
        context.add_contagious_occupant(home);
        context.set_disease_state(agent, DiseaseState::Bedridden);

        context.commit_to_schedule(agent, work, Schedule::new(9.0, 8.0, 1.0).unwrap());
        record_every_hour(&mut context, agent);
        context.shutdown_at(48.0);
        context.execute();
        assert_eq!(location_at(&context, 10.0), Some(home));
        assert_eq!(context.get_place(home).contagious, 1);
        assert!(context.get_place(work).occupants.is_empty());
    }

    #[test]
    fn dead_agents_go_nowhere() {
        let Town {
            mut context,
            agent,
            home,
            work,
            ..
        } = town();
        context.depart(agent);
        for state in [
            DiseaseState::Latent,
            DiseaseState::Asymptomatic,
            DiseaseState::Symptomatic,
            DiseaseState::Bedridden,
            DiseaseState::Dead,
        ] {
            context.set_disease_state(agent, state);
        }
        context.commit_to_schedule(agent, work, Schedule::new(9.0, 8.0, 1.0).unwrap());
        context.shutdown_at(48.0);
        context.execute();
        assert_eq!(context.get_location(agent), None);
        assert!(context.get_place(home).occupants.is_empty());
        assert!(context.get_place(work).occupants.is_empty());
    }
}
