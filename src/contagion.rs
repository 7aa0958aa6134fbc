//! Place-level force of infection.
//!
//! Each place counts its contagious occupants. Whenever that count changes
//! by one, every current occupant gets a fresh infection draw with mean
//! delay `1 / (contagious * transmissivity)`, superseding whatever was
//! pending for it. The hazard is therefore recomputed reactively: between
//! changes of the count, an occupant keeps the draw it was last given,
//! including after it leaves the place. When the count (or the place's
//! transmissivity) is zero there is no hazard and pending draws of the
//! occupants are cancelled.
use crate::context::Context;
use crate::disease::ContextDiseaseExt;
use crate::places::{ContextPlaceMutExt, ContextPlacesExt, PlaceId};
use crate::population::{AgentId, ContextLocationExt, ContextPopulationExt};
use crate::trace;

pub trait ContextContagionExt {
    /// Puts the agent in the place, counting it if it is infectious.
    ///
    /// # Panics
    ///
    /// Panics if the agent is already somewhere.
    fn arrive(&mut self, agent_id: AgentId, place_id: PlaceId);

    /// Takes the agent out of its current place, if any.
    fn depart(&mut self, agent_id: AgentId);

    /// Departs the current place and arrives at `place_id`. Does nothing
    /// if the agent is already there.
    fn move_agent(&mut self, agent_id: AgentId, place_id: PlaceId);

    /// An occupant of the place became infectious.
    fn add_contagious_occupant(&mut self, place_id: PlaceId);

    /// An occupant of the place stopped being infectious (or left).
    ///
    /// # Panics
    ///
    /// Panics if the place has no contagious occupants.
    fn remove_contagious_occupant(&mut self, place_id: PlaceId);

    /// The current infection hazard per hour for occupants of the place.
    fn get_infection_hazard(&self, place_id: PlaceId) -> f64;
}

impl ContextContagionExt for Context {
    fn arrive(&mut self, agent_id: AgentId, place_id: PlaceId) {
        if let Some(location) = self.get_location(agent_id) {
            panic!("{agent_id} cannot arrive at {place_id} while still at {location}");
        }
        let infectious = self.get_disease_state(agent_id).is_infectious();
        self.get_place_mut(place_id).occupants.insert(agent_id);
        self.set_location(agent_id, Some(place_id));
        trace!(
            "{agent_id} arrived at {place_id} at t={}",
            self.get_current_time()
        );
        if infectious {
            self.add_contagious_occupant(place_id);
        }
    }

    fn depart(&mut self, agent_id: AgentId) {
        let Some(place_id) = self.get_location(agent_id) else {
            return;
        };
        let infectious = self.get_disease_state(agent_id).is_infectious();
        self.get_place_mut(place_id).occupants.shift_remove(&agent_id);
        self.set_location(agent_id, None);
        trace!(
            "{agent_id} left {place_id} at t={}",
            self.get_current_time()
        );
        if infectious {
            self.remove_contagious_occupant(place_id);
        }
    }

    fn move_agent(&mut self, agent_id: AgentId, place_id: PlaceId) {
        if self.get_location(agent_id) == Some(place_id) {
            return;
        }
        self.depart(agent_id);
        self.arrive(agent_id, place_id);
    }

    fn add_contagious_occupant(&mut self, place_id: PlaceId) {
        self.get_place_mut(place_id).contagious += 1;
        recompute_hazard(self, place_id);
    }

    fn remove_contagious_occupant(&mut self, place_id: PlaceId) {
        let place = self.get_place_mut(place_id);
        assert!(
            place.contagious > 0,
            "{place_id} has no contagious occupants to remove"
        );
        place.contagious -= 1;
        recompute_hazard(self, place_id);
    }

    fn get_infection_hazard(&self, place_id: PlaceId) -> f64 {
        let place = self.get_place(place_id);
        #[allow(clippy::cast_precision_loss)]
        let contagious = place.contagious as f64;
        contagious * place.transmissivity
    }
}

fn recompute_hazard(context: &mut Context, place_id: PlaceId) {
    let hazard = context.get_infection_hazard(place_id);
    let occupants: Vec<AgentId> = context
        .get_place(place_id)
        .occupants
        .iter()
        .copied()
        .collect();
    trace!(
        "{place_id}: hazard {hazard} for {} occupants at t={}",
        occupants.len(),
        context.get_current_time()
    );
    // A hazard too small to invert counts as none.
    let mean_delay = 1.0 / hazard;
    if hazard > 0.0 && mean_delay.is_finite() {
        for agent_id in occupants {
            context.schedule_infect(agent_id, mean_delay);
        }
    } else {
        for agent_id in occupants {
            context.cancel_pending_infection(agent_id);
        }
    }
}
