//! Place kinds and the concrete places they produce.
//!
//! A `PlaceKind` is a template (e.g. "school") with a log-normal size
//! distribution and a transmissivity. Places of a kind are created lazily
//! while agents are distributed: each kind keeps an allocation cursor
//! pointing at the place currently being filled. A place's capacity is
//! drawn once, when it is created, and never changes.
use std::fmt::{Display, Formatter};

use indexmap::IndexSet;

use crate::context::Context;
use crate::lognormal::LogNormal;
use crate::population::AgentId;
use crate::random::ContextRandomExt;
use crate::{debug, define_data_plugin, define_rng};

define_rng!(PlaceSizeRng);

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceKindId(usize);

impl PlaceKindId {
    #[must_use]
    pub fn new(index: usize) -> PlaceKindId {
        PlaceKindId(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlaceId(usize);

impl PlaceId {
    #[must_use]
    pub fn new(index: usize) -> PlaceId {
        PlaceId(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

impl Display for PlaceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "place {}", self.0)
    }
}

#[derive(Clone, Debug)]
pub struct PlaceKind {
    pub name: String,
    pub size: LogNormal,
    /// Infection hazard per contagious occupant, per hour.
    pub transmissivity: f64,
    /// The place currently being filled.
    cursor: Option<PlaceId>,
}

impl PlaceKind {
    /// # Panics
    ///
    /// Panics if `transmissivity` is negative or not finite.
    #[must_use]
    pub fn new(name: &str, size_median: f64, size_scatter: f64, transmissivity: f64) -> PlaceKind {
        assert!(
            transmissivity >= 0.0 && transmissivity.is_finite(),
            "transmissivity {transmissivity} of `{name}` is invalid"
        );
        PlaceKind {
            name: name.to_string(),
            size: LogNormal::from_scatter(size_median, size_scatter),
            transmissivity,
            cursor: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Place {
    pub kind: PlaceKindId,
    pub transmissivity: f64,
    pub capacity: usize,
    /// Agents assigned to this place by the generator.
    pub members: Vec<AgentId>,
    /// Agents currently present.
    pub occupants: IndexSet<AgentId>,
    /// How many of the occupants are currently infectious.
    pub contagious: usize,
}

impl Place {
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.members.len() >= self.capacity
    }
}

#[derive(Default)]
struct PlacesData {
    kinds: Vec<PlaceKind>,
    places: Vec<Place>,
}

define_data_plugin!(PlacesPlugin, PlacesData, PlacesData::default());

pub trait ContextPlacesExt {
    /// Registers a place kind. Names are expected to be unique; see
    /// `Parameters::validate`.
    fn add_place_kind(&mut self, kind: PlaceKind) -> PlaceKindId;

    /// # Panics
    ///
    /// Panics if the kind does not exist.
    fn get_place_kind(&self, kind_id: PlaceKindId) -> &PlaceKind;

    fn find_place_kind(&self, name: &str) -> Option<PlaceKindId>;

    fn get_place_kind_count(&self) -> usize;

    /// Adds the agent to the place its kind is currently filling, creating
    /// a new place (and drawing its capacity) when there is none or it is
    /// full.
    fn assign_to_place(&mut self, kind_id: PlaceKindId, agent_id: AgentId) -> PlaceId;

    /// # Panics
    ///
    /// Panics if the place does not exist.
    fn get_place(&self, place_id: PlaceId) -> &Place;

    fn get_place_count(&self) -> usize;

    /// Every place of the given kind, in creation order.
    fn get_places_of_kind(&self, kind_id: PlaceKindId) -> Vec<PlaceId>;
}

impl ContextPlacesExt for Context {
    fn add_place_kind(&mut self, kind: PlaceKind) -> PlaceKindId {
        let data_container = self.get_data_container_mut(PlacesPlugin);
        let kind_id = PlaceKindId(data_container.kinds.len());
        debug!("place kind `{}` registered as {kind_id:?}", kind.name);
        data_container.kinds.push(kind);
        kind_id
    }

    fn get_place_kind(&self, kind_id: PlaceKindId) -> &PlaceKind {
        self.get_data_container(PlacesPlugin)
            .and_then(|data_container| data_container.kinds.get(kind_id.0))
            .unwrap_or_else(|| panic!("{kind_id:?} does not exist"))
    }

    fn find_place_kind(&self, name: &str) -> Option<PlaceKindId> {
        self.get_data_container(PlacesPlugin)?
            .kinds
            .iter()
            .position(|kind| kind.name == name)
            .map(PlaceKindId)
    }

    fn get_place_kind_count(&self) -> usize {
        self.get_data_container(PlacesPlugin)
            .map_or(0, |data_container| data_container.kinds.len())
    }

    fn assign_to_place(&mut self, kind_id: PlaceKindId, agent_id: AgentId) -> PlaceId {
        let kind = self.get_place_kind(kind_id);
        let cursor = kind
            .cursor
            .filter(|place_id| !self.get_place(*place_id).is_full());
        let place_id = match cursor {
            Some(place_id) => place_id,
            None => {
                let size = kind.size;
                let transmissivity = kind.transmissivity;
                let drawn = self.sample_distr(PlaceSizeRng, size).round();
                // A place always holds at least the agent that opened it.
                #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
                let capacity = (drawn as usize).max(1);
                let data_container = self.get_data_container_mut(PlacesPlugin);
                let place_id = PlaceId(data_container.places.len());
                data_container.places.push(Place {
                    kind: kind_id,
                    transmissivity,
                    capacity,
                    members: Vec::new(),
                    occupants: IndexSet::new(),
                    contagious: 0,
                });
                data_container.kinds[kind_id.0].cursor = Some(place_id);
                debug!("{place_id} of kind {kind_id:?} opened with capacity {capacity}");
                place_id
            }
        };
        self.get_data_container_mut(PlacesPlugin).places[place_id.0]
            .members
            .push(agent_id);
        place_id
    }

    fn get_place(&self, place_id: PlaceId) -> &Place {
        self.get_data_container(PlacesPlugin)
            .and_then(|data_container| data_container.places.get(place_id.0))
            .unwrap_or_else(|| panic!("{place_id} does not exist"))
    }

    fn get_place_count(&self) -> usize {
        self.get_data_container(PlacesPlugin)
            .map_or(0, |data_container| data_container.places.len())
    }

    fn get_places_of_kind(&self, kind_id: PlaceKindId) -> Vec<PlaceId> {
        self.get_data_container(PlacesPlugin)
            .map(|data_container| {
                data_container
                    .places
                    .iter()
                    .enumerate()
                    .filter(|(_, place)| place.kind == kind_id)
                    .map(|(index, _)| PlaceId(index))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Mutable access to a place, for the contagion model.
pub(crate) trait ContextPlaceMutExt {
    fn get_place_mut(&mut self, place_id: PlaceId) -> &mut Place;
}

impl ContextPlaceMutExt for Context {
    fn get_place_mut(&mut self, place_id: PlaceId) -> &mut Place {
        self.get_data_container_mut(PlacesPlugin)
            .places
            .get_mut(place_id.0)
            .unwrap_or_else(|| panic!("{place_id} does not exist"))
    }
}
