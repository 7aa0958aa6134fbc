//! An agent-based epidemic simulator.
//!
//! A population of agents, organized into roles, moves between places on
//! recurring daily schedules and transmits a disease stochastically. The
//! central object is the `Context`, which owns simulated time, the event
//! queue, the random number streams and the state of every module:
//! * `disease`: the per-agent progression from uninfected to recovered or
//!   dead, every transition a scheduled plan
//! * `contagion`: the force of infection inside each place, driven by the
//!   number of contagious occupants
//! * `places`, `roles`, `population` and `generator`: the model topology,
//!   built once before the clock starts
//! * `schedule`: daily round trips between home and the other places
//! * `census`: population-by-state counts on a daily cadence
//!
//! A model is described by `Parameters` (usually a JSON file), built with
//! `model::init` and run with `Context::execute`. The `runner` wires this to
//! a command line.
pub mod census;
pub mod contagion;
pub mod context;
pub mod disease;
pub mod error;
pub mod generator;
pub mod hashing;
pub mod log;
pub mod lognormal;
pub mod model;
pub mod numeric;
pub mod parameters;
pub mod places;
pub mod plan;
pub mod population;
pub mod random;
pub mod report;
pub mod roles;
pub mod runner;
pub mod schedule;

pub use census::{Census, CensusRow, ContextCensusExt};
pub use contagion::ContextContagionExt;
pub use context::{Context, ExecutionPhase};
pub use disease::{ContextDiseaseExt, DiseaseRules, DiseaseState, InfectionRule};
pub use error::SimError;
pub use hashing::{HashMap, HashMapExt, HashSet, HashSetExt};
pub use crate::log::{debug, error, info, trace, warn};
pub use parameters::{ContextParametersExt, Parameters};
pub use places::{ContextPlacesExt, PlaceId, PlaceKind, PlaceKindId};
pub use population::{AgentId, ContextPopulationExt, StateCounts};
pub use random::ContextRandomExt;
pub use report::ContextReportExt;
pub use roles::{ContextRolesExt, Role, RoleId};
pub use schedule::{ContextScheduleExt, Schedule};

// Re-exported for use in macros
pub use csv;
pub use paste;
pub use rand;
