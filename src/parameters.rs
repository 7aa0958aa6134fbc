//! Model configuration.
//!
//! Durations and the end time are written in days and converted to hours
//! when the model is built. Transmissivity is already a per-hour rate and is
//! used as given. `validate` collects every
//! problem at once so a configuration can be fixed in one pass.
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::context::Context;
use crate::disease::{DiseaseRules, InfectionRule};
use crate::error::SimError;
use crate::places::{PlaceKind, PlaceKindId};
use crate::roles::Role;
use crate::schedule::{Schedule, HOURS_PER_DAY};
use crate::{define_data_plugin, HashSet, HashSetExt};

/// Duration and outcome of one disease stage.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct StageParameters {
    /// Median duration in days.
    pub median: f64,
    /// Spread of the duration in days; `median + scatter` lies one sigma
    /// above the median.
    #[serde(default)]
    pub scatter: f64,
    /// Probability that the stage ends in recovery.
    #[serde(default)]
    pub recovery: f64,
}

impl StageParameters {
    #[must_use]
    pub fn to_rule(&self) -> InfectionRule {
        InfectionRule::new(
            self.median * HOURS_PER_DAY,
            self.scatter * HOURS_PER_DAY,
            self.recovery,
        )
    }

    fn problems(&self, stage: &str) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.median > 0.0 && self.median.is_finite()) {
            problems.push(format!("{stage}: median {} must be positive", self.median));
        }
        if !(self.scatter >= 0.0 && self.scatter.is_finite()) {
            problems.push(format!("{stage}: scatter {} is negative", self.scatter));
        }
        if !(0.0..=1.0).contains(&self.recovery) {
            problems.push(format!(
                "{stage}: recovery probability {} is outside [0, 1]",
                self.recovery
            ));
        }
        problems
    }
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DiseaseParameters {
    pub latent: StageParameters,
    pub asymptomatic: StageParameters,
    pub symptomatic: StageParameters,
    pub bedridden: StageParameters,
}

impl DiseaseParameters {
    #[must_use]
    pub fn to_rules(&self) -> DiseaseRules {
        DiseaseRules {
            latent: self.latent.to_rule(),
            asymptomatic: self.asymptomatic.to_rule(),
            symptomatic: self.symptomatic.to_rule(),
            bedridden: self.bedridden.to_rule(),
        }
    }

    fn stages(&self) -> [(&'static str, &StageParameters); 4] {
        [
            ("latent", &self.latent),
            ("asymptomatic", &self.asymptomatic),
            ("symptomatic", &self.symptomatic),
            ("bedridden", &self.bedridden),
        ]
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct PlaceKindParameters {
    pub name: String,
    /// Median number of members.
    pub median: f64,
    #[serde(default)]
    pub scatter: f64,
    /// Infection hazard per contagious occupant, per hour.
    pub transmissivity: f64,
}

impl PlaceKindParameters {
    #[must_use]
    pub fn to_place_kind(&self) -> PlaceKind {
        PlaceKind::new(
            &self.name,
            self.median,
            self.scatter,
            self.transmissivity,
        )
    }
}

/// Hours of the day, with an optional compliance probability.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ScheduleParameters {
    pub start: f64,
    pub end: f64,
    #[serde(default = "always")]
    pub compliance: f64,
}

fn always() -> f64 {
    1.0
}

impl ScheduleParameters {
    /// # Errors
    ///
    /// Returns `SimError::Validation` if the hours or compliance are out of
    /// range.
    pub fn to_schedule(&self) -> Result<Schedule, SimError> {
        Schedule::new(self.start, self.end - self.start, self.compliance)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct VisitParameters {
    /// Name of a place kind.
    pub kind: String,
    /// `None` marks the home.
    #[serde(default)]
    pub schedule: Option<ScheduleParameters>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RoleParameters {
    pub name: String,
    pub fraction: f64,
    pub places: Vec<VisitParameters>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Parameters {
    pub population: usize,
    pub initial_infected: usize,
    /// Length of the run in days.
    pub end_time: f64,
    pub disease: DiseaseParameters,
    pub place_kinds: Vec<PlaceKindParameters>,
    pub roles: Vec<RoleParameters>,
}

impl Parameters {
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON for
    /// `Parameters`. The result is not validated.
    pub fn from_json_file(path: &Path) -> Result<Parameters, SimError> {
        let text = fs::read_to_string(path)?;
        Parameters::from_json_str(&text)
    }

    /// # Errors
    ///
    /// Returns an error if `text` is not valid JSON for `Parameters`.
    pub fn from_json_str(text: &str) -> Result<Parameters, SimError> {
        Ok(serde_json::from_str(text)?)
    }

    #[must_use]
    pub fn end_time_hours(&self) -> f64 {
        self.end_time * HOURS_PER_DAY
    }

    /// Builds the role with place kinds numbered in `place_kinds` order,
    /// which is the order the model registers them in.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` if a place kind is unknown or a
    /// schedule is malformed.
    pub fn build_role(&self, role: &RoleParameters) -> Result<Role, SimError> {
        let mut problems = Vec::new();
        let mut built = Role::new(&role.name, role.fraction);
        for visit in &role.places {
            let Some(kind) = self.kind_index(&visit.kind) else {
                problems.push(format!(
                    "role `{}`: place kind `{}` is not defined",
                    role.name, visit.kind
                ));
                continue;
            };
            match visit.schedule.as_ref().map(ScheduleParameters::to_schedule) {
                None => built = built.with_home(kind),
                Some(Ok(schedule)) => built = built.with_visit(kind, schedule),
                Some(Err(SimError::Validation(errors))) => {
                    for error in errors {
                        problems.push(format!("role `{}` at `{}`: {error}", role.name, visit.kind));
                    }
                }
                Some(Err(error)) => problems.push(error.to_string()),
            }
        }
        if problems.is_empty() {
            Ok(built)
        } else {
            Err(SimError::Validation(problems))
        }
    }

    fn kind_index(&self, name: &str) -> Option<PlaceKindId> {
        self.place_kinds
            .iter()
            .position(|kind| kind.name == name)
            .map(PlaceKindId::new)
    }

    /// Checks the whole configuration.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` with every problem found.
    pub fn validate(&self) -> Result<(), SimError> {
        let mut problems = Vec::new();
        if self.population == 0 {
            problems.push("population must be positive".to_string());
        }
        if self.initial_infected > self.population {
            problems.push(format!(
                "initial infected {} exceeds population {}",
                self.initial_infected, self.population
            ));
        }
        if !(self.end_time > 0.0 && self.end_time.is_finite()) {
            problems.push(format!("end time {} must be positive", self.end_time));
        }
        for (stage, parameters) in self.disease.stages() {
            problems.extend(parameters.problems(stage));
        }

        let mut kind_names = HashSet::new();
        for kind in &self.place_kinds {
            if !kind_names.insert(kind.name.as_str()) {
                problems.push(format!("place kind `{}` is defined twice", kind.name));
            }
            if !(kind.median > 0.0 && kind.median.is_finite()) {
                problems.push(format!(
                    "place kind `{}`: median size {} must be positive",
                    kind.name, kind.median
                ));
            }
            if !(kind.scatter >= 0.0 && kind.scatter.is_finite()) {
                problems.push(format!(
                    "place kind `{}`: scatter {} is negative",
                    kind.name, kind.scatter
                ));
            }
            if !(kind.transmissivity >= 0.0 && kind.transmissivity.is_finite()) {
                problems.push(format!(
                    "place kind `{}`: transmissivity {} is negative",
                    kind.name, kind.transmissivity
                ));
            }
        }

        if self.roles.is_empty() {
            problems.push("no roles are defined".to_string());
        }
        let mut role_names = HashSet::new();
        for role in &self.roles {
            if !role_names.insert(role.name.as_str()) {
                problems.push(format!("role `{}` is defined twice", role.name));
            }
            match self.build_role(role) {
                Ok(built) => problems.extend(built.problems()),
                Err(SimError::Validation(errors)) => problems.extend(errors),
                Err(error) => problems.push(error.to_string()),
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(SimError::Validation(problems))
        }
    }
}

define_data_plugin!(ParametersPlugin, Option<Parameters>, None);

pub trait ContextParametersExt {
    /// Validates and stores the parameters.
    ///
    /// # Errors
    ///
    /// Returns `SimError::Validation` if the parameters are invalid; nothing
    /// is stored in that case.
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SimError>;

    /// Reads, validates and stores parameters from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed, or if the
    /// parameters are invalid.
    fn load_parameters_from_json(&mut self, path: &Path) -> Result<(), SimError>;

    fn get_parameters(&self) -> Option<&Parameters>;
}

impl ContextParametersExt for Context {
    fn set_parameters(&mut self, parameters: Parameters) -> Result<(), SimError> {
        parameters.validate()?;
        *self.get_data_container_mut(ParametersPlugin) = Some(parameters);
        Ok(())
    }

    fn load_parameters_from_json(&mut self, path: &Path) -> Result<(), SimError> {
        let parameters = Parameters::from_json_file(path)?;
        self.set_parameters(parameters)
    }

    fn get_parameters(&self) -> Option<&Parameters> {
        self.get_data_container(ParametersPlugin)?.as_ref()
    }
}
