//! Roles group agents that share a routine: the kinds of places they belong
//! to and when they visit them. Every role has exactly one home kind (the
//! entry without a schedule).
use crate::context::Context;
use crate::error::SimError;
use crate::places::{ContextPlacesExt, PlaceKindId};
use crate::schedule::Schedule;
use crate::{debug, define_data_plugin};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoleId(usize);

impl RoleId {
    #[must_use]
    pub fn new(index: usize) -> RoleId {
        RoleId(index)
    }

    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RoleEntry {
    pub kind: PlaceKindId,
    pub schedule: Option<Schedule>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Role {
    pub name: String,
    /// Relative share of the population; normalized over all roles.
    pub fraction: f64,
    pub entries: Vec<RoleEntry>,
}

impl Role {
    #[must_use]
    pub fn new(name: &str, fraction: f64) -> Role {
        Role {
            name: name.to_string(),
            fraction,
            entries: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_home(mut self, kind: PlaceKindId) -> Role {
        self.entries.push(RoleEntry {
            kind,
            schedule: None,
        });
        self
    }

    #[must_use]
    pub fn with_visit(mut self, kind: PlaceKindId, schedule: Schedule) -> Role {
        self.entries.push(RoleEntry {
            kind,
            schedule: Some(schedule),
        });
        self
    }

    #[must_use]
    pub fn home_kind(&self) -> Option<PlaceKindId> {
        self.entries
            .iter()
            .find(|entry| entry.schedule.is_none())
            .map(|entry| entry.kind)
    }

    /// Every structural problem with the role.
    #[must_use]
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        if !(self.fraction > 0.0 && self.fraction.is_finite()) {
            problems.push(format!(
                "role `{}`: fraction {} must be positive",
                self.name, self.fraction
            ));
        }
        let homes = self
            .entries
            .iter()
            .filter(|entry| entry.schedule.is_none())
            .count();
        match homes {
            0 => problems.push(format!("role `{}`: no home", self.name)),
            1 => {}
            _ => problems.push(format!("role `{}`: more than one home", self.name)),
        }
        for (index, entry) in self.entries.iter().enumerate() {
            for earlier in &self.entries[..index] {
                if earlier.kind == entry.kind {
                    problems.push(format!(
                        "role `{}`: {:?} is listed twice",
                        self.name, entry.kind
                    ));
                } else if let (Some(earlier_schedule), Some(schedule)) =
                    (earlier.schedule, entry.schedule)
                {
                    if earlier_schedule.overlaps(&schedule) {
                        problems.push(format!(
                            "role `{}`: {schedule} overlaps {earlier_schedule}",
                            self.name
                        ));
                    }
                }
            }
        }
        problems
    }
}

define_data_plugin!(RolesPlugin, Vec<Role>, Vec::new());

pub trait ContextRolesExt {
    /// # Errors
    ///
    /// Returns `SimError::Validation` if the role is malformed or refers
    /// to a place kind that was never added.
    fn add_role(&mut self, role: Role) -> Result<RoleId, SimError>;

    /// # Panics
    ///
    /// Panics if the role does not exist.
    fn get_role(&self, role_id: RoleId) -> &Role;

    fn get_role_count(&self) -> usize;

    fn find_role(&self, name: &str) -> Option<RoleId>;
}

impl ContextRolesExt for Context {
    fn add_role(&mut self, role: Role) -> Result<RoleId, SimError> {
        let mut problems = role.problems();
        let kind_count = self.get_place_kind_count();
        for entry in &role.entries {
            if entry.kind.index() >= kind_count {
                problems.push(format!(
                    "role `{}`: {:?} does not exist",
                    role.name, entry.kind
                ));
            }
        }
        if self.find_role(&role.name).is_some() {
            problems.push(format!("role `{}` is defined twice", role.name));
        }
        if !problems.is_empty() {
            return Err(SimError::Validation(problems));
        }
        let roles = self.get_data_container_mut(RolesPlugin);
        let role_id = RoleId(roles.len());
        debug!("role `{}` registered as {role_id:?}", role.name);
        roles.push(role);
        Ok(role_id)
    }

    fn get_role(&self, role_id: RoleId) -> &Role {
        self.get_data_container(RolesPlugin)
            .and_then(|roles| roles.get(role_id.0))
            .unwrap_or_else(|| panic!("{role_id:?} does not exist"))
    }

    fn get_role_count(&self) -> usize {
        self.get_data_container(RolesPlugin).map_or(0, Vec::len)
    }

    fn find_role(&self, name: &str) -> Option<RoleId> {
        self.get_data_container(RolesPlugin)?
            .iter()
            .position(|role| role.name == name)
            .map(RoleId)
    }
}
