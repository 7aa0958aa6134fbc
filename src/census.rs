//! Daily population-by-state counts.
//!
//! A census is taken at time 0, every 24 hours after that, and once more at
//! the end of the run. Observers see the counts after every plan scheduled
//! for that instant has run.
use std::path::Path;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::context::{Context, ExecutionPhase};
use crate::disease::DiseaseState;
use crate::error::SimError;
use crate::population::{ContextPopulationExt, StateCounts};
use crate::report::ContextReportExt;
use crate::schedule::HOURS_PER_DAY;
use crate::{create_report_trait, define_data_plugin, info};

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Census {
    /// Time in days.
    pub day: f64,
    /// Time in hours.
    pub time: f64,
    pub counts: StateCounts,
}

type CensusObserver = Rc<dyn Fn(&Context, &Census)>;

define_data_plugin!(CensusPlugin, Vec<CensusObserver>, Vec::new());

pub trait ContextCensusExt {
    /// Registers a callback for every census.
    fn add_census_observer(&mut self, observer: impl Fn(&Context, &Census) + 'static);

    /// Counts the population now and hands the census to every observer.
    fn take_census(&mut self) -> Census;

    /// Schedules a census at time 0 and every day until `end_time`, plus a
    /// closing census at `end_time`. Call before `shutdown_at(end_time)` so
    /// that the closing census runs before the simulation stops.
    fn start_census(&mut self, end_time: f64);

    /// Writes every census to a CSV file at `path`.
    ///
    /// # Errors
    ///
    /// Returns a `SimError` if the report file cannot be created.
    fn add_census_report(&mut self, path: &Path) -> Result<(), SimError>;
}

impl ContextCensusExt for Context {
    fn add_census_observer(&mut self, observer: impl Fn(&Context, &Census) + 'static) {
        self.get_data_container_mut(CensusPlugin)
            .push(Rc::new(observer));
    }

    fn take_census(&mut self) -> Census {
        let time = self.get_current_time();
        let census = Census {
            day: time / HOURS_PER_DAY,
            time,
            counts: self.get_state_counts(),
        };
        info!(
            "day {}: {}",
            census.day,
            census
                .counts
                .iter()
                .map(|(state, count)| format!("{state}={count}"))
                .collect::<Vec<_>>()
                .join(" ")
        );
        let observers = self
            .get_data_container(CensusPlugin)
            .cloned()
            .unwrap_or_default();
        for observer in observers {
            observer(self, &census);
        }
        census
    }

    fn start_census(&mut self, end_time: f64) {
        let now = self.get_current_time();
        if end_time > now {
            self.add_plan_with_phase(
                end_time,
                |context| {
                    context.take_census();
                },
                ExecutionPhase::Last,
            );
        }
        self.add_periodic_plan_with_phase(
            now,
            HOURS_PER_DAY,
            |context| {
                context.take_census();
            },
            ExecutionPhase::Last,
        );
    }

    fn add_census_report(&mut self, path: &Path) -> Result<(), SimError> {
        self.add_report::<CensusRow>(path)?;
        self.add_census_observer(|context, census| {
            context.send_report(CensusRow::from(census));
        });
        Ok(())
    }
}

/// One line of the census CSV report.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq)]
pub struct CensusRow {
    pub day: f64,
    pub uninfected: usize,
    pub latent: usize,
    pub asymptomatic: usize,
    pub symptomatic: usize,
    pub bedridden: usize,
    pub recovered: usize,
    pub dead: usize,
}

create_report_trait!(CensusRow);

impl From<&Census> for CensusRow {
    fn from(census: &Census) -> CensusRow {
        let counts = census.counts;
        CensusRow {
            day: census.day,
            uninfected: counts[DiseaseState::Uninfected],
            latent: counts[DiseaseState::Latent],
            asymptomatic: counts[DiseaseState::Asymptomatic],
            symptomatic: counts[DiseaseState::Symptomatic],
            bedridden: counts[DiseaseState::Bedridden],
            recovered: counts[DiseaseState::Recovered],
            dead: counts[DiseaseState::Dead],
        }
    }
}

#[cfg(test)]
#[allow(clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::roles::RoleId;
    use std::cell::RefCell;

    fn record(context: &mut Context) -> Rc<RefCell<Vec<Census>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        context.add_census_observer(move |_, census| sink.borrow_mut().push(*census));
        seen
    }

    #[test]
    fn daily_and_closing_census() {
        let mut context = Context::new();
        context.add_agent(RoleId::new(0));
        let seen = record(&mut context);
        context.start_census(60.0);
        context.shutdown_at(60.0);
        context.execute();

        let times: Vec<f64> = seen.borrow().iter().map(|census| census.time).collect();
        assert_eq!(times, vec![0.0, 24.0, 48.0, 60.0]);
        assert_eq!(seen.borrow()[3].day, 2.5);
        assert!(seen.borrow().iter().all(|census| census.counts.total() == 1));
    }

    #[test]
    fn no_duplicate_census_on_a_day_boundary() {
        let mut context = Context::new();
        let seen = record(&mut context);
        context.start_census(48.0);
        context.shutdown_at(48.0);
        context.execute();
        let times: Vec<f64> = seen.borrow().iter().map(|census| census.time).collect();
        assert_eq!(times, vec![0.0, 24.0, 48.0]);
    }

    #[test]
    fn census_sees_the_end_of_the_instant() {
        let mut context = Context::new();
        let agent = context.add_agent(RoleId::new(0));
        let seen = record(&mut context);
        context.start_census(30.0);
        context.add_plan(24.0, move |context| {
            context.set_disease_state(agent, DiseaseState::Latent);
        });
        context.shutdown_at(30.0);
        context.execute();
        let day_one = seen.borrow()[1];
        assert_eq!(day_one.counts[DiseaseState::Latent], 1);
        assert_eq!(day_one.counts[DiseaseState::Uninfected], 0);
    }

    #[test]
    fn writes_csv_rows() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("census.csv");
        let mut context = Context::new();
        for _ in 0..3 {
            context.add_agent(RoleId::new(0));
        }
        context.add_census_report(&path).unwrap();
        context.start_census(36.0);
        context.shutdown_at(36.0);
        context.execute();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(
            headers.iter().collect::<Vec<_>>(),
            vec![
                "day",
                "uninfected",
                "latent",
                "asymptomatic",
                "symptomatic",
                "bedridden",
                "recovered",
                "dead"
            ]
        );
        let rows: Vec<CensusRow> = reader.deserialize().map(Result::unwrap).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].day, 1.5);
        assert!(rows.iter().all(|row| row.uninfected == 3));
    }
}
