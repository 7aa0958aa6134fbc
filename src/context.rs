//! The `Context` owns simulated time, the event queue and every piece of
//! module-specific state (data plugins). Simulation modules extend it with
//! `Context*Ext` traits.
use std::any::{Any, TypeId};
use std::rc::Rc;

use crate::log::{debug, trace};
use crate::plan::Queue;
use crate::{HashMap, HashMapExt};

/// Marker trait for a type that owns a data container stored in `Context`.
pub trait DataPlugin: Any {
    type DataContainer;

    fn create_data_container() -> Self::DataContainer;
}

/// Defines a new data plugin type with a default value for its container.
#[macro_export]
macro_rules! define_data_plugin {
    ($plugin:ident, $data_container:ty, $default: expr) => {
        #[derive(Copy, Clone)]
        struct $plugin;

        impl $crate::context::DataPlugin for $plugin {
            type DataContainer = $data_container;

            fn create_data_container() -> Self::DataContainer {
                $default
            }
        }
    };
}
pub use define_data_plugin;

/// Orders plans scheduled for the same instant. All `First` plans run
/// before `Normal` plans, which run before `Last` plans. Within a phase,
/// plans run in the order they were added.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExecutionPhase {
    First,
    Normal,
    Last,
}

type Callback = dyn FnOnce(&mut Context);

pub struct Context {
    plan_queue: Queue<Box<Callback>, ExecutionPhase>,
    data_plugins: HashMap<TypeId, Box<dyn Any>>,
    current_time: f64,
    horizon: Option<f64>,
    shutdown_requested: bool,
}

impl Context {
    #[must_use]
    pub fn new() -> Context {
        Context {
            plan_queue: Queue::new(),
            data_plugins: HashMap::new(),
            current_time: 0.0,
            horizon: None,
            shutdown_requested: false,
        }
    }

    /// Adds a plan to run at `time` in the `Normal` phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is not finite or lies in the past.
    pub fn add_plan(&mut self, time: f64, callback: impl FnOnce(&mut Context) + 'static) {
        self.add_plan_with_phase(time, callback, ExecutionPhase::Normal);
    }

    /// Adds a plan to run at `time` in the given phase.
    ///
    /// # Panics
    ///
    /// Panics if `time` is not finite or lies in the past.
    pub fn add_plan_with_phase(
        &mut self,
        time: f64,
        callback: impl FnOnce(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            time.is_finite() && time >= self.current_time,
            "Time {time} is invalid (current time is {})",
            self.current_time
        );
        self.plan_queue.add_plan(time, Box::new(callback), phase);
    }

    /// Runs `callback` at `start` and then every `period` time units, as
    /// long as the next occurrence lies strictly before the simulation
    /// horizon. Without a horizon the recurrence stops once it is the only
    /// work left in the queue.
    ///
    /// # Panics
    ///
    /// Panics if `period` is not positive and finite.
    pub fn add_periodic_plan_with_phase(
        &mut self,
        start: f64,
        period: f64,
        callback: impl Fn(&mut Context) + 'static,
        phase: ExecutionPhase,
    ) {
        assert!(
            period > 0.0 && period.is_finite(),
            "Period {period} must be positive"
        );
        if self.within_horizon(start) {
            self.schedule_occurrence(start, period, Rc::new(callback), phase);
        }
    }

    fn schedule_occurrence(
        &mut self,
        time: f64,
        period: f64,
        callback: Rc<dyn Fn(&mut Context)>,
        phase: ExecutionPhase,
    ) {
        self.add_plan_with_phase(
            time,
            move |context| {
                callback(context);
                let next = time + period;
                let keep_going = match context.horizon {
                    Some(_) => context.within_horizon(next),
                    None => !context.plan_queue.is_empty(),
                };
                if keep_going {
                    context.schedule_occurrence(next, period, callback, phase);
                }
            },
            phase,
        );
    }

    fn within_horizon(&self, time: f64) -> bool {
        self.horizon.is_none_or(|horizon| time < horizon)
    }

    /// Schedules the end-of-simulation event. Every plan ordered after it
    /// is left unprocessed, and periodic plans stop recurring at `end_time`.
    pub fn shutdown_at(&mut self, end_time: f64) {
        self.horizon = Some(end_time);
        self.add_plan_with_phase(
            end_time,
            |context| {
                debug!("end of simulation at t={}", context.get_current_time());
                context.shutdown();
            },
            ExecutionPhase::Last,
        );
    }

    /// Requests that `execute` return once the current plan completes.
    pub fn shutdown(&mut self) {
        trace!("shutdown requested");
        self.shutdown_requested = true;
    }

    /// The end time given to `shutdown_at`, if any.
    #[must_use]
    pub fn get_horizon(&self) -> Option<f64> {
        self.horizon
    }

    pub fn get_data_container_mut<T: DataPlugin>(&mut self, _plugin: T) -> &mut T::DataContainer {
        self.data_plugins
            .entry(TypeId::of::<T>())
            .or_insert_with(|| Box::new(T::create_data_container()))
            .downcast_mut::<T::DataContainer>()
            .unwrap()
    }

    #[must_use]
    pub fn get_data_container<T: DataPlugin>(&self, _plugin: T) -> Option<&T::DataContainer> {
        self.data_plugins
            .get(&TypeId::of::<T>())
            .and_then(|container| container.downcast_ref::<T::DataContainer>())
    }

    #[must_use]
    pub fn get_current_time(&self) -> f64 {
        self.current_time
    }

    /// Runs plans in time order until the queue is empty or a shutdown
    /// has been requested.
    pub fn execute(&mut self) {
        while !self.shutdown_requested {
            match self.plan_queue.get_next_plan() {
                Some(plan) => {
                    self.current_time = plan.time;
                    (plan.data)(self);
                }
                None => break,
            }
        }
        debug!(
            "execution stopped at t={} with {} plans pending",
            self.current_time,
            self.plan_queue.len()
        );
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}
