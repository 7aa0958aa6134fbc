//! Diagnostic logging for the simulator itself. Model output (the census)
//! goes through `crate::report`, not through here.
//!
//! The five `log` macros are re-exported. Event handlers log at `trace`,
//! model construction at `debug`, and run milestones at `info`.
//!
//! Logging starts switched off. Turn it on with the runner's `--log-level`
//! flag or from code, optionally with per-module levels:
//!
//! ```rust
//! use episim::log::{set_log_level, set_module_filter, LevelFilter};
//!
//! set_log_level(LevelFilter::Info);
//! set_module_filter("episim::contagion", LevelFilter::Trace);
//! ```
#[cfg(feature = "logging")]
mod standard_logger;

#[cfg(not(feature = "logging"))]
mod null_logger;

use std::sync::{LazyLock, Mutex, MutexGuard};

pub use log::{debug, error, info, trace, warn, LevelFilter};
#[cfg(feature = "logging")]
use log4rs::Handle;

use crate::{HashMap, HashMapExt};

/// The installed logger and the levels it filters by. There is one per
/// process; the free functions below lock it and reconfigure the logger.
struct LogConfiguration {
    level: LevelFilter,
    /// Module path to the level used for it and its submodules.
    module_levels: HashMap<String, LevelFilter>,
    #[cfg(feature = "logging")]
    handle: Option<Handle>,
}

impl Default for LogConfiguration {
    fn default() -> Self {
        LogConfiguration {
            level: LevelFilter::Off,
            module_levels: HashMap::new(),
            #[cfg(feature = "logging")]
            handle: None,
        }
    }
}

static LOG_CONFIGURATION: LazyLock<Mutex<LogConfiguration>> = LazyLock::new(Mutex::default);

fn log_configuration() -> MutexGuard<'static, LogConfiguration> {
    LOG_CONFIGURATION
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Logs everything. Same as `set_log_level(LevelFilter::Trace)`.
pub fn enable_logging() {
    set_log_level(LevelFilter::Trace);
}

/// Logs nothing. Same as `set_log_level(LevelFilter::Off)`.
pub fn disable_logging() {
    set_log_level(LevelFilter::Off);
}

/// Sets the level for every module without its own filter.
pub fn set_log_level(level: LevelFilter) {
    let mut configuration = log_configuration();
    configuration.level = level;
    configuration.apply();
}

/// Sets the level for one module path, e.g. `"episim::disease"`.
pub fn set_module_filter(module_path: &str, level: LevelFilter) {
    set_module_filters(&[(module_path, level)]);
}

/// Sets several module levels with a single reconfiguration.
pub fn set_module_filters(module_filters: &[(&str, LevelFilter)]) {
    let mut configuration = log_configuration();
    let mut changed = false;
    for (module_path, level) in module_filters {
        let previous = configuration
            .module_levels
            .insert((*module_path).to_string(), *level);
        changed |= previous != Some(*level);
    }
    if changed {
        configuration.apply();
    }
}

/// Returns the module to the global level.
pub fn remove_module_filter(module_path: &str) {
    let mut configuration = log_configuration();
    if configuration.module_levels.remove(module_path).is_some() {
        configuration.apply();
    }
}
