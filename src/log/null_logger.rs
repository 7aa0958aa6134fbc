//! Stand-in used when the `logging` feature is off: nothing is printed, but
//! the level still gates the `log` macros.
use crate::log::{LevelFilter, LogConfiguration};

impl LogConfiguration {
    pub(super) fn apply(&mut self) {
        let most_verbose = self
            .module_levels
            .values()
            .copied()
            .fold(self.level, LevelFilter::max);
        log::set_max_level(most_verbose);
    }
}
