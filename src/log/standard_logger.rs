use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Config;

use crate::log::LogConfiguration;

// Wall-clock timestamp, colored level, module path.
const LOG_PATTERN: &str = "{d(%Y-%m-%dT%H:%M:%S)} {h({l})} {t} - {m}{n}";

impl LogConfiguration {
    /// Installs the logger, or swaps the configuration of the installed one.
    pub(super) fn apply(&mut self) {
        let stderr = ConsoleAppender::builder()
            .target(Target::Stderr)
            .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
            .build();
        let loggers = self
            .module_levels
            .iter()
            .map(|(module_path, level)| Logger::builder().build(module_path.clone(), *level));
        let config = Config::builder()
            .appender(Appender::builder().build("stderr", Box::new(stderr)))
            .loggers(loggers)
            .build(Root::builder().appender("stderr").build(self.level))
            .unwrap_or_else(|error| panic!("invalid logging configuration: {error}"));

        match &self.handle {
            Some(handle) => handle.set_config(config),
            None => match log4rs::init_config(config) {
                Ok(handle) => self.handle = Some(handle),
                // Another logger owns the process; leave it alone.
                Err(error) => eprintln!("episim logging unavailable: {error}"),
            },
        }
    }
}
