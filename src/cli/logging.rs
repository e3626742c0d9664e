//! Console logger for the `log` records emitted by the library

use console::style;
use log::{Level, LevelFilter, Log, Metadata, Record};

/// Writes records to stderr with a styled level tag
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl ConsoleLogger {
    pub fn new(level: LevelFilter) -> Self {
        Self { level }
    }

    /// Install as the global logger. A second call is a no-op.
    pub fn install(level: LevelFilter) {
        if log::set_boxed_logger(Box::new(Self::new(level))).is_ok() {
            log::set_max_level(level);
        }
    }

    fn tag(level: Level) -> String {
        match level {
            Level::Error => style("error").red().bold().to_string(),
            Level::Warn => style("warn").yellow().bold().to_string(),
            Level::Info => style("info").blue().to_string(),
            Level::Debug => style("debug").dim().to_string(),
            Level::Trace => style("trace").dim().to_string(),
        }
    }
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("{} {}", Self::tag(record.level()), record.args());
    }

    fn flush(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enabled_respects_level() {
        let logger = ConsoleLogger::new(LevelFilter::Info);
        let info = Metadata::builder().level(Level::Info).build();
        let debug = Metadata::builder().level(Level::Debug).build();
        assert!(logger.enabled(&info));
        assert!(!logger.enabled(&debug));
    }
}
