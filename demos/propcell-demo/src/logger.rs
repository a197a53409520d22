use std::thread;

use chrono::{Local, NaiveDateTime};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};

/// One formatted log line.
struct LogLine<'a> {
    level: Level,
    timepoint: NaiveDateTime,
    module: &'a str,
    thread_name: Option<String>,
    message: String,
}

impl LogLine<'_> {
    fn render(&self) -> String {
        format!(
            "[{} {:<5} {} ({})] {}",
            self.timepoint.format("%H:%M:%S%.3f"),
            self.level,
            self.module,
            self.thread_name.as_deref().unwrap_or("<unnamed>"),
            self.message,
        )
    }
}

/// Prints every enabled record to stdout.
pub struct ConsoleLogger {
    level: LevelFilter,
}

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let line = LogLine {
            level: record.level(),
            timepoint: Local::now().naive_local(),
            module: record.module_path().unwrap_or("?"),
            thread_name: thread::current().name().map(str::to_owned),
            message: record.args().to_string(),
        };
        println!("{}", line.render());
    }

    fn flush(&self) {}
}

static LOGGER: ConsoleLogger = ConsoleLogger {
    level: LevelFilter::Debug,
};

pub fn init() -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(LOGGER.level);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::DemoError;

    #[test]
    fn renders_level_module_and_message() {
        let line = LogLine {
            level: Level::Warn,
            timepoint: NaiveDateTime::default(),
            module: "propcell::lazy",
            thread_name: None,
            message: "Producer for 'data_file' failed".to_string(),
        };
        assert_eq!(
            line.render(),
            "[00:00:00.000 WARN  propcell::lazy (<unnamed>)] Producer for 'data_file' failed"
        );
    }

    #[test]
    fn second_install_is_reported_through_demo_error() {
        let _ = init();
        let err = DemoError::from(init().unwrap_err());

        assert!(matches!(err, DemoError::Logger(_)));
        assert!(err.to_string().starts_with("logger already installed"));
    }

    #[test]
    fn filters_below_configured_level() {
        let logger = ConsoleLogger {
            level: LevelFilter::Info,
        };
        let trace = Metadata::builder().level(Level::Trace).build();
        let warn = Metadata::builder().level(Level::Warn).build();
        assert!(!logger.enabled(&trace));
        assert!(logger.enabled(&warn));
    }
}
