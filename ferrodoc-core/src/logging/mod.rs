//! Logger backend for the `log` facade
//!
//! The library itself only emits records through `log::debug!`, `log::info!`
//! and friends. Applications that do not bring their own logger can install
//! this one once at startup:
//!
//! ```rust,no_run
//! use ferrodoc_core::logging::{LoggingConfig, LogFormat};
//!
//! let config = LoggingConfig::production().with_context_field("service", "orders");
//! ferrodoc_core::logging::init_logging(&config)?;
//!
//! log::info!("Connected to database '{}'", "shop");
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod config;
pub mod formatter;

pub use config::{LogLevel, LogOutput, LoggingConfig};
pub use formatter::{LogEntry, LogFormat};

use std::io::Write;
use std::sync::{Arc, Once};

static INIT: Once = Once::new();

/// Install the Ferrodoc logger as the global `log` backend
///
/// Only the first call has an effect. A failure to install (another logger
/// is already registered) is reported by that first call.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let mut result = Ok(());
    INIT.call_once(|| {
        result = init_logging_internal(config);
    });
    result
}

fn init_logging_internal(config: &LoggingConfig) -> anyhow::Result<()> {
    let logger = FerrodocLogger::new(config.clone());
    log::set_boxed_logger(Box::new(logger))?;
    log::set_max_level(log::Level::from(config.level.clone()).to_level_filter());
    Ok(())
}

struct FerrodocLogger {
    config: LoggingConfig,
    writers: Vec<Arc<dyn LogWriter>>,
}

impl FerrodocLogger {
    fn new(config: LoggingConfig) -> Self {
        let mut writers: Vec<Arc<dyn LogWriter>> = Vec::new();

        for output in &config.outputs {
            let format = output.format().unwrap_or(&config.format).clone();
            match output {
                LogOutput::Stdout { .. } => writers.push(Arc::new(StdoutWriter { format })),
                LogOutput::Stderr { .. } => writers.push(Arc::new(StderrWriter { format })),
            }
        }

        if writers.is_empty() {
            writers.push(Arc::new(StdoutWriter { format: config.format.clone() }));
        }

        Self { config, writers }
    }
}

impl log::Log for FerrodocLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::Level::from(self.config.level.clone())
    }

    fn log(&self, record: &log::Record) {
        if !self.enabled(record.metadata()) {
            return;
        }

        let entry = LogEntry::from_log_record(record, &self.config);
        for writer in &self.writers {
            let _ = writer.write_log(&entry);
        }
    }

    fn flush(&self) {
        for writer in &self.writers {
            let _ = writer.flush();
        }
    }
}

trait LogWriter: Send + Sync {
    fn write_log(&self, entry: &LogEntry) -> anyhow::Result<()>;
    fn flush(&self) -> anyhow::Result<()>;
}

struct StdoutWriter {
    format: LogFormat,
}

impl LogWriter for StdoutWriter {
    fn write_log(&self, entry: &LogEntry) -> anyhow::Result<()> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{}", self.format.format_entry(entry))?;
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        std::io::stdout().flush()?;
        Ok(())
    }
}

struct StderrWriter {
    format: LogFormat,
}

impl LogWriter for StderrWriter {
    fn write_log(&self, entry: &LogEntry) -> anyhow::Result<()> {
        let mut err = std::io::stderr().lock();
        writeln!(err, "{}", self.format.format_entry(entry))?;
        Ok(())
    }

    fn flush(&self) -> anyhow::Result<()> {
        std::io::stderr().flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Log;

    #[test]
    fn test_logger_filters_by_level() {
        let logger = FerrodocLogger::new(LoggingConfig::default().with_level(LogLevel::Warn));
        let warn = log::Metadata::builder().level(log::Level::Warn).target("ferrodoc").build();
        let debug = log::Metadata::builder().level(log::Level::Debug).target("ferrodoc").build();

        assert!(logger.enabled(&warn));
        assert!(!logger.enabled(&debug));
    }

    #[test]
    fn test_logger_defaults_to_stdout() {
        let mut config = LoggingConfig::default();
        config.outputs.clear();
        let logger = FerrodocLogger::new(config);
        assert_eq!(logger.writers.len(), 1);
    }
}
