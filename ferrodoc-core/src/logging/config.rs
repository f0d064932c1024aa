//! Logger configuration

use crate::logging::LogFormat;
use std::collections::HashMap;
use std::str::FromStr;

/// How and where log records are written
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    /// Minimum level to capture
    pub level: LogLevel,
    pub outputs: Vec<LogOutput>,
    /// Format used by outputs that do not override it
    pub format: LogFormat,
    /// Fields added to every entry
    pub context_fields: HashMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            outputs: vec![LogOutput::Stdout { format: None }],
            format: LogFormat::Human,
            context_fields: HashMap::new(),
        }
    }
}

/// Log levels in order of severity
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<log::Level> for LogLevel {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => LogLevel::Error,
            log::Level::Warn => LogLevel::Warn,
            log::Level::Info => LogLevel::Info,
            log::Level::Debug => LogLevel::Debug,
            log::Level::Trace => LogLevel::Trace,
        }
    }
}

impl From<LogLevel> for log::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        log::Level::from_str(s).map(LogLevel::from).map_err(|_| format!("unknown log level: {}", s))
    }
}

/// Where log records are sent
#[derive(Clone, Debug, PartialEq)]
pub enum LogOutput {
    Stdout {
        /// Override the default format for this output
        format: Option<LogFormat>,
    },
    Stderr {
        /// Override the default format for this output
        format: Option<LogFormat>,
    },
}

impl LogOutput {
    pub fn format(&self) -> Option<&LogFormat> {
        match self {
            LogOutput::Stdout { format } | LogOutput::Stderr { format } => format.as_ref(),
        }
    }
}

impl LoggingConfig {
    /// JSON lines on stdout at info level
    pub fn production() -> Self {
        Self {
            level: LogLevel::Info,
            outputs: vec![LogOutput::Stdout { format: Some(LogFormat::Json) }],
            format: LogFormat::Json,
            context_fields: HashMap::new(),
        }
    }

    /// Human-readable output at debug level
    pub fn development() -> Self {
        Self {
            level: LogLevel::Debug,
            outputs: vec![LogOutput::Stdout { format: Some(LogFormat::Human) }],
            format: LogFormat::Human,
            context_fields: HashMap::new(),
        }
    }

    pub fn with_level(mut self, level: LogLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the default format; outputs with their own format keep it
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_context_field(mut self, key: &str, value: &str) -> Self {
        self.context_fields.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_stdout(mut self, format: LogFormat) -> Self {
        self.outputs.push(LogOutput::Stdout { format: Some(format) });
        self
    }

    pub fn with_stderr(mut self, format: LogFormat) -> Self {
        self.outputs.push(LogOutput::Stderr { format: Some(format) });
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        let production = LoggingConfig::production();
        assert_eq!(production.level, LogLevel::Info);
        assert_eq!(production.format, LogFormat::Json);

        let development = LoggingConfig::development();
        assert_eq!(development.level, LogLevel::Debug);
        assert_eq!(development.outputs[0].format(), Some(&LogFormat::Human));
    }

    #[test]
    fn test_builder_pattern() {
        let config = LoggingConfig::production()
            .with_stderr(LogFormat::Logfmt)
            .with_context_field("service", "test")
            .with_level(LogLevel::Trace);

        assert_eq!(config.level, LogLevel::Trace);
        assert_eq!(config.outputs.len(), 2);
        assert_eq!(config.context_fields.get("service"), Some(&"test".to_string()));
    }

    #[test]
    fn test_level_parsing() {
        assert_eq!("WARN".parse::<LogLevel>(), Ok(LogLevel::Warn));
        assert_eq!("debug".parse::<LogLevel>(), Ok(LogLevel::Debug));
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
