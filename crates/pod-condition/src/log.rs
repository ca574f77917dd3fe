//! `log` contains the sink that receives what a check has to tell its caller.
//!
//! A check writes the standard error of the query process and the message of
//! any failure to launch it into a [`LogSink`]. The sink is supplied by the
//! caller, usually the build that evaluates the condition.
use tracing::info;

/// Receives diagnostic lines produced while evaluating a condition.
pub trait LogSink: Send {
    /// Record a single line. The line carries no trailing newline.
    fn log_line(&mut self, line: &str);
}

/// Collects lines in memory.
impl LogSink for Vec<String> {
    fn log_line(&mut self, line: &str) {
        self.push(line.to_owned());
    }
}

impl<S: LogSink + ?Sized> LogSink for &mut S {
    fn log_line(&mut self, line: &str) {
        (**self).log_line(line)
    }
}

/// Forwards every line as a `tracing` event.
#[derive(Clone, Debug)]
pub struct TracingSink {
    source: String,
}

impl TracingSink {
    /// Create a sink whose events are tagged with `source`.
    pub fn new(source: impl Into<String>) -> Self {
        TracingSink {
            source: source.into(),
        }
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        TracingSink::new("kubectl")
    }
}

impl LogSink for TracingSink {
    fn log_line(&mut self, line: &str) {
        info!(source = %self.source, "{}", line);
    }
}
