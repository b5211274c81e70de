//! Output channel bridge
//!
//! Extension logs are forwarded to a host output panel tagged with a
//! severity and the `extensions` channel. The host IDE implements
//! [`OutputChannel`]; [`TracingOutputChannel`] is the default bridge that
//! routes everything through `tracing`.

use serde::{Deserialize, Serialize};
use std::sync::Mutex;
use tracing::{error, info, warn};

/// Channel name used for extension output
pub const EXTENSIONS_CHANNEL: &str = "extensions";

/// Severity of a forwarded log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogSeverity {
    Info,
    Warn,
    Error,
}

/// Sink for extension log output
pub trait OutputChannel: Send + Sync {
    /// Append a message to the named channel.
    fn append(&self, message: &str, severity: LogSeverity, channel: &str);
}

/// Default channel that forwards to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingOutputChannel;

impl OutputChannel for TracingOutputChannel {
    fn append(&self, message: &str, severity: LogSeverity, channel: &str) {
        match severity {
            LogSeverity::Info => info!(channel, "{}", message),
            LogSeverity::Warn => warn!(channel, "{}", message),
            LogSeverity::Error => error!(channel, "{}", message),
        }
    }
}

/// In-memory channel capturing output for assertions
#[derive(Debug, Default)]
pub struct MemoryOutputChannel {
    entries: Mutex<Vec<(String, LogSeverity, String)>>,
}

impl MemoryOutputChannel {
    /// Create an empty channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Captured `(message, severity, channel)` entries.
    pub fn entries(&self) -> Vec<(String, LogSeverity, String)> {
        self.entries.lock().expect("output channel poisoned").clone()
    }
}

impl OutputChannel for MemoryOutputChannel {
    fn append(&self, message: &str, severity: LogSeverity, channel: &str) {
        self.entries
            .lock()
            .expect("output channel poisoned")
            .push((message.to_string(), severity, channel.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_channel_captures() {
        let channel = MemoryOutputChannel::new();
        channel.append("hello", LogSeverity::Warn, EXTENSIONS_CHANNEL);
        let entries = channel.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].0, "hello");
        assert_eq!(entries[0].1, LogSeverity::Warn);
        assert_eq!(entries[0].2, "extensions");
    }
}
