//! Session configuration.

use std::time::Duration;

use oxo_types::ProgramId;

/// Default period of the keep-alive loop.
pub const DEFAULT_KEEP_ALIVE_PERIOD: Duration = Duration::from_millis(1000);

/// Default byte size requested for freshly allocated game records.
pub const RECORD_SPACE: usize = 256;

/// Configuration for a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity of the deployed game program.
    pub program: ProgramId,
    /// Period of the keep-alive loop.
    pub keep_alive_period: Duration,
    /// Bytes requested when allocating a fresh record.
    pub record_space: usize,
    /// Whether create/join/move submissions wait for ledger confirmation.
    /// Keep-alive sends never do.
    pub confirm_commands: bool,
}

impl SessionConfig {
    /// Create a configuration for the given game program.
    pub fn new(program: ProgramId) -> Self {
        Self {
            program,
            keep_alive_period: DEFAULT_KEEP_ALIVE_PERIOD,
            record_space: RECORD_SPACE,
            confirm_commands: true,
        }
    }

    /// Set the keep-alive period.
    pub fn with_keep_alive_period(mut self, period: Duration) -> Self {
        self.keep_alive_period = period;
        self
    }

    /// Set the record allocation size.
    pub fn with_record_space(mut self, space: usize) -> Self {
        self.record_space = space;
        self
    }

    /// Set whether submissions wait for confirmation.
    pub fn with_confirmation(mut self, confirm: bool) -> Self {
        self.confirm_commands = confirm;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = SessionConfig::new(ProgramId::random());
        assert_eq!(config.keep_alive_period, DEFAULT_KEEP_ALIVE_PERIOD);
        assert_eq!(config.record_space, RECORD_SPACE);
        assert!(config.confirm_commands);
    }

    #[test]
    fn builder_pattern() {
        let config = SessionConfig::new(ProgramId::random())
            .with_keep_alive_period(Duration::from_millis(50))
            .with_record_space(512)
            .with_confirmation(false);

        assert_eq!(config.keep_alive_period, Duration::from_millis(50));
        assert_eq!(config.record_space, 512);
        assert!(!config.confirm_commands);
    }
}
