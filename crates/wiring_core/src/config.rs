//! Registry configuration.

/// Configuration for a [`Registry`](crate::Registry).
#[derive(Debug, Clone)]
pub struct Config {
    /// Initial `next_id` of every table the registry creates.
    pub first_row_id: u64,

    /// Whether `get`/`get_many` append read events to the history.
    pub audit_reads: bool,

    /// Number of events the history pre-allocates room for.
    pub history_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            first_row_id: 0,
            audit_reads: true,
            history_capacity: 1024,
        }
    }
}

impl Config {
    /// Creates a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the first id handed out by new tables.
    #[must_use]
    pub const fn first_row_id(mut self, value: u64) -> Self {
        self.first_row_id = value;
        self
    }

    /// Sets whether reads are recorded in the history.
    #[must_use]
    pub const fn audit_reads(mut self, value: bool) -> Self {
        self.audit_reads = value;
        self
    }

    /// Sets the pre-allocated history capacity.
    #[must_use]
    pub const fn history_capacity(mut self, value: usize) -> Self {
        self.history_capacity = value;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.first_row_id, 0);
        assert!(config.audit_reads);
        assert_eq!(config.history_capacity, 1024);
    }

    #[test]
    fn builder_pattern() {
        let config = Config::new()
            .first_row_id(1000)
            .audit_reads(false)
            .history_capacity(16);

        assert_eq!(config.first_row_id, 1000);
        assert!(!config.audit_reads);
        assert_eq!(config.history_capacity, 16);
    }
}
