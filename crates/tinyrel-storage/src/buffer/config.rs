//! Buffer pool configuration.

use serde::{Deserialize, Serialize};
use tinyrel_common::constants::PAGE_SIZE;

/// Default number of frames when none is specified.
pub const DEFAULT_NUM_BUFS: usize = 100;

/// Configuration for the buffer pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BufPoolConfig {
    /// Number of page frames in the pool.
    pub num_bufs: usize,
}

impl BufPoolConfig {
    /// Creates a configuration with the given frame count.
    pub fn new(num_bufs: usize) -> Self {
        Self { num_bufs }
    }

    /// Creates a configuration from a memory budget in bytes.
    pub fn from_memory_size(memory_bytes: usize) -> Self {
        Self::new((memory_bytes / PAGE_SIZE).max(1))
    }

    /// Returns the total frame memory the pool will allocate.
    pub fn memory_usage(&self) -> usize {
        self.num_bufs * PAGE_SIZE
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.num_bufs == 0 {
            return Err("num_bufs must be > 0");
        }
        Ok(())
    }
}

impl Default for BufPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_BUFS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new() {
        let config = BufPoolConfig::new(10);
        assert_eq!(config.num_bufs, 10);
        assert!(config.validate().is_ok());
        assert_eq!(config.memory_usage(), 10 * PAGE_SIZE);
    }

    #[test]
    fn test_config_from_memory() {
        let config = BufPoolConfig::from_memory_size(64 * PAGE_SIZE);
        assert_eq!(config.num_bufs, 64);

        // A tiny budget still yields one frame.
        let config = BufPoolConfig::from_memory_size(1);
        assert_eq!(config.num_bufs, 1);
    }

    #[test]
    fn test_validation() {
        assert!(BufPoolConfig::new(0).validate().is_err());
        assert!(BufPoolConfig::default().validate().is_ok());
    }
}
