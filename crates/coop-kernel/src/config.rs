//! Kernel configuration

use alloc::format;
use alloc::string::{String, ToString};

use coop_kernel_core::constants::MIN_PID_CEILING;
use coop_kernel_core::{DEFAULT_PID_CEILING, DEFAULT_ROOT_TYPE};
use serde::{Deserialize, Serialize};

use crate::error::KernelError;

/// Default number of syslog events kept in memory
pub const DEFAULT_SYSLOG_CAPACITY: usize = 1000;

/// Tunables for one kernel instance.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Registered type of the root process
    pub root_type: String,
    /// PIDs are allocated below this value
    pub pid_ceiling: u32,
    /// Quota headroom kept back from processes each tick
    pub cpu_reserve: f64,
    /// Syslog events kept before the oldest are dropped
    pub syslog_capacity: usize,
    /// Commit the process table at the end of every `run()`
    pub persist_every_tick: bool,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            root_type: DEFAULT_ROOT_TYPE.to_string(),
            pid_ceiling: DEFAULT_PID_CEILING,
            cpu_reserve: 0.0,
            syslog_capacity: DEFAULT_SYSLOG_CAPACITY,
            persist_every_tick: true,
        }
    }
}

impl KernelConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, KernelError> {
        let config: KernelConfig =
            serde_json::from_str(json).map_err(|e| KernelError::Config(format!("{}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the kernel cannot run with
    pub fn validate(&self) -> Result<(), KernelError> {
        if self.root_type.is_empty() {
            return Err(KernelError::Config("root_type must not be empty".to_string()));
        }
        if self.pid_ceiling < MIN_PID_CEILING {
            return Err(KernelError::Config(format!(
                "pid_ceiling must be at least {}",
                MIN_PID_CEILING
            )));
        }
        if self.cpu_reserve.is_nan() || self.cpu_reserve < 0.0 {
            return Err(KernelError::Config(
                "cpu_reserve must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_uses_defaults() {
        let config = KernelConfig::from_json("{}").unwrap();
        assert_eq!(config, KernelConfig::default());
        assert_eq!(config.root_type, "init");
        assert_eq!(config.pid_ceiling, 50_000);
        assert!(config.persist_every_tick);
    }

    #[test]
    fn test_partial_json() {
        let config = KernelConfig::from_json(r#"{"root_type":"boot","cpu_reserve":2.5}"#).unwrap();
        assert_eq!(config.root_type, "boot");
        assert_eq!(config.syslog_capacity, DEFAULT_SYSLOG_CAPACITY);
        assert!(config.cpu_reserve > 2.4 && config.cpu_reserve < 2.6);
    }

    #[test]
    fn test_invalid_config() {
        assert!(matches!(
            KernelConfig::from_json(r#"{"pid_ceiling":1}"#),
            Err(KernelError::Config(_))
        ));
        assert!(matches!(
            KernelConfig::from_json(r#"{"cpu_reserve":-1}"#),
            Err(KernelError::Config(_))
        ));
        assert!(matches!(
            KernelConfig::from_json("[1,2]"),
            Err(KernelError::Config(_))
        ));
    }
}
