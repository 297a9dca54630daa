//! Service declarations and the respawn ledger

use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;
use alloc::vec::Vec;

use coop_process::{ChildInfo, Pid, Priority, ProcessError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ticks between service checks when the config does not say
pub const DEFAULT_CHECK_INTERVAL: u64 = 10;

/// Heap key under which Init keeps its ledger
pub const LEDGER_KEY: &str = "services";

/// One service Init keeps alive
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Registered process type
    #[serde(rename = "type")]
    pub kind: String,
    /// Requested priority (clamped by the scheduler)
    #[serde(default)]
    pub priority: Option<Priority>,
    /// Construction arguments
    #[serde(default)]
    pub args: Value,
    /// Ledger name. Defaults to the type, so two services of the same type
    /// need distinct names to be counted separately.
    #[serde(default)]
    pub name: Option<String>,
}

impl ServiceSpec {
    /// Service of `kind` with no arguments
    pub fn new(kind: &str) -> Self {
        Self {
            kind: kind.into(),
            priority: None,
            args: Value::Null,
            name: None,
        }
    }

    /// Set the requested priority
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set construction arguments
    pub fn args(mut self, args: Value) -> Self {
        self.args = args;
        self
    }

    /// Set the ledger name
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name this service is tracked under
    pub fn key(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.kind)
    }

    /// Whether a live child is an instance of this service
    fn matches(&self, child: &ChildInfo) -> bool {
        child.kind == self.kind && child.args == self.args
    }
}

/// What Init supervises and how often it looks
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InitConfig {
    /// Services to keep alive, in spawn order
    #[serde(default)]
    pub services: Vec<ServiceSpec>,
    /// Ticks to sleep between checks
    #[serde(default = "default_check_interval")]
    pub check_interval: u64,
}

fn default_check_interval() -> u64 {
    DEFAULT_CHECK_INTERVAL
}

impl Default for InitConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            check_interval: DEFAULT_CHECK_INTERVAL,
        }
    }
}

impl InitConfig {
    /// Config supervising `services` with the default interval
    pub fn with_services(services: Vec<ServiceSpec>) -> Self {
        Self {
            services,
            ..Self::default()
        }
    }

    /// Read a config from process arguments.
    ///
    /// Accepts a bare service list (`[{"type": ..}, ..]`) or a full config
    /// object. `null` means "no config given".
    pub fn from_args(args: &Value) -> Result<Option<Self>, ProcessError> {
        match args {
            Value::Null => Ok(None),
            Value::Array(_) => {
                let services = serde_json::from_value(args.clone())
                    .map_err(|e| ProcessError::new(format!("bad service list: {}", e)))?;
                Ok(Some(Self::with_services(services)))
            }
            Value::Object(_) => serde_json::from_value(args.clone())
                .map(Some)
                .map_err(|e| ProcessError::new(format!("bad init config: {}", e))),
            _ => Err(ProcessError::new("init args must be a list or object")),
        }
    }
}

/// Indices of services with no live child.
///
/// Each child satisfies at most one service, so two identical specs need
/// two identical children.
pub fn missing_services(specs: &[ServiceSpec], children: &BTreeMap<Pid, ChildInfo>) -> Vec<usize> {
    let mut unclaimed: Vec<&ChildInfo> = children.values().collect();
    let mut missing = Vec::new();
    for (index, spec) in specs.iter().enumerate() {
        match unclaimed.iter().position(|child| spec.matches(child)) {
            Some(at) => {
                unclaimed.remove(at);
            }
            None => missing.push(index),
        }
    }
    missing
}

/// Ledger entry for one service, persisted in Init's memory
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// PID of the most recent instance
    #[serde(default)]
    pub pid: Option<Pid>,
    /// Successful spawns so far
    #[serde(default)]
    pub spawns: u32,
    /// Why the last spawn was refused, cleared on success
    #[serde(default)]
    pub last_error: Option<String>,
}

impl ServiceRecord {
    /// Spawns after the first
    pub fn respawns(&self) -> u32 {
        self.spawns.saturating_sub(1)
    }
}

/// Persisted ledger: service name to record
pub type Ledger = BTreeMap<String, ServiceRecord>;

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;
    use alloc::vec;
    use serde_json::json;

    fn child(pid: u32, kind: &str, args: Value) -> (Pid, ChildInfo) {
        (
            Pid(pid),
            ChildInfo {
                pid: Pid(pid),
                kind: kind.to_string(),
                args,
                priority: None,
            },
        )
    }

    // ========================================================================
    // Config parsing
    // ========================================================================

    #[test]
    fn test_from_args_list() {
        let args = json!([{"type": "miner", "priority": 10}, {"type": "hauler", "args": {"room": "W1N1"}}]);
        let config = InitConfig::from_args(&args).unwrap().unwrap();

        assert_eq!(config.check_interval, DEFAULT_CHECK_INTERVAL);
        assert_eq!(config.services.len(), 2);
        assert_eq!(config.services[0], ServiceSpec::new("miner").priority(Priority(10)));
        assert_eq!(config.services[1].args, json!({"room": "W1N1"}));
    }

    #[test]
    fn test_from_args_object() {
        let args = json!({"services": [{"type": "miner", "name": "m1"}], "check_interval": 3});
        let config = InitConfig::from_args(&args).unwrap().unwrap();

        assert_eq!(config.check_interval, 3);
        assert_eq!(config.services[0].key(), "m1");
    }

    #[test]
    fn test_from_args_null_and_garbage() {
        assert_eq!(InitConfig::from_args(&Value::Null).unwrap(), None);
        assert!(InitConfig::from_args(&json!(7)).is_err());
        assert!(InitConfig::from_args(&json!([{"priority": 1}])).is_err());
    }

    // ========================================================================
    // Matching
    // ========================================================================

    #[test]
    fn test_missing_services() {
        let specs = vec![
            ServiceSpec::new("miner"),
            ServiceSpec::new("miner"),
            ServiceSpec::new("hauler").args(json!(1)),
        ];
        let children: BTreeMap<Pid, ChildInfo> = [
            child(4, "miner", Value::Null),
            child(5, "hauler", json!(2)),
        ]
        .into_iter()
        .collect();

        assert_eq!(missing_services(&specs, &children), vec![1, 2]);
    }

    #[test]
    fn test_respawns() {
        let mut record = ServiceRecord::default();
        assert_eq!(record.respawns(), 0);
        record.spawns = 3;
        assert_eq!(record.respawns(), 2);
    }
}
