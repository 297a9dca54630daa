//! Centralized constants for the supervisor crate

/// Built-in process type that hibernates forever. Useful as a placeholder
/// service and for exercising the kernel from the host.
pub const IDLE_TYPE: &str = "idle";

/// Host object method returning the current tick
pub const HOST_TIME: &str = "time";

/// Host object method returning the CPU budget left this tick
pub const HOST_CPU_REMAINING: &str = "cpuRemaining";

/// Host object method returning the stored image (string, or null if none)
pub const HOST_LOAD: &str = "load";

/// Host object method taking the image string to store
pub const HOST_STORE: &str = "store";

/// Every method a host object must provide
pub const HOST_METHODS: [&str; 4] = [HOST_TIME, HOST_CPU_REMAINING, HOST_LOAD, HOST_STORE];
