//! Kernel error types

use alloc::string::String;
use core::fmt;

use coop_hal::HostError;
use coop_kernel_core::TableError;

/// Errors surfaced by kernel operations
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum KernelError {
    /// The configured root type has no factory in the registry
    RootTypeNotRegistered(String),
    /// A process type has no factory in the registry
    UnknownProcessType(String),
    /// Process table operation failed
    Table(TableError),
    /// Host storage failed
    Host(HostError),
    /// Configuration rejected
    Config(String),
}

impl fmt::Display for KernelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KernelError::RootTypeNotRegistered(kind) => {
                write!(f, "root type {} is not registered", kind)
            }
            KernelError::UnknownProcessType(kind) => write!(f, "unknown process type {}", kind),
            KernelError::Table(e) => write!(f, "{}", e),
            KernelError::Host(e) => write!(f, "{}", e),
            KernelError::Config(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl From<TableError> for KernelError {
    fn from(e: TableError) -> Self {
        KernelError::Table(e)
    }
}

impl From<HostError> for KernelError {
    fn from(e: HostError) -> Self {
        KernelError::Host(e)
    }
}
