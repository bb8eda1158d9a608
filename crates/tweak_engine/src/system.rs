//! System Probe / System Mutator abstraction.
//!
//! The engine only talks to the OS through these two traits. Production code
//! uses `WindowsSystem` (shell-backed); tests use `FakeSystem`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tweak_common::{
    MutationError, ProbeError, RegValueType, ServiceAction, ServiceStatus, StartupType,
};

/// A registry value as read from the live system
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryValue {
    /// Data rendered as a string; DWORD/QWORD in decimal
    pub value: String,
    pub value_type: RegValueType,
}

/// Run state and start type of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceState {
    pub status: ServiceStatus,
    pub startup_type: StartupType,
}

impl ServiceState {
    /// Service tweaks count as applied when the service is disabled or merely stopped
    pub fn counts_as_disabled(&self) -> bool {
        self.startup_type == StartupType::Disabled || self.status == ServiceStatus::Stopped
    }

    /// Live value shown for service tweaks, e.g. `Stopped/Manual`
    pub fn display_value(&self) -> String {
        format!("{}/{}", self.status, self.startup_type)
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == 0
    }
}

/// Read-only queries against live OS state
#[async_trait]
pub trait SystemProbe: Send + Sync {
    /// Read `key` under registry `path`
    async fn probe_registry(&self, path: &str, key: &str) -> Result<RegistryValue, ProbeError>;

    /// Read status and start type of service `name`
    async fn probe_service(&self, name: &str) -> Result<ServiceState, ProbeError>;
}

/// Writes against live OS state
#[async_trait]
pub trait SystemMutator: Send + Sync {
    async fn write_registry(
        &self,
        path: &str,
        key: &str,
        value: &str,
        value_type: RegValueType,
    ) -> Result<(), MutationError>;

    /// Set the start type of service `name`, then stop or start it per `action.kind`
    async fn set_service_startup(
        &self,
        name: &str,
        action: ServiceAction,
    ) -> Result<(), MutationError>;

    /// Run an arbitrary command through the configured shell
    async fn run_command(&self, command: &str) -> Result<CommandOutput, MutationError>;
}
