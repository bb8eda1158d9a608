//! In-memory fake system for deterministic testing.
//!
//! Holds a tiny registry and service table, implements both `SystemProbe`
//! and `SystemMutator`, and lets tests inject failures, hangs and delays
//! without touching the real OS.
//!
//! ```rust,ignore
//! let fake = Arc::new(
//!     FakeSystem::new()
//!         .with_registry(r"HKCU\System\GameConfigStore", "GameDVR_Enabled", "1", RegValueType::Dword)
//!         .with_service("SysMain", ServiceStatus::Running, StartupType::Automatic),
//! );
//! ```

use crate::parsers::normalize_key_path;
use crate::system::{CommandOutput, RegistryValue, ServiceState, SystemMutator, SystemProbe};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tweak_common::{
    MutationError, ProbeError, RegValueType, ServiceAction, ServiceActionKind, ServiceStatus,
    StartupType,
};

/// How long a "hanging" call sleeps; always longer than any test timeout
const HANG: Duration = Duration::from_secs(3600);

/// A mutation the fake received, in call order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedMutation {
    WriteRegistry {
        path: String,
        key: String,
        value: String,
        value_type: RegValueType,
    },
    SetService {
        name: String,
        action: ServiceAction,
    },
    RunCommand(String),
}

/// Effect a fake command has on the service table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandEffect {
    pub service: String,
    pub state: ServiceState,
}

#[derive(Default)]
struct FakeState {
    registry: HashMap<String, RegistryValue>,
    services: HashMap<String, ServiceState>,
    command_effects: HashMap<String, CommandEffect>,
    failing_probes: HashSet<String>,
    hanging_probes: HashSet<String>,
    failing_mutations: HashSet<String>,
    hanging_mutations: HashSet<String>,
    probe_delay: Duration,
    probe_calls: HashMap<String, usize>,
    mutations: Vec<RecordedMutation>,
}

/// Fake registry + service manager
#[derive(Default)]
pub struct FakeSystem {
    state: Mutex<FakeState>,
}

fn registry_key(path: &str, key: &str) -> String {
    format!("{}\\{}", normalize_key_path(path), key).to_lowercase()
}

fn service_key(name: &str) -> String {
    format!("service:{}", name.to_lowercase())
}

impl FakeSystem {
    /// Empty system: every probe reports not-found
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    // ------------------------------------------------------------------
    // Builder-style setup
    // ------------------------------------------------------------------

    pub fn with_registry(self, path: &str, key: &str, value: &str, value_type: RegValueType) -> Self {
        self.set_registry(path, key, value, value_type);
        self
    }

    pub fn with_service(self, name: &str, status: ServiceStatus, startup_type: StartupType) -> Self {
        self.set_service(name, status, startup_type);
        self
    }

    /// Running `command` changes `service` to `state`
    pub fn with_command_effect(self, command: &str, service: &str, state: ServiceState) -> Self {
        self.lock().command_effects.insert(
            command.to_string(),
            CommandEffect {
                service: service.to_string(),
                state,
            },
        );
        self
    }

    /// Registry probe for `path\key` returns a `ProbeError::Failed`
    pub fn failing_registry(self, path: &str, key: &str) -> Self {
        self.lock().failing_probes.insert(registry_key(path, key));
        self
    }

    /// Service probe for `name` returns a `ProbeError::Failed`
    pub fn failing_service(self, name: &str) -> Self {
        self.lock().failing_probes.insert(service_key(name));
        self
    }

    /// Registry probe for `path\key` never returns
    pub fn hanging_registry(self, path: &str, key: &str) -> Self {
        self.lock().hanging_probes.insert(registry_key(path, key));
        self
    }

    /// Service probe for `name` never returns
    pub fn hanging_service(self, name: &str) -> Self {
        self.lock().hanging_probes.insert(service_key(name));
        self
    }

    /// Mutations targeting `target` fail. Target is `path\key`, a service name or command text.
    pub fn failing_mutation(self, target: &str) -> Self {
        self.lock().failing_mutations.insert(target.to_lowercase());
        self
    }

    /// Mutations targeting `target` never return
    pub fn hanging_mutation(self, target: &str) -> Self {
        self.lock().hanging_mutations.insert(target.to_lowercase());
        self
    }

    // ------------------------------------------------------------------
    // Runtime control
    // ------------------------------------------------------------------

    /// Change a registry value behind the engine's back
    pub fn set_registry(&self, path: &str, key: &str, value: &str, value_type: RegValueType) {
        self.lock().registry.insert(
            registry_key(path, key),
            RegistryValue {
                value: value.to_string(),
                value_type,
            },
        );
    }

    pub fn remove_registry(&self, path: &str, key: &str) {
        self.lock().registry.remove(&registry_key(path, key));
    }

    pub fn set_service(&self, name: &str, status: ServiceStatus, startup_type: StartupType) {
        self.lock().services.insert(
            name.to_lowercase(),
            ServiceState {
                status,
                startup_type,
            },
        );
    }

    /// Delay applied to every probe started after this call
    pub fn set_probe_delay(&self, delay: Duration) {
        self.lock().probe_delay = delay;
    }

    // ------------------------------------------------------------------
    // Assertions
    // ------------------------------------------------------------------

    pub fn registry_value(&self, path: &str, key: &str) -> Option<String> {
        self.lock()
            .registry
            .get(&registry_key(path, key))
            .map(|v| v.value.clone())
    }

    pub fn service_state(&self, name: &str) -> Option<ServiceState> {
        self.lock().services.get(&name.to_lowercase()).copied()
    }

    /// Number of probe calls for `path\key`
    pub fn registry_probe_count(&self, path: &str, key: &str) -> usize {
        self.lock()
            .probe_calls
            .get(&registry_key(path, key))
            .copied()
            .unwrap_or(0)
    }

    pub fn service_probe_count(&self, name: &str) -> usize {
        self.lock()
            .probe_calls
            .get(&service_key(name))
            .copied()
            .unwrap_or(0)
    }

    pub fn total_probe_calls(&self) -> usize {
        self.lock().probe_calls.values().sum()
    }

    pub fn mutations(&self) -> Vec<RecordedMutation> {
        self.lock().mutations.clone()
    }

    pub fn mutation_count(&self) -> usize {
        self.lock().mutations.len()
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Record a probe call; returns (should_fail, should_hang, delay)
    fn begin_probe(&self, probe_key: &str) -> (bool, bool, Duration) {
        let mut state = self.lock();
        *state.probe_calls.entry(probe_key.to_string()).or_insert(0) += 1;
        (
            state.failing_probes.contains(probe_key),
            state.hanging_probes.contains(probe_key),
            state.probe_delay,
        )
    }

    /// Record a mutation; returns (should_fail, should_hang)
    fn begin_mutation(&self, target: &str, mutation: RecordedMutation) -> (bool, bool) {
        let mut state = self.lock();
        state.mutations.push(mutation);
        let target = target.to_lowercase();
        (
            state.failing_mutations.contains(&target),
            state.hanging_mutations.contains(&target),
        )
    }

    async fn gate_probe(&self, probe_key: &str) -> Result<(), ProbeError> {
        let (fail, hang, delay) = self.begin_probe(probe_key);
        if hang {
            tokio::time::sleep(HANG).await;
        }
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(ProbeError::Failed(format!("injected failure for {}", probe_key)));
        }
        Ok(())
    }

    async fn gate_mutation(
        &self,
        target: &str,
        command: String,
        mutation: RecordedMutation,
    ) -> Result<(), MutationError> {
        let (fail, hang) = self.begin_mutation(target, mutation);
        if hang {
            tokio::time::sleep(HANG).await;
        }
        if fail {
            return Err(MutationError::CommandFailed {
                command,
                code: 1,
                stderr: "Access is denied.".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SystemProbe for FakeSystem {
    async fn probe_registry(&self, path: &str, key: &str) -> Result<RegistryValue, ProbeError> {
        let probe_key = registry_key(path, key);
        self.gate_probe(&probe_key).await?;
        self.lock()
            .registry
            .get(&probe_key)
            .cloned()
            .ok_or_else(|| ProbeError::NotFound(format!("{}\\{}", path, key)))
    }

    async fn probe_service(&self, name: &str) -> Result<ServiceState, ProbeError> {
        self.gate_probe(&service_key(name)).await?;
        self.lock()
            .services
            .get(&name.to_lowercase())
            .copied()
            .ok_or_else(|| ProbeError::NotFound(format!("service {}", name)))
    }
}

#[async_trait]
impl SystemMutator for FakeSystem {
    async fn write_registry(
        &self,
        path: &str,
        key: &str,
        value: &str,
        value_type: RegValueType,
    ) -> Result<(), MutationError> {
        let target = format!("{}\\{}", normalize_key_path(path), key);
        self.gate_mutation(
            &target,
            format!("reg add {} /v {} /d {}", path, key, value),
            RecordedMutation::WriteRegistry {
                path: path.to_string(),
                key: key.to_string(),
                value: value.to_string(),
                value_type,
            },
        )
        .await?;
        self.set_registry(path, key, value, value_type);
        Ok(())
    }

    async fn set_service_startup(
        &self,
        name: &str,
        action: ServiceAction,
    ) -> Result<(), MutationError> {
        self.gate_mutation(
            name,
            format!("sc config {} start= {}", name, action.startup_type.sc_value()),
            RecordedMutation::SetService {
                name: name.to_string(),
                action,
            },
        )
        .await?;

        let mut state = self.lock();
        let Some(svc) = state.services.get_mut(&name.to_lowercase()) else {
            return Err(MutationError::CommandFailed {
                command: format!("sc config {}", name),
                code: 1060,
                stderr: "The specified service does not exist as an installed service."
                    .to_string(),
            });
        };
        svc.startup_type = action.startup_type;
        match action.kind {
            ServiceActionKind::Disable => svc.status = ServiceStatus::Stopped,
            ServiceActionKind::Enable if action.startup_type == StartupType::Automatic => {
                svc.status = ServiceStatus::Running
            }
            ServiceActionKind::Enable => {}
        }
        Ok(())
    }

    async fn run_command(&self, command: &str) -> Result<CommandOutput, MutationError> {
        self.gate_mutation(
            command,
            command.to_string(),
            RecordedMutation::RunCommand(command.to_string()),
        )
        .await?;

        let mut state = self.lock();
        if let Some(effect) = state.command_effects.get(command).cloned() {
            state
                .services
                .insert(effect.service.to_lowercase(), effect.state);
        }
        Ok(CommandOutput::default())
    }
}
