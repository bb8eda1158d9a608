//! Tweakwise Engine - reconciles the tweak catalog against live system state.
//!
//! The engine probes every catalog entry through a `SystemProbe`, publishes
//! the joined result as a `Snapshot`, and applies or reverts tweaks through a
//! `SystemMutator`.

pub mod engine;
pub mod fake;
pub mod parsers;
pub mod plan;
pub mod privilege;
pub mod shell;
pub mod state;
pub mod system;

pub use engine::{reconcile_one, EngineOptions, MutationReport, ReconciliationEngine};
pub use fake::{FakeSystem, RecordedMutation};
pub use plan::{Direction, MutationPlan};
pub use privilege::is_elevated;
pub use shell::WindowsSystem;
pub use state::{SharedSnapshot, Snapshot};
pub use system::{CommandOutput, RegistryValue, ServiceState, SystemMutator, SystemProbe};
