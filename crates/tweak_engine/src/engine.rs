//! Reconciliation engine.
//!
//! Joins the static catalog with live probe results, publishes the result as
//! a wholesale `Snapshot`, and runs apply/revert through the mutator followed
//! by a fresh reconciliation.

use crate::parsers::service_name_from_command;
use crate::plan::{Direction, MutationPlan};
use crate::state::{SharedSnapshot, Snapshot};
use crate::system::{ServiceState, SystemMutator, SystemProbe};
use serde::Serialize;
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};
use tweak_common::config::EngineConfig;
use tweak_common::{
    Catalog, Failure, Mechanism, ProbeError, ReconciledTweak, TweakDescriptor, UNKNOWN_VALUE,
};

/// Runtime knobs for the engine
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Whether the caller may run admin-only tweaks
    pub is_admin: bool,
    pub probe_timeout: Duration,
    pub mutate_timeout: Duration,
    pub max_concurrent_probes: usize,
}

impl EngineOptions {
    pub fn from_config(config: &EngineConfig, is_admin: bool) -> Self {
        Self {
            is_admin,
            probe_timeout: config.probe_timeout(),
            mutate_timeout: config.mutate_timeout(),
            max_concurrent_probes: config.max_concurrent_probes,
        }
    }
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default(), false)
    }
}

/// Outcome of a successful apply or revert
#[derive(Debug, Clone, Serialize)]
pub struct MutationReport {
    pub id: String,
    pub direction: Direction,
    /// What was executed
    pub plan: MutationPlan,
    /// The tweak as observed by the reconciliation that followed
    pub tweak: ReconciledTweak,
    pub score: u8,
}

/// Holds an id in the in-flight set until dropped
struct InFlightGuard<'a> {
    set: &'a Mutex<HashSet<String>>,
    id: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.set.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.id);
    }
}

pub struct ReconciliationEngine {
    catalog: Catalog,
    probe: Arc<dyn SystemProbe>,
    mutator: Arc<dyn SystemMutator>,
    options: EngineOptions,
    state: SharedSnapshot,
    in_flight: Mutex<HashSet<String>>,
    probe_slots: Arc<Semaphore>,
}

impl ReconciliationEngine {
    pub fn new(
        catalog: Catalog,
        probe: Arc<dyn SystemProbe>,
        mutator: Arc<dyn SystemMutator>,
        options: EngineOptions,
    ) -> Self {
        let slots = options.max_concurrent_probes.max(1);
        Self {
            catalog,
            probe,
            mutator,
            options,
            state: SharedSnapshot::new(),
            in_flight: Mutex::new(HashSet::new()),
            probe_slots: Arc::new(Semaphore::new(slots)),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    // =========================================================================
    // Reconciliation
    // =========================================================================

    /// Probe every catalog entry and publish the result.
    ///
    /// Returns the snapshot that is current once this pass is done. If a pass
    /// that started later has already published, that newer snapshot is
    /// returned and this pass's results are dropped.
    pub async fn reconcile_all(&self) -> Arc<Snapshot> {
        let ticket = self.state.issue_ticket();
        let descriptors = self.catalog.get_all();
        debug!("Reconciliation pass {} over {} tweaks", ticket, descriptors.len());

        let mut join_set = JoinSet::new();
        for (index, descriptor) in descriptors.iter().enumerate() {
            let descriptor = descriptor.clone();
            let probe = Arc::clone(&self.probe);
            let slots = Arc::clone(&self.probe_slots);
            let limit = self.options.probe_timeout;

            join_set.spawn(async move {
                // A closed semaphore only means we run unbounded
                let _permit = slots.acquire_owned().await.ok();
                (index, reconcile_one(descriptor, probe.as_ref(), limit).await)
            });
        }

        let mut results: Vec<Option<ReconciledTweak>> = vec![None; descriptors.len()];
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((index, tweak)) => results[index] = Some(tweak),
                Err(e) => warn!("Probe task failed: {}", e),
            }
        }

        let tweaks: Vec<ReconciledTweak> = results
            .into_iter()
            .zip(descriptors.iter())
            .map(|(result, descriptor)| {
                result.unwrap_or_else(|| {
                    ReconciledTweak::missing(descriptor.clone(), "probe task did not complete")
                })
            })
            .collect();

        let snapshot = Snapshot::new(ticket, tweaks);
        info!(
            "Reconciled {} tweaks ({} available, {} enabled), score {}",
            snapshot.tweaks.len(),
            snapshot.available().len(),
            snapshot.enabled_count(),
            snapshot.score
        );

        if !self.state.publish(snapshot).await {
            debug!("Discarding stale reconciliation pass {}", ticket);
        }
        self.state.current().await
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Move tweak `id` to its intended state, then reconcile
    pub async fn apply(&self, id: &str) -> Result<MutationReport, Failure> {
        self.mutate(id, Direction::Apply).await
    }

    /// Move tweak `id` back to its catalog default, then reconcile
    pub async fn revert(&self, id: &str) -> Result<MutationReport, Failure> {
        self.mutate(id, Direction::Revert).await
    }

    /// Dry run of `apply`: checks preconditions and returns what would run
    pub fn plan_apply(&self, id: &str) -> Result<MutationPlan, Failure> {
        self.plan(id, Direction::Apply).map(|(_, plan)| plan)
    }

    /// Dry run of `revert`
    pub fn plan_revert(&self, id: &str) -> Result<MutationPlan, Failure> {
        self.plan(id, Direction::Revert).map(|(_, plan)| plan)
    }

    fn plan(
        &self,
        id: &str,
        direction: Direction,
    ) -> Result<(&TweakDescriptor, MutationPlan), Failure> {
        let descriptor = self
            .catalog
            .get(id)
            .ok_or_else(|| Failure::UnknownTweak(id.to_string()))?;

        if descriptor.requires_admin && !self.options.is_admin {
            return Err(Failure::PermissionDenied(id.to_string()));
        }

        let plan = match direction {
            Direction::Apply => MutationPlan::for_apply(descriptor),
            Direction::Revert => MutationPlan::for_revert(descriptor)
                .ok_or_else(|| Failure::NoRevertTarget(id.to_string()))?,
        };
        Ok((descriptor, plan))
    }

    async fn mutate(&self, id: &str, direction: Direction) -> Result<MutationReport, Failure> {
        let (descriptor, plan) = self.plan(id, direction)?;
        let _guard = self.claim(id)?;

        info!("{} {}: {}", direction, id, plan);
        let limit = self.options.mutate_timeout;
        let outcome = match tokio::time::timeout(limit, plan.execute(self.mutator.as_ref())).await
        {
            Ok(result) => result,
            Err(_) => Err(tweak_common::MutationError::Timeout(limit)),
        };

        if let Err(e) = outcome {
            warn!("{} {} failed: {}", direction, id, e);
            return Err(Failure::MutationFailed {
                id: id.to_string(),
                detail: e.to_string(),
            });
        }

        let snapshot = self.reconcile_all().await;
        let tweak = snapshot.get(id).cloned().unwrap_or_else(|| {
            ReconciledTweak::missing(descriptor.clone(), "not present in reconciled state")
        });
        if direction == Direction::Apply && !tweak.is_enabled {
            // The write went through but the probe disagrees; report what we saw
            warn!("{} applied but still reads as not enabled ({})", id, tweak.live_value);
        }

        Ok(MutationReport {
            id: id.to_string(),
            direction,
            plan,
            tweak,
            score: snapshot.score,
        })
    }

    /// Mark `id` as in flight, failing if another apply/revert holds it
    fn claim(&self, id: &str) -> Result<InFlightGuard<'_>, Failure> {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(id.to_string()) {
            return Err(Failure::OperationInProgress(id.to_string()));
        }
        Ok(InFlightGuard {
            set: &self.in_flight,
            id: id.to_string(),
        })
    }

    /// Whether an apply/revert for `id` is running right now
    pub fn is_in_flight(&self, id: &str) -> bool {
        let set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.contains(id)
    }

    // =========================================================================
    // Read side
    // =========================================================================

    /// Current reconciled tweaks in catalog order (empty before the first pass)
    pub async fn list_reconciled(&self) -> Vec<ReconciledTweak> {
        self.state.current().await.tweaks.clone()
    }

    pub async fn get_score(&self) -> u8 {
        self.state.current().await.score
    }

    pub async fn refresh(&self) {
        self.reconcile_all().await;
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        self.state.current().await
    }

    /// Tweaks the last pass could not find on this system
    pub async fn unavailable(&self) -> Vec<ReconciledTweak> {
        self.state
            .current()
            .await
            .unavailable()
            .into_iter()
            .cloned()
            .collect()
    }
}

async fn timed<T, F>(limit: Duration, fut: F) -> Result<T, ProbeError>
where
    F: Future<Output = Result<T, ProbeError>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::Timeout(limit)),
    }
}

fn log_probe_error(id: &str, error: &ProbeError) {
    if error.is_not_found() {
        debug!("  {}: {}", id, error);
    } else {
        warn!("Probe for {} failed: {}", id, error);
    }
}

fn from_service(descriptor: TweakDescriptor, state: ServiceState) -> ReconciledTweak {
    ReconciledTweak::observed(descriptor, state.display_value(), state.counts_as_disabled())
}

/// Probe a single descriptor. Never fails: errors land in `probe_error`.
pub async fn reconcile_one(
    descriptor: TweakDescriptor,
    probe: &dyn SystemProbe,
    limit: Duration,
) -> ReconciledTweak {
    match &descriptor.mechanism {
        Mechanism::Registry(reg) => {
            match timed(limit, probe.probe_registry(&reg.path, &reg.key)).await {
                Ok(live) => {
                    let enabled = live.value == reg.intended_value;
                    ReconciledTweak::observed(descriptor, live.value, enabled)
                }
                Err(e) => {
                    log_probe_error(&descriptor.id, &e);
                    ReconciledTweak::missing(descriptor, e.to_string())
                }
            }
        }
        Mechanism::Service(svc) => {
            match timed(limit, probe.probe_service(&svc.service_name)).await {
                Ok(state) => from_service(descriptor, state),
                Err(e) => {
                    log_probe_error(&descriptor.id, &e);
                    ReconciledTweak::missing(descriptor, e.to_string())
                }
            }
        }
        Mechanism::Command(cmd) => {
            let Some(service) = service_name_from_command(&cmd.apply_command) else {
                // Nothing to query; the command is assumed present but not applied
                return ReconciledTweak::observed(descriptor, UNKNOWN_VALUE.to_string(), false);
            };
            match timed(limit, probe.probe_service(&service)).await {
                Ok(state) => from_service(descriptor, state),
                Err(e) => {
                    log_probe_error(&descriptor.id, &e);
                    let mut tweak =
                        ReconciledTweak::observed(descriptor, UNKNOWN_VALUE.to_string(), false);
                    tweak.probe_error = Some(e.to_string());
                    tweak
                }
            }
        }
    }
}
