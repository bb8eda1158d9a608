//! Reconciliation tests.
//!
//! Every test runs the engine against `FakeSystem`; no registry, service
//! manager or shell is touched.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tweak_common::{
    compute_score, Catalog, RegValueType, ServiceStatus, StartupType, UNKNOWN_VALUE,
};
use tweak_engine::{EngineOptions, FakeSystem, ReconciliationEngine};

const GAME_CONFIG_STORE: &str = r"HKCU\System\GameConfigStore";
const DESKTOP: &str = r"HKCU\Control Panel\Desktop";

fn options() -> EngineOptions {
    EngineOptions {
        is_admin: true,
        probe_timeout: Duration::from_secs(2),
        mutate_timeout: Duration::from_secs(2),
        max_concurrent_probes: 8,
    }
}

fn subset(ids: &[&str]) -> Catalog {
    let standard = Catalog::standard();
    let descriptors = ids
        .iter()
        .map(|id| standard.get(id).cloned().unwrap())
        .collect();
    Catalog::from_descriptors(descriptors).unwrap()
}

fn engine(catalog: Catalog, fake: &Arc<FakeSystem>, options: EngineOptions) -> ReconciliationEngine {
    ReconciliationEngine::new(catalog, fake.clone(), fake.clone(), options)
}

/// A host where a handful of standard tweaks are present
fn populated_fake() -> FakeSystem {
    FakeSystem::new()
        .with_registry(GAME_CONFIG_STORE, "GameDVR_Enabled", "1", RegValueType::Dword)
        .with_registry(DESKTOP, "MenuShowDelay", "400", RegValueType::String)
        .with_service("SysMain", ServiceStatus::Running, StartupType::Automatic)
        .with_service("DiagTrack", ServiceStatus::Stopped, StartupType::Manual)
        .with_service("XblGameSave", ServiceStatus::Running, StartupType::Manual)
}

// ============================================================================
// Snapshot shape
// ============================================================================

#[tokio::test]
async fn test_snapshot_follows_catalog_order() {
    let fake = Arc::new(populated_fake());
    let engine = engine(Catalog::standard(), &fake, options());

    let snapshot = engine.reconcile_all().await;
    let ids: Vec<&str> = snapshot.tweaks.iter().map(|t| t.id()).collect();
    assert_eq!(ids, engine.catalog().ids());
}

#[tokio::test]
async fn test_empty_before_first_pass() {
    let fake = Arc::new(populated_fake());
    let engine = engine(Catalog::standard(), &fake, options());

    assert!(engine.list_reconciled().await.is_empty());
    assert_eq!(engine.get_score().await, 0);
    assert_eq!(fake.total_probe_calls(), 0);
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let fake = Arc::new(populated_fake());
    let engine = engine(Catalog::standard(), &fake, options());

    let first = engine.reconcile_all().await;
    let second = engine.reconcile_all().await;
    assert!(second.generation > first.generation);
    assert_eq!(first.tweaks, second.tweaks);
    assert_eq!(first.score, second.score);
}

#[tokio::test]
async fn test_score_matches_tweaks_and_stays_in_range() {
    let fake = Arc::new(populated_fake());
    let engine = engine(Catalog::standard(), &fake, options());

    let snapshot = engine.reconcile_all().await;
    assert!(snapshot.score <= 100);
    assert_eq!(snapshot.score, compute_score(&snapshot.tweaks));
    assert_eq!(engine.get_score().await, snapshot.score);
}

// ============================================================================
// Per-mechanism rules
// ============================================================================

#[tokio::test]
async fn test_registry_enabled_only_on_exact_match() {
    let fake = Arc::new(populated_fake());
    let engine = engine(subset(&["disable-game-dvr"]), &fake, options());

    let snap = engine.reconcile_all().await;
    let dvr = snap.get("disable-game-dvr").unwrap();
    assert!(dvr.exists);
    assert!(!dvr.is_enabled);
    assert_eq!(dvr.live_value, "1");

    fake.set_registry(GAME_CONFIG_STORE, "GameDVR_Enabled", "0", RegValueType::Dword);
    let snap = engine.reconcile_all().await;
    let dvr = snap.get("disable-game-dvr").unwrap();
    assert!(dvr.is_enabled);
    assert_eq!(dvr.live_value, "0");
}

#[tokio::test]
async fn test_stopped_manual_service_counts_as_enabled() {
    let fake = Arc::new(populated_fake());
    let engine = engine(subset(&["disable-diagtrack", "disable-sysmain"]), &fake, options());

    let snap = engine.reconcile_all().await;
    let diag = snap.get("disable-diagtrack").unwrap();
    assert!(diag.exists);
    assert!(diag.is_enabled);
    assert_eq!(diag.live_value, "Stopped/Manual");

    let sysmain = snap.get("disable-sysmain").unwrap();
    assert!(sysmain.exists);
    assert!(!sysmain.is_enabled);
    assert_eq!(sysmain.live_value, "Running/Automatic");
}

#[tokio::test]
async fn test_missing_key_is_excluded_from_score() {
    let fake = Arc::new(
        FakeSystem::new().with_registry(GAME_CONFIG_STORE, "GameDVR_Enabled", "0", RegValueType::Dword),
    );
    let engine = engine(subset(&["disable-game-dvr", "menu-show-delay"]), &fake, options());

    let snap = engine.reconcile_all().await;
    let menu = snap.get("menu-show-delay").unwrap();
    assert!(!menu.exists);
    assert!(!menu.is_enabled);
    assert_eq!(menu.live_value, UNKNOWN_VALUE);
    assert!(menu.probe_error.is_some());

    // Only the present, enabled tweak counts
    assert_eq!(snap.score, 100);
    assert_eq!(engine.unavailable().await.len(), 1);
}

#[tokio::test]
async fn test_command_targeting_service_uses_service_state() {
    let fake = Arc::new(populated_fake());
    let engine = engine(subset(&["disable-xbox-save-sync", "disable-hibernation"]), &fake, options());

    let snap = engine.reconcile_all().await;
    let xbl = snap.get("disable-xbox-save-sync").unwrap();
    assert!(xbl.exists);
    assert!(!xbl.is_enabled);
    assert_eq!(xbl.live_value, "Running/Manual");
    assert_eq!(fake.service_probe_count("XblGameSave"), 1);

    let hib = snap.get("disable-hibernation").unwrap();
    assert!(hib.exists);
    assert!(!hib.is_enabled);
    assert_eq!(hib.live_value, UNKNOWN_VALUE);
}

// ============================================================================
// Failure isolation
// ============================================================================

#[tokio::test]
async fn test_failed_probe_does_not_abort_pass() {
    let fake = Arc::new(populated_fake().failing_service("SysMain"));
    let engine = engine(Catalog::standard(), &fake, options());

    let snap = engine.reconcile_all().await;
    assert_eq!(snap.tweaks.len(), engine.catalog().len());

    let sysmain = snap.get("disable-sysmain").unwrap();
    assert!(!sysmain.exists);
    assert!(sysmain.probe_error.as_deref().unwrap().contains("injected failure"));

    // Neighbours still reconciled
    assert!(snap.get("disable-diagtrack").unwrap().is_enabled);
    assert!(snap.get("disable-game-dvr").unwrap().exists);
}

#[tokio::test]
async fn test_hanging_probe_times_out_in_isolation() {
    let fake = Arc::new(
        populated_fake()
            .hanging_service("SysMain")
            .hanging_registry(DESKTOP, "MenuShowDelay"),
    );
    let mut opts = options();
    opts.probe_timeout = Duration::from_millis(50);
    let engine = engine(Catalog::standard(), &fake, opts);

    let started = Instant::now();
    let snap = engine.reconcile_all().await;
    assert!(started.elapsed() < Duration::from_secs(5));

    for id in ["disable-sysmain", "menu-show-delay"] {
        let t = snap.get(id).unwrap();
        assert!(!t.exists, "{} should be unavailable", id);
        assert!(t.probe_error.as_deref().unwrap().contains("timed out"));
    }
    assert!(snap.get("disable-diagtrack").unwrap().is_enabled);
}

#[tokio::test]
async fn test_single_probe_slot_still_completes() {
    let fake = Arc::new(populated_fake());
    let mut opts = options();
    opts.max_concurrent_probes = 0;
    let engine = engine(Catalog::standard(), &fake, opts);

    let snap = engine.reconcile_all().await;
    assert_eq!(snap.tweaks.len(), engine.catalog().len());
}

// ============================================================================
// Snapshot publishing
// ============================================================================

#[tokio::test]
async fn test_stale_pass_is_discarded() {
    let fake = Arc::new(populated_fake());
    let engine = Arc::new(engine(subset(&["disable-game-dvr"]), &fake, options()));

    // Pass A starts first and is slow
    fake.set_probe_delay(Duration::from_millis(300));
    let slow = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.reconcile_all().await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    // Pass B starts later and finishes first
    fake.set_probe_delay(Duration::ZERO);
    let fast = engine.reconcile_all().await;
    assert!(!fast.get("disable-game-dvr").unwrap().is_enabled);

    // A will read this value, but its results must not replace B's
    fake.set_registry(GAME_CONFIG_STORE, "GameDVR_Enabled", "0", RegValueType::Dword);

    let returned_to_a = slow.await.unwrap();
    assert_eq!(returned_to_a.generation, fast.generation);

    let current = engine.snapshot().await;
    assert_eq!(current.generation, fast.generation);
    assert!(!current.get("disable-game-dvr").unwrap().is_enabled);
}

#[tokio::test]
async fn test_readers_see_whole_snapshots() {
    let fake = Arc::new(populated_fake());
    let engine = engine(Catalog::standard(), &fake, options());

    let before = engine.reconcile_all().await;
    fake.set_registry(GAME_CONFIG_STORE, "GameDVR_Enabled", "0", RegValueType::Dword);
    engine.refresh().await;

    // The old Arc is never mutated in place
    assert!(!before.get("disable-game-dvr").unwrap().is_enabled);
    assert!(engine.snapshot().await.get("disable-game-dvr").unwrap().is_enabled);
}
