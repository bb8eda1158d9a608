//! Apply / revert tests against `FakeSystem`.

use std::sync::Arc;
use std::time::Duration;
use tweak_common::{
    Catalog, Failure, FailureKind, RegValueType, ServiceAction, ServiceStatus, StartupType,
};
use tweak_engine::{
    Direction, EngineOptions, FakeSystem, MutationPlan, ReconciliationEngine, RecordedMutation,
    ServiceState,
};

const GAME_CONFIG_STORE: &str = r"HKCU\System\GameConfigStore";
const DESKTOP: &str = r"HKCU\Control Panel\Desktop";
const FAX_DISABLE: &str =
    "Set-Service -Name Fax -StartupType Disabled; Stop-Service -Name Fax -Force";

fn options(is_admin: bool) -> EngineOptions {
    EngineOptions {
        is_admin,
        probe_timeout: Duration::from_secs(2),
        mutate_timeout: Duration::from_secs(2),
        max_concurrent_probes: 8,
    }
}

fn host() -> FakeSystem {
    FakeSystem::new()
        .with_registry(GAME_CONFIG_STORE, "GameDVR_Enabled", "1", RegValueType::Dword)
        .with_registry(DESKTOP, "MenuShowDelay", "200", RegValueType::String)
        .with_service("SysMain", ServiceStatus::Running, StartupType::Automatic)
        .with_service("Fax", ServiceStatus::Running, StartupType::Manual)
        .with_command_effect(
            FAX_DISABLE,
            "Fax",
            ServiceState {
                status: ServiceStatus::Stopped,
                startup_type: StartupType::Disabled,
            },
        )
}

fn engine(fake: &Arc<FakeSystem>, options: EngineOptions) -> Arc<ReconciliationEngine> {
    Arc::new(ReconciliationEngine::new(
        Catalog::standard(),
        fake.clone(),
        fake.clone(),
        options,
    ))
}

// ============================================================================
// Happy paths
// ============================================================================

#[tokio::test]
async fn test_apply_registry_then_reconciled() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(false));
    engine.reconcile_all().await;
    let score_before = engine.get_score().await;

    let report = engine.apply("disable-game-dvr").await.unwrap();
    assert_eq!(report.direction, Direction::Apply);
    assert!(report.tweak.is_enabled);
    assert_eq!(report.tweak.live_value, "0");
    assert!(report.score > score_before);
    assert_eq!(report.score, engine.get_score().await);

    assert_eq!(
        fake.registry_value(GAME_CONFIG_STORE, "GameDVR_Enabled").as_deref(),
        Some("0")
    );
    assert!(engine
        .snapshot()
        .await
        .get("disable-game-dvr")
        .unwrap()
        .is_enabled);
}

#[tokio::test]
async fn test_revert_targets_catalog_default_not_prior_value() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(false));

    // Live value starts at a non-default 200
    engine.apply("menu-show-delay").await.unwrap();
    assert_eq!(fake.registry_value(DESKTOP, "MenuShowDelay").as_deref(), Some("0"));

    let report = engine.revert("menu-show-delay").await.unwrap();
    assert_eq!(report.direction, Direction::Revert);
    assert!(!report.tweak.is_enabled);
    assert_eq!(report.tweak.live_value, "400");
    assert_eq!(fake.registry_value(DESKTOP, "MenuShowDelay").as_deref(), Some("400"));
}

#[tokio::test]
async fn test_apply_and_revert_service() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(true));

    let report = engine.apply("disable-sysmain").await.unwrap();
    assert!(report.tweak.is_enabled);
    assert_eq!(report.tweak.live_value, "Stopped/Disabled");

    let report = engine.revert("disable-sysmain").await.unwrap();
    assert!(!report.tweak.is_enabled);
    assert_eq!(report.tweak.live_value, "Running/Automatic");

    assert_eq!(
        fake.mutations(),
        vec![
            RecordedMutation::SetService {
                name: "SysMain".to_string(),
                action: ServiceAction::disable(),
            },
            RecordedMutation::SetService {
                name: "SysMain".to_string(),
                action: ServiceAction::enable(StartupType::Automatic),
            },
        ]
    );
}

#[tokio::test]
async fn test_apply_command_reconciles_through_service() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(true));

    let before = engine.reconcile_all().await;
    assert!(!before.get("disable-fax-service").unwrap().is_enabled);

    let report = engine.apply("disable-fax-service").await.unwrap();
    assert!(report.tweak.is_enabled);
    assert_eq!(report.tweak.live_value, "Stopped/Disabled");
    assert_eq!(
        fake.mutations(),
        vec![RecordedMutation::RunCommand(FAX_DISABLE.to_string())]
    );
}

#[tokio::test]
async fn test_successful_mutation_reprobes_everything() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(false));
    engine.reconcile_all().await;
    let calls = fake.total_probe_calls();

    engine.apply("disable-game-dvr").await.unwrap();
    assert_eq!(fake.total_probe_calls(), calls * 2);
}

// ============================================================================
// Preconditions
// ============================================================================

#[tokio::test]
async fn test_unknown_id() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(true));

    let err = engine.apply("no-such-tweak").await.unwrap_err();
    assert_eq!(err, Failure::UnknownTweak("no-such-tweak".to_string()));
    assert_eq!(fake.mutation_count(), 0);
}

#[tokio::test]
async fn test_admin_required() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(false));

    let err = engine.apply("disable-sysmain").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::PermissionDenied);
    let err = engine.revert("disable-sysmain").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::PermissionDenied);

    assert_eq!(fake.mutation_count(), 0);
    assert_eq!(fake.total_probe_calls(), 0);
}

#[tokio::test]
async fn test_no_revert_target() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(true));

    for id in ["disable-startup-delay", "ultimate-performance-plan"] {
        let err = engine.revert(id).await.unwrap_err();
        assert_eq!(err, Failure::NoRevertTarget(id.to_string()));
        assert!(err.rejected_early());
    }
    assert_eq!(fake.mutation_count(), 0);
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let fake = Arc::new(host());
    let engine = engine(&fake, options(true));

    let plan = engine.plan_apply("disable-game-dvr").unwrap();
    assert_eq!(
        plan,
        MutationPlan::WriteRegistry {
            path: GAME_CONFIG_STORE.to_string(),
            key: "GameDVR_Enabled".to_string(),
            value: "0".to_string(),
            value_type: RegValueType::Dword,
        }
    );
    assert!(matches!(
        engine.plan_revert("ultimate-performance-plan"),
        Err(Failure::NoRevertTarget(_))
    ));
    assert_eq!(fake.mutation_count(), 0);
    assert_eq!(fake.total_probe_calls(), 0);
}

// ============================================================================
// Mutation failures
// ============================================================================

#[tokio::test]
async fn test_failed_mutation_skips_reconcile() {
    let fake = Arc::new(host().failing_mutation(r"HKCU\System\GameConfigStore\GameDVR_Enabled"));
    let engine = engine(&fake, options(false));
    let before = engine.reconcile_all().await;
    let calls = fake.total_probe_calls();

    let err = engine.apply("disable-game-dvr").await.unwrap_err();
    match &err {
        Failure::MutationFailed { id, detail } => {
            assert_eq!(id, "disable-game-dvr");
            assert!(detail.contains("Access is denied"));
        }
        other => panic!("unexpected failure {:?}", other),
    }

    // No re-probe, snapshot untouched
    assert_eq!(fake.total_probe_calls(), calls);
    assert_eq!(engine.snapshot().await.generation, before.generation);
}

#[tokio::test]
async fn test_hanging_mutation_times_out() {
    let fake = Arc::new(host().hanging_mutation("SysMain"));
    let mut opts = options(true);
    opts.mutate_timeout = Duration::from_millis(50);
    let engine = engine(&fake, opts);

    let err = engine.apply("disable-sysmain").await.unwrap_err();
    assert_eq!(err.kind(), FailureKind::MutationFailed);
    assert!(err.to_string().contains("timed out"));
    assert!(!engine.is_in_flight("disable-sysmain"));
}

// ============================================================================
// Per-tweak exclusion
// ============================================================================

#[tokio::test]
async fn test_concurrent_ops_on_same_tweak_rejected() {
    let fake = Arc::new(host().hanging_mutation("SysMain"));
    let mut opts = options(true);
    opts.mutate_timeout = Duration::from_millis(300);
    let engine = engine(&fake, opts);

    let first = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.apply("disable-sysmain").await })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(engine.is_in_flight("disable-sysmain"));

    let err = engine.revert("disable-sysmain").await.unwrap_err();
    assert_eq!(err, Failure::OperationInProgress("disable-sysmain".to_string()));

    // Other tweaks are unaffected
    engine.apply("disable-game-dvr").await.unwrap();

    let first = first.await.unwrap();
    assert_eq!(first.unwrap_err().kind(), FailureKind::MutationFailed);
    assert!(!engine.is_in_flight("disable-sysmain"));
}
