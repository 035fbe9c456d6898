use crate::defaults::default_snapshot;
use crate::loader::{load_snapshot, load_snapshot_with_options, LoadOptions};
use crate::model::{PolicySource, StatsWindow};
use crate::overlay::apply_override_to_snapshot;
use crate::PolicyError;
use rapidtap_core_types::StrategyKind;
use std::env;
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

#[test]
fn default_snapshot_matches_builtin_tables() {
    let snapshot = default_snapshot();
    assert_eq!(snapshot.host.min_event_interval_ms, 50);
    assert_eq!(snapshot.host.max_concurrent_units, 8);
    assert_eq!(snapshot.cache.ttl_ms, 2_000);
    assert_eq!(snapshot.strategy.recompute_interval_ms, 5_000);
    assert_eq!(snapshot.strategy.window, StatsWindow::Lifetime);
    assert_eq!(snapshot.patterns.len(), 6);

    let normal = snapshot.strategy.strategy(StrategyKind::Normal);
    assert_eq!(normal.time_budget, Duration::from_millis(200));
    assert_eq!(normal.search_timeout, Duration::from_millis(50));
    assert_eq!(normal.max_retries, 2);
    assert_eq!(normal.retry_delay, Duration::from_millis(25));
    snapshot.validate().expect("defaults validate");
}

#[test]
fn load_snapshot_applies_file_overlay() {
    let _guard = env_guard().lock().unwrap();
    let dir = tempfile::tempdir().unwrap();
    let file_path = dir.path().join("policy.yaml");
    std::fs::write(
        &file_path,
        r#"host:
  package: com.example.shop
  min_event_interval_ms: 80
strategy:
  window: windowed
  normal:
    time_budget_ms: 300
    max_retries: 3
cache:
  ttl_ms: 1500
patterns:
  - id: checkout
    texts: ["Checkout"]
    view_ids: ["com.example.shop:id/checkout"]
    priority: 1
    critical: true
"#,
    )
    .unwrap();

    let snapshot = load_snapshot(Some(&file_path)).unwrap();
    assert_eq!(snapshot.host.package, "com.example.shop");
    assert_eq!(snapshot.host.min_event_interval_ms, 80);
    assert_eq!(snapshot.strategy.window, StatsWindow::Windowed);
    assert_eq!(snapshot.strategy.normal.time_budget_ms, 300);
    assert_eq!(snapshot.strategy.normal.max_retries, 3);
    assert_eq!(snapshot.strategy.normal.search_timeout_ms, 50);
    assert_eq!(snapshot.cache.ttl_ms, 1_500);
    assert_eq!(snapshot.patterns.len(), 1);
    assert_eq!(snapshot.patterns[0].id, "checkout");
    assert!(snapshot.patterns[0].descriptions.is_empty());
    assert_eq!(
        snapshot.provenance.get("cache.ttl_ms").unwrap().source,
        PolicySource::File
    );
    assert_eq!(
        snapshot.provenance.get("host.intake_capacity").unwrap().source,
        PolicySource::Builtin
    );
    assert!(snapshot.rev > default_snapshot().rev);
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let options = LoadOptions {
        paths: vec!["/nonexistent/rapidtap.yaml".into()],
        include_env: false,
        include_cli_env: false,
    };
    let snapshot = load_snapshot_with_options(&options).unwrap();
    assert_eq!(snapshot.rev, default_snapshot().rev);
    assert_eq!(snapshot.patterns, default_snapshot().patterns);
}

#[test]
fn env_overlay_records_provenance() {
    let _guard = env_guard().lock().unwrap();
    let key = "RAPIDTAP_POLICY__STRATEGY__EMERGENCY__MAX_RETRIES";
    env::set_var(key, "12");
    let snapshot = load_snapshot(None);
    env::remove_var(key);
    let snapshot = snapshot.expect("load snapshot");
    assert_eq!(snapshot.strategy.emergency.max_retries, 12);
    assert_eq!(
        snapshot
            .provenance
            .get("strategy.emergency.max_retries")
            .expect("provenance")
            .source,
        PolicySource::Env
    );
}

#[test]
fn cli_overrides_replace_and_record_provenance() {
    let _guard = env_guard().lock().unwrap();
    env::set_var(
        "RAPIDTAP_POLICY_CLI_OVERRIDES",
        "strategy.thresholds.turbo_latency_ms=400,dispatch.fallback_timeout_ms=750",
    );
    let snapshot = load_snapshot(None);
    env::remove_var("RAPIDTAP_POLICY_CLI_OVERRIDES");
    let snapshot = snapshot.expect("load snapshot with cli");
    assert_eq!(snapshot.strategy.thresholds.turbo_latency_ms, 400);
    assert_eq!(snapshot.dispatch.fallback_timeout_ms, 750);
    assert_eq!(
        snapshot
            .provenance
            .get("dispatch.fallback_timeout_ms")
            .unwrap()
            .source,
        PolicySource::Cli
    );
}

#[test]
fn unknown_paths_are_rejected() {
    let mut snapshot = default_snapshot();
    let err = apply_override_to_snapshot(
        &mut snapshot,
        "strategy.warp.time_budget_ms",
        &serde_json::json!(10),
        PolicySource::Cli,
    )
    .unwrap_err();
    assert!(matches!(err, PolicyError::UnsupportedPath(_)));

    let err = apply_override_to_snapshot(
        &mut snapshot,
        "strategy.thresholds.turbo_failure_rate",
        &serde_json::json!(1.5),
        PolicySource::Cli,
    )
    .unwrap_err();
    assert!(matches!(err, PolicyError::InvalidValue(_)));
}

#[test]
fn validate_rejects_duplicate_pattern_ids() {
    let mut snapshot = default_snapshot();
    let duplicate = snapshot.patterns[0].clone();
    snapshot.patterns.push(duplicate);
    assert!(matches!(snapshot.validate(), Err(PolicyError::Invalid(_))));
}

#[test]
fn validate_rejects_zero_budget() {
    let mut snapshot = default_snapshot();
    snapshot.strategy.turbo.time_budget_ms = 0;
    assert!(snapshot.validate().is_err());
}

fn env_guard() -> &'static Mutex<()> {
    static ENV_GUARD: OnceLock<Mutex<()>> = OnceLock::new();
    ENV_GUARD.get_or_init(|| Mutex::new(()))
}
