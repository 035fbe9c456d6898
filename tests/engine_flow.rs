use std::sync::Arc;
use std::time::Duration;

use rapidtap::{AppContext, Scene, SimulatedHost, TapRecord};
use rapidtap_core_types::{StrategyKind, UiEvent, UiEventKind};
use rapidtap_policy_center::default_snapshot;
use rapidtap_scheduler::monitor::OP_CYCLE;
use rapidtap_scheduler::{DispatchPath, SkipReason};

const SCENE: &str = include_str!("fixtures/checkout_scene.yaml");

fn engine() -> (AppContext, Arc<SimulatedHost>) {
    let policy = default_snapshot();
    let host = Arc::new(SimulatedHost::new(
        Scene::from_yaml(SCENE).expect("scene parses"),
        &policy.host.package,
    ));
    let context =
        AppContext::new(policy, host.clone(), host.actuator().clone()).expect("engine builds");
    (context, host)
}

#[tokio::test(start_paused = true)]
async fn purchase_flow_across_screens() {
    let (context, host) = engine();
    let orchestrator = context.orchestrator();

    host.show(0);
    let product = orchestrator
        .handle_event(host.event())
        .await
        .report()
        .cloned()
        .expect("product cycle");
    // zero statistics classify as turbo
    assert_eq!(product.strategy, StrategyKind::Turbo);
    assert_eq!(product.result.attempted_count, 6);
    assert_eq!(product.result.success_count, 1);
    assert_eq!(product.result.action_faults, 1);
    let buy = product
        .units
        .iter()
        .find(|unit| unit.pattern.as_str() == "buy_now")
        .unwrap();
    assert!(buy.success);
    assert!(matches!(buy.path, DispatchPath::Search(_)));
    assert!(context.cache().is_empty());

    tokio::time::advance(Duration::from_millis(60)).await;
    host.show(1);
    let loading = orchestrator
        .handle_event(host.event())
        .await
        .report()
        .cloned()
        .expect("loading cycle");
    assert_eq!(loading.result.attempted_count, 0);

    tokio::time::advance(Duration::from_millis(60)).await;
    host.show(2);
    let checkout = orchestrator
        .handle_event(host.event())
        .await
        .report()
        .cloned()
        .expect("checkout cycle");
    assert_eq!(checkout.result.success_count, 1);
    let place_order = checkout
        .units
        .iter()
        .find(|unit| unit.pattern.as_str() == "place_order")
        .unwrap();
    assert!(place_order.success);
    let continue_unit = checkout
        .units
        .iter()
        .find(|unit| unit.pattern.as_str() == "continue")
        .unwrap();
    assert_eq!(continue_unit.path, DispatchPath::NotFound);

    let snapshot = context.controller().snapshot();
    assert_eq!(snapshot.successes, 2);
    assert_eq!(snapshot.failures, 1);
    assert_eq!(context.monitor().operation_stats(OP_CYCLE).unwrap().count, 2);

    let stats = orchestrator.stats();
    assert_eq!(stats.received, 3);
    assert_eq!(stats.admitted, 3);
    assert_eq!(stats.cycles_completed, 3);

    assert_eq!(
        host.actuator().accepted(),
        vec![
            "Buy Now".to_string(),
            "com.flipkart.android:id/place_order".to_string()
        ]
    );
    assert!(host.actuator().records().contains(&TapRecord::Activated {
        element: "Add to Cart".to_string(),
        accepted: false,
    }));
}

#[tokio::test(start_paused = true)]
async fn foreign_and_rapid_signals_are_dropped() {
    let (context, host) = engine();
    let orchestrator = context.orchestrator();

    let foreign = orchestrator
        .handle_event(UiEvent::new("com.other.app", UiEventKind::ContentChanged))
        .await;
    assert_eq!(foreign.skip_reason(), Some(SkipReason::ForeignPackage));

    assert!(orchestrator.handle_event(host.event()).await.report().is_some());
    let rapid = orchestrator.handle_event(host.event()).await;
    assert_eq!(rapid.skip_reason(), Some(SkipReason::Debounced));
    assert_eq!(host.actuator().accepted().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn spawned_intake_publishes_reports() {
    let (context, host) = engine();
    let orchestrator = context.orchestrator().clone();
    orchestrator.spawn();
    let mut reports = orchestrator.subscribe();

    host.show(3);
    let cycle_id = orchestrator.on_event(host.event()).expect("admitted");
    let report = reports.recv().await.expect("report published");
    assert_eq!(report.cycle_id, cycle_id);
    let pay = report
        .units
        .iter()
        .find(|unit| unit.pattern.as_str() == "pay_now")
        .unwrap();
    assert!(pay.success);

    orchestrator.shutdown().await;
    assert_eq!(
        orchestrator.on_event(host.event()),
        Err(SkipReason::IntakeClosed)
    );
}
