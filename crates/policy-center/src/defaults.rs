use rapidtap_core_types::{Strategy, StrategyKind};

use crate::model::{
    CachePolicy, ClassifierThresholds, DispatchPolicy, HostPolicy, MonitorPolicy, PatternSpec,
    PolicySnapshot, StatsWindow, StrategyParams, StrategyPolicy,
};

const DEFAULT_PACKAGE: &str = "com.flipkart.android";

pub fn default_snapshot() -> PolicySnapshot {
    PolicySnapshot {
        rev: 1,
        host: HostPolicy {
            package: DEFAULT_PACKAGE.to_string(),
            min_event_interval_ms: 50,
            max_concurrent_units: 8,
            intake_capacity: 1,
        },
        strategy: StrategyPolicy {
            recompute_interval_ms: 5_000,
            window: StatsWindow::Lifetime,
            thresholds: ClassifierThresholds {
                emergency_failure_rate: 0.7,
                emergency_latency_ms: 3_000,
                aggressive_failure_rate: 0.4,
                aggressive_latency_ms: 2_000,
                turbo_failure_rate: 0.1,
                turbo_latency_ms: 500,
            },
            turbo: builtin_params(StrategyKind::Turbo),
            normal: builtin_params(StrategyKind::Normal),
            aggressive: builtin_params(StrategyKind::Aggressive),
            emergency: builtin_params(StrategyKind::Emergency),
        },
        cache: CachePolicy { ttl_ms: 2_000 },
        dispatch: DispatchPolicy {
            fallback_timeout_ms: 500,
            confirm_delay_ms: 10,
        },
        monitor: MonitorPolicy {
            slow_operation_ms: 1_000,
            very_slow_operation_ms: 5_000,
            max_recent_operations: 100,
            trend_window: 20,
            degradation_factor: 1.5,
        },
        patterns: default_patterns(),
        provenance: Default::default(),
    }
}

fn builtin_params(kind: StrategyKind) -> StrategyParams {
    StrategyParams::from(&Strategy::builtin(kind))
}

/// Purchase-flow targets of the tracked storefront app.
pub fn default_patterns() -> Vec<PatternSpec> {
    vec![
        pattern(
            "buy_now",
            &["Buy Now"],
            &[
                "com.flipkart.android:id/buy_now_button",
                "com.flipkart.android:id/buyNowButton",
                "com.flipkart.android:id/btn_buy_now",
            ],
            &["Buy Now", "Buy now", "BUY NOW"],
            1,
            true,
        ),
        pattern(
            "buy_now_hi",
            &["बाय नाउ"],
            &["com.flipkart.android:id/buy_now_button"],
            &["बाय नाउ", "Buy Now"],
            1,
            true,
        ),
        pattern(
            "add_to_cart",
            &["Add to Cart"],
            &[
                "com.flipkart.android:id/add_to_cart",
                "com.flipkart.android:id/addToCartButton",
            ],
            &["Add to Cart", "Add To Cart"],
            2,
            false,
        ),
        pattern(
            "place_order",
            &["Place Order"],
            &[
                "com.flipkart.android:id/place_order",
                "com.flipkart.android:id/placeOrderButton",
            ],
            &["Place Order", "PLACE ORDER"],
            1,
            true,
        ),
        pattern(
            "continue",
            &["Continue"],
            &[
                "com.flipkart.android:id/continue_button",
                "com.flipkart.android:id/continueButton",
            ],
            &["Continue", "CONTINUE"],
            3,
            false,
        ),
        pattern(
            "pay_now",
            &["Pay Now"],
            &[
                "com.flipkart.android:id/pay_now",
                "com.flipkart.android:id/payNowButton",
            ],
            &["Pay Now", "PAY NOW"],
            1,
            true,
        ),
    ]
}

fn pattern(
    id: &str,
    texts: &[&str],
    view_ids: &[&str],
    descriptions: &[&str],
    priority: u8,
    critical: bool,
) -> PatternSpec {
    PatternSpec {
        id: id.to_string(),
        texts: texts.iter().map(|s| s.to_string()).collect(),
        view_ids: view_ids.iter().map(|s| s.to_string()).collect(),
        descriptions: descriptions.iter().map(|s| s.to_string()).collect(),
        priority,
        critical,
    }
}
