//! Checkout and order metrics for Prometheus.

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounterVec, TextEncoder, register_int_counter_vec};

/// Counter for payment sessions opened, by flow
static CHECKOUTS_OPENED: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bobactl_checkouts_opened_total",
        "Total payment sessions opened for priced carts",
        &["flow"]
    )
    .expect("Failed to register bobactl_checkouts_opened_total metric")
});

/// Counter for checkouts that could not be opened
static CHECKOUT_FAILURES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bobactl_checkout_failures_total",
        "Total checkout attempts blocked before a session was opened",
        &["reason"]
    )
    .expect("Failed to register bobactl_checkout_failures_total metric")
});

/// Counter for materialization attempts, by trigger and outcome
static MATERIALIZATIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bobactl_order_materializations_total",
        "Total order materialization attempts",
        &["trigger", "outcome"]
    )
    .expect("Failed to register bobactl_order_materializations_total metric")
});

/// Counter for webhook deliveries
static WEBHOOK_DELIVERIES: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "bobactl_webhook_deliveries_total",
        "Total payment provider webhook deliveries",
        &["outcome"]
    )
    .expect("Failed to register bobactl_webhook_deliveries_total metric")
});

/// Record an opened checkout (`flow` is "checkout_session" or "payment_intent")
pub fn record_checkout_opened(flow: &str) {
    CHECKOUTS_OPENED.with_label_values(&[flow]).inc();
}

/// Record a blocked checkout
pub fn record_checkout_failure(reason: &str) {
    CHECKOUT_FAILURES.with_label_values(&[reason]).inc();
}

/// Record the outcome of one materialization attempt
///
/// # Arguments
/// * `trigger` - "webhook" or "poll"
/// * `outcome` - "created", "existing", "unpaid" or "error"
pub fn record_materialization(trigger: &str, outcome: &str) {
    MATERIALIZATIONS.with_label_values(&[trigger, outcome]).inc();
}

/// Record a webhook delivery ("processed", "ignored", "failed" or "rejected")
pub fn record_webhook(outcome: &str) {
    WEBHOOK_DELIVERIES.with_label_values(&[outcome]).inc();
}

/// Encode every registered metric in the Prometheus text format
pub fn render() -> anyhow::Result<String> {
    let mut buffer = Vec::new();
    TextEncoder::new().encode(&prometheus::gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}
