use lazy_static::lazy_static;
use prometheus::{
    Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Once;

lazy_static! {
    /// Global Prometheus registry
    pub static ref REGISTRY: Registry = Registry::new();

    // Intertask messaging
    pub static ref MESSAGES_RECEIVED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nas_messages_received_total", "Messages taken out of a task mailbox"),
        &["task"]
    ).expect("valid metric definition");

    pub static ref MESSAGES_RELEASED_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nas_messages_released_total", "Messages released after handling"),
        &["message"]
    ).expect("valid metric definition");

    // EMM-SAP
    pub static ref SAP_PRIMITIVES_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nas_emm_sap_primitives_total", "Primitives forwarded to a sub-SAP"),
        &["sap"]
    ).expect("valid metric definition");

    pub static ref SAP_OUT_OF_RANGE_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("nas_emm_sap_out_of_range_total", "Primitives outside every sub-SAP range")
    ).expect("valid metric definition");

    // Session contexts
    pub static ref CONTEXT_OPS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("nas_context_ops_total", "Context operations applied by the owner task"),
        &["op"]
    ).expect("valid metric definition");

    pub static ref ACTIVE_CONTEXTS: IntGauge = IntGauge::with_opts(
        Opts::new("nas_active_contexts", "Session contexts held by the owner task")
    ).expect("valid metric definition");

    // Timers and replies
    pub static ref ARMED_TIMERS: IntGauge = IntGauge::with_opts(
        Opts::new("nas_armed_timers", "Timers currently armed")
    ).expect("valid metric definition");

    pub static ref STALE_TIMER_EXPIRIES_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("nas_stale_timer_expiries_total", "Expiries discarded because the timer id no longer matched")
    ).expect("valid metric definition");

    pub static ref REPLY_TIMEOUTS_TOTAL: IntCounter = IntCounter::with_opts(
        Opts::new("nas_reply_timeouts_total", "Context requests that never got a reply")
    ).expect("valid metric definition");
}

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call more than once.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
            Box::new(MESSAGES_RECEIVED_TOTAL.clone()),
            Box::new(MESSAGES_RELEASED_TOTAL.clone()),
            Box::new(SAP_PRIMITIVES_TOTAL.clone()),
            Box::new(SAP_OUT_OF_RANGE_TOTAL.clone()),
            Box::new(CONTEXT_OPS_TOTAL.clone()),
            Box::new(ACTIVE_CONTEXTS.clone()),
            Box::new(ARMED_TIMERS.clone()),
            Box::new(STALE_TIMER_EXPIRIES_TOTAL.clone()),
            Box::new(REPLY_TIMEOUTS_TOTAL.clone()),
        ];
        for collector in collectors {
            // Only fails on duplicate registration, which Once rules out
            let _ = REGISTRY.register(collector);
        }
    });
}

/// Gather metrics in Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = vec![];
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_registration() {
        register_metrics();
        register_metrics();

        MESSAGES_RECEIVED_TOTAL.with_label_values(&["TASK_NAS_MME"]).inc();
        SAP_PRIMITIVES_TOTAL.with_label_values(&["EMMREG"]).inc();
        ACTIVE_CONTEXTS.set(3);
        SAP_OUT_OF_RANGE_TOTAL.inc();

        let metrics = gather_metrics();
        assert!(metrics.contains("nas_messages_received_total"));
        assert!(metrics.contains("nas_emm_sap_primitives_total"));
        assert!(metrics.contains("nas_active_contexts"));
    }
}
