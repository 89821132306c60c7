use tracing_subscriber::EnvFilter;

/// Default filter: NAS crates at `level`, everything else at `warn`.
fn nas_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,mnas_core={level},mnas_emm_core={level},mnas_esm_core={level},mnas_runtime={level},mnas_mmed={level}"
        ))
    })
}

/// JSON logging at `info`.
pub fn init() {
    init_with_level("info")
}

/// JSON logging for the NAS daemon. `RUST_LOG` wins when set.
///
/// Each event carries the `task` span it was emitted from (`TASK_NAS_MME`,
/// `TASK_GUTI_RECEIVER`, ...), as opened by `Itti::create_task`.
pub fn init_with_level(level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(nas_filter(level))
        .json()
        .with_current_span(true)
        .with_span_list(false)
        .try_init();
}

/// Plain logs captured by the test harness.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
