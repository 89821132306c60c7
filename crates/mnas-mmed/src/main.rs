mod procedures;

use anyhow::Context;
use axum::routing::get;
use axum::Router;
use mnas_config::MmeNasConfig;
use mnas_core::TaskId;
use mnas_emm_core::EmmSap;
use mnas_esm_core::T3489Retransmission;
use mnas_runtime::{nas_init, NasCollaborators};
use mnas_shared::SapFamily;
use procedures::{TracingProc, TracingSubSap};
use tracing::{error, info};

async fn metrics() -> String {
    mnas_metrics::gather_metrics()
}

fn load_config() -> anyhow::Result<MmeNasConfig> {
    let path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("MNAS_CONFIG").ok());
    match path {
        Some(path) => mnas_config::load_config(&path)
            .with_context(|| format!("loading configuration from {path}")),
        None => Ok(MmeNasConfig::default()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = load_config()?;

    // Initialize logging
    mnas_logging::init_with_level(&config.app.log_level);

    // Register metrics
    mnas_metrics::register_metrics();

    info!(
        service = %config.app.service_name,
        version = env!("CARGO_PKG_VERSION"),
        "Starting MME NAS service"
    );

    let addr = format!("0.0.0.0:{}", config.app.metrics_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding metrics listener on {addr}"))?;
    info!("Serving metrics on {}", addr);
    let app = Router::new().route("/metrics", get(metrics));
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    });

    let collaborators = NasCollaborators {
        emm_sap: EmmSap::new(
            Box::new(TracingSubSap::new(SapFamily::Reg)),
            Box::new(TracingSubSap::new(SapFamily::Esm)),
            Box::new(TracingSubSap::new(SapFamily::As)),
            Box::new(TracingSubSap::new(SapFamily::Cn)),
        ),
        proc: TracingProc,
        esm_info: Box::new(T3489Retransmission::default()),
    };
    let runtime = nas_init(
        &config.nas,
        collaborators,
        &[TaskId::MmeApp, TaskId::S1ap, TaskId::S6a],
    )
    .await?;

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    let shutdown = runtime.shutdown().await?;
    info!(contexts = shutdown.store.len(), "Stopped");
    Ok(())
}
