//! rollcalld: attendance session daemon.
//!
//! Serves `org.rollcall.Engine1` on the session bus. The capture and
//! recognition pipeline runs on a dedicated OS thread per session; the
//! async runtime only handles the bus traffic.

mod config;
mod dbus;
mod engine;
mod publisher;
mod session;
mod worker;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = config::EngineConfig::from_env();
    let engine = Arc::new(engine::Engine::new(config).context("engine initialization failed")?);

    let _conn = zbus::connection::Builder::session()?
        .name(dbus::BUS_NAME)?
        .serve_at(dbus::OBJECT_PATH, dbus::EngineService::new(Arc::clone(&engine)))?
        .build()
        .await
        .context("failed to claim bus name")?;

    tracing::info!(bus = dbus::BUS_NAME, "rollcalld ready");

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown signal received");
    if engine.stop() {
        // Let the worker drain its grace window and release the camera
        // before the process exits; a bit of slack covers a blocking
        // frame dequeue in flight.
        let deadline = std::time::Instant::now() + engine.stop_grace() + Duration::from_secs(5);
        while engine.is_running() && std::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        if engine.is_running() {
            tracing::warn!("session worker did not exit within the grace window");
        }
    }

    Ok(())
}
