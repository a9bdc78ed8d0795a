//! Server startup and shutdown

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;

use heart_rate_sentinel::{
    HttpEmailSink, LogSink, Monitor, NotificationSink, SentinelConfig, SystemClock,
};

use crate::http;

/// Pick the alert sink for `config`: the email relay if one is configured,
/// otherwise the log.
pub fn sink_for(config: &SentinelConfig) -> anyhow::Result<Arc<dyn NotificationSink>> {
    match &config.email_endpoint {
        Some(endpoint) => {
            let sink = HttpEmailSink::new(endpoint.clone(), config.notify_timeout())
                .context("building email relay client")?;
            log::info!("Alerts will be sent to {}", endpoint);
            Ok(Arc::new(sink))
        }
        None => {
            log::info!("No email relay configured, alerts will only be logged");
            Ok(Arc::new(LogSink))
        }
    }
}

/// Serve until Ctrl-C.
pub async fn serve(config: SentinelConfig) -> anyhow::Result<()> {
    let addr: SocketAddr = config
        .bind_addr
        .parse()
        .with_context(|| format!("invalid bind address {}", config.bind_addr))?;

    let sink = sink_for(&config)?;
    let (monitor, notifier) = Monitor::start(&config, Arc::new(SystemClock), sink);
    let routes = http::routes(Arc::new(monitor));

    let (bound, server) = warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .with_context(|| format!("binding {}", addr))?;

    log::info!("Heart rate sentinel listening on http://{}", bound);
    server.await;
    log::info!("Shutting down");

    // The routes held the last event sender, so the notifier drains and exits.
    match tokio::time::timeout(config.notify_timeout(), notifier).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log::warn!("Notifier task failed: {}", e),
        Err(_) => log::warn!("Notifier did not finish pending alerts in time"),
    }
    Ok(())
}
