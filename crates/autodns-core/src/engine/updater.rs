//! Reconciliation passes
//!
//! A pass resolves the target address and hostname list from scratch, then
//! hands them to the [`ReconciliationEngine`]. In loop mode passes run back
//! to back with a fixed sleep in between; the sleep starts after a pass
//! finishes, so there is no overlap and no drift compensation.

use super::{ReconcileOutcome, ReconciliationEngine, ReconciliationResult};
use crate::error::{Error, Result};
use crate::traits::IpSource;
use std::net::IpAddr;
use std::time::Duration;
use tracing::{debug, error, info};

/// Results of one pass
#[derive(Debug)]
pub struct PassReport {
    pub target_ip: IpAddr,
    pub results: Vec<ReconciliationResult>,
}

impl PassReport {
    fn count(&self, pred: impl Fn(&ReconcileOutcome) -> bool) -> usize {
        self.results.iter().filter(|r| pred(&r.outcome)).count()
    }

    pub fn unchanged(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Unchanged))
    }

    pub fn created(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Created { .. }))
    }

    pub fn updated(&self) -> usize {
        self.count(|o| matches!(o, ReconcileOutcome::Updated { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(ReconcileOutcome::is_failed)
    }

    pub fn has_failures(&self) -> bool {
        self.failed() > 0
    }
}

/// Runs reconciliation passes for one domain
pub struct Updater {
    engine: ReconciliationEngine,
    ip_source: Box<dyn IpSource>,
    domain: String,
    hostnames: Vec<String>,
}

impl Updater {
    /// Create an updater
    ///
    /// An empty `hostnames` list means the machine's own hostname, looked up
    /// again at the start of every pass.
    pub fn new(
        engine: ReconciliationEngine,
        ip_source: Box<dyn IpSource>,
        domain: impl Into<String>,
        hostnames: Vec<String>,
    ) -> Self {
        Self {
            engine,
            ip_source,
            domain: domain.into(),
            hostnames,
        }
    }

    /// Run a single pass
    ///
    /// Fails only when the pass cannot start (no target address or no
    /// hostname). Per-hostname failures are in the returned report.
    pub async fn run_pass(&self) -> Result<PassReport> {
        let target_ip = self.ip_source.current().await.map_err(|e| {
            error!(source = self.ip_source.source_name(), err = %e, "Error getting current IP");
            e
        })?;

        let hostnames = self.hostnames_for_pass().map_err(|e| {
            error!(err = %e, "Error getting hostnames to use");
            e
        })?;

        info!(?hostnames, ip = %target_ip, store = self.engine.store_name(), "Updating DNS records");

        let results = self
            .engine
            .reconcile_all(&hostnames, &self.domain, target_ip)
            .await;

        let report = PassReport { target_ip, results };
        info!(
            unchanged = report.unchanged(),
            created = report.created(),
            updated = report.updated(),
            failed = report.failed(),
            "Pass complete"
        );
        Ok(report)
    }

    /// Run passes forever, sleeping `interval` after each one
    ///
    /// Pass failures are logged and the next pass runs regardless. Returns
    /// on Ctrl-C, which is only observed between passes.
    pub async fn run_loop(&self, interval: Duration) -> Result<()> {
        self.run_loop_internal(interval, None).await
    }

    /// Test-only helper to run the loop with a controlled shutdown signal
    ///
    /// Production code should use [`Updater::run_loop`].
    pub async fn run_loop_with_shutdown(
        &self,
        interval: Duration,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_loop_internal(interval, Some(shutdown_rx)).await
    }

    async fn run_loop_internal(
        &self,
        interval: Duration,
        mut shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        info!(interval_secs = interval.as_secs(), "Starting auto-updater in loop mode");

        loop {
            // Errors are already logged inside the pass
            let _ = self.run_pass().await;

            debug!(interval_secs = interval.as_secs(), "Sleeping until next pass");
            let stop = match shutdown_rx.as_mut() {
                Some(rx) => tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = rx => true,
                },
                None => tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    _ = tokio::signal::ctrl_c() => true,
                },
            };

            if stop {
                info!("Shutdown signal received, stopping loop");
                return Ok(());
            }
        }
    }

    fn hostnames_for_pass(&self) -> Result<Vec<String>> {
        if !self.hostnames.is_empty() {
            debug!(hostnames = ?self.hostnames, "Using configured hostnames");
            return Ok(self.hostnames.clone());
        }

        let hostname = machine_hostname()?;
        debug!(hostname = %hostname, "Using machine hostname");
        Ok(vec![hostname])
    }
}

/// This machine's hostname
pub fn machine_hostname() -> Result<String> {
    let raw = hostname::get()
        .map_err(|e| Error::Hostname(format!("failed to get machine hostname: {}", e)))?;
    let hostname = raw
        .into_string()
        .map_err(|_| Error::Hostname("machine hostname is not valid UTF-8".to_string()))?;
    if hostname.trim().is_empty() {
        return Err(Error::Hostname("machine hostname is empty".to_string()));
    }
    debug!(hostname = %hostname, "Fetched machine hostname");
    Ok(hostname.trim().to_string())
}
