//! Reconciliation engine
//!
//! The ReconciliationEngine is responsible for:
//! - Looking up each hostname's existing host override
//! - Deciding between no-op, create and update
//! - Driving the chosen mutation through the [`RecordRepository`]
//!
//! ## Decision flow
//!
//! ```text
//!   DesiredRecord ──► find_record ──► Err ───────────────► Failed
//!                          │
//!                          ├─ Some(r), r points at target ► Unchanged
//!                          ├─ Some(r) ──► update_record ──► Updated / Failed
//!                          └─ None ─────► create_record ──► Created / Failed
//! ```
//!
//! The engine never retries. A failed hostname stays failed for the pass and
//! the next scheduled pass starts again from a fresh lookup.

pub mod updater;

pub use updater::{PassReport, Updater};

use crate::error::Error;
use crate::traits::RecordRepository;
use std::fmt;
use std::net::IpAddr;
use tracing::{debug, error, info};

/// Placeholder for the previous address when no record exists yet
pub const NO_RECORD: &str = "none";

/// What one hostname should resolve to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredRecord {
    pub hostname: String,
    pub domain: String,
    pub target_ip: IpAddr,
}

impl DesiredRecord {
    pub fn new(hostname: impl Into<String>, domain: impl Into<String>, target_ip: IpAddr) -> Self {
        Self {
            hostname: hostname.into(),
            domain: domain.into(),
            target_ip,
        }
    }
}

impl fmt::Display for DesiredRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.hostname, self.domain, self.target_ip)
    }
}

/// Outcome of reconciling one hostname
#[derive(Debug)]
pub enum ReconcileOutcome {
    /// The record already pointed at the target; nothing was written
    Unchanged,
    /// No record existed and one was created
    Created {
        ip: IpAddr,
    },
    /// An existing record was repointed
    Updated {
        /// Address the record held before, verbatim from the store
        previous_ip: String,
        ip: IpAddr,
    },
    /// Lookup or mutation failed
    Failed {
        error: Error,
    },
}

impl ReconcileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether a write reached the remote store
    pub fn wrote(&self) -> bool {
        match self {
            Self::Created { .. } | Self::Updated { .. } => true,
            Self::Failed { error } => error.write_applied(),
            Self::Unchanged => false,
        }
    }
}

/// Per-hostname result of a pass
#[derive(Debug)]
pub struct ReconciliationResult {
    pub hostname: String,
    pub outcome: ReconcileOutcome,
}

/// Decides and drives the minimal set of remote mutations
///
/// Hostnames are processed one at a time; a hostname's lookup, write and
/// reconfigure all complete before the next hostname starts.
pub struct ReconciliationEngine {
    repository: Box<dyn RecordRepository>,
}

impl ReconciliationEngine {
    /// Create an engine over `repository`
    pub fn new(repository: Box<dyn RecordRepository>) -> Self {
        Self { repository }
    }

    /// Reconcile a single hostname
    ///
    /// Issues no write at all when the existing record already points at the
    /// target. A failed lookup is reported as `Failed` and never treated as
    /// "no record", so nothing is created on top of unknown remote state.
    pub async fn reconcile_one(&self, desired: &DesiredRecord) -> ReconcileOutcome {
        let DesiredRecord {
            hostname,
            domain,
            target_ip,
        } = desired;

        let existing = match self.repository.find_record(hostname, domain).await {
            Ok(existing) => existing,
            Err(e) => {
                error!(hostname = %hostname, domain = %domain, err = %e, "Error getting existing DNS record");
                return ReconcileOutcome::Failed { error: e };
            }
        };

        let observed_ip = match &existing {
            Some(record) => {
                debug!(hostname = %hostname, old_ip = %record.current_ip, uuid = %record.id, "Found existing DNS record");
                record.current_ip.clone()
            }
            None => {
                debug!(hostname = %hostname, "No existing DNS record found, will create new one");
                NO_RECORD.to_string()
            }
        };

        if existing.as_ref().is_some_and(|r| r.points_at(*target_ip)) {
            debug!(hostname = %hostname, ip = %target_ip, "IP unchanged, skipping update");
            return ReconcileOutcome::Unchanged;
        }

        info!(hostname = %hostname, old_ip = %observed_ip, new_ip = %target_ip, "IP changed, updating DNS");

        match existing {
            Some(record) => {
                match self
                    .repository
                    .update_record(&record, hostname, domain, *target_ip)
                    .await
                {
                    Ok(()) => {
                        info!(hostname = %hostname, domain = %domain, ip = %target_ip, "Successfully updated DNS record");
                        ReconcileOutcome::Updated {
                            previous_ip: observed_ip,
                            ip: *target_ip,
                        }
                    }
                    Err(e) => {
                        error!(hostname = %hostname, err = %e, "Error updating DNS record");
                        ReconcileOutcome::Failed { error: e }
                    }
                }
            }
            None => match self.repository.create_record(hostname, domain, *target_ip).await {
                Ok(()) => {
                    info!(hostname = %hostname, domain = %domain, ip = %target_ip, "Successfully created DNS record");
                    ReconcileOutcome::Created { ip: *target_ip }
                }
                Err(e) => {
                    error!(hostname = %hostname, err = %e, "Error creating DNS record");
                    ReconcileOutcome::Failed { error: e }
                }
            },
        }
    }

    /// Reconcile every hostname in order
    ///
    /// A failure on one hostname never skips the ones after it. Every
    /// hostname gets its own result; there is no overall verdict.
    pub async fn reconcile_all(
        &self,
        hostnames: &[String],
        domain: &str,
        target_ip: IpAddr,
    ) -> Vec<ReconciliationResult> {
        let mut results = Vec::with_capacity(hostnames.len());
        for hostname in hostnames {
            let desired = DesiredRecord::new(hostname.as_str(), domain, target_ip);
            let outcome = self.reconcile_one(&desired).await;
            results.push(ReconciliationResult {
                hostname: hostname.clone(),
                outcome,
            });
        }
        results
    }

    /// Name of the underlying record store
    pub fn store_name(&self) -> &'static str {
        self.repository.store_name()
    }
}
