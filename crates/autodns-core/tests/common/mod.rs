//! Test doubles and common utilities for reconciliation contract tests
//!
//! The mock repository behaves like a tiny remote record store: writes land
//! in an in-memory list that later lookups see, and every call is recorded
//! in order so tests can assert on exact request sequences.

#![allow(dead_code)]

use autodns_core::error::{Error, Operation, Result};
use autodns_core::traits::{IpSource, RecordRepository, RemoteRecord};
use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// One call made against the mock repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Find { hostname: String },
    Create { hostname: String, ip: IpAddr },
    Update { id: String, hostname: String, ip: IpAddr },
    Reconfigure,
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::Find { .. })
    }
}

/// A recording RecordRepository backed by an in-memory record list
///
/// Clones share all state, so a test can keep one handle and give the
/// engine another.
#[derive(Clone, Default)]
pub struct MockRecordRepository {
    records: Arc<Mutex<Vec<RemoteRecord>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_lookup: Arc<Mutex<HashSet<String>>>,
    fail_mutation: Arc<Mutex<HashSet<String>>>,
    fail_reconfigure: Arc<AtomicBool>,
    next_id: Arc<AtomicUsize>,
}

impl MockRecordRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with an existing record
    pub fn with_record(self, id: &str, hostname: &str, domain: &str, ip: &str) -> Self {
        self.records.lock().unwrap().push(RemoteRecord {
            id: id.to_string(),
            hostname: hostname.to_string(),
            domain: domain.to_string(),
            current_ip: ip.to_string(),
            description: "seeded".to_string(),
            enabled: true,
        });
        self
    }

    /// Make lookups for `hostname` fail
    pub fn failing_lookup(self, hostname: &str) -> Self {
        self.fail_lookup.lock().unwrap().insert(hostname.to_string());
        self
    }

    /// Make create/update for `hostname` fail at the transport level
    pub fn failing_mutation(self, hostname: &str) -> Self {
        self.fail_mutation.lock().unwrap().insert(hostname.to_string());
        self
    }

    /// Make every reconfigure fail
    pub fn failing_reconfigure(self) -> Self {
        self.fail_reconfigure.store(true, Ordering::SeqCst);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn write_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn find_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Find { .. }))
            .count()
    }

    pub fn records(&self) -> Vec<RemoteRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn boxed(&self) -> Box<dyn RecordRepository> {
        Box::new(self.clone())
    }

    fn record_call(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn transport_failure() -> Error {
        Error::Transport {
            status: 500,
            body: "{\"result\":\"failed\"}".to_string(),
        }
    }

    async fn reconfigure_after(&self, operation: Operation) -> Result<()> {
        self.reconfigure()
            .await
            .map_err(|e| Error::reconfigure_pending(operation, e))
    }
}

#[async_trait::async_trait]
impl RecordRepository for MockRecordRepository {
    async fn find_record(&self, hostname: &str, domain: &str) -> Result<Option<RemoteRecord>> {
        self.record_call(Call::Find {
            hostname: hostname.to_string(),
        });

        if self.fail_lookup.lock().unwrap().contains(hostname) {
            return Err(Error::lookup(Error::connectivity("connection refused")));
        }

        Ok(self
            .records
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.matches(hostname, domain))
            .cloned())
    }

    async fn create_record(&self, hostname: &str, domain: &str, ip: IpAddr) -> Result<()> {
        self.record_call(Call::Create {
            hostname: hostname.to_string(),
            ip,
        });

        if self.fail_mutation.lock().unwrap().contains(hostname) {
            return Err(Error::mutation(Operation::Create, Self::transport_failure()));
        }

        let id = format!("generated-{}", self.next_id.fetch_add(1, Ordering::SeqCst));
        self.records.lock().unwrap().push(RemoteRecord {
            id,
            hostname: hostname.to_string(),
            domain: domain.to_string(),
            current_ip: ip.to_string(),
            description: "created".to_string(),
            enabled: true,
        });

        self.reconfigure_after(Operation::Create).await
    }

    async fn update_record(
        &self,
        existing: &RemoteRecord,
        hostname: &str,
        _domain: &str,
        ip: IpAddr,
    ) -> Result<()> {
        self.record_call(Call::Update {
            id: existing.id.clone(),
            hostname: hostname.to_string(),
            ip,
        });

        if self.fail_mutation.lock().unwrap().contains(hostname) {
            return Err(Error::mutation(Operation::Update, Self::transport_failure()));
        }

        if let Some(record) = self
            .records
            .lock()
            .unwrap()
            .iter_mut()
            .find(|r| r.id == existing.id)
        {
            record.current_ip = ip.to_string();
            record.enabled = true;
        }

        self.reconfigure_after(Operation::Update).await
    }

    async fn reconfigure(&self) -> Result<()> {
        self.record_call(Call::Reconfigure);
        if self.fail_reconfigure.load(Ordering::SeqCst) {
            return Err(Error::mutation(
                Operation::Reconfigure,
                Self::transport_failure(),
            ));
        }
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "mock"
    }
}

/// An IP source that counts calls and can be told to fail
#[derive(Clone)]
pub struct ScriptedIpSource {
    ip: IpAddr,
    failing: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedIpSource {
    pub fn new(ip: IpAddr) -> Self {
        Self {
            ip,
            failing: Arc::new(AtomicBool::new(false)),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl IpSource for ScriptedIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::ip_source("network unreachable"));
        }
        Ok(self.ip)
    }

    fn source_name(&self) -> &'static str {
        "scripted"
    }
}

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test IP")
}

pub fn hostnames(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
