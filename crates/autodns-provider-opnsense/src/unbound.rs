//! Host overrides in the appliance's Unbound resolver
//!
//! Every successful create or update is followed immediately by a
//! reconfigure, so each hostname's change goes live before the next hostname
//! is touched.

use crate::client::OpnsenseClient;
use crate::types::{EmptyRequest, HostOverride, MutationResponse, SearchResponse};
use async_trait::async_trait;
use autodns_core::config::Settings;
use autodns_core::traits::{RecordRepository, RemoteRecord};
use autodns_core::{Error, Operation, Result};
use std::net::IpAddr;

const SEARCH_PATH: &str = "/api/unbound/settings/search_host_override";
const ADD_PATH: &str = "/api/unbound/settings/addHostOverride";
const SET_PATH: &str = "/api/unbound/settings/setHostOverride";
const RECONFIGURE_PATH: &str = "/api/unbound/service/reconfigure";

/// Unbound host-override store on an OPNsense appliance
#[derive(Debug, Clone)]
pub struct UnboundRepository {
    client: OpnsenseClient,
}

impl UnboundRepository {
    pub fn new(client: OpnsenseClient) -> Self {
        Self { client }
    }

    /// Build a repository from validated settings
    pub fn from_settings(settings: &Settings, ignore_cert: bool) -> Result<Self> {
        let client = OpnsenseClient::new(
            &settings.opnsense_host,
            settings.api_key.clone(),
            settings.api_secret.clone(),
            ignore_cert,
        )?;
        Ok(Self::new(client))
    }

    /// Send one record write, then reload the resolver
    async fn write(&self, operation: Operation, path: &str, host: HostOverride) -> Result<()> {
        let body = self
            .client
            .post(path, &host.into_request())
            .await
            .map_err(|e| Error::mutation(operation, e))?;

        let response: MutationResponse =
            serde_json::from_slice(&body).map_err(|e| Error::mutation(operation, e.into()))?;
        if !response.succeeded() {
            return Err(Error::mutation(
                operation,
                Error::invalid_response(response.failure_reason()),
            ));
        }

        tracing::debug!(%operation, path, "Record write accepted, reconfiguring");

        self.reconfigure()
            .await
            .map_err(|e| Error::reconfigure_pending(operation, e))
    }
}

/// Description stamped on every record this tool writes
fn description_stamp() -> String {
    format!(
        "Auto-updated by opnsense-auto-dns at {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    )
}

#[async_trait]
impl RecordRepository for UnboundRepository {
    async fn find_record(&self, hostname: &str, domain: &str) -> Result<Option<RemoteRecord>> {
        let body = self.client.get(SEARCH_PATH).await.map_err(Error::lookup)?;

        let response: SearchResponse =
            serde_json::from_slice(&body).map_err(|e| Error::lookup(e.into()))?;

        tracing::debug!(rows = response.rows.len(), "Searched host overrides");

        // First match wins when the store holds duplicates
        Ok(response
            .rows
            .into_iter()
            .map(RemoteRecord::from)
            .find(|record| record.matches(hostname, domain)))
    }

    async fn create_record(&self, hostname: &str, domain: &str, ip: IpAddr) -> Result<()> {
        let host = HostOverride::create(hostname, domain, ip, description_stamp());
        self.write(Operation::Create, ADD_PATH, host).await
    }

    async fn update_record(
        &self,
        existing: &RemoteRecord,
        hostname: &str,
        domain: &str,
        ip: IpAddr,
    ) -> Result<()> {
        let host = HostOverride::update(hostname, domain, ip, description_stamp());
        let path = format!("{}/{}", SET_PATH, existing.id);
        self.write(Operation::Update, &path, host).await
    }

    async fn reconfigure(&self) -> Result<()> {
        let body = self
            .client
            .post(RECONFIGURE_PATH, &EmptyRequest::default())
            .await
            .map_err(|e| Error::mutation(Operation::Reconfigure, e))?;

        let response: MutationResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::mutation(Operation::Reconfigure, e.into()))?;
        if !response.succeeded() {
            return Err(Error::mutation(
                Operation::Reconfigure,
                Error::invalid_response(response.failure_reason()),
            ));
        }

        tracing::info!("Unbound service reconfigured");
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "opnsense-unbound"
    }
}
