//! Wire types for the OPNsense Unbound settings API
//!
//! Field names match the API exactly. `enabled` is left out of create
//! payloads so the appliance default applies, and is sent as `"1"` on
//! updates.

use autodns_core::RemoteRecord;
use serde::{Deserialize, Deserializer, Serialize};
use std::net::IpAddr;

/// `GET /api/unbound/settings/search_host_override`
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub status: Option<String>,
    pub rows: Vec<HostOverrideRow>,
}

/// One row of a host-override search
#[derive(Debug, Clone, Deserialize)]
pub struct HostOverrideRow {
    pub uuid: String,
    pub hostname: String,
    pub domain: String,
    pub server: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub enabled: bool,
}

impl From<HostOverrideRow> for RemoteRecord {
    fn from(row: HostOverrideRow) -> Self {
        RemoteRecord {
            id: row.uuid,
            hostname: row.hostname,
            domain: row.domain,
            current_ip: row.server,
            description: row.description,
            enabled: row.enabled,
        }
    }
}

/// Body of `addHostOverride` and `setHostOverride/{uuid}`
#[derive(Debug, Clone, Serialize)]
pub struct HostOverrideRequest {
    pub host: HostOverride,
}

/// The `host` object inside a create/update request
#[derive(Debug, Clone, Serialize)]
pub struct HostOverride {
    pub hostname: String,
    pub domain: String,
    pub rr: &'static str,
    pub server: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<&'static str>,
}

impl HostOverride {
    /// Payload for creating a record; `enabled` is omitted
    pub fn create(hostname: &str, domain: &str, ip: IpAddr, description: String) -> Self {
        Self {
            hostname: hostname.to_string(),
            domain: domain.to_string(),
            rr: record_type(ip),
            server: ip.to_string(),
            description,
            enabled: None,
        }
    }

    /// Payload for updating a record; always re-enables it
    pub fn update(hostname: &str, domain: &str, ip: IpAddr, description: String) -> Self {
        Self {
            enabled: Some("1"),
            ..Self::create(hostname, domain, ip, description)
        }
    }

    pub fn into_request(self) -> HostOverrideRequest {
        HostOverrideRequest { host: self }
    }
}

/// Body of `service/reconfigure`, serialized as `{}`
#[derive(Debug, Clone, Default, Serialize)]
pub struct EmptyRequest {}

/// Response envelope of every mutation endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutationResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub validations: Option<serde_json::Value>,
}

impl MutationResponse {
    /// Whether the envelope carries a recognised success indicator
    ///
    /// Record writes answer `{"result":"saved"}`; the reconfigure endpoint
    /// answers `{"status":"ok"}`. Anything else is a failure.
    pub fn succeeded(&self) -> bool {
        match self.result.as_deref() {
            Some(result) => ["saved", "ok", "done"]
                .iter()
                .any(|s| result.eq_ignore_ascii_case(s)),
            None => self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("ok")),
        }
    }

    /// Human-readable reason for a failed envelope
    pub fn failure_reason(&self) -> String {
        let mut reason = match (&self.result, &self.status) {
            (Some(result), _) => format!("result \"{}\"", result),
            (None, Some(status)) => format!("status \"{}\"", status),
            (None, None) => "no result or status field".to_string(),
        };
        if let Some(validations) = self.validations.as_ref().filter(|v| !v.is_null()) {
            reason.push_str(&format!(", validations: {}", validations));
        }
        reason
    }
}

/// `A` for IPv4 targets, `AAAA` for IPv6
pub fn record_type(ip: IpAddr) -> &'static str {
    match ip {
        IpAddr::V4(_) => "A",
        IpAddr::V6(_) => "AAAA",
    }
}

// The API reports flags as "1"/"0" but some versions use numbers or booleans
fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Bool(b) => b,
        serde_json::Value::Number(n) => n.as_u64().is_some_and(|n| n != 0),
        serde_json::Value::String(s) => s == "1" || s.eq_ignore_ascii_case("true"),
        _ => false,
    })
}
