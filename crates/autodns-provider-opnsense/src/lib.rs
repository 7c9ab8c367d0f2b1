// # OPNsense Unbound Record Store
//
// RecordRepository implementation over the OPNsense management API.
//
// ## What it does
//
// - Searches Unbound host overrides and picks the row for a hostname/domain
// - Creates or repoints a single host override per call
// - Reloads Unbound after every accepted write
//
// ## What it does not do
//
// - No retries: a failed call is reported and the next pass starts over
// - No caching: every lookup re-reads the full override list
// - No deletes: records are only ever created or updated
//
// ## Security Requirements
//
// - API key and secret NEVER appear in logs or Debug output
// - Certificate verification is on unless explicitly disabled
//
// ## API Reference
//
// - Search: GET `/api/unbound/settings/search_host_override`
// - Create: POST `/api/unbound/settings/addHostOverride`
// - Update: POST `/api/unbound/settings/setHostOverride/{uuid}`
// - Reload: POST `/api/unbound/service/reconfigure`

pub mod client;
pub mod types;
pub mod unbound;

pub use client::{ApiMethod, OpnsenseClient};
pub use unbound::UnboundRepository;
