// # autodns-core
//
// Reconciliation core for opnsense-auto-dns.
//
// ## Architecture Overview
//
// - **RecordRepository**: Trait for search/create/update/reconfigure on the
//   resolver's host-override store
// - **IpSource**: Trait for resolving the address records should point at
// - **ReconciliationEngine**: Per-hostname decision procedure (no-op, create,
//   update) over a RecordRepository
// - **Updater**: Runs passes, once or on a fixed interval
//
// ## Design Principles
//
// 1. **Stateless passes**: Remote state is re-read for every hostname on
//    every pass; nothing is cached locally
// 2. **Idempotency**: A hostname whose record already points at the target
//    causes zero writes
// 3. **Failure isolation**: One hostname's failure never skips another
// 4. **Library-First**: The binary only wires configuration to these types

pub mod config;
pub mod engine;
pub mod error;
pub mod traits;

// Re-export core types for convenience
pub use config::{ConfigOverrides, FileConfig, RunOptions, Settings};
pub use engine::{
    DesiredRecord, PassReport, ReconcileOutcome, ReconciliationEngine, ReconciliationResult,
    Updater,
};
pub use error::{Error, Operation, Result};
pub use traits::{FixedIpSource, IpSource, RecordRepository, RemoteRecord};
