//! Core traits for opnsense-auto-dns
//!
//! - [`RecordRepository`]: Domain operations on the remote host-override store
//! - [`IpSource`]: Where the target address for a pass comes from

pub mod ip_source;
pub mod record_repository;

pub use ip_source::{FixedIpSource, IpSource};
pub use record_repository::{RecordRepository, RemoteRecord};
