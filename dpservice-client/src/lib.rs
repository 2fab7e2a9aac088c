//! Typed client for the dp-service dataplane gRPC API.
//!
//! [`Client`] exposes one async method per domain verb (get, list, create,
//! delete) for interfaces, prefixes, routes, virtual IPs, load balancers and
//! their targets, NAT, neighbor NAT, firewall rules and VNI state. Requests are
//! issued through a [`DpdkService`] transport, normally [`GrpcTransport`].
//!
//! ```no_run
//! # async fn run() -> dpservice_client::Result<()> {
//! use dpservice_client::{Client, ClientConfig};
//!
//! let client = Client::connect(&ClientConfig::default()).await?;
//! for iface in client.list_interfaces().await?.items {
//!     println!("{} vni={}", iface.metadata.id, iface.spec.vni);
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod errors;
pub mod proto;
pub mod transport;

pub use client::Client;
pub use config::ClientConfig;
pub use errors::{ignore_status_code, Error, Result};
pub use transport::{DpdkService, GrpcTransport};
