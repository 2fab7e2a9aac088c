//! Connection settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tonic::transport::Endpoint;

/// Default dp-service gRPC address.
pub const DEFAULT_ADDRESS: &str = "http://[::1]:1337";

fn default_address() -> String {
    DEFAULT_ADDRESS.to_string()
}

fn default_connect_timeout() -> u64 {
    5
}

/// How to reach dp-service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// gRPC endpoint URI (e.g. http://[::1]:1337)
    #[serde(default = "default_address")]
    pub address: String,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Deadline for each call. Unset means calls are only bounded by the caller.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: default_address(),
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            ..Default::default()
        }
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Build the tonic endpoint for this configuration.
    pub fn endpoint(&self) -> Result<Endpoint, tonic::transport::Error> {
        let mut endpoint = Endpoint::from_shared(self.address.clone())?
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs));
        if let Some(secs) = self.request_timeout_secs {
            endpoint = endpoint.timeout(Duration::from_secs(secs));
        }
        Ok(endpoint)
    }
}
