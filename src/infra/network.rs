//! Network endpoint probing
//!
//! Endpoints come from the global configuration. An endpoint is reported
//! while it accepts TCP connections within the probe timeout.

use async_trait::async_trait;
use futures::future::join_all;
use std::time::Duration;
use tokio::net::TcpStream;

use crate::core::discovery::{DeviceSource, DiscoveredDevice, NetworkDevice};
use crate::core::global_config::NetworkEndpoint;
use crate::error::DiscoveryError;

/// Probes configured endpoints with a TCP connect
#[derive(Debug, Clone)]
pub struct NetworkProbeSource {
    endpoints: Vec<NetworkEndpoint>,
    timeout: Duration,
}

impl NetworkProbeSource {
    pub fn new(endpoints: Vec<NetworkEndpoint>, timeout: Duration) -> Self {
        Self { endpoints, timeout }
    }

    async fn probe(&self, endpoint: &NetworkEndpoint) -> Option<NetworkDevice> {
        let connect = TcpStream::connect((endpoint.address.as_str(), endpoint.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_)) => Some(NetworkDevice {
                address: endpoint.address.clone(),
                port: endpoint.port,
                name: endpoint.name.clone(),
            }),
            Ok(Err(e)) => {
                tracing::trace!(address = %endpoint.address, port = endpoint.port, "Endpoint unreachable: {}", e);
                None
            }
            Err(_) => {
                tracing::trace!(address = %endpoint.address, port = endpoint.port, "Endpoint probe timed out");
                None
            }
        }
    }
}

#[async_trait]
impl DeviceSource for NetworkProbeSource {
    fn name(&self) -> &str {
        "network"
    }

    async fn enumerate(&self) -> Result<Vec<DiscoveredDevice>, DiscoveryError> {
        let probes = self.endpoints.iter().map(|endpoint| self.probe(endpoint));
        Ok(join_all(probes)
            .await
            .into_iter()
            .flatten()
            .map(DiscoveredDevice::Network)
            .collect())
    }
}
