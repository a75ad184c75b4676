//! Network configuration facade
//!
//! Single entry point for the HTTP layer. Operations of one interface class
//! (wifi, wired) are serialized: a query issued while a mutation of the same
//! class is in flight waits for it. The two classes never wait on each other.

pub mod cidr;
pub mod classify;
pub mod error;
pub mod wifi;
pub mod wired;

#[cfg(test)]
pub(crate) mod testing;

use crate::nmcli_client::CommandRunner;
use log::debug;
use std::sync::Arc;
use tokio::sync::Mutex;

pub use error::{NetworkError, NetworkResult};
pub use wifi::{WifiConnectionState, WifiCredentials, WifiManager, WifiNetwork};
pub use wired::{WiredConfig, WiredConfigRequest, WiredManager, WiredMode};

/// Service for network configuration operations
pub struct NetworkConfigService<R> {
    wifi: WifiManager<R>,
    wired: WiredManager<R>,
    wifi_scope: Mutex<()>,
    wired_scope: Mutex<()>,
}

impl<R> NetworkConfigService<R>
where
    R: CommandRunner,
{
    pub fn new(runner: R, wifi_interface: &str, wired_profile: &str) -> Self {
        let runner = Arc::new(runner);

        NetworkConfigService {
            wifi: WifiManager::new(runner.clone(), wifi_interface),
            wired: WiredManager::new(runner, wired_profile),
            wifi_scope: Mutex::new(()),
            wired_scope: Mutex::new(()),
        }
    }

    pub async fn wifi_scan(&self) -> NetworkResult<Vec<WifiNetwork>> {
        let _scope = self.wifi_scope.lock().await;
        self.wifi.scan().await
    }

    pub async fn wifi_status(&self) -> NetworkResult<WifiConnectionState> {
        let _scope = self.wifi_scope.lock().await;
        self.wifi.status().await
    }

    pub async fn wifi_connect(&self, credentials: &WifiCredentials) -> NetworkResult<()> {
        let _scope = self.wifi_scope.lock().await;
        debug!("wifi scope acquired for connect");
        self.wifi.connect(credentials).await
    }

    pub async fn wifi_disconnect(&self) -> NetworkResult<()> {
        let _scope = self.wifi_scope.lock().await;
        debug!("wifi scope acquired for disconnect");
        self.wifi.disconnect().await
    }

    pub async fn wired_status(&self) -> NetworkResult<WiredConfig> {
        let _scope = self.wired_scope.lock().await;
        self.wired.status().await
    }

    pub async fn wired_configure(&self, request: &WiredConfigRequest) -> NetworkResult<()> {
        let _scope = self.wired_scope.lock().await;
        debug!("wired scope acquired for configure");
        self.wired.configure(request).await
    }
}
