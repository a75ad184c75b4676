use crate::{
    config::NetworkConfig,
    http_response::{SuccessMessage, WifiNetworks, handle_service_result},
    nmcli_client::CommandRunner,
    services::network::{
        NetworkConfigService, NetworkError, NetworkResult, WifiCredentials, WiredConfigRequest,
    },
};
use actix_web::{HttpResponse, Responder, web};
use log::{debug, error};
use std::{future::Future, sync::Arc};

pub struct Api<Runner>
where
    Runner: CommandRunner,
{
    pub network: Arc<NetworkConfigService<Runner>>,
}

impl<Runner> Api<Runner>
where
    Runner: CommandRunner + Send + Sync + 'static,
{
    pub fn new(runner: Runner, config: &NetworkConfig) -> Self {
        Api {
            network: Arc::new(NetworkConfigService::new(
                runner,
                &config.wifi_interface,
                &config.wired_profile,
            )),
        }
    }

    /// Register all network routes; expects `web::Data<Self>` as app data
    pub fn routes(cfg: &mut web::ServiceConfig) {
        cfg.route("/api/wifi/list", web::get().to(Self::wifi_list))
            .route("/api/wifi/networks", web::get().to(Self::wifi_list))
            .route("/api/wifi/status", web::get().to(Self::wifi_status))
            .route("/api/wifi/connect", web::post().to(Self::wifi_connect))
            .route("/api/wifi/disconnect", web::post().to(Self::wifi_disconnect))
            .route("/api/wired/status", web::get().to(Self::wired_status))
            .route("/api/wired/configure", web::post().to(Self::wired_configure))
            .route("/version", web::get().to(Self::version));
    }

    pub async fn wifi_list(api: web::Data<Self>) -> impl Responder {
        debug!("wifi_list() called");

        let network = api.network.clone();
        let result = detached(async move { network.wifi_scan().await }).await;

        handle_service_result(
            result.map(|networks| WifiNetworks { networks }),
            "wifi_list",
            "Failed to fetch WiFi networks",
        )
    }

    pub async fn wifi_status(api: web::Data<Self>) -> impl Responder {
        debug!("wifi_status() called");

        let network = api.network.clone();

        handle_service_result(
            detached(async move { network.wifi_status().await }).await,
            "wifi_status",
            "Failed to fetch WiFi status",
        )
    }

    pub async fn wifi_connect(
        body: web::Json<WifiCredentials>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("wifi_connect() called: {body:?}");

        let credentials = body.into_inner();
        let ssid = credentials.ssid.clone();
        let network = api.network.clone();

        let result = detached(async move { network.wifi_connect(&credentials).await })
            .await
            .map(|()| SuccessMessage::new(format!("Connected to {ssid}")));

        handle_service_result(result, "wifi_connect", "Failed to connect to WiFi")
    }

    pub async fn wifi_disconnect(api: web::Data<Self>) -> impl Responder {
        debug!("wifi_disconnect() called");

        let network = api.network.clone();

        let result = detached(async move { network.wifi_disconnect().await })
            .await
            .map(|()| SuccessMessage::new("Disconnected from WiFi"));

        handle_service_result(result, "wifi_disconnect", "Failed to disconnect from WiFi")
    }

    pub async fn wired_status(api: web::Data<Self>) -> impl Responder {
        debug!("wired_status() called");

        let network = api.network.clone();

        handle_service_result(
            detached(async move { network.wired_status().await }).await,
            "wired_status",
            "Failed to fetch wired status",
        )
    }

    pub async fn wired_configure(
        body: web::Json<WiredConfigRequest>,
        api: web::Data<Self>,
    ) -> impl Responder {
        debug!("wired_configure() called: {body:?}");

        let request = body.into_inner();
        let network = api.network.clone();

        let result = detached(async move { network.wired_configure(&request).await })
            .await
            .map(|()| SuccessMessage::new("Wired network configured"));

        handle_service_result(
            result,
            "wired_configure",
            "Failed to configure wired network",
        )
    }

    pub async fn version() -> impl Responder {
        HttpResponse::Ok().body(env!("CARGO_PKG_VERSION"))
    }
}

/// Run a facade operation on its own task
///
/// A started command sequence runs to completion even when the client goes
/// away and actix drops the handler future.
async fn detached<T, F>(operation: F) -> NetworkResult<T>
where
    F: Future<Output = NetworkResult<T>> + Send + 'static,
    T: Send + 'static,
{
    tokio::spawn(operation).await.unwrap_or_else(|e| {
        error!("network operation task failed: {e}");
        Err(NetworkError::CommandFailure(format!(
            "network operation aborted: {e}"
        )))
    })
}
