use crate::services::network::{
    NetworkError, WifiConnectionState, WifiNetwork, WiredConfig,
};
use actix_web::{HttpResponse, http::StatusCode};
use log::error;
use serde::Serialize;

/// Body of a successful mutating operation
#[derive(Clone, Debug, Serialize)]
pub struct SuccessMessage {
    pub success: bool,
    pub message: String,
}

impl SuccessMessage {
    pub fn new(message: impl Into<String>) -> Self {
        SuccessMessage {
            success: true,
            message: message.into(),
        }
    }
}

/// Body of a WiFi scan
#[derive(Clone, Debug, Serialize)]
pub struct WifiNetworks {
    pub networks: Vec<WifiNetwork>,
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    category: &'static str,
    details: String,
}

/// Trait for converting service results into HTTP responses
pub trait ServiceResultResponse {
    fn into_response(self) -> HttpResponse;
}

impl ServiceResultResponse for SuccessMessage {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

impl ServiceResultResponse for WifiNetworks {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

impl ServiceResultResponse for WifiConnectionState {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

impl ServiceResultResponse for WiredConfig {
    fn into_response(self) -> HttpResponse {
        HttpResponse::Ok().json(self)
    }
}

/// Status category for each member of the error taxonomy
pub fn status_code(error: &NetworkError) -> StatusCode {
    match error {
        NetworkError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        NetworkError::CommandFailure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        NetworkError::LaunchFailure { .. } => StatusCode::SERVICE_UNAVAILABLE,
        NetworkError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
    }
}

/// Handle a service result and convert it to a response
///
/// # Arguments
/// * `result` - The Result to handle
/// * `operation` - Name of the operation used for logging
/// * `failure` - Operator facing summary sent as `error` on failure
pub fn handle_service_result<T>(
    result: Result<T, NetworkError>,
    operation: &str,
    failure: &str,
) -> HttpResponse
where
    T: ServiceResultResponse,
{
    match result {
        Ok(data) => data.into_response(),
        Err(e) => {
            error!("{operation} failed: {e:#}");

            // LaunchFailure carries io details that stay in the log
            let details = match &e {
                NetworkError::LaunchFailure { program, .. } => {
                    format!("failed to launch {program}")
                }
                e => e.to_string(),
            };

            HttpResponse::build(status_code(&e)).json(ErrorBody {
                error: failure,
                category: e.category(),
                details,
            })
        }
    }
}
