pub mod api;
pub mod config;
pub mod http_response;
pub mod nmcli_client;
pub mod services;
