use super::{
    cidr::{mask_to_prefix, prefix_to_mask},
    classify::classify_wired_failure,
    error::{NetworkError, NetworkResult},
};
use crate::nmcli_client::{CommandRunner, NmCommand, split_terse_fields};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{net::Ipv4Addr, sync::Arc};

const METHOD_FIELD: &str = "ipv4.method";
const ADDRESS_FIELD: &str = "IP4.ADDRESS";
const GATEWAY_FIELD: &str = "IP4.GATEWAY";

#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WiredMode {
    #[default]
    Dhcp,
    Static,
}

/// Current IPv4 settings of the wired profile
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WiredConfig {
    pub mode: WiredMode,
    pub address: Option<Ipv4Addr>,
    pub prefix_length: Option<u8>,
    pub mask: Option<Ipv4Addr>,
    pub gateway: Option<Ipv4Addr>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct WiredConfigRequest {
    pub mode: WiredMode,
    #[serde(default, alias = "staticIp")]
    pub address: Option<String>,
    #[serde(default, alias = "subnetMask")]
    pub mask: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
}

/// Validated static settings
struct StaticAddress {
    address: Ipv4Addr,
    prefix: u8,
    gateway: Ipv4Addr,
}

impl WiredConfigRequest {
    fn static_address(&self) -> NetworkResult<StaticAddress> {
        let (Some(address), Some(mask), Some(gateway)) = (
            present(&self.address),
            present(&self.mask),
            present(&self.gateway),
        ) else {
            return Err(NetworkError::InvalidInput(
                "address, mask and gateway are required for static mode".to_string(),
            ));
        };

        Ok(StaticAddress {
            address: parse_ipv4("address", address)?,
            prefix: mask_to_prefix(mask)?,
            gateway: parse_ipv4("gateway", gateway)?,
        })
    }
}

/// IPv4 configuration of the fixed wired profile
pub struct WiredManager<R> {
    runner: Arc<R>,
    profile: String,
}

impl<R> WiredManager<R>
where
    R: CommandRunner,
{
    pub fn new(runner: Arc<R>, profile: impl Into<String>) -> Self {
        WiredManager {
            runner,
            profile: profile.into(),
        }
    }

    pub async fn status(&self) -> NetworkResult<WiredConfig> {
        let method = self.query_field(METHOD_FIELD).await?;
        let address = self.query_field(ADDRESS_FIELD).await?;
        let gateway = self.query_field(GATEWAY_FIELD).await?;

        let mode = match method.as_deref() {
            Some("manual") => WiredMode::Static,
            _ => WiredMode::Dhcp,
        };

        let (address, prefix_length) = address.as_deref().map(parse_cidr).unwrap_or_default();
        let mask = prefix_length.and_then(|prefix| prefix_to_mask(prefix).ok());
        let gateway = gateway.as_deref().and_then(|gateway| {
            gateway
                .parse()
                .inspect_err(|_| warn!("ignoring unparseable gateway: {gateway}"))
                .ok()
        });

        Ok(WiredConfig {
            mode,
            address,
            prefix_length,
            mask,
            gateway,
        })
    }

    /// Apply dhcp or static settings and reactivate the profile
    ///
    /// Static settings are validated before any command runs.
    pub async fn configure(&self, request: &WiredConfigRequest) -> NetworkResult<()> {
        info!("configure wired: {request:?}");

        let method = match request.mode {
            WiredMode::Static => {
                let settings = request.static_address()?;

                self.modify(
                    "ipv4.addresses",
                    &format!("{}/{}", settings.address, settings.prefix),
                )
                .await?;
                self.modify("ipv4.gateway", &settings.gateway.to_string())
                    .await?;

                "manual"
            }
            WiredMode::Dhcp => "auto",
        };

        self.modify(METHOD_FIELD, method).await?;
        self.configure_step(NmCommand::mutation([
            "connection",
            "up",
            self.profile.as_str(),
        ]))
        .await?;

        info!("wired profile {} configured ({method})", self.profile);
        Ok(())
    }

    async fn modify(&self, property: &str, value: &str) -> NetworkResult<()> {
        self.configure_step(NmCommand::mutation([
            "connection",
            "modify",
            self.profile.as_str(),
            property,
            value,
        ]))
        .await
    }

    async fn configure_step(&self, command: NmCommand) -> NetworkResult<()> {
        let result = self.runner.run(command).await?;

        if result.exit_succeeded {
            Ok(())
        } else {
            Err(NetworkError::CommandFailure(classify_wired_failure(
                &result.stderr,
            )))
        }
    }

    /// Value of one terse field of the profile, `None` when unset
    async fn query_field(&self, field: &str) -> NetworkResult<Option<String>> {
        let result = self
            .runner
            .run(NmCommand::query([
                "-t",
                "-f",
                field,
                "connection",
                "show",
                self.profile.as_str(),
            ]))
            .await?;

        if !result.exit_succeeded {
            return Err(NetworkError::CommandFailure(
                result.stderr.trim().to_string(),
            ));
        }

        let value = result
            .stdout
            .lines()
            .find(|line| !line.trim().is_empty())
            .and_then(|line| split_terse_fields(line).into_iter().nth(1))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty() && value != "--");

        debug!("{field} of {}: {value:?}", self.profile);
        Ok(value)
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn parse_ipv4(name: &str, value: &str) -> NetworkResult<Ipv4Addr> {
    value
        .parse()
        .map_err(|_| NetworkError::InvalidInput(format!("invalid {name}: {value}")))
}

fn parse_cidr(value: &str) -> (Option<Ipv4Addr>, Option<u8>) {
    let (address, prefix) = match value.split_once('/') {
        Some((address, prefix)) => (address, Some(prefix)),
        None => (value, None),
    };

    (
        address.trim().parse().ok(),
        prefix
            .and_then(|prefix| prefix.trim().parse().ok())
            .filter(|prefix| *prefix <= 32),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{nmcli_client::CommandResult, services::network::testing::RecordingRunner};

    const PROFILE: &str = "Wired connection 1";

    fn manager(runner: &RecordingRunner) -> WiredManager<RecordingRunner> {
        WiredManager::new(Arc::new(runner.clone()), PROFILE)
    }

    fn static_request(address: Option<&str>, mask: Option<&str>, gateway: Option<&str>) -> WiredConfigRequest {
        WiredConfigRequest {
            mode: WiredMode::Static,
            address: address.map(str::to_string),
            mask: mask.map(str::to_string),
            gateway: gateway.map(str::to_string),
        }
    }

    mod status {
        use super::*;

        #[tokio::test]
        async fn dhcp_profile_reports_live_values() {
            let runner = RecordingRunner::new()
                .respond("ipv4.method", CommandResult::success("method:auto\n"))
                .respond("IP4.ADDRESS", CommandResult::success("address:192.168.1.50/24\n"))
                .respond("IP4.GATEWAY", CommandResult::success("gateway:192.168.1.1\n"));

            let config = manager(&runner).status().await.unwrap();

            assert_eq!(
                config,
                WiredConfig {
                    mode: WiredMode::Dhcp,
                    address: Some(Ipv4Addr::new(192, 168, 1, 50)),
                    prefix_length: Some(24),
                    mask: Some(Ipv4Addr::new(255, 255, 255, 0)),
                    gateway: Some(Ipv4Addr::new(192, 168, 1, 1)),
                }
            );
        }

        #[tokio::test]
        async fn manual_method_is_static() {
            let runner = RecordingRunner::new()
                .respond("ipv4.method", CommandResult::success("ipv4.method:manual\n"))
                .respond(
                    "IP4.ADDRESS",
                    CommandResult::success("IP4.ADDRESS[1]:10.0.0.5/16\nIP4.ADDRESS[2]:10.0.0.6/16\n"),
                );

            let config = manager(&runner).status().await.unwrap();

            assert_eq!(config.mode, WiredMode::Static);
            assert_eq!(config.address, Some(Ipv4Addr::new(10, 0, 0, 5)));
            assert_eq!(config.mask, Some(Ipv4Addr::new(255, 255, 0, 0)));
            assert_eq!(config.gateway, None);
        }

        #[tokio::test]
        async fn missing_fields_are_empty_not_errors() {
            let runner = RecordingRunner::new()
                .respond("ipv4.method", CommandResult::success("ipv4.method:auto\n"))
                .respond("IP4.GATEWAY", CommandResult::success("IP4.GATEWAY:--\n"));

            let config = manager(&runner).status().await.unwrap();

            assert_eq!(config, WiredConfig::default());
        }

        #[tokio::test]
        async fn queries_method_address_gateway_in_order() {
            let runner = RecordingRunner::new();

            manager(&runner).status().await.unwrap();

            assert_eq!(
                runner.calls(),
                vec![
                    "-t -f ipv4.method connection show Wired connection 1",
                    "-t -f IP4.ADDRESS connection show Wired connection 1",
                    "-t -f IP4.GATEWAY connection show Wired connection 1",
                ]
            );
        }

        #[tokio::test]
        async fn unknown_profile_is_command_failure() {
            let runner = RecordingRunner::new().respond(
                "ipv4.method",
                CommandResult::failure("Error: Wired connection 1 - no such connection profile.\n"),
            );

            let result = manager(&runner).status().await;

            assert!(matches!(result, Err(NetworkError::CommandFailure(_))));
            assert_eq!(runner.calls().len(), 1);
        }
    }

    mod configure {
        use super::*;

        #[tokio::test]
        async fn static_without_address_is_invalid_input_without_commands() {
            let runner = RecordingRunner::new();

            let result = manager(&runner)
                .configure(&static_request(None, Some("255.255.255.0"), Some("192.168.1.1")))
                .await;

            assert!(matches!(result, Err(NetworkError::InvalidInput(_))));
            assert!(runner.calls().is_empty());
        }

        #[tokio::test]
        async fn empty_strings_count_as_absent() {
            let runner = RecordingRunner::new();

            let result = manager(&runner)
                .configure(&static_request(Some("192.168.1.50"), Some(""), Some("192.168.1.1")))
                .await;

            assert!(matches!(result, Err(NetworkError::InvalidInput(_))));
            assert!(runner.calls().is_empty());
        }

        #[tokio::test]
        async fn malformed_values_are_invalid_input_without_commands() {
            let runner = RecordingRunner::new();
            let manager = manager(&runner);

            for request in [
                static_request(Some("300.1.1.1"), Some("255.255.255.0"), Some("192.168.1.1")),
                static_request(Some("192.168.1.50"), Some("255.255"), Some("192.168.1.1")),
                static_request(Some("192.168.1.50"), Some("255.255.255.0"), Some("gw")),
            ] {
                let result = manager.configure(&request).await;
                assert!(matches!(result, Err(NetworkError::InvalidInput(_))));
            }

            assert!(runner.calls().is_empty());
        }

        #[tokio::test]
        async fn static_sets_address_gateway_then_method_and_activates() {
            let runner = RecordingRunner::new();

            manager(&runner)
                .configure(&static_request(
                    Some("192.168.1.50"),
                    Some("255.255.255.0"),
                    Some("192.168.1.1"),
                ))
                .await
                .unwrap();

            assert_eq!(
                runner.calls(),
                vec![
                    "connection modify Wired connection 1 ipv4.addresses 192.168.1.50/24",
                    "connection modify Wired connection 1 ipv4.gateway 192.168.1.1",
                    "connection modify Wired connection 1 ipv4.method manual",
                    "connection up Wired connection 1",
                ]
            );
        }

        #[tokio::test]
        async fn dhcp_ignores_static_fields() {
            let runner = RecordingRunner::new();
            let request = WiredConfigRequest {
                mode: WiredMode::Dhcp,
                address: Some("garbage".to_string()),
                mask: None,
                gateway: None,
            };

            manager(&runner).configure(&request).await.unwrap();

            assert_eq!(
                runner.calls(),
                vec![
                    "connection modify Wired connection 1 ipv4.method auto",
                    "connection up Wired connection 1",
                ]
            );
        }

        #[tokio::test]
        async fn modify_failure_is_reclassified_and_aborts() {
            let runner = RecordingRunner::new().respond(
                "ipv4.gateway",
                CommandResult::failure(
                    "Error: failed to modify ipv4.gateway: gateway cannot be set without addresses: x\n",
                ),
            );

            let result = manager(&runner)
                .configure(&static_request(
                    Some("192.168.1.50"),
                    Some("255.255.255.0"),
                    Some("192.168.1.1"),
                ))
                .await;

            assert!(matches!(
                result,
                Err(NetworkError::CommandFailure(msg)) if msg == "gateway cannot be set without addresses"
            ));
            assert_eq!(runner.calls().len(), 2);
        }

        #[tokio::test]
        async fn activation_failure_surfaces_raw_stderr() {
            let runner = RecordingRunner::new().respond(
                "connection up",
                CommandResult::failure("Error: Connection activation failed: No suitable device found.\n"),
            );

            let result = manager(&runner)
                .configure(&WiredConfigRequest::default())
                .await;

            assert!(matches!(
                result,
                Err(NetworkError::CommandFailure(msg))
                    if msg == "Error: Connection activation failed: No suitable device found."
            ));
        }
    }

    mod request {
        use super::*;

        #[test]
        fn accepts_web_ui_field_names() {
            let request: WiredConfigRequest = serde_json::from_str(
                r#"{"mode":"static","staticIp":"10.0.0.2","subnetMask":"255.0.0.0","gateway":"10.0.0.1"}"#,
            )
            .unwrap();

            assert_eq!(request.mode, WiredMode::Static);
            assert_eq!(request.address.as_deref(), Some("10.0.0.2"));
            assert_eq!(request.mask.as_deref(), Some("255.0.0.0"));
        }

        #[test]
        fn rejects_unknown_mode() {
            let result = serde_json::from_str::<WiredConfigRequest>(r#"{"mode":"bootp"}"#);
            assert!(result.is_err());
        }
    }
}
