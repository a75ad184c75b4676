use super::{
    classify::classify_wifi_failure,
    error::{NetworkError, NetworkResult},
};
use crate::nmcli_client::{CommandResult, CommandRunner, NmCommand, split_terse_fields};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_valid::Validate;
use std::{collections::HashSet, fmt, sync::Arc};

const MAX_SIGNAL: u16 = 100;
const SSID_FIELD: &str = "802-11-wireless.ssid";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WifiNetwork {
    pub ssid: String,
    #[serde(rename = "strength")]
    pub signal_strength: u8,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct WifiConnectionState {
    pub ssid: Option<String>,
}

#[derive(Clone, Default, Deserialize, Validate)]
pub struct WifiCredentials {
    #[serde(default)]
    #[validate(min_length = 1)]
    pub ssid: String,
    #[serde(default)]
    #[validate(min_length = 1)]
    pub password: String,
}

impl WifiCredentials {
    pub fn new(ssid: &str, password: &str) -> Self {
        WifiCredentials {
            ssid: ssid.to_string(),
            password: password.to_string(),
        }
    }
}

impl fmt::Debug for WifiCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WifiCredentials")
            .field("ssid", &self.ssid)
            .field("password", &"******")
            .finish()
    }
}

/// WiFi operations on the known wireless interface
pub struct WifiManager<R> {
    runner: Arc<R>,
    interface: String,
}

impl<R> WifiManager<R>
where
    R: CommandRunner,
{
    pub fn new(runner: Arc<R>, interface: impl Into<String>) -> Self {
        WifiManager {
            runner,
            interface: interface.into(),
        }
    }

    /// List visible networks, deduplicated by SSID in the tool's order
    pub async fn scan(&self) -> NetworkResult<Vec<WifiNetwork>> {
        let result = self
            .runner
            .run(NmCommand::query([
                "-t",
                "-f",
                "SSID,SIGNAL",
                "device",
                "wifi",
                "list",
                "ifname",
                self.interface.as_str(),
            ]))
            .await?;

        let stdout = succeeded_or_raw(result)?;
        let networks = parse_networks(&stdout);
        debug!("found {} wifi networks", networks.len());

        Ok(networks)
    }

    /// SSID of the active wireless connection, if any
    ///
    /// The profile name is not the SSID for profiles created outside this
    /// service, so the SSID is read from the matched profile itself.
    pub async fn status(&self) -> NetworkResult<WifiConnectionState> {
        let result = self
            .runner
            .run(NmCommand::query([
                "-t",
                "-f",
                "NAME,UUID,TYPE,DEVICE",
                "connection",
                "show",
                "--active",
            ]))
            .await?;

        let stdout = succeeded_or_raw(result)?;
        let Some(uuid) = find_active_wireless(&stdout, &self.interface) else {
            return Ok(WifiConnectionState::default());
        };

        let result = self
            .runner
            .run(NmCommand::query([
                "-t",
                "-f",
                SSID_FIELD,
                "connection",
                "show",
                "uuid",
                uuid.as_str(),
            ]))
            .await?;

        let stdout = succeeded_or_raw(result)?;

        Ok(WifiConnectionState {
            ssid: parse_profile_ssid(&stdout),
        })
    }

    /// Replace the profile named after the SSID and activate it
    ///
    /// A failure after the profile was created leaves it in place; the delete
    /// step of the next attempt removes it.
    pub async fn connect(&self, credentials: &WifiCredentials) -> NetworkResult<()> {
        if let Err(e) = credentials.validate() {
            debug!("rejected wifi credentials: {e}");
            return Err(NetworkError::InvalidInput(
                "SSID and password are required".to_string(),
            ));
        }

        let ssid = credentials.ssid.as_str();
        let password = credentials.password.as_str();
        info!("connect to {ssid}");

        let deleted = self
            .runner
            .run(NmCommand::mutation(["connection", "delete", "id", ssid]))
            .await?;

        if !deleted.exit_succeeded {
            debug!("no previous profile removed: {}", deleted.stderr.trim());
        }

        self.connect_step(NmCommand::mutation([
            "connection",
            "add",
            "type",
            "wifi",
            "con-name",
            ssid,
            "ifname",
            self.interface.as_str(),
            "ssid",
            ssid,
        ]))
        .await?;

        self.connect_step(
            NmCommand::mutation([
                "connection",
                "modify",
                "id",
                ssid,
                "wifi-sec.key-mgmt",
                "wpa-psk",
                "wifi-sec.psk",
                password,
            ])
            .with_secret(password),
        )
        .await?;

        self.connect_step(NmCommand::mutation(["connection", "up", "id", ssid]))
            .await?;

        info!("connected to {ssid}");
        Ok(())
    }

    pub async fn disconnect(&self) -> NetworkResult<()> {
        let result = self
            .runner
            .run(NmCommand::mutation([
                "device",
                "disconnect",
                self.interface.as_str(),
            ]))
            .await?;

        succeeded_or_raw(result)?;
        info!("disconnected {}", self.interface);

        Ok(())
    }

    async fn connect_step(&self, command: NmCommand) -> NetworkResult<()> {
        let result = self.runner.run(command).await?;

        if result.exit_succeeded {
            Ok(())
        } else {
            Err(NetworkError::CommandFailure(classify_wifi_failure(
                &result.stderr,
            )))
        }
    }
}

fn succeeded_or_raw(result: CommandResult) -> NetworkResult<String> {
    if result.exit_succeeded {
        Ok(result.stdout)
    } else {
        Err(NetworkError::CommandFailure(result.stderr.trim().to_string()))
    }
}

fn parse_networks(stdout: &str) -> Vec<WifiNetwork> {
    let mut seen = HashSet::new();

    stdout
        .lines()
        .filter(|line| !line.trim().is_empty() && !line.contains("IN-USE"))
        .filter_map(|line| {
            let fields = split_terse_fields(line);
            let ssid = fields.first()?.trim().to_string();
            let signal = fields.get(1)?.trim().parse::<u16>().ok()?;

            (!ssid.is_empty()).then(|| WifiNetwork {
                ssid,
                signal_strength: signal.min(MAX_SIGNAL) as u8,
            })
        })
        .filter(|network| seen.insert(network.ssid.clone()))
        .collect()
}

/// UUID of the active profile on the wireless interface or of wireless type
fn find_active_wireless(stdout: &str, interface: &str) -> Option<String> {
    stdout
        .lines()
        .map(split_terse_fields)
        .find(|fields| {
            fields.get(3).is_some_and(|device| device == interface)
                || fields.get(2).is_some_and(|kind| kind.contains("wireless"))
        })
        .and_then(|fields| fields.into_iter().nth(1))
        .filter(|uuid| !uuid.is_empty())
}

fn parse_profile_ssid(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .find(|line| !line.trim().is_empty())
        .and_then(|line| split_terse_fields(line).into_iter().nth(1))
        .filter(|ssid| !ssid.is_empty() && ssid != "--")
}
