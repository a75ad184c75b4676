//! Mapping of `nmcli` stderr text to operator facing failure messages
//!
//! The markers below depend on the tool's English wording, which the adapter
//! pins with `LC_ALL=C`.

pub const WIFI_CREDENTIALS_MESSAGE: &str = "Unknown SSID or Incorrect Password";

const WIFI_CREDENTIAL_MARKERS: &[&str] = &[
    "wireless-security.psk",
    "not found",
    "no network with ssid",
    "secrets were required",
];

const WIRED_MODIFY_MARKER: &str = "failed to modify";

/// Failure message for a failed WiFi connect step
pub fn classify_wifi_failure(stderr: &str) -> String {
    let lowered = stderr.to_lowercase();

    if WIFI_CREDENTIAL_MARKERS
        .iter()
        .any(|marker| lowered.contains(marker))
    {
        return WIFI_CREDENTIALS_MESSAGE.to_string();
    }

    stderr.trim().to_string()
}

/// Failure message for a failed wired configuration step
///
/// `Error: failed to modify ipv4.addresses: invalid IP address: 300.1.1.1`
/// is reduced to `invalid IP address`.
pub fn classify_wired_failure(stderr: &str) -> String {
    stderr
        .lines()
        .find(|line| line.to_lowercase().contains(WIRED_MODIFY_MARKER))
        .and_then(|line| line.split(':').nth(2))
        .map(str::trim)
        .filter(|reason| !reason.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| stderr.trim().to_string())
}
