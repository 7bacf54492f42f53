//! Parsing of the comma-separated network/IP/MAC flags into ordered
//! interface requests.

use anyhow::{bail, Result};
use osvm_provision::NetworkRequest;

/// Split a CSV flag into trimmed entries; `None` yields an empty list.
fn split_csv(value: Option<&str>) -> Vec<String> {
    match value {
        Some(v) if !v.trim().is_empty() => v.split(',').map(|s| s.trim().to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Treat empty and "auto" entries as "let the backend choose".
fn normalize(entry: &str) -> Option<String> {
    if entry.is_empty() || entry.eq_ignore_ascii_case("auto") {
        None
    } else {
        Some(entry.to_string())
    }
}

/// A MAC is six hex pairs separated by ':' or '-'.
pub fn is_valid_mac(mac: &str) -> bool {
    let parts: Vec<&str> = mac.split([':', '-']).collect();
    parts.len() == 6
        && parts
            .iter()
            .all(|p| p.len() == 2 && p.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Build the ordered interface request list from the raw flag values.
///
/// The IP and MAC lists, when given, must pair up one-to-one with the network
/// list. A MAC entry takes precedence over an IP entry for the same slot,
/// since a pinned MAC forces the pre-created-port attach path.
pub fn parse_network_requests(
    networks: Option<&str>,
    ips: Option<&str>,
    macs: Option<&str>,
) -> Result<Vec<NetworkRequest>> {
    let networks = split_csv(networks);
    if networks.is_empty() {
        bail!("no networks specified; provide --networks or set 'networks' in config");
    }

    let ips = split_csv(ips);
    if !ips.is_empty() && ips.len() != networks.len() {
        bail!(
            "the number of networks ({}) must match the number of IPs ({})",
            networks.len(),
            ips.len()
        );
    }

    let macs = split_csv(macs);
    if !macs.is_empty() && macs.len() != networks.len() {
        bail!(
            "the number of networks ({}) must match the number of MACs ({})",
            networks.len(),
            macs.len()
        );
    }
    for mac in macs.iter().filter_map(|m| normalize(m)) {
        if !is_valid_mac(&mac) {
            bail!("invalid MAC address: {mac}");
        }
    }

    let requests = networks
        .into_iter()
        .enumerate()
        .map(|(i, network)| {
            let mac = macs.get(i).and_then(|m| normalize(m));
            let fixed_ip = if mac.is_none() {
                ips.get(i).and_then(|ip| normalize(ip))
            } else {
                None
            };
            NetworkRequest {
                network,
                fixed_ip,
                mac,
            }
        })
        .collect();

    Ok(requests)
}
