//! Network service (Neutron) wrappers: networks and subnets.

use osvm_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::http;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub shared: bool,
    #[serde(rename = "router:external", default)]
    pub external: bool,
    #[serde(rename = "subnets", default)]
    pub subnet_ids: Vec<String>,
}

pub fn list_networks(network_url: &str, token: &str) -> Result<Vec<Network>> {
    #[derive(Deserialize)]
    struct Wrapper {
        networks: Vec<Network>,
    }

    let url = format!("{network_url}/v2.0/networks");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.networks)
}

/// Resolve a network name to its ID; substring match, ambiguity is an error.
pub fn network_id_by_name(network_url: &str, token: &str, name: &str) -> Result<String> {
    if crate::is_uuid(name) {
        return Ok(name.to_string());
    }
    let networks = list_networks(network_url, token)?;
    let found: Vec<&Network> = networks.iter().filter(|n| n.name.contains(name)).collect();
    match found.as_slice() {
        [] => Err(Error::Precondition(format!("no network found for name {name}"))),
        [one] => Ok(one.id.clone()),
        _ => Err(Error::Precondition(format!(
            "multiple networks found for name {name}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_network_with_router_external() {
        let body = r#"{"id": "n1", "name": "public", "status": "ACTIVE", "shared": true, "router:external": true, "subnets": ["s1"]}"#;
        let net: Network = serde_json::from_str(body).unwrap();
        assert!(net.external);
        assert_eq!(net.subnet_ids, vec!["s1"]);
    }
}
