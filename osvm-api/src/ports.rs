//! Port wrappers (Neutron).
//!
//! Ports are the only way the backend lets a caller choose a MAC address:
//! create the port with the MAC up front, then attach the port to the server.

use osvm_core::Result;
use serde::{Deserialize, Serialize};

use crate::compute::FixedIp;
use crate::http;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub network_id: String,
    #[serde(default)]
    pub mac_address: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Serialize)]
struct PortCreateBody<'a> {
    network_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    mac_address: Option<&'a str>,
}

/// Create a port on `network_id`, optionally pinning its MAC address.
pub fn create_port(
    network_url: &str,
    token: &str,
    network_id: &str,
    mac_address: Option<&str>,
) -> Result<Port> {
    #[derive(Serialize)]
    struct Wrapper<'a> {
        port: PortCreateBody<'a>,
    }
    #[derive(Deserialize)]
    struct RespWrapper {
        port: Port,
    }

    let url = format!("{network_url}/v2.0/ports");
    let request = Wrapper {
        port: PortCreateBody {
            network_id,
            mac_address,
        },
    };

    let resp = http::post(&url, token, &request)?;
    if resp.status != 201 {
        return Err(resp.into_api_error());
    }
    let parsed: RespWrapper = http::parse(&resp)?;
    Ok(parsed.port)
}

pub fn delete_port(network_url: &str, token: &str, port_id: &str) -> Result<()> {
    let url = format!("{network_url}/v2.0/ports/{port_id}");
    let resp = http::delete(&url, token)?;
    if resp.status != 204 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_body_omits_auto_mac() {
        let body = PortCreateBody {
            network_id: "net-1",
            mac_address: None,
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["network_id"], "net-1");
        assert!(json.get("mac_address").is_none());

        let pinned = PortCreateBody {
            network_id: "net-1",
            mac_address: Some("aa:bb:cc:dd:ee:ff"),
        };
        let json = serde_json::to_value(&pinned).unwrap();
        assert_eq!(json["mac_address"], "aa:bb:cc:dd:ee:ff");
    }
}
