//! Compute service (Nova) wrappers: servers, actions, interface attachments.

use osvm_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::http;

/// One entry of `block_device_mapping_v2` in a server create request.
///
/// Computed by the boot source resolver and consumed exactly once by
/// [`create_server`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockDeviceMapping {
    pub boot_index: i32,
    /// Image ID or volume ID, depending on `source_type`.
    pub uuid: String,
    pub source_type: String,
    pub destination_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_size: Option<u64>,
    pub delete_on_termination: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disk_bus: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

/// Payload for creating a server.
///
/// `networks` is the literal string "none": interfaces are attached
/// individually after the server reaches ACTIVE, so attach order (and with it
/// the primary-interface convention) stays under our control.
#[derive(Debug, Clone, Serialize)]
pub struct CreateServerRequest {
    pub name: String,
    #[serde(rename = "flavorRef")]
    pub flavor_ref: String,
    #[serde(rename = "imageRef", skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    pub networks: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub block_device_mapping_v2: Vec<BlockDeviceMapping>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_data: Option<String>,
}

impl CreateServerRequest {
    pub fn new(name: impl Into<String>, flavor_ref: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flavor_ref: flavor_ref.into(),
            image_ref: None,
            networks: "none".into(),
            block_device_mapping_v2: Vec::new(),
            user_data: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// Server detail as returned by `GET /servers/{id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerDetail {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: String,
    #[serde(rename = "OS-EXT-STS:power_state", default)]
    pub power_state: i32,
    #[serde(rename = "OS-EXT-STS:task_state", default)]
    pub task_state: Option<String>,
    #[serde(default)]
    pub created: String,
    #[serde(default)]
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixedIp {
    pub ip_address: String,
    #[serde(default)]
    pub subnet_id: String,
}

/// One attached interface, as reported by `os-interface`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterfaceAttachment {
    #[serde(default)]
    pub port_id: String,
    #[serde(default)]
    pub net_id: String,
    #[serde(default)]
    pub mac_addr: String,
    #[serde(default)]
    pub port_state: String,
    #[serde(default)]
    pub fixed_ips: Vec<FixedIp>,
}

#[derive(Serialize)]
struct AttachInterfaceRequest<'a> {
    #[serde(rename = "interfaceAttachment")]
    interface_attachment: AttachInterfaceBody<'a>,
}

#[derive(Serialize)]
struct AttachInterfaceBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    net_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fixed_ips: Vec<FixedIpRequest<'a>>,
}

#[derive(Serialize)]
struct FixedIpRequest<'a> {
    ip_address: &'a str,
}

/// Create a server; returns the new server ID. Creation is asynchronous, the
/// caller polls status afterwards.
pub fn create_server(compute_url: &str, token: &str, request: &CreateServerRequest) -> Result<String> {
    #[derive(Serialize)]
    struct Wrapper<'a> {
        server: &'a CreateServerRequest,
    }
    #[derive(Deserialize)]
    struct RespWrapper {
        server: Server,
    }

    let url = format!("{compute_url}/servers");
    let resp = http::post(&url, token, &Wrapper { server: request })?;
    if resp.status != 202 {
        return Err(resp.into_api_error());
    }
    let parsed: RespWrapper = http::parse(&resp)?;
    Ok(parsed.server.id)
}

pub fn get_server(compute_url: &str, token: &str, server_id: &str) -> Result<ServerDetail> {
    #[derive(Deserialize)]
    struct Wrapper {
        server: ServerDetail,
    }

    let url = format!("{compute_url}/servers/{server_id}");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.server)
}

pub fn list_servers(compute_url: &str, token: &str) -> Result<Vec<Server>> {
    #[derive(Deserialize)]
    struct Wrapper {
        servers: Vec<Server>,
    }

    let url = format!("{compute_url}/servers");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.servers)
}

pub fn delete_server(compute_url: &str, token: &str, server_id: &str) -> Result<()> {
    let url = format!("{compute_url}/servers/{server_id}");
    let resp = http::delete(&url, token)?;
    if resp.status != 204 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

/// Send a graceful `os-stop`. The guest needs an ACPI listener for this to
/// finish promptly; there is no forced fallback here.
pub fn stop_server(compute_url: &str, token: &str, server_id: &str) -> Result<()> {
    let url = format!("{compute_url}/servers/{server_id}/action");
    let body = serde_json::json!({ "os-stop": null });
    let resp = http::post(&url, token, &body)?;
    if resp.status != 202 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

/// Request a SOFT (default) or HARD reboot.
pub fn reboot_server(compute_url: &str, token: &str, server_id: &str, reboot_type: &str) -> Result<()> {
    let reboot_type = if reboot_type.is_empty() {
        "SOFT"
    } else {
        reboot_type
    };
    if reboot_type != "SOFT" && reboot_type != "HARD" {
        return Err(Error::Precondition(format!(
            "invalid reboot type: {reboot_type}"
        )));
    }

    let url = format!("{compute_url}/servers/{server_id}/action");
    let body = serde_json::json!({ "reboot": { "type": reboot_type } });
    let resp = http::post(&url, token, &body)?;
    if resp.status != 202 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

/// Attach an interface to a server by network, pre-created port, or network
/// plus fixed IP.
pub fn attach_interface(
    compute_url: &str,
    token: &str,
    server_id: &str,
    net_id: Option<&str>,
    port_id: Option<&str>,
    fixed_ip: Option<&str>,
) -> Result<InterfaceAttachment> {
    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(rename = "interfaceAttachment")]
        interface_attachment: InterfaceAttachment,
    }

    let url = format!("{compute_url}/servers/{server_id}/os-interface");
    let request = AttachInterfaceRequest {
        interface_attachment: AttachInterfaceBody {
            net_id,
            port_id,
            fixed_ips: fixed_ip.map(|ip| vec![FixedIpRequest { ip_address: ip }]).unwrap_or_default(),
        },
    };

    let resp = http::post(&url, token, &request)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.interface_attachment)
}

pub fn list_interfaces(compute_url: &str, token: &str, server_id: &str) -> Result<Vec<InterfaceAttachment>> {
    #[derive(Deserialize)]
    struct Wrapper {
        #[serde(rename = "interfaceAttachments")]
        interface_attachments: Vec<InterfaceAttachment>,
    }

    let url = format!("{compute_url}/servers/{server_id}/os-interface");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.interface_attachments)
}

/// Resolve a server name to its ID; substring match, ambiguity is an error.
pub fn server_id_by_name(compute_url: &str, token: &str, name: &str) -> Result<String> {
    if crate::is_uuid(name) {
        return Ok(name.to_string());
    }
    let servers = list_servers(compute_url, token)?;
    let found: Vec<&Server> = servers.iter().filter(|s| s.name.contains(name)).collect();
    match found.as_slice() {
        [] => Err(Error::Precondition(format!("no servers found for name {name}"))),
        [one] => Ok(one.id.clone()),
        _ => Err(Error::Precondition(format!(
            "multiple servers found for name {name}"
        ))),
    }
}

/// Human-readable label for the `OS-EXT-STS:power_state` integer.
pub fn power_state_label(state: i32) -> &'static str {
    match state {
        0 => "NOSTATE",
        1 => "RUNNING",
        3 => "PAUSED",
        4 => "SHUTDOWN",
        6 => "CRASHED",
        7 => "SUSPENDED",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_request_serializes_openstack_field_names() {
        let mut req = CreateServerRequest::new("web1", "f1");
        req.image_ref = Some("img-1".into());
        req.block_device_mapping_v2.push(BlockDeviceMapping {
            boot_index: 0,
            uuid: "img-1".into(),
            source_type: "image".into(),
            destination_type: "volume".into(),
            volume_size: Some(10),
            delete_on_termination: true,
            disk_bus: Some("scsi".into()),
            volume_type: None,
        });

        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["flavorRef"], "f1");
        assert_eq!(json["imageRef"], "img-1");
        assert_eq!(json["networks"], "none");
        let bdm = &json["block_device_mapping_v2"][0];
        assert_eq!(bdm["source_type"], "image");
        assert_eq!(bdm["volume_size"], 10);
        assert!(bdm.get("volume_type").is_none());
    }

    #[test]
    fn mapping_without_size_omits_the_field() {
        let bdm = BlockDeviceMapping {
            boot_index: 0,
            uuid: "vol-1".into(),
            source_type: "volume".into(),
            destination_type: "volume".into(),
            volume_size: None,
            delete_on_termination: true,
            disk_bus: None,
            volume_type: None,
        };
        let json = serde_json::to_value(&bdm).unwrap();
        assert!(json.get("volume_size").is_none());
        assert!(json.get("disk_bus").is_none());
    }

    #[test]
    fn parses_server_detail_extensions() {
        let body = r#"{
            "id": "abc",
            "name": "web1",
            "status": "ACTIVE",
            "OS-EXT-STS:power_state": 1,
            "OS-EXT-STS:task_state": null,
            "created": "2026-01-01T00:00:00Z"
        }"#;
        let detail: ServerDetail = serde_json::from_str(body).unwrap();
        assert_eq!(detail.status, "ACTIVE");
        assert_eq!(detail.power_state, 1);
        assert!(detail.task_state.is_none());
    }

    #[test]
    fn attach_request_shapes() {
        let req = AttachInterfaceRequest {
            interface_attachment: AttachInterfaceBody {
                net_id: Some("net-1"),
                port_id: None,
                fixed_ips: vec![FixedIpRequest {
                    ip_address: "10.0.0.5",
                }],
            },
        };
        let json = serde_json::to_value(&req).unwrap();
        let body = &json["interfaceAttachment"];
        assert_eq!(body["net_id"], "net-1");
        assert!(body.get("port_id").is_none());
        assert_eq!(body["fixed_ips"][0]["ip_address"], "10.0.0.5");

        let bare = AttachInterfaceRequest {
            interface_attachment: AttachInterfaceBody {
                net_id: Some("net-1"),
                port_id: None,
                fixed_ips: vec![],
            },
        };
        let json = serde_json::to_value(&bare).unwrap();
        assert!(json["interfaceAttachment"].get("fixed_ips").is_none());
    }

    #[test]
    fn power_state_labels() {
        assert_eq!(power_state_label(1), "RUNNING");
        assert_eq!(power_state_label(4), "SHUTDOWN");
        assert_eq!(power_state_label(42), "UNKNOWN");
    }
}
