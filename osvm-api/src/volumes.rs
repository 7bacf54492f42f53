//! Block storage service (Cinder) wrappers.

use osvm_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::http;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub bootable: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateVolumeRequest {
    pub name: String,
    pub size: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume_type: Option<String>,
}

/// Create a volume; creation is asynchronous, callers wait for `available`.
pub fn create_volume(storage_url: &str, token: &str, request: &CreateVolumeRequest) -> Result<Volume> {
    #[derive(Serialize)]
    struct Wrapper<'a> {
        volume: &'a CreateVolumeRequest,
    }
    #[derive(Deserialize)]
    struct RespWrapper {
        volume: Volume,
    }

    let url = format!("{storage_url}/volumes");
    let resp = http::post(&url, token, &Wrapper { volume: request })?;
    if resp.status != 202 {
        return Err(resp.into_api_error());
    }
    let parsed: RespWrapper = http::parse(&resp)?;
    Ok(parsed.volume)
}

pub fn get_volume(storage_url: &str, token: &str, volume_id: &str) -> Result<Volume> {
    #[derive(Deserialize)]
    struct Wrapper {
        volume: Volume,
    }

    let url = format!("{storage_url}/volumes/{volume_id}");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.volume)
}

pub fn list_volumes(storage_url: &str, token: &str) -> Result<Vec<Volume>> {
    #[derive(Deserialize)]
    struct Wrapper {
        volumes: Vec<Volume>,
    }

    let url = format!("{storage_url}/volumes/detail");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.volumes)
}

pub fn delete_volume(storage_url: &str, token: &str, volume_id: &str) -> Result<()> {
    let url = format!("{storage_url}/volumes/{volume_id}");
    let resp = http::delete(&url, token)?;
    if resp.status != 204 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

/// Flag a volume bootable. A blank volume cannot boot a server without this.
pub fn set_bootable(storage_url: &str, token: &str, volume_id: &str, bootable: bool) -> Result<()> {
    let url = format!("{storage_url}/volumes/{volume_id}/action");
    let body = serde_json::json!({ "os-set_bootable": { "bootable": bootable } });
    let resp = http::post(&url, token, &body)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

/// Resolve a volume name to its ID; exact match, ambiguity is an error.
pub fn volume_id_by_name(storage_url: &str, token: &str, name: &str) -> Result<String> {
    if crate::is_uuid(name) {
        return Ok(name.to_string());
    }
    let volumes = list_volumes(storage_url, token)?;
    let found: Vec<&Volume> = volumes
        .iter()
        .filter(|v| v.name.as_deref() == Some(name))
        .collect();
    match found.as_slice() {
        [] => Err(Error::Precondition(format!("no volumes found for name {name}"))),
        [one] => Ok(one.id.clone()),
        _ => Err(Error::Precondition(format!(
            "multiple volumes found for name {name}"
        ))),
    }
}
