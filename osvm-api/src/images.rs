//! Image service (Glance) wrappers.

use osvm_core::{Error, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::http;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: String,
    /// Absent until data has been uploaded.
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default)]
    pub disk_format: Option<String>,
    #[serde(default)]
    pub visibility: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateImageRequest {
    pub name: String,
    pub container_format: String,
    pub disk_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
}

/// Create an image record (no data yet); returns the image ID.
pub fn create_image(image_url: &str, token: &str, request: &CreateImageRequest) -> Result<String> {
    if request.disk_format.is_empty() {
        return Err(Error::Precondition("disk_format must be specified".into()));
    }
    if request.container_format.is_empty() {
        return Err(Error::Precondition(
            "container_format must be specified".into(),
        ));
    }

    let url = format!("{image_url}/v2/images");
    let resp = http::post(&url, token, request)?;
    if resp.status != 201 {
        return Err(resp.into_api_error());
    }
    let image: Image = http::parse(&resp)?;
    Ok(image.id)
}

pub fn get_image(image_url: &str, token: &str, image_id: &str) -> Result<Image> {
    let url = format!("{image_url}/v2/images/{image_id}");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    http::parse(&resp)
}

pub fn list_images(image_url: &str, token: &str, query: &[(&str, &str)]) -> Result<Vec<Image>> {
    #[derive(Deserialize)]
    struct Wrapper {
        images: Vec<Image>,
    }

    let mut url = Url::parse(&format!("{image_url}/v2/images"))
        .map_err(|e| Error::Precondition(format!("bad image endpoint URL: {e}")))?;
    for (key, value) in query {
        url.query_pairs_mut().append_pair(key, value);
    }

    let resp = http::get(url.as_str(), token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.images)
}

pub fn delete_image(image_url: &str, token: &str, image_id: &str) -> Result<()> {
    let url = format!("{image_url}/v2/images/{image_id}");
    let resp = http::delete(&url, token)?;
    if resp.status != 204 {
        return Err(resp.into_api_error());
    }
    Ok(())
}

/// URL of the binary data endpoint for an image, fed to the upload channel.
pub fn image_file_url(image_url: &str, image_id: &str) -> String {
    format!("{image_url}/v2/images/{image_id}/file")
}

pub fn image_size(image_url: &str, token: &str, image_id: &str) -> Result<u64> {
    let image = get_image(image_url, token, image_id)?;
    image.size.ok_or_else(|| {
        Error::Precondition(format!("image {image_id} has no size reported yet"))
    })
}

/// Resolve an image name to its ID; substring match, ambiguity is an error.
pub fn image_id_by_name(image_url: &str, token: &str, name: &str) -> Result<String> {
    if crate::is_uuid(name) {
        return Ok(name.to_string());
    }
    let images = list_images(image_url, token, &[])?;
    let found: Vec<&Image> = images
        .iter()
        .filter(|i| i.name.as_deref().is_some_and(|n| n.contains(name)))
        .collect();
    match found.as_slice() {
        [] => Err(Error::Precondition(format!("no images found for name {name}"))),
        [one] => Ok(one.id.clone()),
        _ => Err(Error::Precondition(format!(
            "multiple images found for name {name}"
        ))),
    }
}
