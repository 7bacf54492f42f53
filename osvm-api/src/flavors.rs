//! Flavor wrappers (Nova).

use osvm_core::{Error, Result};
use serde::{Deserialize, Serialize};

use crate::http;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

pub fn list_flavors(compute_url: &str, token: &str) -> Result<Vec<Flavor>> {
    #[derive(Deserialize)]
    struct Wrapper {
        flavors: Vec<Flavor>,
    }

    let url = format!("{compute_url}/flavors");
    let resp = http::get(&url, token)?;
    if resp.status != 200 {
        return Err(resp.into_api_error());
    }
    let parsed: Wrapper = http::parse(&resp)?;
    Ok(parsed.flavors)
}

/// Resolve a flavor name to its ID; substring match, ambiguity is an error.
pub fn flavor_id_by_name(compute_url: &str, token: &str, name: &str) -> Result<String> {
    if crate::is_uuid(name) {
        return Ok(name.to_string());
    }
    let flavors = list_flavors(compute_url, token)?;
    let found: Vec<&Flavor> = flavors.iter().filter(|f| f.name.contains(name)).collect();
    match found.as_slice() {
        [] => Err(Error::Precondition(format!("no flavors found for name {name}"))),
        [one] => Ok(one.id.clone()),
        _ => Err(Error::Precondition(format!(
            "multiple flavors found for name {name}"
        ))),
    }
}
