//! The live implementation of the service traits, backed by osvm-api.

use std::fs::File;
use std::path::Path;

use osvm_api::compute::{CreateServerRequest, InterfaceAttachment, ServerDetail};
use osvm_api::images::{CreateImageRequest, Image};
use osvm_api::ports::Port;
use osvm_api::volumes::{CreateVolumeRequest, Volume};
use osvm_api::{auth::Token, compute, images, networks, ports, upload, volumes};
use osvm_core::{Error, Result};

use crate::ops::{ComputeOps, ImageOps, NetworkOps, Platform, VolumeOps};

/// Resolved endpoints plus the token used for every call in one run.
///
/// Construction fails if any required endpoint is missing from the catalog,
/// so no orchestration step can start against a half-usable token.
pub struct Services {
    token: Token,
    compute_url: String,
    storage_url: String,
    network_url: String,
    image_url: String,
}

impl Services {
    pub fn from_token(token: Token) -> Result<Self> {
        let compute_url = token.endpoint("compute")?;
        let storage_url = token.endpoint("volumev3")?;
        let network_url = token.endpoint("network")?;
        let image_url = token.endpoint("image")?;
        Ok(Self {
            token,
            compute_url,
            storage_url,
            network_url,
            image_url,
        })
    }

    pub fn token(&self) -> &Token {
        &self.token
    }

    pub fn compute_url(&self) -> &str {
        &self.compute_url
    }

    pub fn image_url(&self) -> &str {
        &self.image_url
    }

    fn tok(&self) -> &str {
        &self.token.value
    }
}

impl ComputeOps for Services {
    fn create_server(&self, request: &CreateServerRequest) -> Result<String> {
        compute::create_server(&self.compute_url, self.tok(), request)
    }

    fn get_server(&self, server_id: &str) -> Result<ServerDetail> {
        compute::get_server(&self.compute_url, self.tok(), server_id)
    }

    fn attach_interface(
        &self,
        server_id: &str,
        net_id: Option<&str>,
        port_id: Option<&str>,
        fixed_ip: Option<&str>,
    ) -> Result<InterfaceAttachment> {
        compute::attach_interface(&self.compute_url, self.tok(), server_id, net_id, port_id, fixed_ip)
    }

    fn stop_server(&self, server_id: &str) -> Result<()> {
        compute::stop_server(&self.compute_url, self.tok(), server_id)
    }
}

impl VolumeOps for Services {
    fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume> {
        volumes::create_volume(&self.storage_url, self.tok(), request)
    }

    fn get_volume(&self, volume_id: &str) -> Result<Volume> {
        volumes::get_volume(&self.storage_url, self.tok(), volume_id)
    }

    fn set_bootable(&self, volume_id: &str) -> Result<()> {
        volumes::set_bootable(&self.storage_url, self.tok(), volume_id, true)
    }
}

impl NetworkOps for Services {
    fn resolve_network(&self, name_or_id: &str) -> Result<String> {
        networks::network_id_by_name(&self.network_url, self.tok(), name_or_id)
    }

    fn create_port(&self, network_id: &str, mac_address: Option<&str>) -> Result<Port> {
        ports::create_port(&self.network_url, self.tok(), network_id, mac_address)
    }
}

impl ImageOps for Services {
    fn create_image(&self, request: &CreateImageRequest) -> Result<String> {
        images::create_image(&self.image_url, self.tok(), request)
    }

    fn get_image(&self, image_id: &str) -> Result<Image> {
        images::get_image(&self.image_url, self.tok(), image_id)
    }

    fn upload_image_data(&self, image_id: &str, source: &Path) -> Result<()> {
        let file = File::open(source)?;
        let size = file.metadata()?.len();
        let url = images::image_file_url(&self.image_url, image_id);
        upload::upload_file(&url, self.tok(), file, size)
    }

    fn image_size(&self, image_id: &str) -> Result<u64> {
        images::image_size(&self.image_url, self.tok(), image_id)
    }

    fn delete_image(&self, image_id: &str) -> Result<()> {
        images::delete_image(&self.image_url, self.tok(), image_id)
    }
}

impl Platform for Services {
    fn check_ready(&self) -> Result<()> {
        // Freshness is re-checked at the start of every run, not cached
        // across it.
        if self.token.is_expired() {
            return Err(Error::TokenInvalid {
                host: self.token.host.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn token_with(endpoints: &[(&str, &str)]) -> Token {
        Token {
            value: "tok".into(),
            host: "vhi1".into(),
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            endpoints: endpoints
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
            project: "dev".into(),
        }
    }

    #[test]
    fn requires_all_four_endpoints() {
        let full = token_with(&[
            ("compute", "https://c/v2.1"),
            ("volumev3", "https://v/v3"),
            ("network", "https://n"),
            ("image", "https://i"),
        ]);
        assert!(Services::from_token(full).is_ok());

        let missing = token_with(&[("compute", "https://c/v2.1")]);
        assert!(matches!(
            Services::from_token(missing),
            Err(Error::Precondition(_))
        ));
    }

    #[test]
    fn expired_token_fails_check_ready() {
        let mut token = token_with(&[
            ("compute", "https://c/v2.1"),
            ("volumev3", "https://v/v3"),
            ("network", "https://n"),
            ("image", "https://i"),
        ]);
        token.expires_at = chrono::Utc::now() - chrono::Duration::minutes(1);
        let svc = Services::from_token(token).unwrap();
        assert!(matches!(
            svc.check_ready(),
            Err(Error::TokenInvalid { .. })
        ));
    }
}
