//! Service traits the orchestrators are written against.
//!
//! These mirror the four verb shapes the control plane exposes
//! (create-resource, get-resource, delete-resource, upload-binary), narrowed
//! to exactly the operations the orchestration sequences need. The real
//! implementation is [`crate::services::Services`]; tests substitute mocks.

use std::path::Path;

use osvm_api::compute::{CreateServerRequest, InterfaceAttachment, ServerDetail};
use osvm_api::images::{CreateImageRequest, Image};
use osvm_api::ports::Port;
use osvm_api::volumes::{CreateVolumeRequest, Volume};
use osvm_core::Result;

pub trait ComputeOps {
    /// Create a server and return its ID; creation is asynchronous.
    fn create_server(&self, request: &CreateServerRequest) -> Result<String>;
    fn get_server(&self, server_id: &str) -> Result<ServerDetail>;
    fn attach_interface(
        &self,
        server_id: &str,
        net_id: Option<&str>,
        port_id: Option<&str>,
        fixed_ip: Option<&str>,
    ) -> Result<InterfaceAttachment>;
    /// Graceful stop request; completion is observed by polling.
    fn stop_server(&self, server_id: &str) -> Result<()>;
}

pub trait VolumeOps {
    fn create_volume(&self, request: &CreateVolumeRequest) -> Result<Volume>;
    fn get_volume(&self, volume_id: &str) -> Result<Volume>;
    fn set_bootable(&self, volume_id: &str) -> Result<()>;
}

pub trait NetworkOps {
    /// Resolve a network name or ID to an ID.
    fn resolve_network(&self, name_or_id: &str) -> Result<String>;
    fn create_port(&self, network_id: &str, mac_address: Option<&str>) -> Result<Port>;
}

pub trait ImageOps {
    fn create_image(&self, request: &CreateImageRequest) -> Result<String>;
    fn get_image(&self, image_id: &str) -> Result<Image>;
    /// Stream a local file to the image's data endpoint.
    fn upload_image_data(&self, image_id: &str, source: &Path) -> Result<()>;
    fn image_size(&self, image_id: &str) -> Result<u64>;
    fn delete_image(&self, image_id: &str) -> Result<()>;
}

/// Everything a plain provisioning run needs.
pub trait Platform: ComputeOps + VolumeOps + NetworkOps {
    /// Called once at the start of every orchestrator run, before any other
    /// call; the place where token freshness is enforced.
    fn check_ready(&self) -> Result<()> {
        Ok(())
    }
}

/// A provisioning platform that can also manage images, for migrations.
pub trait MigrationPlatform: Platform + ImageOps {}

impl<T: Platform + ImageOps> MigrationPlatform for T {}
