//! Boot source resolution.
//!
//! Decides whether the server boots from an image or from a freshly created
//! blank volume, and produces the block device mapping for the create call.

use osvm_api::compute::BlockDeviceMapping;
use osvm_api::volumes::CreateVolumeRequest;
use osvm_core::{Result, Tuning};

use crate::ops::VolumeOps;
use crate::poller::{self, Classified, PollOptions};
use crate::provision::ProvisionRequest;

/// Root volume size when the caller does not specify one.
pub const DEFAULT_BOOT_GIB: u64 = 10;

/// Build the boot mapping for `request`.
///
/// With an image reference the compute service materializes the volume from
/// the image during server creation; nothing to pre-create. Without one, a
/// blank volume is created, waited to `available`, and explicitly flagged
/// bootable, because the backend will not boot an unformatted blank volume
/// otherwise. Either branch fails fast before any server is created.
pub fn resolve_boot_source(
    volumes: &impl VolumeOps,
    request: &ProvisionRequest,
    tuning: &Tuning,
) -> Result<BlockDeviceMapping> {
    let size = request.boot_volume_gib.unwrap_or(DEFAULT_BOOT_GIB);

    if let Some(image_ref) = &request.image_ref {
        return Ok(BlockDeviceMapping {
            boot_index: 0,
            uuid: image_ref.clone(),
            source_type: "image".into(),
            destination_type: "volume".into(),
            volume_size: Some(size),
            delete_on_termination: true,
            disk_bus: request.disk_bus.map(|b| b.as_str().to_string()),
            volume_type: request.volume_type.clone(),
        });
    }

    tracing::info!(name = %request.name, size, "creating blank boot volume");
    let volume = volumes.create_volume(&CreateVolumeRequest {
        name: format!("{}-boot", request.name),
        size,
        description: Some(format!("Boot volume for {}", request.name)),
        volume_type: request.volume_type.clone(),
    })?;

    let opts = PollOptions {
        interval: tuning.poll_interval,
        max_attempts: tuning.poll_max_attempts,
    };
    let volume = poller::wait_for(
        &opts,
        || volumes.get_volume(&volume.id),
        |v| match v.status.as_str() {
            "available" => Classified::Ready,
            "error" => Classified::Failed("volume entered error state".into()),
            _ => Classified::Pending,
        },
    )
    .map_err(|e| {
        e.into_error(
            &format!("volume {} to become available", volume.id),
            |v| v.status.clone(),
        )
    })?;

    volumes.set_bootable(&volume.id)?;

    Ok(BlockDeviceMapping {
        boot_index: 0,
        uuid: volume.id,
        source_type: "volume".into(),
        destination_type: "volume".into(),
        volume_size: None,
        delete_on_termination: true,
        disk_bus: None,
        volume_type: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPlatform;
    use osvm_core::Error;

    fn request(image: Option<&str>) -> ProvisionRequest {
        ProvisionRequest {
            name: "web1".into(),
            flavor_ref: "f1".into(),
            image_ref: image.map(str::to_string),
            networks: vec![],
            boot_volume_gib: None,
            user_data: None,
            disk_bus: None,
            volume_type: None,
            power_down: false,
        }
    }

    #[test]
    fn image_ref_yields_image_mapping_without_volume_calls() {
        let mock = MockPlatform::new();
        let mapping =
            resolve_boot_source(&mock, &request(Some("img-1")), &Tuning::immediate()).unwrap();

        assert_eq!(mapping.source_type, "image");
        assert_eq!(mapping.uuid, "img-1");
        assert_eq!(mapping.volume_size, Some(DEFAULT_BOOT_GIB));
        assert_eq!(mock.count("create_volume"), 0);
        assert_eq!(mock.count("set_bootable"), 0);
    }

    #[test]
    fn explicit_size_overrides_default() {
        let mut req = request(Some("img-1"));
        req.boot_volume_gib = Some(40);
        let mock = MockPlatform::new();
        let mapping = resolve_boot_source(&mock, &req, &Tuning::immediate()).unwrap();
        assert_eq!(mapping.volume_size, Some(40));
    }

    #[test]
    fn blank_volume_branch_marks_bootable_exactly_once() {
        let mock = MockPlatform::new();
        mock.volume_statuses
            .borrow_mut()
            .extend(["creating".to_string(), "available".to_string()]);

        let mapping = resolve_boot_source(&mock, &request(None), &Tuning::immediate()).unwrap();

        assert_eq!(mapping.source_type, "volume");
        assert_eq!(mapping.uuid, "vol-1");
        assert_eq!(mapping.volume_size, None);
        assert_eq!(mock.count("create_volume"), 1);
        assert_eq!(mock.count("set_bootable"), 1);
    }

    #[test]
    fn volume_error_state_fails_fast() {
        let mock = MockPlatform::new();
        mock.volume_statuses.borrow_mut().extend(["error".to_string()]);

        let err = resolve_boot_source(&mock, &request(None), &Tuning::immediate()).unwrap_err();
        assert!(matches!(err, Error::ResourceError { .. }));
        assert_eq!(mock.count("set_bootable"), 0);
    }

    #[test]
    fn volume_create_failure_aborts_before_polling() {
        let mock = MockPlatform::new();
        mock.fail("create_volume");

        let err = resolve_boot_source(&mock, &request(None), &Tuning::immediate()).unwrap_err();
        assert!(matches!(err, Error::Api { .. }));
        assert_eq!(mock.count("get_volume"), 0);
    }
}
