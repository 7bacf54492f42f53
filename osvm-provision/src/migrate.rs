//! Migration orchestrator.
//!
//! Streams a foreign disk image (VMDK) into a temporary image, provisions a
//! server from it, and deletes the temporary image no matter how the
//! provisioning went. The image is a build artifact: leaving it behind after
//! a successful migration would silently consume storage quota forever.

use std::path::PathBuf;
use std::time::Duration;

use osvm_api::images::CreateImageRequest;
use osvm_core::{Error, Result, Tuning};

use crate::attach::NetworkRequest;
use crate::ops::MigrationPlatform;
use crate::poller::{self, Classified, PollOptions};
use crate::provision::{provision_server, DiskBus, ProvisionRequest, ProvisionSummary};

const GIB: u64 = 1024 * 1024 * 1024;

// The image service reports `queued` almost immediately; this wait only
// bridges the record-creation round trip.
const IMAGE_READY_INTERVAL: Duration = Duration::from_secs(3);
const IMAGE_READY_ATTEMPTS: u32 = 5;

/// Immutable input to one migration run.
#[derive(Debug, Clone)]
pub struct MigrationRequest {
    pub name: String,
    pub flavor_ref: String,
    /// Local path of the disk image to stream.
    pub source: PathBuf,
    pub networks: Vec<NetworkRequest>,
    /// Root volume size; defaults to the uploaded image size rounded up to
    /// the next whole GiB, since under-provisioning would truncate the disk.
    pub boot_volume_gib: Option<u64>,
    pub disk_bus: DiskBus,
    pub volume_type: Option<String>,
    pub power_down: bool,
}

fn wait_image_ready(svc: &impl MigrationPlatform, image_id: &str, tuning: &Tuning) -> Result<()> {
    let opts = PollOptions {
        interval: tuning.poll_interval.min(IMAGE_READY_INTERVAL),
        max_attempts: IMAGE_READY_ATTEMPTS,
    };
    poller::wait_for(
        &opts,
        || svc.get_image(image_id),
        |image| match image.status.as_str() {
            "queued" => Classified::Ready,
            "error" | "killed" => Classified::Failed("image entered error state".into()),
            _ => Classified::Pending,
        },
    )
    .map_err(|e| {
        e.into_error(
            &format!("image {image_id} to be ready for upload"),
            |i| i.status.clone(),
        )
    })?;
    Ok(())
}

fn upload_and_provision(
    svc: &impl MigrationPlatform,
    request: &MigrationRequest,
    image_id: &str,
    tuning: &Tuning,
) -> Result<ProvisionSummary> {
    wait_image_ready(svc, image_id, tuning)?;

    tracing::info!(source = %request.source.display(), image = %image_id, "uploading disk image");
    svc.upload_image_data(image_id, &request.source)?;

    let size = svc.image_size(image_id)?;
    let boot_volume_gib = request.boot_volume_gib.unwrap_or_else(|| size.div_ceil(GIB));

    let provision = ProvisionRequest {
        name: request.name.clone(),
        flavor_ref: request.flavor_ref.clone(),
        image_ref: Some(image_id.to_string()),
        networks: request.networks.clone(),
        boot_volume_gib: Some(boot_volume_gib),
        user_data: None,
        disk_bus: Some(request.disk_bus),
        volume_type: request.volume_type.clone(),
        power_down: request.power_down,
    };
    provision_server(svc, &provision, tuning)
}

/// Migrate a VMDK-backed machine onto the control plane.
///
/// The temporary image is owned by this job for its whole lifetime and is
/// deleted unconditionally once the delegated provisioning step finishes,
/// success or failure. A deletion failure is reported, never swallowed.
pub fn migrate_server(
    svc: &impl MigrationPlatform,
    request: &MigrationRequest,
    tuning: &Tuning,
) -> Result<ProvisionSummary> {
    svc.check_ready()?;

    if !request.source.is_file() {
        return Err(Error::Precondition(format!(
            "disk image not found: {}",
            request.source.display()
        )));
    }

    tracing::info!(name = %request.name, "creating temporary image");
    let image_id = svc.create_image(&CreateImageRequest {
        name: format!("Migrated-{}", request.name),
        container_format: "bare".into(),
        disk_format: "vmdk".into(),
        visibility: Some("shared".into()),
    })?;

    let outcome = upload_and_provision(svc, request, &image_id, tuning);

    tracing::info!(image = %image_id, "deleting temporary image");
    let cleanup = svc.delete_image(&image_id);

    match (outcome, cleanup) {
        (Ok(summary), Ok(())) => Ok(summary),
        (Ok(summary), Err(delete_err)) => Err(Error::Cleanup {
            context: format!(
                "server {} was provisioned but temporary image {image_id} was not deleted",
                summary.id
            ),
            detail: delete_err.to_string(),
        }),
        (Err(run_err), Ok(())) => Err(run_err),
        (Err(run_err), Err(delete_err)) => Err(Error::Cleanup {
            context: format!("{run_err}; temporary image {image_id} was also not deleted"),
            detail: delete_err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPlatform;
    use std::io::Write;

    fn vmdk_fixture() -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"vmdk bytes").unwrap();
        f
    }

    fn request(source: PathBuf) -> MigrationRequest {
        MigrationRequest {
            name: "legacy1".into(),
            flavor_ref: "f1".into(),
            source,
            networks: vec![],
            boot_volume_gib: None,
            disk_bus: DiskBus::Sata,
            volume_type: None,
            power_down: false,
        }
    }

    #[test]
    fn missing_source_fails_before_any_call() {
        let mock = MockPlatform::new();
        let err = migrate_server(
            &mock,
            &request(PathBuf::from("/does/not/exist.vmdk")),
            &Tuning::immediate(),
        )
        .unwrap_err();

        assert!(matches!(err, Error::Precondition(_)));
        assert_eq!(mock.count("create_image"), 0);
    }

    #[test]
    fn success_deletes_temporary_image_exactly_once() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();

        let summary =
            migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate()).unwrap();

        assert_eq!(summary.id, "srv-1");
        assert_eq!(mock.count("create_image"), 1);
        assert_eq!(mock.count("upload_image_data"), 1);
        assert_eq!(mock.count("delete_image"), 1);
    }

    #[test]
    fn upload_failure_still_deletes_temporary_image() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.fail("upload_image_data");

        let err = migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate())
            .unwrap_err();

        assert!(matches!(err, Error::Api { .. }));
        assert_eq!(mock.count("delete_image"), 1);
        assert_eq!(mock.count("create_server"), 0);
    }

    #[test]
    fn image_error_state_still_deletes_temporary_image() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.image_statuses.borrow_mut().extend(["error".to_string()]);

        let err = migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate())
            .unwrap_err();

        assert!(matches!(err, Error::ResourceError { .. }));
        assert_eq!(mock.count("upload_image_data"), 0);
        assert_eq!(mock.count("delete_image"), 1);
    }

    #[test]
    fn server_error_still_deletes_temporary_image() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.server_statuses.borrow_mut().extend(["ERROR".to_string()]);

        let err = migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate())
            .unwrap_err();

        assert!(matches!(err, Error::ResourceError { .. }));
        assert_eq!(mock.count("delete_image"), 1);
    }

    #[test]
    fn cleanup_failure_after_success_is_reported() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.fail("delete_image");

        let err = migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate())
            .unwrap_err();

        match err {
            Error::Cleanup { context, .. } => {
                assert!(context.contains("srv-1"));
                assert!(context.contains("img-tmp-1"));
            }
            other => panic!("expected cleanup error, got {other}"),
        }
    }

    #[test]
    fn cleanup_failure_after_failure_reports_both() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.fail("delete_image");
        mock.server_statuses.borrow_mut().extend(["ERROR".to_string()]);

        let err = migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate())
            .unwrap_err();

        match err {
            Error::Cleanup { context, .. } => {
                assert!(context.contains("error state"));
                assert!(context.contains("was also not deleted"));
            }
            other => panic!("expected cleanup error, got {other}"),
        }
    }

    #[test]
    fn boot_volume_defaults_to_image_size_rounded_up() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.image_size.replace(3 * GIB / 2); // 1.5 GiB

        migrate_server(&mock, &request(fixture.path().into()), &Tuning::immediate()).unwrap();

        let create = mock.last_create_server.borrow();
        let mapping = &create.as_ref().unwrap().block_device_mapping_v2[0];
        assert_eq!(mapping.volume_size, Some(2));
        assert_eq!(mapping.disk_bus.as_deref(), Some("sata"));
        assert_eq!(mapping.source_type, "image");
    }

    #[test]
    fn explicit_boot_volume_size_wins() {
        let fixture = vmdk_fixture();
        let mock = MockPlatform::new();
        mock.image_size.replace(3 * GIB / 2);

        let mut req = request(fixture.path().into());
        req.boot_volume_gib = Some(20);
        migrate_server(&mock, &req, &Tuning::immediate()).unwrap();

        let create = mock.last_create_server.borrow();
        let mapping = &create.as_ref().unwrap().block_device_mapping_v2[0];
        assert_eq!(mapping.volume_size, Some(20));
    }
}
