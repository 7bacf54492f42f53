//! Provisioning orchestrator.
//!
//! Sequences boot source resolution, server creation, the ACTIVE wait, the
//! network attachment protocol, and the optional power-down into one
//! operation. Steps run strictly in this order on a single thread of
//! control; concurrent invocations are independent and uncoordinated.

use std::fmt;
use std::str::FromStr;

use osvm_api::compute::{power_state_label, CreateServerRequest, ServerDetail};
use osvm_core::{Error, Result, Tuning};
use serde::Serialize;

use crate::attach::{attach_networks, NetworkAttachment, NetworkRequest};
use crate::boot::resolve_boot_source;
use crate::ops::Platform;
use crate::poller::{self, Classified, PollOptions};

/// Disk bus for the root volume. Only these three are known to produce a
/// bootable guest; anything else is rejected before any network call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskBus {
    Sata,
    Scsi,
    Virtio,
}

impl DiskBus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiskBus::Sata => "sata",
            DiskBus::Scsi => "scsi",
            DiskBus::Virtio => "virtio",
        }
    }
}

impl fmt::Display for DiskBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DiskBus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "sata" => Ok(DiskBus::Sata),
            "scsi" => Ok(DiskBus::Scsi),
            "virtio" => Ok(DiskBus::Virtio),
            other => Err(Error::Precondition(format!(
                "disk bus must be one of: sata, scsi, virtio (got '{other}')"
            ))),
        }
    }
}

/// Immutable input to one provisioning run. Constructed once by the caller,
/// never mutated.
#[derive(Debug, Clone)]
pub struct ProvisionRequest {
    pub name: String,
    pub flavor_ref: String,
    /// Boot from this image; a blank boot volume is created when absent.
    pub image_ref: Option<String>,
    /// Interfaces to attach once ACTIVE, in order; network[0] is primary.
    pub networks: Vec<NetworkRequest>,
    pub boot_volume_gib: Option<u64>,
    /// Base64-encoded cloud-init payload.
    pub user_data: Option<String>,
    pub disk_bus: Option<DiskBus>,
    pub volume_type: Option<String>,
    /// Gracefully stop the server after attachment. Soft stop only; a guest
    /// without an ACPI listener can take minutes.
    pub power_down: bool,
}

/// Outcome record the CLI renders as a table, JSON, or YAML.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionSummary {
    pub id: String,
    pub name: String,
    pub power_state: String,
    pub networks: Vec<NetworkAttachment>,
}

fn classify_server(target: &str) -> impl Fn(&ServerDetail) -> Classified + '_ {
    move |server| {
        if server.status.eq_ignore_ascii_case("ERROR") {
            Classified::Failed("status ERROR".into())
        } else if server.status.eq_ignore_ascii_case(target) {
            Classified::Ready
        } else {
            Classified::Pending
        }
    }
}

/// Wait until `server_id` reaches `target` status, with ERROR terminal.
pub fn wait_for_server_status(
    svc: &impl Platform,
    server_id: &str,
    target: &str,
    tuning: &Tuning,
) -> Result<ServerDetail> {
    let opts = PollOptions {
        interval: tuning.poll_interval,
        max_attempts: tuning.poll_max_attempts,
    };
    poller::wait_for(&opts, || svc.get_server(server_id), classify_server(target)).map_err(|e| {
        e.into_error(&format!("server {server_id} to reach {target}"), |s| {
            s.status.clone()
        })
    })
}

/// Bring a server to a running (or, with `power_down`, stopped) state.
///
/// ERROR during the ACTIVE wait is terminal and surfaces immediately; server
/// creation is never retried. Per-network attach failures are handled inside
/// the attachment protocol; a partially-networked but running server is a
/// valid, inspectable outcome, never torn down from here.
pub fn provision_server(
    svc: &impl Platform,
    request: &ProvisionRequest,
    tuning: &Tuning,
) -> Result<ProvisionSummary> {
    svc.check_ready()?;

    let mapping = resolve_boot_source(svc, request, tuning)?;

    let mut create = CreateServerRequest::new(&request.name, &request.flavor_ref);
    create.image_ref = request.image_ref.clone();
    create.user_data = request.user_data.clone();
    create.block_device_mapping_v2.push(mapping);

    tracing::info!(name = %request.name, "creating server");
    let server_id = svc.create_server(&create)?;

    let detail = wait_for_server_status(svc, &server_id, "ACTIVE", tuning)?;
    tracing::info!(id = %server_id, "server is ACTIVE");

    let networks = attach_networks(svc, &server_id, &request.networks, tuning.attach_settle)?;

    let detail = if request.power_down {
        tracing::info!(id = %server_id, "requesting graceful stop");
        svc.stop_server(&server_id)?;
        wait_for_server_status(svc, &server_id, "SHUTOFF", tuning)?
    } else {
        detail
    };

    Ok(ProvisionSummary {
        id: detail.id,
        name: detail.name,
        power_state: power_state_label(detail.power_state).to_string(),
        networks,
    })
}
