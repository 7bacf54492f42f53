//! Scriptable mock platform for orchestrator tests.
//!
//! Status queues drive the polled resources (the last entry is sticky), the
//! `fail` set injects failures per operation, and every call is counted so
//! tests can assert exact call sequences.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::Path;

use osvm_api::compute::{CreateServerRequest, FixedIp, InterfaceAttachment, ServerDetail};
use osvm_api::images::{CreateImageRequest, Image};
use osvm_api::ports::Port;
use osvm_api::volumes::{CreateVolumeRequest, Volume};
use osvm_core::{Error, Result};

use crate::ops::{ComputeOps, ImageOps, NetworkOps, Platform, VolumeOps};

#[derive(Debug, Clone)]
pub struct AttachCall {
    pub net_id: Option<String>,
    pub port_id: Option<String>,
    pub fixed_ip: Option<String>,
}

pub struct MockPlatform {
    pub server_statuses: RefCell<VecDeque<String>>,
    pub volume_statuses: RefCell<VecDeque<String>>,
    pub image_statuses: RefCell<VecDeque<String>>,
    pub image_size: Cell<u64>,
    pub respond_mac: RefCell<String>,
    /// IP reported for attaches that did not request a fixed IP.
    pub respond_ip: RefCell<Option<String>>,
    pub attach_log: RefCell<Vec<AttachCall>>,
    pub last_create_server: RefCell<Option<CreateServerRequest>>,
    fail_ops: RefCell<HashSet<&'static str>>,
    calls: RefCell<HashMap<&'static str, u32>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self {
            server_statuses: RefCell::new(VecDeque::new()),
            volume_statuses: RefCell::new(VecDeque::new()),
            image_statuses: RefCell::new(VecDeque::new()),
            image_size: Cell::new(1024 * 1024 * 1024),
            respond_mac: RefCell::new("fa:16:3e:00:00:01".into()),
            respond_ip: RefCell::new(None),
            attach_log: RefCell::new(Vec::new()),
            last_create_server: RefCell::new(None),
            fail_ops: RefCell::new(HashSet::new()),
            calls: RefCell::new(HashMap::new()),
        }
    }

    /// Make `op` fail with an injected API error.
    pub fn fail(&self, op: &'static str) {
        self.fail_ops.borrow_mut().insert(op);
    }

    pub fn count(&self, op: &'static str) -> u32 {
        self.calls.borrow().get(op).copied().unwrap_or(0)
    }

    fn bump(&self, op: &'static str) {
        *self.calls.borrow_mut().entry(op).or_insert(0) += 1;
    }

    fn maybe_fail(&self, op: &'static str) -> Result<()> {
        if self.fail_ops.borrow().contains(op) {
            return Err(Error::Api {
                status: 500,
                message: format!("{op} injected failure"),
            });
        }
        Ok(())
    }

    fn pop_status(queue: &RefCell<VecDeque<String>>, default: &str) -> String {
        let mut queue = queue.borrow_mut();
        match queue.len() {
            0 => default.to_string(),
            1 => queue.front().cloned().unwrap_or_else(|| default.to_string()),
            _ => queue.pop_front().unwrap_or_else(|| default.to_string()),
        }
    }
}

impl ComputeOps for MockPlatform {
    fn create_server(&self, request: &CreateServerRequest) -> Result<String> {
        self.bump("create_server");
        self.maybe_fail("create_server")?;
        self.last_create_server.replace(Some(request.clone()));
        Ok("srv-1".into())
    }

    fn get_server(&self, server_id: &str) -> Result<ServerDetail> {
        self.bump("get_server");
        self.maybe_fail("get_server")?;
        let status = Self::pop_status(&self.server_statuses, "ACTIVE");
        let power_state = if status == "SHUTOFF" { 4 } else { 1 };
        Ok(ServerDetail {
            id: server_id.to_string(),
            name: "web1".into(),
            status,
            power_state,
            ..Default::default()
        })
    }

    fn attach_interface(
        &self,
        _server_id: &str,
        net_id: Option<&str>,
        port_id: Option<&str>,
        fixed_ip: Option<&str>,
    ) -> Result<InterfaceAttachment> {
        self.bump("attach_interface");
        self.attach_log.borrow_mut().push(AttachCall {
            net_id: net_id.map(str::to_string),
            port_id: port_id.map(str::to_string),
            fixed_ip: fixed_ip.map(str::to_string),
        });
        self.maybe_fail("attach_interface")?;
        if fixed_ip.is_some() {
            self.maybe_fail("attach_fixed_ip")?;
        }

        let fixed_ips = fixed_ip
            .map(str::to_string)
            .or_else(|| self.respond_ip.borrow().clone())
            .map(|ip| {
                vec![FixedIp {
                    ip_address: ip,
                    ..Default::default()
                }]
            })
            .unwrap_or_default();

        Ok(InterfaceAttachment {
            port_id: port_id.unwrap_or("port-auto").to_string(),
            net_id: net_id.unwrap_or_default().to_string(),
            mac_addr: self.respond_mac.borrow().clone(),
            port_state: "ACTIVE".into(),
            fixed_ips,
        })
    }

    fn stop_server(&self, _server_id: &str) -> Result<()> {
        self.bump("stop_server");
        self.maybe_fail("stop_server")
    }
}

impl VolumeOps for MockPlatform {
    fn create_volume(&self, _request: &CreateVolumeRequest) -> Result<Volume> {
        self.bump("create_volume");
        self.maybe_fail("create_volume")?;
        Ok(Volume {
            id: "vol-1".into(),
            status: "creating".into(),
            ..Default::default()
        })
    }

    fn get_volume(&self, volume_id: &str) -> Result<Volume> {
        self.bump("get_volume");
        self.maybe_fail("get_volume")?;
        Ok(Volume {
            id: volume_id.to_string(),
            status: Self::pop_status(&self.volume_statuses, "available"),
            ..Default::default()
        })
    }

    fn set_bootable(&self, _volume_id: &str) -> Result<()> {
        self.bump("set_bootable");
        self.maybe_fail("set_bootable")
    }
}

impl NetworkOps for MockPlatform {
    fn resolve_network(&self, name_or_id: &str) -> Result<String> {
        self.bump("resolve_network");
        self.maybe_fail("resolve_network")?;
        Ok(name_or_id.to_string())
    }

    fn create_port(&self, network_id: &str, mac_address: Option<&str>) -> Result<Port> {
        self.bump("create_port");
        self.maybe_fail("create_port")?;
        Ok(Port {
            id: "port-1".into(),
            network_id: network_id.to_string(),
            mac_address: mac_address.unwrap_or("fa:16:3e:aa:bb:cc").to_string(),
            ..Default::default()
        })
    }
}

impl ImageOps for MockPlatform {
    fn create_image(&self, _request: &CreateImageRequest) -> Result<String> {
        self.bump("create_image");
        self.maybe_fail("create_image")?;
        Ok("img-tmp-1".into())
    }

    fn get_image(&self, image_id: &str) -> Result<Image> {
        self.bump("get_image");
        self.maybe_fail("get_image")?;
        Ok(Image {
            id: image_id.to_string(),
            status: Self::pop_status(&self.image_statuses, "queued"),
            size: Some(self.image_size.get()),
            ..Default::default()
        })
    }

    fn upload_image_data(&self, _image_id: &str, _source: &Path) -> Result<()> {
        self.bump("upload_image_data");
        self.maybe_fail("upload_image_data")
    }

    fn image_size(&self, _image_id: &str) -> Result<u64> {
        self.bump("image_size");
        self.maybe_fail("image_size")?;
        Ok(self.image_size.get())
    }

    fn delete_image(&self, _image_id: &str) -> Result<()> {
        self.bump("delete_image");
        self.maybe_fail("delete_image")
    }
}

impl Platform for MockPlatform {}
