//! Network attachment protocol.
//!
//! Interfaces are attached one at a time, strictly in request order: some
//! backends apply boot-order-like precedence by attach order, and operators
//! rely on network[0] being the primary interface.

use std::thread;
use std::time::Duration;

use osvm_core::{Error, Result};
use serde::Serialize;

use crate::ops::{ComputeOps, NetworkOps};

/// One requested interface: a network plus an optional fixed IP or MAC.
#[derive(Debug, Clone, Default)]
pub struct NetworkRequest {
    /// Network name or ID; resolved at attach time.
    pub network: String,
    pub fixed_ip: Option<String>,
    pub mac: Option<String>,
}

/// The observed result of one attachment, in request order.
#[derive(Debug, Clone, Serialize)]
pub struct NetworkAttachment {
    pub network_id: String,
    pub port_id: String,
    pub mac_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Attach every requested network to `server_id`, in order.
///
/// A MAC request goes through an explicitly created port, the only way the
/// backend accepts caller-chosen MACs. A fixed-IP request that fails is
/// retried exactly once without the IP (an unmanaged interface), degrading to
/// best-effort connectivity; a second failure aborts the run. After each
/// successful attach the backend's interface plumbing needs `settle` before
/// the next attach on the same server.
pub fn attach_networks(
    svc: &(impl ComputeOps + NetworkOps),
    server_id: &str,
    requests: &[NetworkRequest],
    settle: Duration,
) -> Result<Vec<NetworkAttachment>> {
    let mut attachments = Vec::with_capacity(requests.len());

    for request in requests {
        let network_id = svc.resolve_network(&request.network)?;

        let attached = if let Some(mac) = &request.mac {
            tracing::info!(network = %network_id, %mac, "attaching via pre-created port");
            let port = svc.create_port(&network_id, Some(mac))?;
            svc.attach_interface(server_id, None, Some(&port.id), None)?
        } else if let Some(ip) = &request.fixed_ip {
            tracing::info!(network = %network_id, %ip, "attaching with fixed IP");
            match svc.attach_interface(server_id, Some(&network_id), None, Some(ip)) {
                Ok(attached) => attached,
                Err(first) => {
                    // IP exhaustion and policy conflicts are common; degrade
                    // to an unmanaged interface rather than abort the run.
                    tracing::warn!(network = %network_id, %ip, error = %first,
                        "fixed IP attach failed, retrying unmanaged");
                    svc.attach_interface(server_id, Some(&network_id), None, None)
                        .map_err(|second| Error::RetryExhausted {
                            operation: format!("attach network {network_id}"),
                            detail: second.to_string(),
                        })?
                }
            }
        } else {
            tracing::info!(network = %network_id, "attaching with auto-assigned address");
            svc.attach_interface(server_id, Some(&network_id), None, None)?
        };

        let mac_address = if attached.mac_addr.is_empty() {
            "UNKNOWN".to_string()
        } else {
            attached.mac_addr.to_uppercase()
        };
        let ip_address = attached
            .fixed_ips
            .first()
            .map(|ip| ip.ip_address.clone())
            .or_else(|| request.fixed_ip.clone());

        attachments.push(NetworkAttachment {
            network_id,
            port_id: attached.port_id,
            mac_address,
            ip_address,
        });

        if !settle.is_zero() {
            thread::sleep(settle);
        }
    }

    Ok(attachments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPlatform;

    fn net(network: &str) -> NetworkRequest {
        NetworkRequest {
            network: network.into(),
            ..Default::default()
        }
    }

    fn net_ip(network: &str, ip: &str) -> NetworkRequest {
        NetworkRequest {
            network: network.into(),
            fixed_ip: Some(ip.into()),
            ..Default::default()
        }
    }

    fn net_mac(network: &str, mac: &str) -> NetworkRequest {
        NetworkRequest {
            network: network.into(),
            mac: Some(mac.into()),
            ..Default::default()
        }
    }

    #[test]
    fn attaches_in_request_order() {
        let mock = MockPlatform::new();
        let requests = vec![net("netA"), net("netB"), net("netC")];
        let result = attach_networks(&mock, "srv-1", &requests, Duration::ZERO).unwrap();

        assert_eq!(result.len(), 3);
        assert_eq!(result[0].network_id, "netA");
        assert_eq!(result[1].network_id, "netB");
        assert_eq!(result[2].network_id, "netC");

        let log = mock.attach_log.borrow();
        assert_eq!(log.len(), 3);
        assert_eq!(log[0].net_id.as_deref(), Some("netA"));
        assert_eq!(log[2].net_id.as_deref(), Some("netC"));
    }

    #[test]
    fn fixed_ip_failure_retries_once_unmanaged() {
        let mock = MockPlatform::new();
        mock.fail("attach_fixed_ip");

        let result =
            attach_networks(&mock, "srv-1", &[net_ip("netA", "10.0.0.5")], Duration::ZERO)
                .unwrap();

        let log = mock.attach_log.borrow();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].fixed_ip.as_deref(), Some("10.0.0.5"));
        assert!(log[1].fixed_ip.is_none());
        // Unmanaged fallback still reports the requested IP when the backend
        // omits one.
        assert_eq!(result[0].ip_address.as_deref(), Some("10.0.0.5"));
    }

    #[test]
    fn second_failure_aborts_without_a_third_attempt() {
        let mock = MockPlatform::new();
        mock.fail("attach_interface");

        let err =
            attach_networks(&mock, "srv-1", &[net_ip("netA", "10.0.0.5")], Duration::ZERO)
                .unwrap_err();

        assert!(matches!(err, Error::RetryExhausted { .. }));
        assert_eq!(mock.attach_log.borrow().len(), 2);
    }

    #[test]
    fn mac_request_creates_port_then_attaches_it() {
        let mock = MockPlatform::new();
        let result = attach_networks(
            &mock,
            "srv-1",
            &[net_mac("netA", "aa:bb:cc:dd:ee:ff")],
            Duration::ZERO,
        )
        .unwrap();

        assert_eq!(mock.count("create_port"), 1);
        let log = mock.attach_log.borrow();
        assert_eq!(log.len(), 1);
        assert!(log[0].net_id.is_none());
        assert_eq!(log[0].port_id.as_deref(), Some("port-1"));
        assert_eq!(result[0].mac_address, "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn mac_path_failure_is_fatal_without_retry() {
        let mock = MockPlatform::new();
        mock.fail("attach_interface");

        let err = attach_networks(
            &mock,
            "srv-1",
            &[net_mac("netA", "aa:bb:cc:dd:ee:ff")],
            Duration::ZERO,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Api { .. }));
        assert_eq!(mock.attach_log.borrow().len(), 1);
    }

    #[test]
    fn auto_request_reports_backend_assigned_ip() {
        let mock = MockPlatform::new();
        mock.respond_ip.replace(Some("192.168.9.7".into()));

        let result = attach_networks(&mock, "srv-1", &[net("netB")], Duration::ZERO).unwrap();
        assert_eq!(result[0].ip_address.as_deref(), Some("192.168.9.7"));
    }

    #[test]
    fn empty_mac_in_response_reports_unknown() {
        let mock = MockPlatform::new();
        mock.respond_mac.replace(String::new());

        let result = attach_networks(&mock, "srv-1", &[net("netA")], Duration::ZERO).unwrap();
        assert_eq!(result[0].mac_address, "UNKNOWN");
    }
}
