//! libvirt implementation of the hypervisor traits.

use crate::error::NetworkError;
use crate::hypervisor::{Hypervisor, NetworkHandle, Session};
use virt::connect::Connect;
use virt::error::ErrorNumber;
use virt::network::Network;
use virt::sys;

/// Connects to libvirt at a fixed URI, one connection per session.
#[derive(Debug, Clone)]
pub struct LibvirtHypervisor {
    uri: String,
}

impl LibvirtHypervisor {
    pub fn new(uri: impl Into<String>) -> Self {
        Self { uri: uri.into() }
    }
}

impl Hypervisor for LibvirtHypervisor {
    type Session = LibvirtSession;

    fn connect(&self) -> Result<LibvirtSession, NetworkError> {
        tracing::debug!("Opening libvirt connection to {}", self.uri);

        let conn = Connect::open(Some(self.uri.as_str())).map_err(|e| {
            NetworkError::Connection(format!(
                "unable to initialize libvirt connection to {}: {}",
                self.uri, e
            ))
        })?;

        Ok(LibvirtSession { conn })
    }
}

pub struct LibvirtSession {
    conn: Connect,
}

impl LibvirtSession {
    fn lookup(
        &self,
        result: Result<Network, virt::error::Error>,
        id: &str,
    ) -> Result<Option<LibvirtNetwork>, NetworkError> {
        match result {
            Ok(inner) => Ok(Some(LibvirtNetwork {
                inner,
                id: id.to_string(),
            })),
            Err(e) if matches!(e.code(), ErrorNumber::NoNetwork) => Ok(None),
            Err(e) => Err(NetworkError::hypervisor(format!("look up network '{}'", id), e)),
        }
    }
}

impl Session for LibvirtSession {
    type Network = LibvirtNetwork;

    fn is_alive(&self) -> Result<bool, NetworkError> {
        self.conn
            .is_alive()
            .map_err(|e| NetworkError::Connection(format!("libvirt connection is not alive: {}", e)))
    }

    fn lookup_by_name(&self, name: &str) -> Result<Option<LibvirtNetwork>, NetworkError> {
        self.lookup(Network::lookup_by_name(&self.conn, name), name)
    }

    fn lookup_by_uuid(&self, uuid: &str) -> Result<Option<LibvirtNetwork>, NetworkError> {
        self.lookup(Network::lookup_by_uuid_string(&self.conn, uuid), uuid)
    }

    fn define_from_descriptor(&self, xml: &str) -> Result<LibvirtNetwork, NetworkError> {
        let inner = Network::define_xml(&self.conn, xml)
            .map_err(|e| NetworkError::hypervisor("define the vm network", e))?;
        let id = inner.get_name().unwrap_or_default();

        Ok(LibvirtNetwork { inner, id })
    }
}

impl Drop for LibvirtSession {
    fn drop(&mut self) {
        if let Err(e) = self.conn.close() {
            tracing::warn!("Failed to close libvirt connection: {}", e);
        }
    }
}

pub struct LibvirtNetwork {
    inner: Network,
    id: String,
}

impl LibvirtNetwork {
    fn failed(&self, action: &str, e: virt::error::Error) -> NetworkError {
        NetworkError::hypervisor(format!("{} network '{}'", action, self.id), e)
    }
}

impl NetworkHandle for LibvirtNetwork {
    fn set_autostart(&self, autostart: bool) -> Result<(), NetworkError> {
        self.inner
            .set_autostart(autostart)
            .map(|_| ())
            .map_err(|e| self.failed("set autostart on", e))
    }

    fn start(&self) -> Result<(), NetworkError> {
        self.inner
            .create()
            .map(|_| ())
            .map_err(|e| self.failed("start", e))
    }

    fn describe(&self) -> Result<String, NetworkError> {
        self.inner
            .get_xml_desc(0)
            .map_err(|e| self.failed("describe", e))
    }

    fn is_active(&self) -> Result<bool, NetworkError> {
        self.inner
            .is_active()
            .map_err(|e| self.failed("query state of", e))
    }

    fn stop(&self) -> Result<(), NetworkError> {
        self.inner.destroy().map_err(|e| self.failed("stop", e))
    }

    fn undefine(&self) -> Result<(), NetworkError> {
        self.inner.undefine().map_err(|e| self.failed("undefine", e))
    }

    fn apply_live_host_reservation(&self, host_xml: &str) -> Result<(), NetworkError> {
        self.inner
            .update(
                sys::VIR_NETWORK_UPDATE_COMMAND_ADD_LAST,
                sys::VIR_NETWORK_SECTION_IP_DHCP_HOST,
                -1,
                host_xml,
                sys::VIR_NETWORK_UPDATE_AFFECT_LIVE,
            )
            .map_err(|e| self.failed("add dhcp host to", e))
    }
}

impl Drop for LibvirtNetwork {
    fn drop(&mut self) {
        if let Err(e) = self.inner.free() {
            tracing::warn!("Failed to release libvirt network '{}': {}", self.id, e);
        }
    }
}
