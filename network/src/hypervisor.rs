//! Narrow view of the virtualization control plane.
//!
//! Sessions and network handles release their control-plane resources when
//! dropped, so every exit path of an operation cleans up after itself.

use crate::error::NetworkError;

/// Local system libvirt daemon.
pub const DEFAULT_LIBVIRT_URI: &str = "qemu:///system";

pub trait Hypervisor {
    type Session: Session;

    /// Open a new session. Each lifecycle operation opens its own.
    fn connect(&self) -> Result<Self::Session, NetworkError>;
}

pub trait Session {
    type Network: NetworkHandle;

    fn is_alive(&self) -> Result<bool, NetworkError>;

    /// `Ok(None)` when no network carries this name.
    fn lookup_by_name(&self, name: &str) -> Result<Option<Self::Network>, NetworkError>;

    /// `Ok(None)` when no network carries this UUID.
    fn lookup_by_uuid(&self, uuid: &str) -> Result<Option<Self::Network>, NetworkError>;

    /// Register a persistent (inactive) network from its XML definition.
    fn define_from_descriptor(&self, xml: &str) -> Result<Self::Network, NetworkError>;
}

pub trait NetworkHandle {
    fn set_autostart(&self, autostart: bool) -> Result<(), NetworkError>;

    fn start(&self) -> Result<(), NetworkError>;

    fn describe(&self) -> Result<String, NetworkError>;

    fn is_active(&self) -> Result<bool, NetworkError>;

    /// Stop a running network. The definition stays registered.
    fn stop(&self) -> Result<(), NetworkError>;

    fn undefine(&self) -> Result<(), NetworkError>;

    /// Append a DHCP host entry to the running network only. The persistent
    /// definition is not touched.
    fn apply_live_host_reservation(&self, host_xml: &str) -> Result<(), NetworkError>;
}
