//! Picks the hypervisor the lifecycle commands talk to.

use snoman_network::NetworkManager;

#[cfg(feature = "libvirt")]
pub fn connect(
    uri: &str,
) -> Result<NetworkManager<snoman_network::LibvirtHypervisor>, Box<dyn std::error::Error>> {
    tracing::debug!("Using libvirt at {}", uri);
    Ok(NetworkManager::new(snoman_network::LibvirtHypervisor::new(uri)))
}

#[cfg(not(feature = "libvirt"))]
pub fn connect(uri: &str) -> Result<NetworkManager<unavailable::Unavailable>, Box<dyn std::error::Error>> {
    Err(format!(
        "cannot connect to {}: snoman was built without libvirt support, rebuild with `--features libvirt`",
        uri
    )
    .into())
}

#[cfg(not(feature = "libvirt"))]
mod unavailable {
    use snoman_network::{Hypervisor, NetworkError, NetworkHandle, Session};

    /// Stand-in hypervisor for builds without a backend. It has no values,
    /// so none of these methods can ever be called.
    pub enum Unavailable {}

    impl Hypervisor for Unavailable {
        type Session = Unavailable;

        fn connect(&self) -> Result<Unavailable, NetworkError> {
            match *self {}
        }
    }

    impl Session for Unavailable {
        type Network = Unavailable;

        fn is_alive(&self) -> Result<bool, NetworkError> {
            match *self {}
        }

        fn lookup_by_name(&self, _name: &str) -> Result<Option<Unavailable>, NetworkError> {
            match *self {}
        }

        fn lookup_by_uuid(&self, _uuid: &str) -> Result<Option<Unavailable>, NetworkError> {
            match *self {}
        }

        fn define_from_descriptor(&self, _xml: &str) -> Result<Unavailable, NetworkError> {
            match *self {}
        }
    }

    impl NetworkHandle for Unavailable {
        fn set_autostart(&self, _autostart: bool) -> Result<(), NetworkError> {
            match *self {}
        }

        fn start(&self) -> Result<(), NetworkError> {
            match *self {}
        }

        fn describe(&self) -> Result<String, NetworkError> {
            match *self {}
        }

        fn is_active(&self) -> Result<bool, NetworkError> {
            match *self {}
        }

        fn stop(&self) -> Result<(), NetworkError> {
            match *self {}
        }

        fn undefine(&self) -> Result<(), NetworkError> {
            match *self {}
        }

        fn apply_live_host_reservation(&self, _host_xml: &str) -> Result<(), NetworkError> {
            match *self {}
        }
    }

}
