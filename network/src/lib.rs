pub mod config;
pub mod descriptor;
mod error;
mod hypervisor;
#[cfg(feature = "libvirt")]
mod libvirt;
mod manager;
mod types;
mod validate;

pub use error::{Constraint, IdentifierKind, NetworkError};
pub use hypervisor::{DEFAULT_LIBVIRT_URI, Hypervisor, NetworkHandle, Session};
#[cfg(feature = "libvirt")]
pub use libvirt::{LibvirtHypervisor, LibvirtNetwork, LibvirtSession};
pub use manager::NetworkManager;
pub use types::*;
