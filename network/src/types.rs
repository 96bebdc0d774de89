use crate::error::{Constraint, NetworkError};
use crate::validate;
use serde::{Deserialize, Serialize};

pub const DEFAULT_NETWORK_NAME: &str = "sno-network";
pub const DEFAULT_NETWORK_BRIDGE_NAME: &str = "sno-bridge";
pub const DEFAULT_NETWORK_CIDR: &str = "192.168.126.0/24";
pub const DEFAULT_DOMAIN: &str = "sno.rhlocal.com";
pub const DEFAULT_HOST_NAME: &str = "example_host";

/// Last octet handed to the synthetic host of a default spec.
const DEFAULT_HOST_OCTET: u8 = 10;

const MAC_LOCAL_BIT: u8 = 0b10;
const MAC_MULTICAST_BIT: u8 = 0b1;

/// Static DHCP lease for a single host on the network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostReservation {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

impl HostReservation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_mac_address(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = Some(mac.into());
        self
    }

    pub fn with_ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }
}

/// In-process description of a libvirt NAT network.
///
/// The durable state lives in the hypervisor; this value is only used to
/// create a network or to read one back. `cidr` is private so the derived
/// prefix can never drift from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkSpec {
    pub name: String,
    pub uuid: String,
    pub bridge_name: String,
    pub mac_address: String,
    pub domain: String,
    pub hosts: Vec<HostReservation>,
    cidr: String,
    prefix: String,
}

impl NetworkSpec {
    /// Build a spec with a fresh UUID and MAC address and no host reservations.
    pub fn new(
        name: impl Into<String>,
        bridge_name: impl Into<String>,
        cidr: &str,
        domain: impl Into<String>,
    ) -> Result<Self, NetworkError> {
        let mut spec = Self::from_parts(
            name.into(),
            new_uuid(),
            bridge_name.into(),
            random_mac_address(),
            domain.into(),
            Vec::new(),
        );
        spec.set_cidr(cidr)?;
        Ok(spec)
    }

    /// Assemble a spec whose CIDR is assigned separately. Decoders use this
    /// and must call `assign_cidr` and `validate` before handing it out.
    pub(crate) fn from_parts(
        name: String,
        uuid: String,
        bridge_name: String,
        mac_address: String,
        domain: String,
        hosts: Vec<HostReservation>,
    ) -> Self {
        Self {
            name,
            uuid,
            bridge_name,
            mac_address,
            domain,
            hosts,
            cidr: String::new(),
            prefix: String::new(),
        }
    }

    pub fn cidr(&self) -> &str {
        &self.cidr
    }

    /// First three octets of the CIDR address, e.g. `192.168.126`.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Assign the CIDR and recompute the prefix. An invalid CIDR leaves the
    /// spec unchanged.
    pub fn set_cidr(&mut self, cidr: &str) -> Result<(), NetworkError> {
        if validate::parse_cidr(cidr).is_none() {
            return Err(NetworkError::validation("cidr", Constraint::Cidr));
        }
        self.assign_cidr(cidr);
        Ok(())
    }

    /// Store the CIDR as given. The prefix is left empty when the CIDR does
    /// not parse; validation rejects such a spec.
    pub(crate) fn assign_cidr(&mut self, cidr: &str) {
        self.cidr = cidr.to_string();
        self.prefix = validate::parse_cidr(cidr)
            .map(|network| {
                let [a, b, c, _] = network.ip().octets();
                format!("{}.{}.{}", a, b, c)
            })
            .unwrap_or_default();
    }

    /// Prefix length of the CIDR, e.g. `24`.
    pub fn prefix_len(&self) -> Result<u8, NetworkError> {
        validate::parse_cidr(&self.cidr)
            .map(|network| network.prefix())
            .ok_or_else(|| NetworkError::validation("cidr", Constraint::Cidr))
    }

    pub fn gateway(&self) -> String {
        self.address(1)
    }

    pub fn dhcp_range(&self) -> (String, String) {
        (self.address(2), self.address(254))
    }

    fn address(&self, last_octet: u8) -> String {
        format!("{}.{}", self.prefix, last_octet)
    }

    /// Fill identifiers the input left out.
    pub(crate) fn fill_generated(&mut self) {
        if self.uuid.is_empty() {
            self.uuid = new_uuid();
            tracing::debug!(uuid = %self.uuid, "Generated network UUID");
        }
        if self.mac_address.is_empty() {
            self.mac_address = random_mac_address();
            tracing::debug!(mac = %self.mac_address, "Generated network MAC address");
        }
    }

    // The synthetic host reuses the network's own MAC address.
    fn add_default_host(&mut self) {
        let host = HostReservation::new(DEFAULT_HOST_NAME)
            .with_ip_address(self.address(DEFAULT_HOST_OCTET))
            .with_mac_address(self.mac_address.clone());
        self.hosts.push(host);
    }
}

impl Default for NetworkSpec {
    fn default() -> Self {
        let mut spec = Self::from_parts(
            DEFAULT_NETWORK_NAME.to_string(),
            new_uuid(),
            DEFAULT_NETWORK_BRIDGE_NAME.to_string(),
            random_mac_address(),
            DEFAULT_DOMAIN.to_string(),
            Vec::new(),
        );
        spec.set_cidr(DEFAULT_NETWORK_CIDR)
            .expect("default network CIDR is valid");
        spec.add_default_host();
        spec
    }
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Random unicast, locally administered MAC address.
pub fn random_mac_address() -> String {
    let mut bytes: [u8; 6] = rand::random();
    bytes[0] = (bytes[0] & !MAC_MULTICAST_BIT) | MAC_LOCAL_BIT;

    bytes
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}
