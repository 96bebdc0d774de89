//! libvirt network XML.
//!
//! Encoding always produces a NAT network with a bridge, DNS and a single
//! DHCP range. Those policy values are not read back when decoding.

use crate::error::NetworkError;
use crate::types::{HostReservation, NetworkSpec};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

const FORWARD_MODE: &str = "nat";
const BRIDGE_STP: &str = "on";
const BRIDGE_DELAY: &str = "0";
const MTU_SIZE: u32 = 1500;
const YES: &str = "yes";
const IPV4_FAMILY: &str = "ipv4";

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "network")]
struct NetworkXml {
    #[serde(default)]
    name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    forward: Option<ForwardXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    bridge: Option<BridgeXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mtu: Option<MtuXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    mac: Option<MacXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<DomainXml>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dns: Option<DnsXml>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    ip: Vec<IpXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ForwardXml {
    #[serde(rename = "@mode", default, skip_serializing_if = "Option::is_none")]
    mode: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BridgeXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@stp", default, skip_serializing_if = "Option::is_none")]
    stp: Option<String>,
    #[serde(rename = "@delay", default, skip_serializing_if = "Option::is_none")]
    delay: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MtuXml {
    #[serde(rename = "@size")]
    size: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MacXml {
    #[serde(rename = "@address", default)]
    address: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DomainXml {
    #[serde(rename = "@name", default)]
    name: String,
    #[serde(rename = "@localOnly", default, skip_serializing_if = "Option::is_none")]
    local_only: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DnsXml {
    #[serde(rename = "@enable", default, skip_serializing_if = "Option::is_none")]
    enable: Option<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IpXml {
    #[serde(rename = "@family", default, skip_serializing_if = "Option::is_none")]
    family: Option<String>,
    #[serde(rename = "@address", default)]
    address: String,
    #[serde(rename = "@prefix", default, skip_serializing_if = "Option::is_none")]
    prefix: Option<u8>,
    #[serde(rename = "@netmask", default, skip_serializing_if = "Option::is_none")]
    netmask: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    dhcp: Option<DhcpXml>,
}

impl IpXml {
    fn is_ipv4(&self) -> bool {
        self.family.as_deref().is_none_or(|f| f == IPV4_FAMILY)
    }

    /// Prefix length from `prefix`, or from a dotted `netmask` as older
    /// libvirt definitions use.
    fn prefix_len(&self) -> Result<u8, NetworkError> {
        if let Some(prefix) = self.prefix {
            if prefix > 32 {
                return Err(NetworkError::Format(format!(
                    "invalid prefix '{}' in ip stanza '{}'",
                    prefix, self.address
                )));
            }
            return Ok(prefix);
        }

        let netmask = self.netmask.as_deref().ok_or_else(|| {
            NetworkError::Format(format!(
                "ip stanza '{}' has neither a prefix nor a netmask",
                self.address
            ))
        })?;
        let mask: Ipv4Addr = netmask
            .parse()
            .map_err(|_| NetworkError::Format(format!("invalid netmask '{}'", netmask)))?;

        let bits = u32::from(mask);
        if bits.leading_ones() + bits.trailing_zeros() != 32 {
            return Err(NetworkError::Format(format!(
                "netmask '{}' is not contiguous",
                netmask
            )));
        }
        Ok(bits.leading_ones() as u8)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct DhcpXml {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    range: Vec<RangeXml>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    host: Vec<HostXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RangeXml {
    #[serde(rename = "@start")]
    start: String,
    #[serde(rename = "@end")]
    end: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "host")]
struct HostXml {
    #[serde(rename = "@mac", default, skip_serializing_if = "Option::is_none")]
    mac: Option<String>,
    #[serde(rename = "@name", default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(rename = "@ip", default, skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
}

impl From<&HostReservation> for HostXml {
    fn from(host: &HostReservation) -> Self {
        Self {
            mac: host.mac_address.clone(),
            name: Some(host.name.clone()),
            ip: host.ip_address.clone(),
        }
    }
}

impl From<HostXml> for HostReservation {
    fn from(host: HostXml) -> Self {
        Self {
            name: host.name.unwrap_or_default(),
            mac_address: host.mac,
            ip_address: host.ip,
        }
    }
}

/// Validate a spec and render its libvirt network definition.
pub fn to_xml(spec: &NetworkSpec) -> Result<String, NetworkError> {
    spec.validate_for_encode()?;

    let (range_start, range_end) = spec.dhcp_range();
    let hosts = spec.hosts.iter().map(HostXml::from).collect();

    let network = NetworkXml {
        name: spec.name.clone(),
        uuid: Some(spec.uuid.clone()),
        forward: Some(ForwardXml {
            mode: Some(FORWARD_MODE.to_string()),
        }),
        bridge: Some(BridgeXml {
            name: spec.bridge_name.clone(),
            stp: Some(BRIDGE_STP.to_string()),
            delay: Some(BRIDGE_DELAY.to_string()),
        }),
        mtu: Some(MtuXml { size: MTU_SIZE }),
        mac: Some(MacXml {
            address: spec.mac_address.clone(),
        }),
        domain: Some(DomainXml {
            name: spec.domain.clone(),
            local_only: Some(YES.to_string()),
        }),
        dns: Some(DnsXml {
            enable: Some(YES.to_string()),
        }),
        ip: vec![IpXml {
            family: Some(IPV4_FAMILY.to_string()),
            address: spec.gateway(),
            prefix: Some(spec.prefix_len()?),
            netmask: None,
            dhcp: Some(DhcpXml {
                range: vec![RangeXml {
                    start: range_start,
                    end: range_end,
                }],
                host: hosts,
            }),
        }],
    };

    serialize(&network)
}

/// Parse a libvirt network definition back into a spec.
///
/// The CIDR is rebuilt from the first IPv4 stanza as `a.b.c.0/prefix`; a
/// definition without one is rejected.
pub fn from_xml(xml: &str) -> Result<NetworkSpec, NetworkError> {
    let network: NetworkXml = quick_xml::de::from_str(xml)?;

    let bridge = network
        .bridge
        .ok_or_else(|| NetworkError::Format("network xml has no bridge stanza".to_string()))?;
    let domain = network
        .domain
        .ok_or_else(|| NetworkError::Format("network xml has no domain stanza".to_string()))?;

    let ip = network.ip.into_iter().find(IpXml::is_ipv4).ok_or_else(|| {
        NetworkError::Format(
            "unable to determine CIDR, no IPv4 range specified in the xml".to_string(),
        )
    })?;

    let address: Ipv4Addr = ip.address.parse().map_err(|_| {
        NetworkError::Format(format!("invalid IPv4 address '{}' in ip stanza", ip.address))
    })?;
    let [a, b, c, _] = address.octets();
    let cidr = format!("{}.{}.{}.0/{}", a, b, c, ip.prefix_len()?);

    let hosts = ip
        .dhcp
        .map(|dhcp| dhcp.host.into_iter().map(HostReservation::from).collect())
        .unwrap_or_default();

    let mut spec = NetworkSpec::from_parts(
        network.name,
        network.uuid.unwrap_or_default(),
        bridge.name,
        network.mac.map(|m| m.address).unwrap_or_default(),
        domain.name,
        hosts,
    );
    spec.fill_generated();
    spec.assign_cidr(&cidr);
    spec.validate()?;

    Ok(spec)
}

/// Standalone `<host/>` element for a live DHCP update.
pub fn host_fragment(host: &HostReservation) -> Result<String, NetworkError> {
    host.validate()?;

    let mut fragment = HostXml::from(host);
    fragment.mac = fragment.mac.filter(|m| !m.is_empty());
    fragment.ip = fragment.ip.filter(|ip| !ip.is_empty());
    Ok(quick_xml::se::to_string(&fragment)?)
}

fn serialize(network: &NetworkXml) -> Result<String, NetworkError> {
    let mut buffer = String::new();
    let mut serializer = quick_xml::se::Serializer::new(&mut buffer);
    serializer.indent(' ', 2);
    network.serialize(serializer)?;
    Ok(buffer)
}
