//! Field rules for network specs.
//!
//! Checks run in a fixed order and stop at the first violation, so the same
//! invalid spec always reports the same field.

use crate::error::{Constraint, NetworkError};
use crate::types::{HostReservation, NetworkSpec};
use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;

impl NetworkSpec {
    /// Check a spec as it may arrive from input, where the UUID and MAC
    /// address can still be empty.
    pub fn validate(&self) -> Result<(), NetworkError> {
        self.check(false)
    }

    /// Check a spec about to be encoded. The UUID and MAC address must be
    /// present, otherwise decoding would generate different ones.
    pub(crate) fn validate_for_encode(&self) -> Result<(), NetworkError> {
        self.check(true)
    }

    fn check(&self, identifiers_required: bool) -> Result<(), NetworkError> {
        require("name", &self.name)?;

        if identifiers_required {
            require("UUID", &self.uuid)?;
        }
        if !self.uuid.is_empty() && !is_uuid(&self.uuid) {
            return Err(NetworkError::validation("UUID", Constraint::Uuid));
        }

        require("bridge", &self.bridge_name)?;

        if identifiers_required {
            require("mac_address", &self.mac_address)?;
        }
        if !self.mac_address.is_empty() && !is_mac_address(&self.mac_address) {
            return Err(NetworkError::validation(
                "mac_address",
                Constraint::MacAddress,
            ));
        }

        require("cidr", self.cidr())?;
        if parse_cidr(self.cidr()).is_none() {
            return Err(NetworkError::validation("cidr", Constraint::Cidr));
        }

        require("domain", &self.domain)?;
        if !is_fqdn(&self.domain) {
            return Err(NetworkError::validation("domain", Constraint::Fqdn));
        }

        for (i, host) in self.hosts.iter().enumerate() {
            host.check(&format!("hosts[{}].", i))?;
        }

        Ok(())
    }
}

impl HostReservation {
    pub fn validate(&self) -> Result<(), NetworkError> {
        self.check("")
    }

    fn check(&self, field_prefix: &str) -> Result<(), NetworkError> {
        let field = |name: &str| format!("{}{}", field_prefix, name);

        if self.name.is_empty() {
            return Err(NetworkError::validation(field("name"), Constraint::Required));
        }

        // An empty value counts as absent.
        if let Some(mac) = self.mac_address.as_deref().filter(|m| !m.is_empty()) {
            if !is_mac_address(mac) {
                return Err(NetworkError::validation(
                    field("mac_address"),
                    Constraint::MacAddress,
                ));
            }
        }

        if let Some(ip) = self.ip_address.as_deref().filter(|ip| !ip.is_empty()) {
            if ip.parse::<Ipv4Addr>().is_err() {
                return Err(NetworkError::validation(field("ip_address"), Constraint::Ipv4));
            }
        }

        Ok(())
    }
}

fn require(field: &str, value: &str) -> Result<(), NetworkError> {
    if value.trim().is_empty() {
        return Err(NetworkError::validation(field, Constraint::Required));
    }
    Ok(())
}

/// Parse `a.b.c.0/n`. The address must be written as a full dotted quad
/// ending in `.0`, which is what the descriptor decoder reconstructs.
pub(crate) fn parse_cidr(cidr: &str) -> Option<Ipv4Network> {
    let (address, prefix) = cidr.split_once('/')?;
    let address: Ipv4Addr = address.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;

    if address.octets()[3] != 0 {
        return None;
    }

    let network = Ipv4Network::new(address, prefix).ok()?;
    if network.to_string() != cidr {
        return None;
    }
    Some(network)
}

pub(crate) fn is_mac_address(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

pub(crate) fn is_uuid(value: &str) -> bool {
    value.len() == 36 && uuid::Uuid::parse_str(value).is_ok()
}

/// Dotted name with at least two labels, each 1-63 alphanumerics or
/// hyphens not starting with a hyphen, and an alphabetic TLD. A trailing
/// dot is allowed.
pub(crate) fn is_fqdn(domain: &str) -> bool {
    let domain = domain.strip_suffix('.').unwrap_or(domain);
    let labels: Vec<&str> = domain.split('.').collect();

    if labels.len() < 2 || domain.len() > 253 {
        return false;
    }

    let valid_label = |label: &str| {
        !label.is_empty()
            && label.len() <= 63
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
            && !label.starts_with('-')
    };

    let Some(tld) = labels.last() else {
        return false;
    };

    labels.iter().copied().all(valid_label)
        && tld.starts_with(|c: char| c.is_ascii_alphabetic())
        && !tld.contains('-')
}
