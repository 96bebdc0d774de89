//! YAML network spec documents, the form users edit and `generate` prints.

use crate::error::NetworkError;
use crate::types::{HostReservation, NetworkSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Serialize, Deserialize)]
struct NetworkDocument {
    #[serde(default)]
    name: String,
    #[serde(rename = "UUID", default, skip_serializing_if = "String::is_empty")]
    uuid: String,
    #[serde(rename = "bridge", default)]
    bridge_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    mac_address: String,
    #[serde(default)]
    cidr: String,
    #[serde(default)]
    domain: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    hosts: Vec<HostReservation>,
}

impl From<&NetworkSpec> for NetworkDocument {
    fn from(spec: &NetworkSpec) -> Self {
        Self {
            name: spec.name.clone(),
            uuid: spec.uuid.clone(),
            bridge_name: spec.bridge_name.clone(),
            mac_address: spec.mac_address.clone(),
            cidr: spec.cidr().to_string(),
            domain: spec.domain.clone(),
            hosts: spec.hosts.clone(),
        }
    }
}

/// Validate and serialize a spec. The derived prefix is never written.
pub fn to_yaml(spec: &NetworkSpec) -> Result<String, NetworkError> {
    spec.validate_for_encode()?;
    Ok(serde_yaml::to_string(&NetworkDocument::from(spec))?)
}

/// Parse a spec document, generating a UUID or MAC address if the document
/// leaves them out.
pub fn from_yaml(data: &str) -> Result<NetworkSpec, NetworkError> {
    let doc: NetworkDocument = serde_yaml::from_str(data)?;

    let mut spec = NetworkSpec::from_parts(
        doc.name,
        doc.uuid,
        doc.bridge_name,
        doc.mac_address,
        doc.domain,
        doc.hosts,
    );
    spec.fill_generated();
    spec.assign_cidr(&doc.cidr);
    spec.validate()?;

    Ok(spec)
}

pub fn load_file(path: impl AsRef<Path>) -> Result<NetworkSpec, NetworkError> {
    let path = path.as_ref();
    tracing::debug!("Loading network spec from {:?}", path);

    let data = std::fs::read_to_string(path)?;
    from_yaml(&data)
}
