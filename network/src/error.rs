use thiserror::Error;

/// Rule a spec field failed during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    Required,
    Uuid,
    MacAddress,
    Cidr,
    Fqdn,
    Ipv4,
}

impl std::fmt::Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Required => write!(f, "required"),
            Constraint::Uuid => write!(f, "must be a hyphenated UUID"),
            Constraint::MacAddress => write!(f, "must be a colon-separated MAC address"),
            Constraint::Cidr => write!(f, "must be an IPv4 CIDR of the form a.b.c.0/n"),
            Constraint::Fqdn => write!(f, "must be a fully qualified domain name"),
            Constraint::Ipv4 => write!(f, "must be an IPv4 address"),
        }
    }
}

/// Which identifier of a network collided with an existing resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierKind {
    Name,
    Uuid,
}

impl std::fmt::Display for IdentifierKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IdentifierKind::Name => write!(f, "name"),
            IdentifierKind::Uuid => write!(f, "UUID"),
        }
    }
}

#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("invalid network spec: {field} {constraint}")]
    Validation { field: String, constraint: Constraint },

    #[error("hypervisor connection error: {0}")]
    Connection(String),

    #[error("a network with {kind} '{value}' already exists")]
    Duplicate {
        kind: IdentifierKind,
        value: String,
        descriptor: String,
    },

    #[error("could not find network with identifier '{0}'")]
    NotFound(String),

    #[error("format error: {0}")]
    Format(String),

    #[error("hypervisor error while trying to {operation}: {message}")]
    Hypervisor { operation: String, message: String },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl NetworkError {
    pub(crate) fn validation(field: impl Into<String>, constraint: Constraint) -> Self {
        NetworkError::Validation {
            field: field.into(),
            constraint,
        }
    }

    pub(crate) fn hypervisor(operation: impl Into<String>, message: impl ToString) -> Self {
        NetworkError::Hypervisor {
            operation: operation.into(),
            message: message.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for NetworkError {
    fn from(e: serde_yaml::Error) -> Self {
        NetworkError::Format(format!("unable to parse the spec: {}", e))
    }
}

impl From<quick_xml::DeError> for NetworkError {
    fn from(e: quick_xml::DeError) -> Self {
        NetworkError::Format(format!("unable to process network xml: {}", e))
    }
}
