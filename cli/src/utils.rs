use clap::Args;
use snoman_network::{NetworkError, NetworkSpec, config, descriptor};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Install the global subscriber. Logs go to stderr so stdout only carries
/// generated specs. `RUST_LOG` overrides the level picked by `--verbose`.
pub fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Where a network spec comes from. The default spec is used when neither
/// file is given.
#[derive(Args, Debug, Default)]
pub struct SpecSource {
    /// Path to the spec file to use
    #[arg(long, conflicts_with = "from_xml")]
    pub from: Option<PathBuf>,

    /// Path to the libvirt XML file to use
    #[arg(long)]
    pub from_xml: Option<PathBuf>,
}

impl SpecSource {
    pub fn load(&self) -> Result<NetworkSpec, NetworkError> {
        if let Some(path) = &self.from {
            return config::load_file(path);
        }

        if let Some(path) = &self.from_xml {
            tracing::debug!("Loading network xml from {:?}", path);
            let xml = std::fs::read_to_string(path)?;
            return descriptor::from_xml(&xml);
        }

        Ok(NetworkSpec::default())
    }
}

pub fn print_spec(spec: &NetworkSpec, as_xml: bool) -> Result<(), NetworkError> {
    let output = if as_xml {
        descriptor::to_xml(spec)?
    } else {
        config::to_yaml(spec)?
    };

    println!("{}", output.trim_end());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_default_spec() {
        let spec = SpecSource::default().load().unwrap();

        assert_eq!(spec.name, snoman_network::DEFAULT_NETWORK_NAME);
        assert_eq!(spec.hosts.len(), 1);
    }

    #[test]
    fn test_load_from_xml() {
        let original = NetworkSpec::default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(descriptor::to_xml(&original).unwrap().as_bytes())
            .unwrap();

        let source = SpecSource {
            from: None,
            from_xml: Some(file.path().to_path_buf()),
        };

        assert_eq!(source.load().unwrap(), original);
    }

    #[test]
    fn test_load_from_yaml() {
        let original = NetworkSpec::default();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config::to_yaml(&original).unwrap().as_bytes())
            .unwrap();

        let source = SpecSource {
            from: Some(file.path().to_path_buf()),
            from_xml: None,
        };

        assert_eq!(source.load().unwrap(), original);
    }
}
