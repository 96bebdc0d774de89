use clap::Subcommand;
use snoman_network::{Hypervisor, NetworkManager};

use crate::utils::SpecSource;

#[derive(Subcommand)]
pub enum CreateCommands {
    /// Create a libvirt network to be used for a cluster VM
    ///
    /// If --from-xml or --from are not specified, the default configuration
    /// will be used.
    Network {
        #[command(flatten)]
        source: SpecSource,
    },
}

pub fn handle_create_command<H: Hypervisor>(
    manager: &NetworkManager<H>,
    cmd: CreateCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        CreateCommands::Network { source } => {
            let spec = source
                .load()
                .map_err(|e| format!("unable to load network spec: {}", e))?;

            manager.create(&spec)?;

            println!("Network '{}' created", spec.name);
            println!("  UUID:    {}", spec.uuid);
            println!("  Bridge:  {}", spec.bridge_name);
            println!("  CIDR:    {}", spec.cidr());
            println!("  Gateway: {}", spec.gateway());
        }
    }

    Ok(())
}
