use clap::Subcommand;
use snoman_network::{Hypervisor, NetworkManager};

use crate::utils::print_spec;

#[derive(Subcommand)]
pub enum FindCommands {
    /// Print a libvirt network as a spec
    Network {
        /// Network name or UUID
        id: String,

        /// Print the libvirt xml config instead of the spec
        #[arg(long)]
        xml: bool,
    },
}

pub fn handle_find_command<H: Hypervisor>(
    manager: &NetworkManager<H>,
    cmd: FindCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        FindCommands::Network { id, xml } => {
            let spec = manager.find(&id)?;
            print_spec(&spec, xml)?;
        }
    }

    Ok(())
}
