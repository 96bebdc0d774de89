use clap::Subcommand;
use snoman_network::{DEFAULT_NETWORK_NAME, Hypervisor, NetworkManager};

#[derive(Subcommand)]
pub enum DestroyCommands {
    /// Destroy a libvirt network by name or UUID
    Network {
        /// Network name or UUID
        #[arg(default_value = DEFAULT_NETWORK_NAME)]
        id: String,
    },
}

pub fn handle_destroy_command<H: Hypervisor>(
    manager: &NetworkManager<H>,
    cmd: DestroyCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        DestroyCommands::Network { id } => {
            manager.destroy(&id)?;
            println!("Network '{}' destroyed", id);
        }
    }

    Ok(())
}
