use clap::Subcommand;
use snoman_network::{HostReservation, Hypervisor, NetworkManager};

#[derive(Subcommand)]
pub enum AddHostCommands {
    /// Add a DHCP host reservation to a running libvirt network
    ///
    /// The reservation only applies to the running network and is not saved
    /// in its persistent definition.
    Network {
        /// Network name or UUID
        id: String,

        /// Host name
        #[arg(long)]
        name: String,

        /// MAC address of the host
        #[arg(long)]
        mac: Option<String>,

        /// IPv4 address to hand out to the host
        #[arg(long)]
        ip: Option<String>,
    },
}

pub fn handle_add_host_command<H: Hypervisor>(
    manager: &NetworkManager<H>,
    cmd: AddHostCommands,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        AddHostCommands::Network { id, name, mac, ip } => {
            let host = HostReservation {
                name,
                mac_address: mac,
                ip_address: ip,
            };

            manager.add_host(&id, &host)?;
            println!("Host '{}' added to network '{}'", host.name, id);
        }
    }

    Ok(())
}
