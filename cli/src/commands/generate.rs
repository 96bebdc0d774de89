use clap::Subcommand;

use crate::utils::{SpecSource, print_spec};

#[derive(Subcommand)]
pub enum GenerateCommands {
    /// Generate a libvirt network spec
    ///
    /// If --from-xml or --from are not specified, the default configuration
    /// will be used. Passing --from just sanitizes the input.
    Network {
        #[command(flatten)]
        source: SpecSource,

        /// Generate the libvirt xml config for the network
        #[arg(long)]
        xml: bool,
    },
}

pub fn handle_generate_command(cmd: GenerateCommands) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        GenerateCommands::Network { source, xml } => {
            let spec = source
                .load()
                .map_err(|e| format!("unable to load network spec: {}", e))?;

            print_spec(&spec, xml).map_err(|e| format!("unable to generate spec: {}", e))?;
        }
    }

    Ok(())
}
