mod backend;
mod commands;
mod utils;

use clap::{Parser, Subcommand};
use snoman_network::DEFAULT_LIBVIRT_URI;
use commands::{
    AddHostCommands, CreateCommands, DestroyCommands, FindCommands, GenerateCommands,
    handle_add_host_command, handle_create_command, handle_destroy_command, handle_find_command,
    handle_generate_command,
};

#[derive(Parser)]
#[command(name = "snoman", version)]
#[command(about = "Manage libvirt networks for single node cluster VMs")]
struct Cli {
    /// Display verbose logs
    #[arg(long, short, global = true)]
    verbose: bool,

    /// Format the log output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// libvirt connection URI
    #[arg(
        long,
        global = true,
        env = "SNOMAN_LIBVIRT_URI",
        default_value = DEFAULT_LIBVIRT_URI
    )]
    connect: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the specified resource config
    #[command(subcommand)]
    Generate(GenerateCommands),
    /// Create the specified resource
    #[command(subcommand)]
    Create(CreateCommands),
    /// Destroy the specified resource
    #[command(subcommand)]
    Destroy(DestroyCommands),
    /// Show the specified resource as it is currently defined
    #[command(subcommand)]
    Find(FindCommands),
    /// Add a static DHCP host to a running resource
    #[command(subcommand)]
    AddHost(AddHostCommands),
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    utils::init_logging(cli.verbose, cli.json);

    match cli.command {
        Some(Commands::Generate(cmd)) => {
            handle_generate_command(cmd)?;
        }
        Some(Commands::Create(cmd)) => {
            let manager = backend::connect(&cli.connect)?;
            handle_create_command(&manager, cmd)?;
        }
        Some(Commands::Destroy(cmd)) => {
            let manager = backend::connect(&cli.connect)?;
            handle_destroy_command(&manager, cmd)?;
        }
        Some(Commands::Find(cmd)) => {
            let manager = backend::connect(&cli.connect)?;
            handle_find_command(&manager, cmd)?;
        }
        Some(Commands::AddHost(cmd)) => {
            let manager = backend::connect(&cli.connect)?;
            handle_add_host_command(&manager, cmd)?;
        }
        None => {
            println!("snoman ready. libvirt URI: {}", cli.connect);
            println!("Use --help for usage information.");
        }
    }

    Ok(())
}
