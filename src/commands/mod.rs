pub mod accounts;
pub mod rpc;
pub mod serve;
pub mod sign_message;

use clap::Command;
use color_eyre::eyre::{Result, WrapErr};
use hdwallet_provider::{config::Config, provider::HdWalletProvider};

/// Register all application commands
pub fn register_commands(app: Command) -> Command {
    app.subcommand(accounts::register_command(Command::new("accounts")))
        .subcommand(sign_message::register_command(Command::new("sign-message")))
        .subcommand(rpc::register_command(Command::new("rpc")))
        .subcommand(serve::register_command(Command::new("serve")))
}

/// Handle all application commands
pub async fn handle_commands(matches: clap::ArgMatches, config: &Config) -> Result<()> {
    match matches.subcommand() {
        Some(("accounts", accounts_matches)) => accounts::handle_command(accounts_matches, config),
        Some(("sign-message", sign_matches)) => {
            sign_message::handle_command(sign_matches, config)
        },
        Some(("rpc", rpc_matches)) => rpc::handle_command(rpc_matches, config).await,
        Some(("serve", serve_matches)) => serve::handle_command(serve_matches, config).await,
        _ => {
            println!("Please specify a subcommand. Use --help for more information.");
            Ok(())
        },
    }
}

/// Validate the configuration and build a provider from it
pub(crate) fn build_provider(config: &Config) -> Result<HdWalletProvider> {
    config.validate().wrap_err("Invalid configuration")?;
    let material = config.key_material()?;
    HdWalletProvider::new(material, config.network.rpc_url.as_str(), config.provider.clone())
        .wrap_err("Failed to build provider")
}
