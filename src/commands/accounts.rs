use clap::{Arg, ArgAction, ArgMatches, Command};
use color_eyre::eyre::Result;
use hdwallet_provider::{config::Config, wallet::format_address};
use tracing::warn;

/// Register the accounts command
pub fn register_command(app: Command) -> Command {
    app.about("List the derived accounts").arg(
        Arg::new("private-keys")
            .long("private-keys")
            .help("Also print each account's private key")
            .action(ArgAction::SetTrue),
    )
}

/// Print the derived addresses in derivation order
pub fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let provider = super::build_provider(config)?;
    let show_keys = matches.get_flag("private-keys");
    if show_keys {
        warn!("Printing private keys to stdout");
    }

    let start = config.provider.address_index as usize;
    for (offset, address) in provider.get_addresses().iter().enumerate() {
        let address = format_address(address);
        if show_keys {
            let key = provider.signer().get_private_key(&address)?;
            println!("{:>4}  {}  0x{}", start + offset, address, key);
        } else {
            println!("{:>4}  {}", start + offset, address);
        }
    }
    Ok(())
}
