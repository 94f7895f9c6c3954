use clap::{Arg, ArgMatches, Command};
use color_eyre::eyre::{Result, eyre};
use hdwallet_provider::{config::Config, subproviders::MessageParams, wallet::format_address};

/// Register the sign-message command
pub fn register_command(app: Command) -> Command {
    app.about("Sign a message with a derived account")
        .arg(
            Arg::new("from")
                .long("from")
                .short('f')
                .help("Signing address, defaults to the first derived account"),
        )
        .arg(
            Arg::new("message")
                .help("Message to sign, 0x hex or plain text")
                .required(true),
        )
}

/// Print the personal-message signature
pub fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let provider = super::build_provider(config)?;

    let from = match matches.get_one::<String>("from") {
        Some(from) => from.clone(),
        None => provider
            .get_address(None)
            .map(|address| format_address(&address))
            .ok_or_else(|| eyre!("No accounts were derived"))?,
    };
    let data = matches.get_one::<String>("message").cloned();

    let signature = provider.signer().sign_message(&MessageParams { data, from })?;
    println!("{}", signature);
    Ok(())
}
