use clap::{Arg, ArgMatches, Command};
use color_eyre::eyre::{Result, WrapErr};
use hdwallet_provider::{config::Config, engine::JsonRpcRequest};
use serde_json::Value;

/// Register the rpc command
pub fn register_command(app: Command) -> Command {
    app.about("Send one JSON-RPC request through the provider")
        .arg(Arg::new("method").help("Method name, e.g. eth_accounts").required(true))
        .arg(Arg::new("params").help("Parameters as a JSON array").default_value("[]"))
}

/// Print the JSON-RPC response
pub async fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let provider = super::build_provider(config)?;

    let method = matches.get_one::<String>("method").cloned().unwrap_or_default();
    let params: Value = match matches.get_one::<String>("params") {
        Some(raw) => serde_json::from_str(raw).wrap_err("params must be valid JSON")?,
        None => Value::Array(Vec::new()),
    };

    let response = provider.request(JsonRpcRequest::new(method, params)).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}
