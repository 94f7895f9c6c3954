use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};
use color_eyre::eyre::{Result, WrapErr};
use hdwallet_provider::{config::Config, server::RpcServer};
use std::net::SocketAddr;
use tracing::{info, warn};

/// Register the serve command
pub fn register_command(app: Command) -> Command {
    app.about("Serve a local JSON-RPC endpoint that signs with the derived accounts").arg(
        Arg::new("bind")
            .long("bind")
            .short('b')
            .help("Bind address, defaults to server.host:server.port")
            .action(ArgAction::Set)
            .value_parser(value_parser!(SocketAddr)),
    )
}

/// Run the server until Ctrl-C
pub async fn handle_command(matches: &ArgMatches, config: &Config) -> Result<()> {
    let bind_address = match matches.get_one::<SocketAddr>("bind") {
        Some(addr) => *addr,
        None => format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .wrap_err("server.host and server.port do not form a socket address")?,
    };

    let provider = super::build_provider(config)?;
    info!(
        accounts = provider.get_addresses().len(),
        upstream = %config.network.rpc_url,
        "Serving JSON-RPC on {}",
        bind_address
    );

    RpcServer::new(provider)
        .run(bind_address, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await?;

    info!("JSON-RPC server stopped");
    Ok(())
}
