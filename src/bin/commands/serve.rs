use clap::Args;
use pfxsync::server::{start_server, ServerConfig};
use pfxsync::{PfxsyncConfig, SyncRunner};

/// Arguments for the Serve command
#[derive(Args)]
pub struct ServeArgs {
    /// Address to bind to, overriding `listen_address`
    #[clap(long)]
    pub address: Option<String>,

    /// Port to listen on, overriding `listen_port`
    #[clap(short, long)]
    pub port: Option<u16>,

    /// Disable scheduled updates
    #[clap(long)]
    pub no_schedule: bool,
}

pub fn run(config: &PfxsyncConfig, args: ServeArgs) {
    let ServeArgs {
        address,
        port,
        no_schedule,
    } = args;

    let mut config = config.clone();
    if no_schedule {
        config.schedule_interval_secs = 0;
    }

    let mut server_config = ServerConfig::from_config(&config);
    if let Some(address) = address {
        server_config = server_config.with_address(address);
    }
    if let Some(port) = port {
        server_config = server_config.with_port(port);
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("ERROR: Failed to start async runtime: {}", e);
            std::process::exit(1);
        }
    };

    let runner = SyncRunner::new(config);
    if let Err(e) = runtime.block_on(start_server(runner, server_config)) {
        eprintln!("ERROR: {}", e);
        std::process::exit(1);
    }
}
