//! Connects to a local ferrited over a streaming transport, registers for
//! block notifications, asks for the block count and shuts the client down
//! after ten seconds (or on Ctrl-C).

#[macro_use]
extern crate log;

use clap::{Arg, ArgAction, Command};

use ferrite_rpc::{
    config::{self, ConnectionConfig},
    constants, Client, NotificationHandlers, TransportKind,
};

fn build_cli() -> Command {
    Command::new("notify-blocks")
        .version("0.1.0")
        .about("Block notifications over the ferrited RPC transport")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::SetTrue)
                .help("Set the output as verbose"),
        )
        .arg(
            Arg::new("error")
                .short('e')
                .long("error")
                .action(ArgAction::SetTrue)
                .help("Suppress all output except errors")
                .conflicts_with("verbose"),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Read the connection config from a ron file"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .default_value(constants::DEFAULT_HOST),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .default_value(constants::DEFAULT_USER),
        )
        .arg(
            Arg::new("secret")
                .short('P')
                .long("secret")
                .default_value(constants::DEFAULT_SECRET),
        )
        .arg(
            Arg::new("cert")
                .long("cert")
                .value_name("FILE")
                .help("Certificate material to check the server against"),
        )
}

fn load_config(matches: &clap::ArgMatches) -> ConnectionConfig {
    if let Some(path) = matches.get_one::<String>("config") {
        match ConnectionConfig::from_file(path) {
            Ok(config) => return config,
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        }
    }
    let cert_path = matches
        .get_one::<String>("cert")
        .map(std::path::PathBuf::from)
        .or_else(config::default_cert_path);
    let certificates = cert_path.and_then(|path| match std::fs::read(&path) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            warn!(
                "no certificate material at {}: {}; server identity will not be checked",
                path.display(),
                e
            );
            None
        }
    });
    ConnectionConfig {
        host: matches.get_one::<String>("host").unwrap().clone(),
        transport: TransportKind::Streaming,
        user: matches.get_one::<String>("user").unwrap().clone(),
        secret: matches.get_one::<String>("secret").unwrap().clone(),
        certificates,
    }
}

#[tokio::main]
async fn main() {
    let matches = build_cli().get_matches();

    let log_level = if matches.get_flag("verbose") {
        simplelog::LevelFilter::Trace
    } else if matches.get_flag("error") {
        simplelog::LevelFilter::Error
    } else {
        simplelog::LevelFilter::Info
    };
    simplelog::TermLogger::init(
        log_level,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )
    .expect("logger already set");

    let config = load_config(&matches);

    // only override the handlers for notifications you care about
    let handlers = NotificationHandlers {
        on_block_connected: Some(Box::new(|hash, height| {
            info!("block connected: {} ({})", hash, height);
        })),
        on_block_disconnected: Some(Box::new(|hash, height| {
            info!("block disconnected: {} ({})", hash, height);
        })),
    };

    let client = match Client::connect(config, handlers).await {
        Ok(client) => client,
        Err(e) => {
            error!("could not connect: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = client.notify_blocks().await {
        error!("could not register for notifications: {}", e);
        std::process::exit(1);
    }
    info!("notify blocks: registration complete");

    match client.get_block_count().await {
        Ok(count) => info!("block count: {}", count),
        Err(e) => {
            error!("could not get block count: {}", e);
            std::process::exit(1);
        }
    }

    // when to shut down is application policy; this example uses a timer
    info!("client shutdown in 10 seconds...");
    let timer_client = client.clone();
    tokio::spawn(async move {
        tokio::time::sleep(std::time::Duration::from_secs(10)).await;
        info!("client shutting down...");
        timer_client.shutdown().await;
        info!("client shutdown complete");
    });

    let signal_client = client.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_client.shutdown().await;
        }
    });

    client.wait_for_shutdown().await;
}
