//! StashKV server binary.
//!
//! Binds a TCP listener and serves every client from one instance of the
//! shared [`InstanceCache`], identified by the bind address and password.

use stashkv::commands::CommandHandler;
use stashkv::connection::{handle_connection, ConnectionStats};
use stashkv::instance::{Config, InstanceCache, InstanceHandle};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Server settings from the command line
struct ServerConfig {
    host: String,
    port: u16,
    /// Maximum number of cached instances (0 = unbounded)
    capacity: usize,
    password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: stashkv::DEFAULT_HOST.to_string(),
            port: stashkv::DEFAULT_PORT,
            capacity: stashkv::DEFAULT_CAPACITY,
            password: String::new(),
        }
    }
}

impl ServerConfig {
    fn from_args() -> Self {
        let mut config = ServerConfig::default();
        let mut args = std::env::args().skip(1);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--host" | "-h" => config.host = required_value(&arg, args.next()),
                "--port" | "-p" => {
                    config.port = required_value(&arg, args.next()).parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid port number");
                        std::process::exit(1);
                    });
                }
                "--capacity" | "-c" => {
                    config.capacity = required_value(&arg, args.next()).parse().unwrap_or_else(|_| {
                        eprintln!("Error: invalid capacity");
                        std::process::exit(1);
                    });
                }
                "--password" => config.password = required_value(&arg, args.next()),
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("StashKV version {}", stashkv::VERSION);
                    std::process::exit(0);
                }
                _ => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    std::process::exit(1);
                }
            }
        }

        config
    }

    fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The instance every connection of this server is served from.
    fn instance_config(&self) -> Config {
        Config::new(self.bind_address(), self.password.clone())
    }
}

fn required_value(flag: &str, value: Option<String>) -> String {
    value.unwrap_or_else(|| {
        eprintln!("Error: {} requires a value", flag);
        std::process::exit(1);
    })
}

fn print_help() {
    println!(
        r#"
StashKV - An Embeddable In-Memory Key-Value Engine

USAGE:
    stashkv [OPTIONS]

OPTIONS:
    -h, --host <HOST>          Host to bind to (default: 127.0.0.1)
    -p, --port <PORT>          Port to listen on (default: 6379)
    -c, --capacity <N>         Maximum cached instances, 0 = unbounded (default: 100)
        --password <PASSWORD>  Password recorded in the instance config (not enforced)
    -v, --version              Print version information
        --help                 Print this help message

EXAMPLES:
    stashkv                        # Start on 127.0.0.1:6379
    stashkv --port 6380            # Start on port 6380

CONNECTING:
    Any line-based client works; requests may be framed or plain text:
    $ nc 127.0.0.1 6379
    SET name Ariz
    +OK
    GET name
    $4
    Ariz
"#
    );
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
   _____ _            _     _  ____   __
  / ____| |          | |   | |/ /\ \ / /
 | (___ | |_ __ _ ___| |__ | ' /  \ V /
  \___ \| __/ _` / __| '_ \|  <    > <
  ____) | || (_| \__ \ | | | . \  / . \
 |_____/ \__\__,_|___/_| |_|_|\_\/_/ \_\

StashKV v{} - Embeddable In-Memory Key-Value Engine
──────────────────────────────────────────────────────────────
Server started on {}
Instance capacity: {}
Ready to accept connections.

Use Ctrl+C to shutdown gracefully.
"#,
        stashkv::VERSION,
        config.bind_address(),
        config.capacity
    );
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_args();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner(&config);

    let cache = Arc::new(InstanceCache::with_capacity(config.capacity));
    let instance = InstanceHandle::new(Arc::clone(&cache), config.instance_config());
    instance.store();
    info!(capacity = config.capacity, "Instance cache initialized");

    let stats = Arc::new(ConnectionStats::new());

    let listener = TcpListener::bind(config.bind_address()).await?;
    info!("Listening on {}", config.bind_address());

    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => error!(error = %e, "Failed to listen for Ctrl+C"),
        }
    };

    tokio::select! {
        _ = accept_loop(listener, instance, stats) => {}
        _ = shutdown => {}
    }

    info!("Server shutdown complete");
    Ok(())
}

async fn accept_loop(
    listener: TcpListener,
    instance: InstanceHandle,
    stats: Arc<ConnectionStats>,
) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let handler = CommandHandler::new(instance.clone());
                let stats = Arc::clone(&stats);

                tokio::spawn(async move {
                    handle_connection(stream, addr, handler, stats).await;
                });
            }
            Err(e) => {
                error!("Failed to accept connection: {}", e);
            }
        }
    }
}
