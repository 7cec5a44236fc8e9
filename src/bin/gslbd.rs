//! GSLB authoritative DNS server entry point

use std::process;
use std::sync::Arc;

use clap::Parser;

use gslb_core::config::Config;
use gslb_core::dns::context::ServerContext;
use gslb_core::dns::logging::{LogLevel, LoggerConfig, StructuredLogger};
use gslb_core::dns::server::{DnsServer, DnsTcpServer, DnsUdpServer};
use gslb_core::dns::shutdown::{ShutdownConfig, ShutdownCoordinator};

#[derive(Parser, Debug)]
#[command(name = "gslbd", about = "Authoritative GSLB DNS server")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "GSLBD_CONFIG")]
    config: Option<String>,

    /// Number of UDP/TCP worker threads per transport
    #[arg(long, default_value_t = 4)]
    threads: usize,
}

fn log_level_from_str(level: &str) -> LogLevel {
    match level.to_lowercase().as_str() {
        "trace" => LogLevel::Trace,
        "debug" => LogLevel::Debug,
        "warn" => LogLevel::Warn,
        "error" => LogLevel::Error,
        _ => LogLevel::Info,
    }
}

fn main() {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load config from {}: {}", path, e);
                process::exit(1);
            }
        },
        None => Config::default(),
    };

    let _logger = StructuredLogger::init(LoggerConfig {
        level: log_level_from_str(&config.log_level),
        json_format: true,
        console_output: true,
    });

    let shutdown_drain_secs = config.shutdown_drain_secs;

    let context = match ServerContext::new(config) {
        Ok(context) => Arc::new(context),
        Err(e) => {
            log::error!("failed to initialize server context: {}", e);
            process::exit(1);
        }
    };

    let shutdown = Arc::new(ShutdownCoordinator::new(ShutdownConfig {
        drain_timeout: std::time::Duration::from_secs(shutdown_drain_secs),
        verbose: false,
    }));

    let udp_server = DnsUdpServer::new(context.clone(), shutdown.clone(), args.threads);
    if let Err(e) = udp_server.run_server() {
        log::error!("failed to start UDP server: {}", e);
        process::exit(1);
    }

    let tcp_server = DnsTcpServer::new(context.clone(), shutdown.clone(), args.threads);
    if let Err(e) = tcp_server.run_server() {
        log::error!("failed to start TCP server: {}", e);
        process::exit(1);
    }

    log::info!(
        "gslbd listening on {}:{} (udp+tcp)",
        context.config.bind_host, context.config.dns_port
    );

    wait_for_shutdown_signal();

    if let Err(e) = shutdown.shutdown() {
        log::warn!("shutdown already in progress: {}", e);
    }
}

fn wait_for_shutdown_signal() {
    loop {
        std::thread::sleep(std::time::Duration::from_secs(3600));
    }
}
