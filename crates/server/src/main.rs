mod config;
mod server;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use arena::{DEFAULT_PORT, DEFAULT_TICK_RATE, MapData, practice_arena};

use config::ServerConfig;
use server::GameServer;

#[derive(Parser)]
#[command(name = "arena-server")]
#[command(about = "Authoritative arena shooter server")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(short, long, default_value_t = 12)]
    max_clients: usize,

    #[arg(long, help = "Seconds of silence before a client is dropped")]
    timeout: Option<u64>,

    #[arg(long, help = "Map file (JSON); built-in arena when omitted")]
    map: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let bind_addr = format!("{}:{}", args.bind, args.port);

    let map = match &args.map {
        Some(path) => MapData::load(path)
            .with_context(|| format!("loading map {}", path.display()))?,
        None => practice_arena(),
    };
    log::info!("loaded map '{}' ({} boxes)", map.name, map.boxes.len());

    let mut config = ServerConfig {
        tick_rate: args.tick_rate,
        max_clients: args.max_clients,
        ..Default::default()
    };
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }

    let mut server = GameServer::new(&bind_addr, config, map)
        .with_context(|| format!("binding {bind_addr}"))?;
    log::info!("server listening on {}", server.local_addr());
    server.run();
    log::info!("server shutting down");

    Ok(())
}
