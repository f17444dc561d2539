//! Headless bot client: joins a server, wanders, and logs what it sees.
//! Exercises the full netcode path (prediction, reconciliation,
//! interpolation) without a renderer.

use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use log::{debug, info, warn};

use arena::{
    DEFAULT_PORT, DEFAULT_TICK_RATE, GameEvent, InputCommand, JoinRequest, PacketType, WeaponKind,
};
use arena_client::{ClientPrediction, NetClient, ServerClock, SnapshotHistory};

#[derive(Parser)]
#[command(name = "arena-client")]
#[command(about = "Headless arena client bot")]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1")]
    server: String,

    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value = "bot")]
    name: String,

    #[arg(long, default_value_t = 0, help = "Seconds to run; 0 runs forever")]
    duration: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut client = NetClient::connect((args.server.as_str(), args.port))?;
    client.join(JoinRequest {
        name: Some(args.name.clone()),
        ..Default::default()
    })?;
    if let Some(addr) = client.server_addr() {
        info!("joining {} as {}", addr, args.name);
    }

    let start = Instant::now();
    let mut tick_rate = DEFAULT_TICK_RATE;
    let mut prediction: Option<ClientPrediction> = None;
    let mut history = SnapshotHistory::new();
    let mut clock = ServerClock::new();
    let mut sequence = 0u32;
    let mut yaw = 0.0f32;
    let mut last_input = Instant::now();
    let mut bought = false;

    loop {
        if args.duration > 0 && start.elapsed() >= Duration::from_secs(args.duration) {
            client.disconnect()?;
            info!("done after {:?}", start.elapsed());
            return Ok(());
        }

        for payload in client.poll()? {
            match payload {
                PacketType::Welcome(welcome) => {
                    info!(
                        "welcomed as player {} on map '{}' ({} others known)",
                        welcome.player_id,
                        welcome.map.name,
                        welcome.roster.len().saturating_sub(1)
                    );
                    tick_rate = welcome.tick_rate;
                    let spawn = glam::Vec3::new(0.0, 1.0, 0.0);
                    prediction = Some(ClientPrediction::new(welcome.map.collider_boxes(), spawn));
                }
                PacketType::Snapshot(snapshot) => {
                    clock.observe(snapshot.server_time, start.elapsed().as_secs_f64());
                    for event in &snapshot.events {
                        log_event(event);
                    }
                    if snapshot.round.buy_open && !bought {
                        bought = true;
                        client.send_buy(WeaponKind::Rifle)?;
                    } else if !snapshot.round.buy_open {
                        bought = false;
                    }
                    if let (Some(prediction), Some(id)) = (prediction.as_mut(), client.player_id())
                    {
                        if let Some(own) = snapshot.players.iter().find(|p| p.id == id) {
                            prediction.reconcile(own);
                            debug!(
                                "reconciled through seq {} ({} pending)",
                                prediction.last_acked(),
                                prediction.pending_count()
                            );
                        }
                    }
                    history.push(snapshot);
                }
                PacketType::PlayerMeta(meta) => {
                    info!("player {} ({}) is here", meta.player_id, meta.name);
                }
                PacketType::Denied { reason } => {
                    warn!("server denied us: {reason}");
                    return Ok(());
                }
                _ => {}
            }
        }

        // Wander in a slow circle once welcomed.
        let input_interval = Duration::from_secs_f64(1.0 / tick_rate as f64);
        if client.player_id().is_some() && last_input.elapsed() >= input_interval {
            last_input = Instant::now();
            sequence += 1;
            yaw += 0.02;

            let mut cmd = InputCommand::new(sequence, input_interval.as_secs_f32());
            cmd.forward = 1.0;
            cmd.yaw = yaw;
            cmd.set_flag(InputCommand::FLAG_JUMP, sequence % 90 == 0);

            if let Some(prediction) = prediction.as_mut() {
                prediction.apply_local(&cmd);
                debug!(
                    "seq {} predicted position {:?} ({} pending)",
                    sequence,
                    prediction.position(),
                    prediction.pending_count()
                );
            }
            client.send_input(cmd)?;
        }

        // Sample a remote player to keep the interpolation path hot.
        if let (Some(rt), Some(own_id)) = (
            clock.render_time(start.elapsed().as_secs_f64()),
            client.player_id(),
        ) {
            if let Some(other) = history
                .latest()
                .and_then(|s| s.players.iter().find(|p| p.id != own_id))
            {
                if let Some(pose) = history.sample_player(other.id, rt) {
                    debug!("player {} at {:?}", other.id, pose.position);
                }
            }
        }

        std::thread::sleep(Duration::from_millis(1));
    }
}

fn log_event(event: &GameEvent) {
    match event {
        GameEvent::Kill {
            attacker,
            victim,
            instrument,
        } => info!("player {attacker} killed {victim} with {instrument:?}"),
        GameEvent::RoundStarted { round } => info!("round {round} starting"),
        GameEvent::RoundEnded { round, winner } => {
            info!("round {round} won by team {winner:?}")
        }
        GameEvent::RoundDrawn { round } => info!("round {round} drawn"),
        GameEvent::MatchOver { winners } => info!("match over, top fraggers: {winners:?}"),
        _ => {}
    }
}
