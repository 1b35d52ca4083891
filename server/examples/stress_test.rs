use std::time::Duration;

use comms::{
    command::{self, UserCommand},
    event::Event,
    transport,
};
use nanoid::nanoid;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::{net::TcpStream, task::JoinSet};
use tokio_stream::StreamExt;

/// Stress Test for the Metronome Server
///
/// Generates synthetic load with rooms of one host and a fixed number of
/// listeners. Each host keeps restarting its room's metronome at random
/// tempos while the listeners consume the beat broadcasts.
///
/// !IMPORTANT! Be sure to check and configure your socket limits, before you run the tests

const SERVER_ADDR: &str = "localhost:8080";

/// Stress Test Configuration
// The number of rooms to spawn, distributed across the load increments
const LOAD_INCREMENTS: &str = r#"[
    { "room_count": 120, "after": { "secs": 60, "nanos": 0 }, "steps": 60 },
    { "room_count": 240, "after": { "secs": 120, "nanos": 0 }, "steps": 60 }
]"#;
// How many listeners join each room next to its host
const LISTENERS_PER_ROOM: usize = 4;
// How many milliseconds a host waits between metronome restarts
const HOST_RESTART_DELAY_MILLIS: u64 = 10_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LoadIncrements {
    room_count: usize,
    after: Duration,
    steps: usize,
}

async fn spawn_host(room: String) -> anyhow::Result<()> {
    let result = spawn_host_raw(room).await;

    match result.as_ref() {
        Ok(_) => println!("host exited without problems"),
        Err(err) => println!("some error occurred = {}", err),
    }

    result
}

async fn spawn_host_raw(room: String) -> anyhow::Result<()> {
    let tcp_stream = TcpStream::connect(SERVER_ADDR).await?;
    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);

    let _connected = match event_stream.next().await {
        Some(Ok(Event::Connected(connected))) => connected,
        _ => return Err(anyhow::anyhow!("server did not send the welcome event")),
    };

    command_writer
        .write(&UserCommand::JoinRoom(command::JoinRoomCommand { room }))
        .await?;

    let join_handle = tokio::spawn({
        let mut rng = StdRng::from_entropy();
        let to_sleep = Duration::from_millis(HOST_RESTART_DELAY_MILLIS);

        async move {
            // sleep initially for a time to distribute the restart times
            tokio::time::sleep(Duration::from_millis(
                rng.gen_range(1..HOST_RESTART_DELAY_MILLIS),
            ))
            .await;

            loop {
                let _ = command_writer
                    .write(&UserCommand::StartMetronome(
                        command::StartMetronomeCommand {
                            tempo: rng.gen_range(60.0..240.0),
                            beats_per_bar: rng.gen_range(2..8u32),
                        },
                    ))
                    .await;

                tokio::time::sleep(to_sleep).await;
            }
        }
    });

    while event_stream.next().await.is_some() {}

    join_handle.abort();
    Ok(())
}

async fn spawn_listener(room: String) -> anyhow::Result<()> {
    let result = spawn_listener_raw(room).await;

    match result.as_ref() {
        Ok(_) => println!("listener exited without problems"),
        Err(err) => println!("some error occurred = {}", err),
    }

    result
}

async fn spawn_listener_raw(room: String) -> anyhow::Result<()> {
    let tcp_stream = TcpStream::connect(SERVER_ADDR).await?;
    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);

    let _connected = match event_stream.next().await {
        Some(Ok(Event::Connected(connected))) => connected,
        _ => return Err(anyhow::anyhow!("server did not send the welcome event")),
    };

    // give the host a head start so it lands first in the member order
    tokio::time::sleep(Duration::from_millis(50)).await;

    command_writer
        .write(&UserCommand::JoinRoom(command::JoinRoomCommand { room }))
        .await?;

    while event_stream.next().await.is_some() {}

    Ok(())
}

#[tokio::main]
async fn main() {
    let load_increments: Vec<LoadIncrements> =
        serde_json::from_str(LOAD_INCREMENTS).expect("could not parse the load increments");

    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();

    let mut current: usize = 0;
    for li in load_increments {
        let diff = li.room_count - current;
        let sleep_duration =
            Duration::from_millis((li.after.as_millis() / li.steps as u128) as u64);
        let to_increment = diff / li.steps;

        for _ in 0..li.steps {
            for _ in 0..to_increment {
                let room_code = String::from(&nanoid!()[0..6]);

                join_set.spawn(spawn_host(room_code.clone()));
                for _ in 0..LISTENERS_PER_ROOM {
                    join_set.spawn(spawn_listener(room_code.clone()));
                }
            }

            current += to_increment;
            println!("total rooms: {}", current);
            tokio::time::sleep(sleep_duration).await;
        }
    }

    while join_set.join_next().await.is_some() {}
}
