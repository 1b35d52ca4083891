use std::sync::Arc;

use anyhow::Context;
use comms::{
    command::UserCommand,
    event::{self, Event},
};
use tokio::{
    sync::mpsc,
    task::{AbortHandle, JoinSet},
};

use crate::room::RoomRegistry;

/// [MetronomeSession] binds a single connection to its room membership and
/// routes the connection's commands to the room state machine.
///
/// The room a session belongs to is always resolved through the registry;
/// the session only keeps the abort handle of the task forwarding room
/// broadcasts into its own channel.
pub(super) struct MetronomeSession {
    session_id: String,
    registry: Arc<RoomRegistry>,
    forwarder: Option<AbortHandle>,
    join_set: JoinSet<()>,
    mpsc_tx: mpsc::Sender<Event>,
    mpsc_rx: mpsc::Receiver<Event>,
}

impl MetronomeSession {
    pub fn new(session_id: &str, registry: Arc<RoomRegistry>) -> Self {
        let (mpsc_tx, mpsc_rx) = mpsc::channel(100);

        MetronomeSession {
            session_id: String::from(session_id),
            registry,
            forwarder: None,
            join_set: JoinSet::new(),
            mpsc_tx,
            mpsc_rx,
        }
    }

    /// Route a user command to the room state machine. A command which cannot
    /// be honored is dropped without a reply; a stale or racing client simply
    /// observes that nothing happened.
    pub async fn handle_user_command(&mut self, cmd: UserCommand) {
        match cmd {
            UserCommand::JoinRoom(cmd) => {
                // a session is a member of at most one room at a time
                if self.forwarder.is_some() {
                    return;
                }

                let (mut broadcast_rx, snapshot) =
                    self.registry.join_room(&cmd.room, &self.session_id).await;

                // spawn a task to forward room broadcasts to the session's own
                // channel; the join reply goes in first so the client learns
                // the room state before any broadcast
                let abort_handle = self.join_set.spawn({
                    let mpsc_tx = self.mpsc_tx.clone();

                    let _ = mpsc_tx
                        .send(Event::RoomJoined(event::RoomJoinedReplyEvent {
                            room: cmd.room.clone(),
                            is_host: snapshot.is_host,
                            tempo: snapshot.tempo,
                            beats_per_bar: snapshot.beats_per_bar,
                        }))
                        .await;

                    async move {
                        while let Ok(event) = broadcast_rx.recv().await {
                            let _ = mpsc_tx.send(event).await;
                        }
                    }
                });

                self.forwarder = Some(abort_handle);
            }
            UserCommand::StartMetronome(cmd) => {
                self.registry
                    .start_metronome(&self.session_id, cmd.tempo, cmd.beats_per_bar)
                    .await;
            }
            UserCommand::StopMetronome(_) => {
                self.registry.stop_metronome(&self.session_id).await;
            }
            UserCommand::UpdateTempo(cmd) => {
                self.registry
                    .update_tempo(&self.session_id, cmd.tempo)
                    .await;
            }
            UserCommand::UpdateTimeSignature(cmd) => {
                self.registry
                    .update_time_signature(&self.session_id, cmd.beats_per_bar)
                    .await;
            }
            UserCommand::LeaveRoom(cmd) => {
                if self.registry.leave_room(&cmd.room, &self.session_id).await {
                    self.abort_forwarder();
                }
            }
            UserCommand::Quit(_) => {}
        }
    }

    /// Leave whichever room the session currently belongs to, used when the
    /// connection goes away.
    pub async fn leave_current_room(&mut self) {
        self.registry.leave_any(&self.session_id).await;
        self.abort_forwarder();
    }

    /// Receive the next event addressed to this session, either a reply or a
    /// broadcast forwarded from the joined room.
    pub async fn recv(&mut self) -> anyhow::Result<Event> {
        self.mpsc_rx
            .recv()
            .await
            .context("could not recv from the broadcast channel")
    }

    fn abort_forwarder(&mut self) {
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
    }
}
