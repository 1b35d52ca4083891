use std::sync::Arc;

use comms::{
    command::UserCommand,
    event::{self, Event},
    transport,
};
use nanoid::nanoid;
use tokio::{net::TcpStream, sync::broadcast};
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::room::RoomRegistry;

use self::metronome_session::MetronomeSession;

mod metronome_session;

/// Given a tcp stream and the room registry, handles the user session
/// until the user quits the session, or the tcp stream is closed for some reason, or the server shuts down
pub async fn handle_user_session(
    registry: Arc<RoomRegistry>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let session_id = nanoid!();
    // Split the tcp stream into a command stream and an event writer with better ergonomics
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);

    info!(session = %session_id, "session connected");

    // Welcoming the user with the id their room membership will be tracked by
    event_writer
        .write(&Event::Connected(event::ConnectedReplyEvent {
            session_id: session_id.clone(),
        }))
        .await?;

    // The metronome session abstracts the room membership handling for the connection
    let mut session = MetronomeSession::new(&session_id, registry);

    loop {
        tokio::select! {
            cmd = commands.next() => match cmd {
                // If the user closes the tcp stream, or sends a quit cmd,
                // leave the joined room so the other members notice the departure
                None | Some(Ok(UserCommand::Quit(_))) => {
                    session.leave_current_room().await;
                    break;
                }
                // Handle a valid user command
                Some(Ok(cmd)) => {
                    session.handle_user_command(cmd).await;
                }
                // A malformed frame is skipped; the room state machine never
                // observes it and the connection stays usable
                Some(Err(err)) => {
                    debug!(session = %session_id, "ignoring malformed frame: {}", err);
                }
            },
            // Aggregated events from the joined room are sent to the user
            Ok(event) = session.recv() => {
                // a session which cannot be written to anymore counts as disconnected
                if let Err(err) = event_writer.write(&event).await {
                    debug!(session = %session_id, "dropping unwritable session: {}", err);
                    session.leave_current_room().await;
                    break;
                }
            }
            // If the server is shutting down, we can just close the tcp stream
            // and exit the session handler. The registry tears all rooms down,
            // there is no need to leave them one by one
            Ok(_) = quit_rx.recv() => {
                drop(event_writer);
                debug!(session = %session_id, "closing session for server shutdown");
                break;
            }
        }
    }

    info!(session = %session_id, "session closed");

    Ok(())
}
