use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{json_lines_stream, BoxedStream, JsonLinesWriter};

/// [CommandStream] is a stream of [crate::command::UserCommand]s sent by the client
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select!]
/// without the risk of missing commands.
pub type CommandStream = BoxedStream<anyhow::Result<command::UserCommand>>;

/// [EventWriter] writes [crate::event::Event]s to the client, see
/// [crate::transport::common::JsonLinesWriter] for cancel safety notes
pub type EventWriter = JsonLinesWriter<event::Event>;

/// Splits a TCP stream into a stream of commands and an event writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] to split
pub fn split_tcp_stream(stream: TcpStream) -> (CommandStream, EventWriter) {
    let (reader, writer) = stream.into_split();

    (json_lines_stream(reader, "client"), EventWriter::new(writer))
}
