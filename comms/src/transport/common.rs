use std::{marker::PhantomData, pin::Pin};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::tcp::{OwnedReadHalf, OwnedWriteHalf},
};
use tokio_stream::{wrappers::LinesStream, Stream, StreamExt};

pub const NEW_LINE: &[u8; 2] = b"\r\n";

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// [JsonLinesWriter] serializes values of a single type as line delimited JSON
/// into the write half of a [tokio::net::TcpStream].
///
/// Both directions of the transport are specializations of this writer, see
/// [crate::transport::server] and [crate::transport::client].
pub struct JsonLinesWriter<T> {
    writer: OwnedWriteHalf,
    _marker: PhantomData<T>,
}

impl<T: Serialize> JsonLinesWriter<T> {
    pub fn new(writer: OwnedWriteHalf) -> Self {
        Self {
            writer,
            _marker: PhantomData,
        }
    }

    /// Serialize a single value and write it to the backing stream as one line
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the value may have been
    /// partially written, but future calls to `write` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write(&mut self, value: &T) -> anyhow::Result<()> {
        let mut serialized_bytes = serde_json::to_vec(value)?;
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer.write_all(serialized_bytes.as_slice()).await?;

        Ok(())
    }
}

/// Turns the read half of a [tokio::net::TcpStream] into a stream of line
/// delimited JSON values. An unparseable line is surfaced as an [Err] item
/// rather than terminating the stream, the receiver decides how to react.
///
/// # Cancel Safety
///
/// The returned stream is cancel-safe, meaning that it can be used in
/// [tokio::select!] without the risk of missing items.
pub fn json_lines_stream<T: DeserializeOwned>(
    reader: OwnedReadHalf,
    peer: &'static str,
) -> BoxedStream<anyhow::Result<T>> {
    Box::pin(
        LinesStream::new(BufReader::new(reader).lines()).map(move |line| {
            line.with_context(|| format!("could not read line from the {}", peer))
                .and_then(|line| {
                    serde_json::from_str::<T>(&line)
                        .with_context(|| format!("failed to deserialize payload from the {}", peer))
                })
        }),
    )
}
