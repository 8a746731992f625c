//! Adapters between byte streams and transport IO.

use bytes::Bytes;
use futures::{Stream, StreamExt as _};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt as _};
use tokio_util::io::ReaderStream;

/// Read chunks from the transport as they arrive.
///
/// Chunk boundaries follow the transport's reads.
pub fn chunk_reader<R>(io: R) -> ReaderStream<R>
where
    R: AsyncRead,
{
    ReaderStream::new(io)
}

/// Write every chunk to the transport and flush.
///
/// Each write waits for the transport to accept the chunk, so a slow peer applies backpressure to
/// the encoder.
pub async fn write_chunks<W, S>(io: &mut W, chunks: S) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
    S: Stream<Item = Bytes>,
{
    let mut chunks = std::pin::pin!(chunks);
    while let Some(chunk) = chunks.next().await {
        io.write_all(&chunk).await?;
    }

    io.flush().await
}
