// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bounded producer/consumer relay.
//!
//! A relay is a `tokio::sync::mpsc` channel of frames. `send` suspends while
//! the channel is full and `next_chunk` suspends while it is empty. A stream
//! ends only with an explicit `End` frame, so a producer that disappears
//! mid-transfer is reported as `Aborted` rather than read as a short file.

use bytes::Bytes;
use futures_util::Stream;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;

use super::TransferError;

enum Frame {
    Data(Bytes),
    Fail(TransferError),
    End,
}

/// Create a relay holding at most `depth` chunks of at most `chunk_size`.
pub fn relay(depth: usize, chunk_size: usize) -> (RelaySender, RelayReceiver) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (
        RelaySender {
            tx,
            chunk_size: chunk_size.max(1),
        },
        RelayReceiver { rx, done: false },
    )
}

/// Producing half.
pub struct RelaySender {
    tx: mpsc::Sender<Frame>,
    chunk_size: usize,
}

impl RelaySender {
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Push `data`, re-sliced into chunks of at most `chunk_size`.
    pub async fn send(&self, mut data: Bytes) -> Result<(), TransferError> {
        while !data.is_empty() {
            let piece = if data.len() > self.chunk_size {
                data.split_to(self.chunk_size)
            } else {
                std::mem::take(&mut data)
            };
            self.tx
                .send(Frame::Data(piece))
                .await
                .map_err(|_| TransferError::Disconnected)?;
        }
        Ok(())
    }

    /// Mark a clean end of stream.
    pub async fn finish(self) -> Result<(), TransferError> {
        self.tx
            .send(Frame::End)
            .await
            .map_err(|_| TransferError::Disconnected)
    }

    /// Abort the stream, handing `err` to the receiver.
    pub async fn fail(self, err: TransferError) {
        // Receiver may already be gone
        let _ = self.tx.send(Frame::Fail(err)).await;
    }
}

/// Consuming half.
pub struct RelayReceiver {
    rx: mpsc::Receiver<Frame>,
    done: bool,
}

impl RelayReceiver {
    /// Next chunk, `Ok(None)` at a clean end, or the error that ended the
    /// stream. Returns `Ok(None)` forever after the first terminal result.
    pub async fn next_chunk(&mut self) -> Result<Option<Bytes>, TransferError> {
        if self.done {
            return Ok(None);
        }
        match self.rx.recv().await {
            Some(Frame::Data(chunk)) => Ok(Some(chunk)),
            Some(Frame::End) => {
                self.done = true;
                Ok(None)
            }
            Some(Frame::Fail(err)) => {
                self.done = true;
                Err(err)
            }
            None => {
                self.done = true;
                Err(TransferError::Aborted)
            }
        }
    }

    /// Adapt into a stream suitable for a response body.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, TransferError>> + Send + 'static {
        futures_util::stream::unfold(self, |mut rx| async move {
            match rx.next_chunk().await {
                Ok(Some(chunk)) => Some((Ok(chunk), rx)),
                Ok(None) => None,
                Err(err) => Some((Err(err), rx)),
            }
        })
    }
}

/// Read `reader` to its end into the relay. Returns bytes sent.
///
/// A read error is forwarded to the receiver and returned.
pub async fn pump_reader<R>(mut reader: R, sender: RelaySender) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin,
{
    let mut buf = vec![0u8; sender.chunk_size()];
    let mut total = 0u64;

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                sender.fail(TransferError::Source(e.to_string())).await;
                return Err(TransferError::Io(e));
            }
        };
        sender.send(Bytes::copy_from_slice(&buf[..n])).await?;
        total += n as u64;
    }

    sender.finish().await?;
    Ok(total)
}

/// Write every chunk from the relay to `writer`, then flush and shut it
/// down. The writer is closed even when the stream fails, so whatever was
/// received stays on disk. Returns bytes written.
pub async fn drain_into<W>(mut receiver: RelayReceiver, mut writer: W) -> Result<u64, TransferError>
where
    W: AsyncWrite + Unpin,
{
    let mut total = 0u64;
    let copied: Result<(), TransferError> = async {
        while let Some(chunk) = receiver.next_chunk().await? {
            writer.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        Ok(())
    }
    .await;

    // Drop the receiver first so a blocked producer sees the disconnect
    drop(receiver);
    let closed = async {
        writer.flush().await?;
        writer.shutdown().await
    }
    .await;

    copied?;
    closed?;
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;
    use std::time::Duration;
    use tokio_util::io::StreamReader;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    #[tokio::test]
    async fn send_reslices_into_chunk_size() {
        let (tx, mut rx) = relay(8, 4);
        tx.send(Bytes::from_static(b"abcdefghij")).await.unwrap();
        tx.finish().await.unwrap();

        let mut chunks = Vec::new();
        while let Some(chunk) = rx.next_chunk().await.unwrap() {
            chunks.push(chunk);
        }
        assert_eq!(chunks, vec!["abcd", "efgh", "ij"]);
        // Terminal state is sticky
        assert!(rx.next_chunk().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn full_relay_applies_backpressure() {
        let (tx, mut rx) = relay(1, 4);
        tx.send(Bytes::from_static(b"one!")).await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            tx.send(Bytes::from_static(b"two!")),
        )
        .await;
        assert!(blocked.is_err(), "send should wait for the consumer");

        assert_eq!(rx.next_chunk().await.unwrap().unwrap(), "one!");
        tx.send(Bytes::from_static(b"two!")).await.unwrap();
        assert_eq!(rx.next_chunk().await.unwrap().unwrap(), "two!");
    }

    #[tokio::test]
    async fn abandoned_sender_is_aborted() {
        let (tx, mut rx) = relay(4, 4);
        tx.send(Bytes::from_static(b"half")).await.unwrap();
        drop(tx);

        assert_eq!(rx.next_chunk().await.unwrap().unwrap(), "half");
        assert!(matches!(
            rx.next_chunk().await,
            Err(TransferError::Aborted)
        ));
    }

    #[tokio::test]
    async fn dropped_receiver_disconnects_sender() {
        let (tx, rx) = relay(4, 4);
        drop(rx);
        assert!(matches!(
            tx.send(Bytes::from_static(b"data")).await,
            Err(TransferError::Disconnected)
        ));
    }

    #[tokio::test]
    async fn fail_reaches_receiver() {
        let (tx, mut rx) = relay(4, 4);
        tx.fail(TransferError::Source("client went away".into()))
            .await;
        assert!(matches!(
            rx.next_chunk().await,
            Err(TransferError::Source(_))
        ));
    }

    #[tokio::test]
    async fn pump_and_drain_copy_large_input() {
        let input = pattern(1024 * 1024 + 17);
        let (tx, rx) = relay(2, 8 * 1024);

        let consumer = tokio::spawn(drain_into(rx, Vec::new()));
        let sent = pump_reader(input.as_slice(), tx).await.unwrap();

        assert_eq!(sent, input.len() as u64);
        let written = consumer.await.unwrap().unwrap();
        assert_eq!(written, input.len() as u64);
    }

    #[tokio::test]
    async fn drain_output_matches_input() {
        let input = pattern(100_000);
        let (tx, rx) = relay(2, 1024);
        let (client, mut server) = tokio::io::duplex(4096);

        let consumer = tokio::spawn(drain_into(rx, client));
        let producer = tokio::spawn({
            let input = input.clone();
            async move { pump_reader(input.as_slice(), tx).await }
        });

        let mut output = Vec::new();
        server.read_to_end(&mut output).await.unwrap();
        producer.await.unwrap().unwrap();
        consumer.await.unwrap().unwrap();
        assert_eq!(output, input);
    }

    #[tokio::test]
    async fn read_error_aborts_both_sides() {
        let source = futures_util::stream::iter(vec![
            Ok(Bytes::from_static(b"partial")),
            Err(std::io::Error::other("connection reset")),
        ]);
        let (tx, rx) = relay(4, 4);

        let consumer = tokio::spawn(drain_into(rx, Vec::new()));
        let pumped = pump_reader(StreamReader::new(source), tx).await;

        assert!(matches!(pumped, Err(TransferError::Io(_))));
        assert!(matches!(
            consumer.await.unwrap(),
            Err(TransferError::Source(_))
        ));
    }

    #[tokio::test]
    async fn write_error_disconnects_producer() {
        let (writer, reader) = tokio::io::duplex(16);
        drop(reader);

        let (tx, rx) = relay(1, 4);
        let consumer = tokio::spawn(drain_into(rx, writer));

        let input = pattern(4096);
        let pumped = pump_reader(input.as_slice(), tx).await;

        assert!(consumer.await.unwrap().is_err());
        assert!(matches!(pumped, Err(TransferError::Disconnected)));
    }

    #[tokio::test]
    async fn into_stream_yields_chunks_then_error() {
        let (tx, rx) = relay(4, 3);
        tx.send(Bytes::from_static(b"abcdef")).await.unwrap();
        drop(tx);

        let items: Vec<_> = rx.into_stream().collect().await;
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].as_ref().unwrap(), "abc");
        assert_eq!(items[1].as_ref().unwrap(), "def");
        assert!(matches!(items[2], Err(TransferError::Aborted)));
    }
}
