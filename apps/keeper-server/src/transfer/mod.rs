// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Streaming Binary Pipeline
//!
//! Files move between the network and the disk through a bounded relay:
//! a producer task pushes chunks of at most `chunk_size` bytes, a consumer
//! task writes them out, and at most `depth` chunks are in flight. Memory
//! use is `depth * chunk_size` regardless of file size.
//!
//! - [`relay`]: the channel and its two halves
//! - [`upload`]: multipart field → relay → file under the user's upload dir
//! - [`download`]: file → relay → `multipart/form-data` response body

pub mod download;
pub mod relay;
pub mod upload;

pub use relay::{drain_into, pump_reader, relay, RelayReceiver, RelaySender};

/// Default relay chunk size (32 KiB).
pub const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Chunks buffered between producer and consumer.
pub const RELAY_DEPTH: usize = 4;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The upstream byte source failed.
    #[error("source failed: {0}")]
    Source(String),

    /// The consuming side went away.
    #[error("relay receiver disconnected")]
    Disconnected,

    /// The producing side went away without finishing.
    #[error("relay aborted before end of stream")]
    Aborted,
}
