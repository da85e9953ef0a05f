//! # Pipelined Connection
//!
//! Wraps one [`Transport`] and batches commands so that a single network
//! round-trip is amortized over up to `max_pipeline` operations.
//!
//! ## Locking Protocol
//!
//! All state (the transport and the outstanding-reply counter) sits behind
//! one async mutex:
//!
//! - `send` takes the lock, buffers the command and bumps the counter. When
//!   the counter reaches `max_pipeline` it **releases** the lock and then
//!   calls `flush`. The release/re-acquire is a defined sequence point:
//!   another caller may slip in between, and whichever flush runs first
//!   drains everything that was sent up to that moment.
//! - `flush` always acquires the lock itself and holds it for the whole
//!   write-and-drain. It is never called with the lock held.
//!
//! ## Failure Model
//!
//! Any transport failure, and any error reply from the server, poisons the
//! connection. The outstanding counter can no longer be trusted, so every
//! later call fails with [`PipelineError::Poisoned`] instead of guessing how
//! to resynchronize.

use crate::transport::{Command, Reply, Transport, TransportError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, error, trace};

/// Errors raised by a pipelined connection.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("connection {slot}: failed to send command: {source}")]
    Send {
        slot: usize,
        #[source]
        source: TransportError,
    },

    #[error("connection {slot}: failed to write pipelined commands: {source}")]
    Write {
        slot: usize,
        #[source]
        source: TransportError,
    },

    #[error("connection {slot}: failed to read reply {read} of {expected}: {source}")]
    Receive {
        slot: usize,
        read: usize,
        expected: usize,
        #[source]
        source: TransportError,
    },

    #[error("connection {slot}: server replied with error on reply {read} of {expected}: {message}")]
    ErrorReply {
        slot: usize,
        read: usize,
        expected: usize,
        message: String,
    },

    #[error("connection {slot} is unusable after an earlier failure")]
    Poisoned { slot: usize },

    #[error("connection {slot}: failed to close: {source}")]
    Close {
        slot: usize,
        #[source]
        source: TransportError,
    },
}

/// Running counters for one connection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub commands_sent: u64,
    /// Flushes that actually wrote to the transport.
    pub flushes: u64,
    /// Flushes triggered from inside `send`.
    pub auto_flushes: u64,
    pub replies_read: u64,
}

struct PipelineState<T> {
    transport: T,
    outstanding: usize,
    poisoned: bool,
    stats: PipelineStats,
}

/// A transport plus the bookkeeping of how many replies it still owes.
pub struct PipelinedConnection<T: Transport> {
    slot: usize,
    max_pipeline: usize,
    state: Mutex<PipelineState<T>>,
}

impl<T: Transport> PipelinedConnection<T> {
    /// Wrap `transport`. A `max_pipeline` of 0 is treated as 1.
    pub fn new(slot: usize, transport: T, max_pipeline: usize) -> Self {
        Self {
            slot,
            max_pipeline: max_pipeline.max(1),
            state: Mutex::new(PipelineState {
                transport,
                outstanding: 0,
                poisoned: false,
                stats: PipelineStats::default(),
            }),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    pub fn max_pipeline(&self) -> usize {
        self.max_pipeline
    }

    /// Buffer `command` and flush if the pipeline is full.
    ///
    /// With `max_pipeline == 1` this is a fully synchronous call: the command
    /// is written and its reply consumed before returning.
    pub async fn send(&self, command: &Command) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(PipelineError::Poisoned { slot: self.slot });
        }

        if let Err(source) = state.transport.send(command).await {
            state.poisoned = true;
            error!("Connection {} failed to send {}: {}", self.slot, command.name(), source);
            return Err(PipelineError::Send {
                slot: self.slot,
                source,
            });
        }
        state.outstanding += 1;
        state.stats.commands_sent += 1;

        if state.outstanding < self.max_pipeline {
            return Ok(());
        }

        state.stats.auto_flushes += 1;
        trace!(
            "Connection {} reached pipeline depth {}, flushing",
            self.slot,
            self.max_pipeline
        );
        // flush() takes the lock on its own.
        drop(state);
        self.flush().await
    }

    /// Write every buffered command and read exactly as many replies.
    ///
    /// A no-op, with no transport I/O, when nothing is outstanding.
    pub async fn flush(&self) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        if state.poisoned {
            return Err(PipelineError::Poisoned { slot: self.slot });
        }
        if state.outstanding == 0 {
            return Ok(());
        }

        let expected = state.outstanding;
        if let Err(source) = state.transport.flush().await {
            state.poisoned = true;
            error!("Connection {} failed to write batch: {}", self.slot, source);
            return Err(PipelineError::Write {
                slot: self.slot,
                source,
            });
        }
        state.stats.flushes += 1;

        let mut read = 0;
        while state.outstanding > 0 {
            read += 1;
            match state.transport.receive().await {
                Ok(Reply::Error(message)) => {
                    state.poisoned = true;
                    error!(
                        "Connection {} got error reply {} of {}: {}",
                        self.slot, read, expected, message
                    );
                    return Err(PipelineError::ErrorReply {
                        slot: self.slot,
                        read,
                        expected,
                        message,
                    });
                }
                Ok(_) => {
                    state.outstanding -= 1;
                    state.stats.replies_read += 1;
                }
                Err(source) => {
                    state.poisoned = true;
                    error!(
                        "Connection {} failed reading reply {} of {}: {}",
                        self.slot, read, expected, source
                    );
                    return Err(PipelineError::Receive {
                        slot: self.slot,
                        read,
                        expected,
                        source,
                    });
                }
            }
        }

        debug!("Connection {} drained {} replies", self.slot, expected);
        Ok(())
    }

    /// Replies owed by the server right now.
    pub async fn outstanding(&self) -> usize {
        self.state.lock().await.outstanding
    }

    pub async fn stats(&self) -> PipelineStats {
        self.state.lock().await.stats
    }

    pub async fn is_poisoned(&self) -> bool {
        self.state.lock().await.poisoned
    }

    /// Close the transport. Commands still buffered are discarded, so
    /// callers drain with [`flush`](Self::flush) first.
    pub async fn close(&self) -> Result<(), PipelineError> {
        let mut state = self.state.lock().await;
        if state.outstanding > 0 {
            debug!(
                "Connection {} closing with {} replies outstanding",
                self.slot, state.outstanding
            );
        }
        let name = state.transport.name();
        state
            .transport
            .close()
            .await
            .map_err(|source| PipelineError::Close {
                slot: self.slot,
                source,
            })?;
        debug!("Connection {} ({}) closed", self.slot, name);
        Ok(())
    }
}
