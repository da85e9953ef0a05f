//! In-memory transport used by unit tests.
//!
//! It tracks commands that are buffered, written, and answered, and refuses
//! to hand out a reply that was never owed.

use super::{Command, Reply, Transport, TransportError};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
pub struct MockState {
    pub sent: Vec<Command>,
    pub buffered: usize,
    pub in_flight: usize,
    pub flush_calls: usize,
    pub receive_calls: usize,
    pub closed: bool,
    /// Fail every `send` with an I/O error.
    pub fail_send: bool,
    /// Fail every `flush` with an I/O error.
    pub fail_flush: bool,
    /// Answer the n-th `receive` call (1-based) with an error reply.
    pub error_reply_at: Option<usize>,
}

/// Cloneable handle; clones share state so tests can inspect a transport
/// after handing it to a connection.
#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, command: &Command) -> Result<(), TransportError> {
        let mut state = self.state();
        if state.fail_send {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "mock send failure",
            )));
        }
        state.sent.push(command.clone());
        state.buffered += 1;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), TransportError> {
        let mut state = self.state();
        state.flush_calls += 1;
        if state.fail_flush {
            return Err(TransportError::Io(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "mock flush failure",
            )));
        }
        state.in_flight += state.buffered;
        state.buffered = 0;
        Ok(())
    }

    async fn receive(&mut self) -> Result<Reply, TransportError> {
        let mut state = self.state();
        state.receive_calls += 1;
        if state.in_flight == 0 {
            return Err(TransportError::Protocol(
                "receive called with no reply pending".to_string(),
            ));
        }
        state.in_flight -= 1;
        if state.error_reply_at == Some(state.receive_calls) {
            return Ok(Reply::Error("ERR mock failure".to_string()));
        }
        Ok(Reply::Simple("OK".to_string()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.state().closed = true;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "Mock"
    }
}
