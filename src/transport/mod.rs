//! # Transport Layer
//!
//! A transport is one established connection to the target server. It knows
//! how to buffer an outgoing command, push every buffered byte to the socket
//! in a single write, and hand back the next reply. It knows nothing about
//! pipeline depth or how many replies are owed; that bookkeeping lives in
//! [`crate::pipeline::PipelinedConnection`].

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use thiserror::Error;

#[cfg(test)]
pub mod mock;
pub mod resp;
pub mod tcp;

pub use tcp::TcpTransport;

/// Errors raised by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("connection closed by server")]
    Closed,
}

/// A single command argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(String),
    Int(i64),
    Float(f64),
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Str(s) => f.write_str(s),
            Arg::Int(n) => write!(f, "{}", n),
            Arg::Float(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

impl From<i64> for Arg {
    fn from(value: i64) -> Self {
        Arg::Int(value)
    }
}

impl From<u64> for Arg {
    fn from(value: u64) -> Self {
        Arg::Int(value as i64)
    }
}

impl From<usize> for Arg {
    fn from(value: usize) -> Self {
        Arg::Int(value as i64)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value)
    }
}

/// A command name plus its variadic arguments.
///
/// ```rust
/// use geofence_bench::transport::Command;
///
/// let cmd = Command::new("SET").arg("fleet").arg(7usize).arg("POINT").arg(33.5).arg(-112.25);
/// assert_eq!(cmd.to_string(), "SET fleet 7 POINT 33.5 -112.25");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    name: String,
    args: Vec<Arg>,
}

impl Command {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument.
    pub fn arg(mut self, arg: impl Into<Arg>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// A server reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Simple(String),
    /// An error reply. Transports return it as a value; callers decide
    /// whether it is fatal.
    Error(String),
    Integer(i64),
    Bulk(Option<Bytes>),
    Array(Option<Vec<Reply>>),
}

/// A connection to the benchmark target.
///
/// `send` only buffers. Nothing reaches the wire until `flush`, and every
/// command sent produces exactly one reply for `receive`.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Encode a command into the local write buffer.
    async fn send(&mut self, command: &Command) -> Result<(), TransportError>;

    /// Write every buffered byte to the server in one write.
    async fn flush(&mut self) -> Result<(), TransportError>;

    /// Read the next pending reply, blocking until it is complete.
    async fn receive(&mut self) -> Result<Reply, TransportError>;

    /// Close the underlying connection.
    async fn close(&mut self) -> Result<(), TransportError>;

    /// Transport name for identification in logs
    fn name(&self) -> &'static str;
}
