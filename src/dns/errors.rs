//! Error taxonomy for the GSLB DNS core
//!
//! Kept in the `derive_more`-based style used by `context::ContextError` and
//! `server::ServerError` rather than the larger hand-rolled error hierarchy
//! the teacher also carries — this crate's error surface is the small closed
//! set below, not an open one.

use derive_more::{Display, Error, From};

#[derive(Debug, Display, From, Error)]
pub enum GslbError {
    #[display(fmt = "no healthy backend available")]
    NoHealthyBackend,

    #[display(fmt = "unknown routing algorithm: {}", _0)]
    UnknownAlgorithm(#[error(not(source))] String),

    #[display(fmt = "invalid address: {}", _0)]
    InvalidAddress(#[error(not(source))] String),

    #[display(fmt = "service not configured: {}", _0)]
    ServiceNotConfigured(#[error(not(source))] String),

    #[display(fmt = "backend not found: {}", _0)]
    BackendNotFound(#[error(not(source))] String),

    #[display(fmt = "malformed request")]
    FormatError,

    #[display(fmt = "unsupported operation: {}", _0)]
    Unsupported(#[error(not(source))] String),

    Buffer(crate::dns::buffer::BufferError),
    Io(std::io::Error),
}

pub type Result<T> = std::result::Result<T, GslbError>;
