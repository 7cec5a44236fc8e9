//! DNS wire protocol and transport
//!
//! This module provides the authoritative-answer wire plumbing:
//! * DNS packet parsing and serialization
//! * EDNS0 / EDNS Client Subnet handling
//! * UDP and TCP transport
//! * Graceful shutdown draining
//! * Structured logging and the crate's error taxonomy
//!
//! # Module Structure
//!
//! * `protocol` - DNS protocol definitions and packet handling
//! * `buffer` - low-level packet buffer operations
//! * `edns` - EDNS0 and EDNS Client Subnet support
//! * `server` - UDP and TCP server implementations
//! * `context` - server configuration and shared state
//! * `health` - per-backend health view
//! * `shutdown` - graceful shutdown coordination
//! * `logging` - structured query logging
//! * `errors` - error taxonomy

/// Low-level buffer operations for DNS packet handling
pub mod buffer;

/// Server configuration and shared context
pub mod context;

/// EDNS0 and EDNS Client Subnet support
pub mod edns;

/// Error taxonomy
pub mod errors;

/// Per-backend health view
pub mod health;

/// Structured query logging
pub mod logging;

/// DNS protocol definitions and packet structures
pub mod protocol;

/// UDP and TCP DNS server implementations
pub mod server;

/// Graceful shutdown coordination
pub mod shutdown;

/// Internal network utilities
mod netutil;
