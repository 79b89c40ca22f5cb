#![deny(missing_docs)]
#![deny(warnings)]
#![deny(unsafe_code)]
//! tx3 stream socket preparation.
//!
//! Takes a raw, unconnected TCP socket and readies it for use underneath a
//! binary wire protocol:
//!
//! - tcp tuning - no-delay, read timeout, keepalive, buffer sizes
//! - extended keepalive - best-effort idle / interval / probe count tuning
//! - tls parameters - SNI and hostname verification for secure sockets
//! - bounded connect - blocking connect limited by the configured timeout
//!
//! See [initialize] for the full sequence.

/// Tx3 helper until `std::io::Error::other()` is stablized
pub fn other_err<E: Into<Box<dyn std::error::Error + Send + Sync>>>(
    error: E,
) -> std::io::Error {
    std::io::Error::new(std::io::ErrorKind::Other, error)
}

use std::io::Result;

mod error;
pub use error::*;

pub mod config;
pub use config::*;

pub mod keepalive;
pub use keepalive::KeepAliveCapability;
pub use keepalive::PlatformCapability;

pub mod tls;
pub use tls::TlsParameters;

mod socket;
pub use socket::*;

pub mod connect;

mod configure;
pub use configure::*;

#[cfg(any(test, feature = "dev_utils"))]
pub mod dev_utils;

#[cfg(test)]
mod smoke_test;
