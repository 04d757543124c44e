//! Configuration distribution: local persistence and network push.
//!
//! Two independent effects, both optional, both possible in one run:
//! - [`write_config`] serializes the runtime configuration to a file
//!   (`-W`); a write failure is fatal for the run.
//! - [`push_config`] transmits the serialized configuration to a
//!   `host:port` listener (`-U`); every failure here — malformed target,
//!   resolution, connect, write — is recovered by the caller and never
//!   aborts the run.
//!
//! The narrow push interface exists so tests can stand up an in-process
//! listener instead of a real deployment.

use std::io::Write;
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use crate::config::RuntimeConfig;

/// Bound on connect and write so a dead listener cannot hang the run.
pub const PUSH_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Local persistence
// ---------------------------------------------------------------------------

/// Serialize the configuration and write it to `path`.
pub fn write_config(config: &RuntimeConfig, path: &Path) -> Result<()> {
    config.save(path)
}

// ---------------------------------------------------------------------------
// Network push
// ---------------------------------------------------------------------------

/// Push the serialized configuration to the listener at `target`.
///
/// `target` must split into exactly two colon-delimited fields; any other
/// shape is a syntax error that echoes each field found.  All errors are
/// returned for the caller to report — none of them is fatal for the run.
pub fn push_config(config: &RuntimeConfig, target: &str) -> Result<()> {
    let fields: Vec<&str> = target.split(':').collect();
    if fields.len() != 2 {
        let echoed: String = fields.iter().map(|f| format!("[{f}]")).collect();
        bail!("syntax error in listener address, expected host:port, got {echoed}");
    }
    let host = fields[0];
    let port: u16 = fields[1]
        .parse()
        .with_context(|| format!("invalid port: {}", fields[1]))?;

    let payload = config.to_toml()?;
    let addr = resolve_target(host, port)?;

    let mut stream = TcpStream::connect_timeout(&addr, PUSH_TIMEOUT)
        .with_context(|| format!("connecting to {addr}"))?;
    stream
        .set_write_timeout(Some(PUSH_TIMEOUT))
        .context("setting write timeout")?;
    stream
        .write_all(payload.as_bytes())
        .with_context(|| format!("transmitting configuration to {addr}"))?;
    stream.shutdown(Shutdown::Write).ok();
    Ok(())
}

/// Resolve `host:port` to the first usable socket address.
fn resolve_target(host: &str, port: u16) -> Result<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .with_context(|| format!("resolving host {host}"))?
        .next()
        .with_context(|| format!("host {host} resolved to no addresses"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
