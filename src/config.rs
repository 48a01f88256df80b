// Tunables for a session. No config file — peerlink is a one-shot CLI
// tool, so everything here is either a fixed protocol constant or a
// CLI-overridable default.

use std::net::SocketAddr;
use std::time::Duration;

/// Plaintext size per AEAD frame during file transfer. Fixed on both
/// sides rather than negotiated, since there is no handshake step left
/// to carry it in.
pub const CHUNK_SIZE: usize = 16 * 1024;

/// Upper bound on a metadata frame's plaintext size. The framed reader no
/// longer truncates silently (see frame.rs), so this is a sanity cap
/// against a misbehaving peer, not a correctness requirement.
pub const MAX_METADATA_SIZE: usize = 64 * 1024;

/// UDP port the rendezvous announcer/listener binds to.
pub const RENDEZVOUS_PORT: u16 = 47623;

pub const PUBLISH_TIMEOUT: Duration = Duration::from_secs(60);
pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const ANNOUNCE_INTERVAL: Duration = Duration::from_secs(2);

pub const PROTOCOL_HANDSHAKE: &str = "/handshake/1.0.0";
pub const PROTOCOL_METADATA: &str = "/metadata/1.0.0";
pub const PROTOCOL_FILE_TRANSFER: &str = "/file-transfer/1.0.0";
pub const PROTOCOL_COMPLETE_CHECK: &str = "/complete-check/1.0.0";

#[derive(Debug, Clone)]
pub struct Config {
    pub chunk_size: usize,
    pub rendezvous_port: u16,
    pub publish_timeout: Duration,
    pub discovery_timeout: Duration,
    /// Extra rendezvous relay addresses to also announce/query against,
    /// beyond the local broadcast domain. Empty by default (LAN-only
    /// rendezvous); see rendezvous.rs and DESIGN.md for why this stands
    /// in for a real DHT bootstrap list.
    pub bootstrap_peers: Vec<SocketAddr>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            chunk_size: CHUNK_SIZE,
            rendezvous_port: RENDEZVOUS_PORT,
            publish_timeout: PUBLISH_TIMEOUT,
            discovery_timeout: DISCOVERY_TIMEOUT,
            bootstrap_peers: Vec::new(),
        }
    }
}
