// Closed error taxonomy for a peerlink session. One variant per failure
// kind a single send/receive run can hit; no retries are attempted
// anywhere in this crate — a session is one-shot.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PeerlinkError {
    #[error("passphrase must be exactly five words separated by '-'")]
    BadPassphrase,

    #[error("file not found: {0}")]
    FileNotFound(std::path::PathBuf),

    #[error("could not bind the rendezvous socket: {0}")]
    BootstrapFailed(std::io::Error),

    #[error("timed out publishing the rendezvous record")]
    PublishTimeout,

    #[error("no providers found for this passphrase within the discovery window")]
    NoProvidersFound,

    #[error("found providers but could not connect to any of them")]
    DialAllFailed,

    #[error("handshake failed: {0}")]
    HandshakeFailed(String),

    #[error("authentication failed while decrypting a frame (key mismatch or tampering)")]
    AuthFailed,

    #[error("stream ended mid-frame (expected {expected} more bytes)")]
    Truncated { expected: usize },

    #[error("stream closed cleanly at a frame boundary")]
    EndOfStream,

    #[error("file checksum mismatch: transfer is corrupt or was tampered with")]
    ChecksumMismatch,

    #[error("operating system RNG unavailable: {0}")]
    EntropyUnavailable(rand::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, PeerlinkError>;
