//! Library surface for the `peerlink` CLI binary, kept separate from
//! `main.rs` so integration tests under `tests/` can drive a full
//! send/receive session without going through the process boundary.

pub mod completion;
pub mod config;
pub mod error;
pub mod file_transfer;
pub mod frame;
pub mod handshake;
pub mod metadata;
pub mod passphrase;
pub mod rendezvous;
pub mod session;
pub mod transport;
