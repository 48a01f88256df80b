// PAKE Handshake.
//
// Two-flight SPAKE2-style exchange over the five-word passphrase (joined
// with single spaces) as the weak secret, producing a 256-bit session
// key. The original protocol calls for "SIEC", a custom curve with no
// vetted Rust implementation, so this uses the `spake2` crate's
// `Ed25519Group`, a standard, reviewed SPAKE2 instantiation; see
// DESIGN.md for the full rationale. Bounded-size flights, symmetric key
// derivation, and failure on mismatched secrets are all preserved.
//
// Role assignment is fixed: receiver = role 0 (initiator), sender =
// role 1 (responder).

use sha2::{Digest, Sha256};
use spake2::{Ed25519Group, Identity, Password, Spake2};
use std::io::{Read, Write};
use zeroize::Zeroize;

use crate::error::{PeerlinkError, Result};

const MAX_FLIGHT_SIZE: usize = 1024;
const ID_INITIATOR: &[u8] = b"peerlink-initiator";
const ID_RESPONDER: &[u8] = b"peerlink-responder";
/// Explicit confirmation byte the initiator sends once it has derived a
/// session key, instead of relying on a "read to EOF" completion barrier
/// — a half-close is not observable on every transport.
const DONE_MARKER: u8 = 0x01;

fn write_flight<S: Write>(stream: &mut S, msg: &[u8]) -> Result<()> {
    debug_assert!(msg.len() <= MAX_FLIGHT_SIZE);
    let len = msg.len() as u16;
    stream.write_all(&len.to_be_bytes())?;
    stream.write_all(msg)?;
    stream.flush()?;
    Ok(())
}

fn read_flight<S: Read>(stream: &mut S) -> Result<Vec<u8>> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf)?;
    let len = u16::from_be_bytes(len_buf) as usize;
    if len > MAX_FLIGHT_SIZE {
        return Err(PeerlinkError::HandshakeFailed(format!(
            "peer flight of {len} bytes exceeds the {MAX_FLIGHT_SIZE}-byte maximum"
        )));
    }
    let mut msg = vec![0u8; len];
    stream.read_exact(&mut msg)?;
    Ok(msg)
}

fn derive_session_key(pake_output: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(pake_output);
    hasher.finalize().into()
}

/// Run the initiator side (the receiver, role 0): INIT → emit flight →
/// AWAIT_RESPONSE → read flight, derive key → DONE.
pub fn run_initiator<S: Read + Write>(stream: &mut S, weak_secret: &str) -> Result<[u8; 32]> {
    let mut secret = weak_secret.to_owned();
    let (state, outbound) = Spake2::<Ed25519Group>::start_a(
        &Password::new(secret.as_bytes()),
        &Identity::new(ID_INITIATOR),
        &Identity::new(ID_RESPONDER),
    );
    secret.zeroize();

    write_flight(stream, &outbound)?;
    let inbound = read_flight(stream)?;

    let pake_output = state
        .finish(&inbound)
        .map_err(|e| PeerlinkError::HandshakeFailed(e.to_string()))?;
    let session_key = derive_session_key(&pake_output);

    // Confirm completion explicitly rather than relying on a half-close.
    stream.write_all(&[DONE_MARKER])?;
    stream.flush()?;

    Ok(session_key)
}

/// Run the responder side (the sender, role 1): INIT → AWAIT_INITIAL,
/// read flight, emit flight, derive key → AWAIT_CLOSE, read the
/// initiator's explicit done marker → DONE.
pub fn run_responder<S: Read + Write>(stream: &mut S, weak_secret: &str) -> Result<[u8; 32]> {
    let mut secret = weak_secret.to_owned();
    let (state, outbound) = Spake2::<Ed25519Group>::start_b(
        &Password::new(secret.as_bytes()),
        &Identity::new(ID_INITIATOR),
        &Identity::new(ID_RESPONDER),
    );
    secret.zeroize();

    let inbound = read_flight(stream)?;
    write_flight(stream, &outbound)?;

    let pake_output = state
        .finish(&inbound)
        .map_err(|e| PeerlinkError::HandshakeFailed(e.to_string()))?;
    let session_key = derive_session_key(&pake_output);

    let mut marker = [0u8; 1];
    stream.read_exact(&mut marker)?;
    if marker[0] != DONE_MARKER {
        return Err(PeerlinkError::HandshakeFailed(
            "initiator sent an unexpected completion marker".into(),
        ));
    }

    Ok(session_key)
}
