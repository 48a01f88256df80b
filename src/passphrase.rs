// Passphrase & Rendezvous Derivation.
//
// Generates the five-word passphrase the two peers share out of band,
// and derives the day-bucketed rendezvous CID both sides compute
// independently from it. The five words are treated as one opaque
// vector with no special meaning for the first word beyond its position
// in the rendezvous preimage.

use bip39::Mnemonic;
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{PeerlinkError, Result};

pub const WORD_COUNT: usize = 5;

#[derive(Clone, PartialEq, Eq)]
pub struct Passphrase(pub [String; WORD_COUNT]);

impl Passphrase {
    /// Parse `word-word-word-word-word` as received on the CLI.
    pub fn parse(joined: &str) -> Result<Self> {
        let words: Vec<&str> = joined.split('-').collect();
        let words: [String; WORD_COUNT] = words
            .into_iter()
            .map(str::to_owned)
            .collect::<Vec<_>>()
            .try_into()
            .map_err(|_| PeerlinkError::BadPassphrase)?;
        Ok(Passphrase(words))
    }

    pub fn display(&self) -> String {
        self.0.join("-")
    }

    /// The weak secret fed into the PAKE: the five words joined by single
    /// spaces.
    pub fn weak_secret(&self) -> zeroize::Zeroizing<String> {
        zeroize::Zeroizing::new(self.0.join(" "))
    }
}

/// Produce 128 bits of OS entropy, map to a 12-word BIP-39 mnemonic, and
/// keep only the first five words. Fails with `EntropyUnavailable` if the
/// OS RNG itself fails (never expected in practice, but the error path
/// exists rather than panicking).
pub fn generate_passphrase() -> Result<Passphrase> {
    let mut entropy = [0u8; 16];
    OsRng
        .try_fill_bytes(&mut entropy)
        .map_err(PeerlinkError::EntropyUnavailable)?;

    let mnemonic = Mnemonic::from_entropy(&entropy)
        .expect("16 bytes is a valid BIP-39 entropy length");

    let words: [String; WORD_COUNT] = mnemonic
        .word_iter()
        .take(WORD_COUNT)
        .map(str::to_owned)
        .collect::<Vec<_>>()
        .try_into()
        .expect("a 12-word mnemonic always yields at least 5 words");

    Ok(Passphrase(words))
}

/// Self-describing multihash identifying the rendezvous point: CIDv1,
/// codec `raw` (0x55), multihash SHA-256. Hand-built rather than pulled
/// from the `cid`/`multihash` crates: every field here (version, codec,
/// hash function, digest length) is a value under 0x80, so the varint
/// encoding collapses to a single byte per field and there is no wire
/// interop requirement to justify the extra dependency weight (this CID
/// never leaves the process as bytes other implementations must decode —
/// see DESIGN.md).
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub struct Cid(pub [u8; 36]);

impl Cid {
    const VERSION: u8 = 0x01;
    const CODEC_RAW: u8 = 0x55;
    const MULTIHASH_SHA256: u8 = 0x12;
    const DIGEST_LEN: u8 = 0x20;

    fn from_digest(digest: [u8; 32]) -> Self {
        let mut bytes = [0u8; 36];
        bytes[0] = Self::VERSION;
        bytes[1] = Self::CODEC_RAW;
        bytes[2] = Self::MULTIHASH_SHA256;
        bytes[3] = Self::DIGEST_LEN;
        bytes[4..].copy_from_slice(&digest);
        Cid(bytes)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// `T = truncate_to_day(now).rfc3339()`, formatted like Go's
/// `"2006-01-02T15:04:05Z07:00"` for a UTC midnight instant, i.e.
/// `"2026-07-31T00:00:00Z"`.
fn day_bucket(now: DateTime<Utc>) -> String {
    let midnight = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .expect("midnight is always a valid time")
        .and_utc();
    midnight.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Compute `T = truncate_to_day(now)`, form `pl<w0|w1|w2|w3|w4|T>`, hash
/// with SHA-256, wrap as a CIDv1/raw multihash. Pure and deterministic:
/// the same five words within the same UTC day always produce the same
/// bytes.
pub fn derive_cid(words: &Passphrase, now: DateTime<Utc>) -> Cid {
    let t = day_bucket(now);
    let preimage = format!(
        "pl<{}|{}|{}|{}|{}|{}>",
        words.0[0], words.0[1], words.0[2], words.0[3], words.0[4], t
    );

    let mut hasher = Sha256::new();
    hasher.update(preimage.as_bytes());
    let digest: [u8; 32] = hasher.finalize().into();

    Cid::from_digest(digest)
}
