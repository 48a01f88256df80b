// Framed AEAD Transport.
//
// A length-prefixed, per-frame-authenticated wrapper over any
// `Read`/`Write` byte stream. Grounded on the AES-256-GCM encrypt/decrypt
// pair in `crypto.rs`'s `CryptoManager::encrypt`/`decrypt`, generalized
// from a base64-in-JSON envelope to a raw binary wire frame since every
// substream here is already a private, already-authenticated channel
// rather than something serialized for IPC.
//
// Wire format: `len:u32_be || nonce:12B || ciphertext_and_tag`.
//
// `read_frame` returns an owned `Vec<u8>` sized to the frame's plaintext
// rather than copying into a caller-supplied buffer that would silently
// drop excess bytes. That removes the "receiver buffer must be at least
// the sender's chunk size" footgun entirely.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use std::io::{self, ErrorKind, Read, Write};

use crate::error::{PeerlinkError, Result};

const NONCE_SIZE: usize = 12;
const LEN_PREFIX_SIZE: usize = 4;

pub struct FrameWriter<W: Write> {
    inner: W,
    cipher: Aes256Gcm,
}

impl<W: Write> FrameWriter<W> {
    pub fn new(inner: W, session_key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(session_key).expect("key is exactly 32 bytes");
        FrameWriter { inner, cipher }
    }

    /// Seal `plaintext` with a fresh random nonce and emit one frame.
    /// Returns the number of plaintext bytes consumed, which is always
    /// `plaintext.len()` on success.
    pub fn write_frame(&mut self, plaintext: &[u8]) -> Result<usize> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| io::Error::new(ErrorKind::Other, "AES-GCM seal failed"))?;

        let frame_len = (NONCE_SIZE + ciphertext.len()) as u32;
        self.inner.write_all(&frame_len.to_be_bytes())?;
        self.inner.write_all(&nonce_bytes)?;
        self.inner.write_all(&ciphertext)?;
        self.inner.flush()?;

        Ok(plaintext.len())
    }
}

pub struct FrameReader<R: Read> {
    inner: R,
    cipher: Aes256Gcm,
}

impl<R: Read> FrameReader<R> {
    pub fn new(inner: R, session_key: &[u8; 32]) -> Self {
        let cipher = Aes256Gcm::new_from_slice(session_key).expect("key is exactly 32 bytes");
        FrameReader { inner, cipher }
    }

    /// Read exactly one frame and return its decrypted plaintext. Signals
    /// `EndOfStream` on a clean EOF at the frame boundary (no bytes of
    /// the next frame's length prefix have arrived yet); any other
    /// short read is `Truncated`; a bad auth tag is `AuthFailed` and the
    /// reader does not consume anything beyond the current frame.
    pub fn read_frame(&mut self) -> Result<Vec<u8>> {
        let mut len_buf = [0u8; LEN_PREFIX_SIZE];
        if let Err(e) = self.inner.read_exact(&mut len_buf) {
            if e.kind() == ErrorKind::UnexpectedEof {
                return Err(PeerlinkError::EndOfStream);
            }
            return Err(PeerlinkError::Io(e));
        }
        let frame_len = u32::from_be_bytes(len_buf) as usize;

        let mut frame = vec![0u8; frame_len];
        if let Err(e) = self.inner.read_exact(&mut frame) {
            return Err(if e.kind() == ErrorKind::UnexpectedEof {
                PeerlinkError::Truncated { expected: frame_len }
            } else {
                PeerlinkError::Io(e)
            });
        }

        if frame.len() < NONCE_SIZE {
            return Err(PeerlinkError::Truncated { expected: NONCE_SIZE });
        }
        let (nonce_bytes, ciphertext) = frame.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        self.cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| PeerlinkError::AuthFailed)
    }
}
