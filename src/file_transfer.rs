// File Transfer.
//
// Two-phase stream: an unframed, unencrypted 32-byte SHA-256 header
// (computed over the whole file up front) followed by the file itself as
// fixed-size AEAD frames. Grounded on `FileTransferManager::prepare_send`/
// `calculate_file_checksum` and the auto-suffix `name (k).ext` logic in
// `prepare_receive`, generalized
// from a chunk-ack-per-message protocol (this system has no resend path —
// a failed transfer is simply retried from scratch) down to a plain
// streaming pipe, since C2 frames are already self-delimiting and
// authenticated.

use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::error::{PeerlinkError, Result};
use crate::frame::{FrameReader, FrameWriter};

const DIGEST_SIZE: usize = 32;

/// Reports transfer progress purely as ambient observability — the
/// orchestrator logs these at `info` level every so often.
pub enum TransferEvent {
    ChunkSent { bytes_sent: u64, total_bytes: u64 },
    ChunkReceived { bytes_received: u64, total_bytes: u64 },
}

fn sha256_file(path: &Path) -> Result<[u8; 32]> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().into())
}

/// Sender side: write the 32-byte digest header, then stream the file in
/// `chunk_size`-sized AEAD frames.
pub fn send_file<S: Write>(
    stream: &mut S,
    session_key: &[u8; 32],
    path: &Path,
    chunk_size: usize,
    mut on_progress: impl FnMut(TransferEvent),
) -> Result<()> {
    let digest = sha256_file(path)?;
    stream.write_all(&digest)?;

    let total_bytes = fs::metadata(path)?.len();
    let mut file = File::open(path)?;
    let mut writer = FrameWriter::new(stream, session_key);
    let mut buf = vec![0u8; chunk_size];
    let mut sent: u64 = 0;

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        writer.write_frame(&buf[..n])?;
        sent += n as u64;
        on_progress(TransferEvent::ChunkSent { bytes_sent: sent, total_bytes });
    }

    Ok(())
}

/// Receiver side: read the 32-byte digest header, then stream frames into
/// `output_path` while hashing what was written. Fails with
/// `ChecksumMismatch` if the running digest does not match the header. On
/// any failure the partially-written output file is left on disk for the
/// caller to clean up rather than silently deleted.
pub fn receive_file<S: Read>(
    stream: &mut S,
    session_key: &[u8; 32],
    output_path: &Path,
    mut on_progress: impl FnMut(TransferEvent),
) -> Result<()> {
    let mut expected_digest = [0u8; DIGEST_SIZE];
    stream.read_exact(&mut expected_digest)?;

    let mut out = File::create(output_path)?;
    let mut reader = FrameReader::new(stream, session_key);
    let mut hasher = Sha256::new();
    let mut received: u64 = 0;

    loop {
        match reader.read_frame() {
            Ok(plaintext) => {
                hasher.update(&plaintext);
                out.write_all(&plaintext)?;
                received += plaintext.len() as u64;
                on_progress(TransferEvent::ChunkReceived {
                    bytes_received: received,
                    total_bytes: received,
                });
            }
            Err(PeerlinkError::EndOfStream) => break,
            Err(e) => return Err(e),
        }
    }
    out.flush()?;

    let actual_digest: [u8; 32] = hasher.finalize().into();
    if actual_digest != expected_digest {
        return Err(PeerlinkError::ChecksumMismatch);
    }

    Ok(())
}

/// Pick the first available `name.ext`, `name (1).ext`, `name (2).ext`,
/// ... under `dir` for the given display filename. Mirrors
/// `prepare_receive`'s auto-suffix behavior for handling a name collision
/// with an existing file in the output directory.
pub fn pick_output_path(dir: &Path, display_filename: &str) -> PathBuf {
    let stem = Path::new(display_filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("file");
    let ext = Path::new(display_filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    let mut candidate = dir.join(display_filename);
    let mut counter = 1;
    while candidate.exists() {
        candidate = if ext.is_empty() {
            dir.join(format!("{stem} ({counter})"))
        } else {
            dir.join(format!("{stem} ({counter}).{ext}"))
        };
        counter += 1;
    }
    candidate
}
