// Session Orchestrator.
//
// Drives the sender/receiver state machines and wires each substream to
// its component. This module is the only place that ever constructs the
// session key. The accept/dial sequence for each role runs on a single
// thread; there is nothing running concurrently within one session.

use log::info;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use zeroize::ZeroizeOnDrop;

use crate::config::{
    Config, PROTOCOL_COMPLETE_CHECK, PROTOCOL_FILE_TRANSFER, PROTOCOL_HANDSHAKE, PROTOCOL_METADATA,
};
use crate::error::{PeerlinkError, Result};
use crate::file_transfer::{self, TransferEvent};
use crate::handshake;
use crate::metadata::{self, Metadata};
use crate::passphrase::{self, Cid, Passphrase};
use crate::rendezvous;
use crate::transport::{self, Substream};
use crate::completion;

/// Session key, constructed exactly once per session and passed by
/// reference into every subsequent phase — never a nullable mutable
/// reference a handler could tear. Zeroized on drop.
#[derive(ZeroizeOnDrop)]
struct SessionKey([u8; 32]);

fn log_progress(event: TransferEvent) {
    match event {
        TransferEvent::ChunkSent { bytes_sent, total_bytes } => {
            if total_bytes == 0 || bytes_sent % (1024 * 1024) < 64 * 1024 {
                info!("sent {bytes_sent}/{total_bytes} bytes");
            }
        }
        TransferEvent::ChunkReceived { bytes_received, .. } => {
            if bytes_received % (1024 * 1024) < 64 * 1024 {
                info!("received {bytes_received} bytes");
            }
        }
    }
}

/// `peerlink send <path>`. Generates a fresh passphrase, displays it, and
/// runs the session to completion.
pub fn run_send(config: &Config, file_path: &Path) -> Result<()> {
    let words = passphrase::generate_passphrase()?;
    println!("Your passphrase is: {}", words.display());
    run_send_with_words(config, file_path, words)
}

/// The sender's protocol driver, parameterized over the passphrase. Split
/// out from `run_send` so tests (in this module and in `tests/`) can pin
/// both sides to the same words without going through stdout.
pub fn run_send_with_words(config: &Config, file_path: &Path, words: Passphrase) -> Result<()> {
    if !file_path.exists() {
        return Err(PeerlinkError::FileNotFound(file_path.to_path_buf()));
    }

    let cid = passphrase::derive_cid(&words, chrono::Utc::now());
    info!("derived rendezvous CID {}", cid.to_hex());

    rendezvous::bootstrap(config)?;
    let (listener, port) = transport::listen(SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0))?;
    let publisher = rendezvous::publish(config, &cid, port)?;

    // Phase 1: Handshake. The sender is the PAKE responder (role 1).
    let handshake_stream = transport::accept_substream(&listener, PROTOCOL_HANDSHAKE)?;
    let mut handshake_stream = Substream(handshake_stream);
    let weak_secret = words.weak_secret();
    let session_key = SessionKey(handshake::run_responder(&mut handshake_stream, &weak_secret)?);
    info!("handshake complete");

    // Phase 2: Metadata. No substream is opened, and no file bytes move,
    // until the session key above is set — this ordering is the
    // orchestrator's job to enforce, not any individual component's.
    let metadata_stream = transport::accept_substream(&listener, PROTOCOL_METADATA)?;
    let mut metadata_stream = Substream(metadata_stream);
    let file_size = std::fs::metadata(file_path)?.len() as i64;
    let filename = file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("file")
        .to_string();
    let md = Metadata { filename, size: file_size };
    let accepted = metadata::send_metadata(&mut metadata_stream, &session_key.0, &md)?;

    if !accepted {
        info!("receiver declined the transfer");
        publisher.stop();
        return Ok(());
    }

    // Phase 3: File transfer.
    let file_stream = transport::accept_substream(&listener, PROTOCOL_FILE_TRANSFER)?;
    let mut file_stream = Substream(file_stream);
    file_transfer::send_file(&mut file_stream, &session_key.0, file_path, config.chunk_size, log_progress)?;
    // Half-close the write side so the receiver's read-to-EOF loop in
    // `receive_file` observes a clean end of stream instead of blocking
    // forever on the next frame.
    file_stream.0.shutdown(std::net::Shutdown::Write)?;
    info!("file transfer complete");

    // Phase 4: Completion check.
    let complete_stream = transport::accept_substream(&listener, PROTOCOL_COMPLETE_CHECK)?;
    let mut complete_stream = Substream(complete_stream);
    completion::await_completion(&mut complete_stream, &session_key.0)?;
    info!("completion check received");

    publisher.stop();
    Ok(())
}

/// `peerlink receive <passphrase>`.
pub fn run_receive(
    config: &Config,
    passphrase: &str,
    output_dir: &Path,
    prompt: impl FnOnce(&Metadata) -> bool,
) -> Result<Option<PathBuf>> {
    let words = Passphrase::parse(passphrase)?;
    let cid: Cid = passphrase::derive_cid(&words, chrono::Utc::now());
    info!("derived rendezvous CID {}", cid.to_hex());

    rendezvous::bootstrap(config)?;
    let addr = rendezvous::find_and_dial(config, &cid)?.peer_addr()?;

    // Phase 1: Handshake. The receiver is the PAKE initiator (role 0).
    let handshake_stream = transport::open_substream(addr, PROTOCOL_HANDSHAKE)?;
    let mut handshake_stream = Substream(handshake_stream);
    let weak_secret = words.weak_secret();
    let session_key = SessionKey(handshake::run_initiator(&mut handshake_stream, &weak_secret)?);
    info!("handshake complete");

    // Phase 2: Metadata.
    let metadata_stream = transport::open_substream(addr, PROTOCOL_METADATA)?;
    let mut metadata_stream = Substream(metadata_stream);
    let (md, accepted) = metadata::receive_metadata(&mut metadata_stream, &session_key.0, prompt)?;

    if !accepted {
        info!("declined transfer of {}", md.filename);
        return Ok(None);
    }

    // Phase 3: File transfer.
    let output_path = file_transfer::pick_output_path(output_dir, &md.filename);
    let file_stream = transport::open_substream(addr, PROTOCOL_FILE_TRANSFER)?;
    let mut file_stream = Substream(file_stream);
    let transfer_result =
        file_transfer::receive_file(&mut file_stream, &session_key.0, &output_path, log_progress);

    if let Err(e) = transfer_result {
        // Partial output is left on disk; the caller decides whether to
        // delete or keep it.
        return Err(e);
    }
    info!("file transfer complete: {}", output_path.display());

    // Phase 4: Completion check.
    let complete_stream = transport::open_substream(addr, PROTOCOL_COMPLETE_CHECK)?;
    let mut complete_stream = Substream(complete_stream);
    completion::send_completion(&mut complete_stream, &session_key.0)?;
    info!("completion check sent");

    Ok(Some(output_path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::thread;
    use std::time::Duration;

    fn test_config(port: u16) -> Config {
        Config {
            rendezvous_port: port,
            publish_timeout: Duration::from_secs(5),
            discovery_timeout: Duration::from_secs(5),
            chunk_size: frame_chunk_for_tests(),
            ..Config::default()
        }
    }

    fn frame_chunk_for_tests() -> usize {
        4096
    }

    #[test]
    fn happy_path_small_file() {
        let port = 48_200;
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("hello.txt");
        fs::write(&input_path, b"hello\n!").unwrap();

        let send_config = test_config(port);
        let send_path = input_path.clone();

        // The sender needs to display its passphrase before the receiver
        // can parse it, so derive it once up front and drive both roles
        // with the same words via the lower-level pieces directly in
        // this test rather than through the CLI's own passphrase
        // generation (which the receiver has no way to observe).
        let words = passphrase::generate_passphrase().unwrap();
        let passphrase_str = words.display();

        let sender = thread::spawn(move || {
            run_send_with_words(&send_config, &send_path, words)
        });

        // Give the sender a moment to bind and publish before the
        // receiver starts discovery.
        thread::sleep(Duration::from_millis(200));

        let recv_config = test_config(port);
        let output_dir = dir.path().to_path_buf();
        let received =
            run_receive(&recv_config, &passphrase_str, &output_dir, |_| true).unwrap();

        sender.join().unwrap().unwrap();

        let received = received.expect("metadata was accepted");
        assert_eq!(fs::read(received).unwrap(), b"hello\n!");
    }

    #[test]
    fn wrong_passphrase_finds_no_providers() {
        let port = 48_201;
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("f.bin");
        fs::write(&input_path, b"x").unwrap();

        let send_config = test_config(port);
        let words_a = Passphrase(["a".into(), "b".into(), "c".into(), "d".into(), "e".into()]);
        let words_b_str = "a-b-c-d-f";

        let send_path = input_path.clone();
        let sender = thread::spawn(move || run_send_with_words(&send_config, &send_path, words_a));

        thread::sleep(Duration::from_millis(200));

        let recv_config = test_config(port);
        let result = run_receive(&recv_config, words_b_str, dir.path(), |_| true);
        assert!(matches!(result, Err(PeerlinkError::NoProvidersFound)));

        // The sender is left waiting for a connection that will never
        // come; this test only checks the receiver's behavior, so it
        // does not join the sender thread.
        drop(sender);
    }

    #[test]
    fn receiver_declines_metadata() {
        let port = 48_202;
        let dir = tempfile::tempdir().unwrap();
        let input_path = dir.path().join("f.bin");
        fs::write(&input_path, b"not today").unwrap();

        let send_config = test_config(port);
        let words = passphrase::generate_passphrase().unwrap();
        let passphrase_str = words.display();
        let send_path = input_path.clone();

        let sender = thread::spawn(move || run_send_with_words(&send_config, &send_path, words));

        thread::sleep(Duration::from_millis(200));

        let recv_config = test_config(port);
        let received = run_receive(&recv_config, &passphrase_str, dir.path(), |_| false).unwrap();
        assert!(received.is_none());

        sender.join().unwrap().unwrap();
        assert!(!dir.path().join("f.bin").exists());
    }
}
