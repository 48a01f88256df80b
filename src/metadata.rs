// Metadata Exchange.
//
// One framed-AEAD round trip: the sender announces filename/size, the
// receiver prompts the human and answers y/n. Grounded on the `FileMetadata`
// shape already used by `file_transfer.rs`, trimmed to exactly two fields —
// size and a display filename, nothing about transfer IDs or chunk counts,
// which belong to the file-transfer stream now that frames are
// self-delimiting.

use serde::{Deserialize, Serialize};
use std::io::{Read, Write};

use crate::config::MAX_METADATA_SIZE;
use crate::error::{PeerlinkError, Result};
use crate::frame::{FrameReader, FrameWriter};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub filename: String,
    pub size: i64,
}

/// Sender side: announce the file, then read the receiver's one-byte
/// y/n answer. Returns whether the receiver accepted.
pub fn send_metadata<S: Read + Write>(
    stream: &mut S,
    session_key: &[u8; 32],
    metadata: &Metadata,
) -> Result<bool> {
    let mut writer = FrameWriter::new(&mut *stream, session_key);
    let payload = serde_json::to_vec(metadata)?;
    writer.write_frame(&payload)?;

    let mut reader = FrameReader::new(&mut *stream, session_key);
    let answer = reader.read_frame()?;
    Ok(answer.first() == Some(&b'y'))
}

/// Receiver side: read the sender's metadata frame, prompt the human via
/// the supplied prompt function, and send back the one-byte answer.
pub fn receive_metadata<S: Read + Write>(
    stream: &mut S,
    session_key: &[u8; 32],
    prompt: impl FnOnce(&Metadata) -> bool,
) -> Result<(Metadata, bool)> {
    let mut reader = FrameReader::new(&mut *stream, session_key);
    let payload = reader.read_frame()?;
    if payload.len() > MAX_METADATA_SIZE {
        return Err(PeerlinkError::HandshakeFailed(
            "metadata frame exceeds the sanity size cap".into(),
        ));
    }
    let metadata: Metadata = serde_json::from_slice(&payload)?;

    let accepted = prompt(&metadata);

    let mut writer = FrameWriter::new(&mut *stream, session_key);
    writer.write_frame(if accepted { b"y" } else { b"n" })?;

    Ok((metadata, accepted))
}

/// CLI rendering of the acceptance prompt shown to the receiving side.
pub fn format_prompt(metadata: &Metadata) -> String {
    format!(
        "Received file metadata:\nFilename: {}\nSize: {} bytes\nDo you want to receive this file? (y/n): ",
        metadata.filename, metadata.size
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct Duplex {
        to_peer: Vec<u8>,
        from_peer: Cursor<Vec<u8>>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            self.from_peer.read(buf)
        }
    }
    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.to_peer.write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn accepted_round_trip() {
        let key = [5u8; 32];

        let mut sender_side = Duplex { to_peer: Vec::new(), from_peer: Cursor::new(Vec::new()) };
        let md = Metadata { filename: "report.pdf".into(), size: 4096 };

        // Sender writes its metadata frame into its own outbox.
        {
            let mut writer = FrameWriter::new(&mut sender_side.to_peer, &key);
            let payload = serde_json::to_vec(&md).unwrap();
            writer.write_frame(&payload).unwrap();
        }

        // Receiver reads from that outbox, answers "y" into its own outbox.
        let mut receiver_side = Duplex {
            to_peer: Vec::new(),
            from_peer: Cursor::new(sender_side.to_peer.clone()),
        };
        let (received, accepted) =
            receive_metadata(&mut receiver_side, &key, |_| true).unwrap();
        assert_eq!(received.filename, "report.pdf");
        assert_eq!(received.size, 4096);
        assert!(accepted);

        // Sender reads the receiver's answer.
        sender_side.from_peer = Cursor::new(receiver_side.to_peer);
        let mut reader = FrameReader::new(&mut sender_side, &key);
        let answer = reader.read_frame().unwrap();
        assert_eq!(answer, b"y");
    }

    #[test]
    fn declined_prompt_returns_false() {
        let key = [6u8; 32];
        let mut outbox = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut outbox, &key);
            let md = Metadata { filename: "x".into(), size: 1 };
            writer.write_frame(&serde_json::to_vec(&md).unwrap()).unwrap();
        }
        let mut receiver_side = Duplex { to_peer: Vec::new(), from_peer: Cursor::new(outbox) };
        let (_, accepted) = receive_metadata(&mut receiver_side, &key, |_| false).unwrap();
        assert!(!accepted);

        let mut reader = FrameReader::new(Cursor::new(receiver_side.to_peer), &key);
        assert_eq!(reader.read_frame().unwrap(), b"n");
    }
}
