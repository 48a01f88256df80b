// Completion Check.
//
// One last encrypted round trip so the sender can distinguish "receiver
// finished and is happy" from "connection dropped mid-transfer". Kept as
// its own tiny module rather than folded into the orchestrator since it
// negotiates its own named substream protocol.

use std::io::{Read, Write};

use crate::error::Result;
use crate::frame::{FrameReader, FrameWriter};

/// Receiver side: send the one-byte encrypted acknowledgement.
pub fn send_completion<S: Write>(stream: &mut S, session_key: &[u8; 32]) -> Result<()> {
    let mut writer = FrameWriter::new(stream, session_key);
    writer.write_frame(b"y")?;
    Ok(())
}

/// Sender side: read one byte and return. The byte's value does not
/// matter — receiving anything at all on this substream is the signal.
pub fn await_completion<S: Read>(stream: &mut S, session_key: &[u8; 32]) -> Result<()> {
    let mut reader = FrameReader::new(stream, session_key);
    reader.read_frame()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn completion_round_trip() {
        let key = [3u8; 32];
        let mut buf = Vec::new();
        send_completion(&mut buf, &key).unwrap();
        await_completion(&mut Cursor::new(buf), &key).unwrap();
    }
}
