// Substream dialing/accepting. The multiplexed, hole-punching,
// NAT-traversing host is treated as an external black-box transport;
// this module is the minimal concrete realization that keeps the four
// protocol IDs bit-exact on the wire: one TCP connection per substream,
// preceded by a newline-terminated protocol ID line — the same
// "negotiate then hand off" shape as libp2p's multistream-select,
// without the dependency.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};

use crate::error::{PeerlinkError, Result};

/// Dial `addr` and open a substream for `protocol_id`.
pub fn open_substream(addr: SocketAddr, protocol_id: &str) -> Result<TcpStream> {
    let mut stream = TcpStream::connect(addr)?;
    stream.write_all(protocol_id.as_bytes())?;
    stream.write_all(b"\n")?;
    stream.flush()?;
    Ok(stream)
}

/// Bind a listener for incoming substreams and report the port it ended
/// up on (needed so the sender can publish a reachable address).
pub fn listen(bind_addr: SocketAddr) -> Result<(TcpListener, u16)> {
    let listener = TcpListener::bind(bind_addr)?;
    let port = listener.local_addr()?.port();
    Ok((listener, port))
}

/// Accept exactly one substream and require it to negotiate
/// `expected_protocol`. The orchestrator drives these calls in a fixed
/// phase order, so there is no need for a dispatch table keyed by
/// protocol ID — each phase simply asserts the protocol it expects next.
///
/// Reads the protocol-ID line one byte at a time rather than through a
/// `BufReader`: a buffered reader would happily read ahead past the
/// newline into whatever frame bytes follow on the wire, and those bytes
/// would be stranded in the buffer once this function returns the plain
/// `TcpStream` to the caller.
pub fn accept_substream(listener: &TcpListener, expected_protocol: &str) -> Result<TcpStream> {
    let (mut stream, _peer) = listener.accept()?;
    let negotiated = read_protocol_line(&mut stream)?;

    if negotiated != expected_protocol {
        return Err(PeerlinkError::HandshakeFailed(format!(
            "expected substream '{expected_protocol}', peer negotiated '{negotiated}'"
        )));
    }

    Ok(stream)
}

fn read_protocol_line(stream: &mut TcpStream) -> Result<String> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    loop {
        stream.read_exact(&mut byte)?;
        if byte[0] == b'\n' {
            break;
        }
        line.push(byte[0]);
    }
    Ok(String::from_utf8_lossy(&line).into_owned())
}

/// Wraps a `TcpStream` so frame readers/writers (which take generic
/// `Read`/`Write`) can share one handle without fighting over ownership.
pub struct Substream(pub TcpStream);

impl Read for Substream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.0.read(buf)
    }
}

impl Write for Substream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        self.0.flush()
    }
}
