// Rendezvous & Peer Discovery.
//
// The libp2p host bootstrap and DHT are treated as an external,
// black-box transport collaborator — interface-only. This module realizes
// that interface (`publish`, `find_and_dial`) as a UDP broadcast provider
// directory, generalized from `discovery.rs` (which announces "a device
// is online" over the LAN) into "this host provides a given CID." It is a
// LAN/broadcast-domain stand-in for a Kademlia DHT, not a reimplementation
// of one — see DESIGN.md for the scope rationale.

use network_interface::NetworkInterfaceConfig;
use serde::{Deserialize, Serialize};
use socket2::{Domain, Protocol, Socket, Type};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, SocketAddr, TcpStream, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::error::{PeerlinkError, Result};
use crate::passphrase::Cid;

#[derive(Serialize, Deserialize)]
struct ProviderRecord {
    cid_hex: String,
    service_port: u16,
}

fn bind_broadcast_socket(port: u16) -> std::io::Result<UdpSocket> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    #[cfg(not(windows))]
    socket.set_reuse_port(true)?;
    socket.set_broadcast(true)?;
    socket.set_read_timeout(Some(Duration::from_millis(250)))?;

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), port);
    socket.bind(&addr.into())?;
    Ok(socket.into())
}

/// Every broadcast-capable address across local interfaces, plus the
/// global broadcast address, all targeting `port` — the same port the
/// peer's listening socket is bound to via `config.rendezvous_port`.
/// Grounded on `get_local_broadcast_addresses`.
fn broadcast_targets(port: u16) -> Vec<SocketAddr> {
    let mut targets = vec![SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port)];

    if let Ok(interfaces) = network_interface::NetworkInterface::show() {
        for iface in &interfaces {
            for addr in &iface.addr {
                if let network_interface::Addr::V4(v4) = addr {
                    if v4.ip.is_loopback() {
                        continue;
                    }
                    if let Some(bcast) = v4.broadcast {
                        targets.push(SocketAddr::new(IpAddr::V4(bcast), port));
                    }
                }
            }
        }
    }
    targets
}

/// Bind the rendezvous socket, failing with `BootstrapFailed` if the
/// port cannot be acquired. This must succeed before any DHT traffic is
/// attempted.
pub fn bootstrap(config: &Config) -> Result<()> {
    bind_broadcast_socket(config.rendezvous_port)
        .map(|_| ())
        .map_err(PeerlinkError::BootstrapFailed)
}

/// Announce this host as a provider of `cid`, reachable at
/// `service_port`, until `stop` is set or `config.publish_timeout`
/// elapses. Runs on a background thread; the caller gets a handle to stop
/// it early (e.g. once the session completes and the record no longer
/// needs to be kept warm).
pub struct Publisher {
    stop: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Publisher {
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

pub fn publish(config: &Config, cid: &Cid, service_port: u16) -> Result<Publisher> {
    let socket = bind_broadcast_socket(config.rendezvous_port).map_err(PeerlinkError::BootstrapFailed)?;
    let record = ProviderRecord { cid_hex: cid.to_hex(), service_port };
    let payload = serde_json::to_vec(&record)?;
    let mut targets = broadcast_targets(config.rendezvous_port);
    // Beyond the local broadcast domain, also announce directly to any
    // configured bootstrap peers (e.g. a relay reachable across NATs),
    // standing in for connecting to bootstrap peers before publishing to
    // the DHT.
    targets.extend(config.bootstrap_peers.iter().copied());
    let stop = Arc::new(AtomicBool::new(false));
    let stop_for_thread = Arc::clone(&stop);
    let deadline = Instant::now() + config.publish_timeout;

    let handle = thread::spawn(move || {
        while !stop_for_thread.load(Ordering::SeqCst) && Instant::now() < deadline {
            for target in &targets {
                let _ = socket.send_to(&payload, target);
            }
            thread::sleep(crate::config::ANNOUNCE_INTERVAL);
        }
    });

    Ok(Publisher { stop, handle: Some(handle) })
}

/// Listen for provider records matching `cid` for up to
/// `config.discovery_timeout`, then dial each candidate address in the
/// order discovered and return the first live TCP connection.
pub fn find_and_dial(config: &Config, cid: &Cid) -> Result<TcpStream> {
    let socket =
        bind_broadcast_socket(config.rendezvous_port).map_err(PeerlinkError::BootstrapFailed)?;
    let deadline = Instant::now() + config.discovery_timeout;
    let target_hex = cid.to_hex();

    let mut candidates: Vec<SocketAddr> = Vec::new();
    let mut seen = HashSet::new();
    let mut buf = [0u8; 4096];

    while Instant::now() < deadline && candidates.is_empty() {
        match socket.recv_from(&mut buf) {
            Ok((amt, src)) => {
                if let Ok(record) = serde_json::from_slice::<ProviderRecord>(&buf[..amt]) {
                    if record.cid_hex == target_hex {
                        let addr = SocketAddr::new(src.ip(), record.service_port);
                        if seen.insert(addr) {
                            candidates.push(addr);
                        }
                    }
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(e) => return Err(PeerlinkError::Io(e)),
        }
    }

    if candidates.is_empty() {
        return Err(PeerlinkError::NoProvidersFound);
    }

    for addr in &candidates {
        if let Ok(stream) = TcpStream::connect_timeout(addr, Duration::from_secs(5)) {
            return Ok(stream);
        }
    }

    Err(PeerlinkError::DialAllFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passphrase::derive_cid;
    use crate::passphrase::Passphrase;
    use chrono::Utc;

    fn test_config(port: u16) -> Config {
        Config {
            rendezvous_port: port,
            publish_timeout: Duration::from_millis(800),
            discovery_timeout: Duration::from_millis(800),
            ..Config::default()
        }
    }

    #[test]
    fn publish_then_find_and_dial_reaches_a_listening_service() {
        let port = 48_100;
        let config = test_config(port);
        let words = Passphrase([
            "orbit".into(), "maple".into(), "river".into(), "zebra".into(), "flint".into(),
        ]);
        let cid = derive_cid(&words, Utc::now());

        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let service_port = listener.local_addr().unwrap().port();

        let accept_thread = thread::spawn(move || listener.accept().is_ok());

        let publisher = publish(&config, &cid, service_port).unwrap();
        let dialed = find_and_dial(&config, &cid);
        publisher.stop();

        assert!(dialed.is_ok(), "expected to dial the published provider");
        assert!(accept_thread.join().unwrap());
    }

    #[test]
    fn find_and_dial_times_out_with_no_providers() {
        let config = test_config(48_101);
        let words = Passphrase([
            "a".into(), "b".into(), "c".into(), "d".into(), "e".into(),
        ]);
        let cid = derive_cid(&words, Utc::now());
        let result = find_and_dial(&config, &cid);
        assert!(matches!(result, Err(PeerlinkError::NoProvidersFound)));
    }
}

