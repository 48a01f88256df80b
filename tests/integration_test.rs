//! Black-box session tests driving the full sender/receiver orchestrator
//! over real loopback TCP + UDP rendezvous, exercising `peerlink` purely
//! through its public library surface (no access to private internals).

use std::fs;
use std::thread;
use std::time::Duration;

use peerlink::config::Config;
use peerlink::passphrase::Passphrase;
use peerlink::session;

fn test_config(port: u16) -> Config {
    Config {
        rendezvous_port: port,
        publish_timeout: Duration::from_secs(10),
        discovery_timeout: Duration::from_secs(10),
        chunk_size: 64 * 1024,
        ..Config::default()
    }
}

/// Scenario 1 from the spec's end-to-end test list: a 1 MiB all-zero file
/// transfers byte-for-byte between two independently-driven sides.
#[test]
fn happy_path_one_megabyte_of_zeros() {
    let port = 48_400;
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("zeros.bin");
    let payload = vec![0u8; 1_048_576];
    fs::write(&input_path, &payload).unwrap();

    let words = Passphrase([
        "orbit".into(),
        "maple".into(),
        "river".into(),
        "zebra".into(),
        "flint".into(),
    ]);
    let passphrase_str = words.display();
    assert_eq!(passphrase_str, "orbit-maple-river-zebra-flint");

    let send_config = test_config(port);
    let send_path = input_path.clone();
    let sender =
        thread::spawn(move || session::run_send_with_words(&send_config, &send_path, words));

    thread::sleep(Duration::from_millis(200));

    let recv_config = test_config(port);
    let output_dir = dir.path().to_path_buf();
    let received = session::run_receive(&recv_config, &passphrase_str, &output_dir, |_| true)
        .expect("receive should succeed");

    sender.join().unwrap().expect("send should succeed");

    let output_path = received.expect("metadata was accepted");
    assert_eq!(fs::read(output_path).unwrap(), payload);
}

/// Scenario 2: a tiny file that fits in a single frame.
#[test]
fn happy_path_seven_byte_file() {
    let port = 48_401;
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("tiny.txt");
    fs::write(&input_path, b"hello\n!").unwrap();

    let words = Passphrase([
        "alpha".into(),
        "bravo".into(),
        "charlie".into(),
        "delta".into(),
        "echo".into(),
    ]);
    let passphrase_str = words.display();

    let send_config = test_config(port);
    let send_path = input_path.clone();
    let sender =
        thread::spawn(move || session::run_send_with_words(&send_config, &send_path, words));

    thread::sleep(Duration::from_millis(200));

    let recv_config = test_config(port);
    let output_dir = dir.path().to_path_buf();
    let received = session::run_receive(&recv_config, &passphrase_str, &output_dir, |_| true)
        .expect("receive should succeed");

    sender.join().unwrap().expect("send should succeed");

    let output_path = received.expect("metadata was accepted");
    assert_eq!(fs::read(output_path).unwrap(), b"hello\n!");
}
