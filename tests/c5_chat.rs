//! End-to-end checks for the chat server/client wire protocol, run over a
//! real loopback TCP connection.

use std::thread;
use std::time::Duration;

use sysprog_lab::chat::{Client, Server};

fn free_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn two_clients_see_each_others_broadcast_messages() {
    let port = free_port();
    let mut server = Server::new();
    server.listen(port).unwrap();

    let mut alice = Client::new("alice");
    let mut bob = Client::new("bob");
    alice.connect(&format!("127.0.0.1:{port}")).unwrap();
    bob.connect(&format!("127.0.0.1:{port}")).unwrap();

    // Let the connects land before the server's first poll.
    thread::sleep(Duration::from_millis(50));
    let _ = server.update(50);

    alice.feed(b"hello from alice\n");
    let _ = alice.update(50);
    thread::sleep(Duration::from_millis(50));
    let _ = server.update(50);
    thread::sleep(Duration::from_millis(50));
    let _ = bob.update(50);

    let received = bob.pop_next();
    assert_eq!(received.as_deref(), Some("hello from alice"));
    // The author does not receive its own broadcast back.
    let _ = alice.update(50);
    assert_eq!(alice.pop_next(), None);
}

#[test]
fn server_broadcast_tags_the_message_with_its_author_and_skips_them() {
    let port = free_port();
    let mut server = Server::new();
    server.listen(port).unwrap();

    let mut alice = Client::new("alice");
    alice.connect(&format!("127.0.0.1:{port}")).unwrap();
    thread::sleep(Duration::from_millis(50));
    let _ = server.update(50);

    alice.feed(b"ping\n");
    let _ = alice.update(50);
    thread::sleep(Duration::from_millis(50));
    let _ = server.update(50);

    let msg = server.pop_next().expect("server should have recorded the message");
    assert_eq!(msg.body, "ping");
    assert_eq!(server.peer_count(), 1);
}

#[test]
fn disconnected_peer_is_removed_instead_of_spinning() {
    let port = free_port();
    let mut server = Server::new();
    server.listen(port).unwrap();

    let mut alice = Client::new("alice");
    alice.connect(&format!("127.0.0.1:{port}")).unwrap();
    thread::sleep(Duration::from_millis(50));
    let _ = server.update(50);
    assert_eq!(server.peer_count(), 1);

    drop(alice);
    thread::sleep(Duration::from_millis(50));
    let _ = server.update(50);
    assert_eq!(server.peer_count(), 0);
}

#[test]
fn listen_twice_fails_with_already_started() {
    let port = free_port();
    let mut server = Server::new();
    server.listen(port).unwrap();
    assert!(server.listen(port).is_err());
}

#[test]
fn update_before_listen_fails_with_not_started() {
    let mut server = Server::new();
    assert!(server.update(10).is_err());
}

#[test]
fn events_are_empty_before_connecting() {
    let mut client = Client::new("x");
    client.feed(b"first\n\nsecond\n");
    // `events()` reflects connection state, not the pending send queue, so
    // it stays empty until `connect` succeeds regardless of queued input.
    assert!(client.events().is_empty());
}
