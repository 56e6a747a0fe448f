use reactor_http::{Connection, Error, HttpServer, Reactor, Response, ServerBuilder};
use std::cell::RefCell;
use std::io::{ErrorKind, Read, Write};
use std::net::{Ipv4Addr, TcpStream};
use std::os::fd::RawFd;
use std::rc::Rc;
use std::time::Duration;

const BAD_REQUEST: &[u8] =
    b"HTTP/1.1 400 Bad Request\r\nContent-Type: text/plain\r\nContent-Length: 11\r\n\r\nBad Request";
const NOT_FOUND: &[u8] =
    b"HTTP/1.1 404 Not Found\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\n404 Not Found";
const HELLO: &[u8] =
    b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 13\r\n\r\nHello, World!";

fn start() -> (Reactor, HttpServer) {
    start_with(ServerBuilder::new(0))
}

fn start_with(builder: ServerBuilder) -> (Reactor, HttpServer) {
    let mut reactor = Reactor::new().expect("reactor");
    let server = builder
        .host(Ipv4Addr::LOCALHOST)
        .build(&mut reactor)
        .expect("bind server");
    (reactor, server)
}

fn connect(server: &HttpServer) -> TcpStream {
    let stream = TcpStream::connect((Ipv4Addr::LOCALHOST, server.port())).expect("connect");
    stream
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("read timeout");
    stream
}

/// Turns the reactor until `done` holds, failing after a bounded number of turns.
fn run_until(reactor: &mut Reactor, mut done: impl FnMut(&Reactor) -> bool) {
    for _ in 0..100 {
        if done(reactor) {
            return;
        }
        reactor
            .turn(Some(Duration::from_millis(20)))
            .expect("reactor turn");
    }
    panic!("condition not reached");
}

/// Sends `request` on a fresh connection and returns everything the server
/// wrote before closing.
fn exchange(reactor: &mut Reactor, server: &HttpServer, request: &[u8]) -> Vec<u8> {
    let mut client = connect(server);
    client.write_all(request).expect("write request");

    // Accept, then read and answer.
    run_until(reactor, |r| r.len() == 2);
    run_until(reactor, |r| r.len() == 1);

    let mut response = Vec::new();
    client.read_to_end(&mut response).expect("read response");
    response
}

type Calls = Rc<RefCell<Vec<(RawFd, Vec<u8>)>>>;

fn recording_route(server: &mut HttpServer, path: &str, body: &'static str) -> Calls {
    let calls: Calls = Rc::new(RefCell::new(Vec::new()));
    let seen = calls.clone();
    server
        .add_route(path, move |mut conn: Connection<'_>, request: &[u8]| {
            seen.borrow_mut().push((conn.descriptor(), request.to_vec()));
            conn.respond(&Response::ok().body(body)).expect("respond");
            conn.close();
        })
        .expect("add route");
    calls
}

#[test]
fn bare_mode_answers_every_request_with_hello() {
    let (mut reactor, server) = start();
    assert!(server.is_bare());

    assert_eq!(exchange(&mut reactor, &server, b"GET /anything HTTP/1.1\r\n\r\n"), HELLO);
    assert_eq!(exchange(&mut reactor, &server, b"garbage"), HELLO);
}

#[test]
fn bare_mode_uses_configured_body() {
    let (mut reactor, server) = start_with(ServerBuilder::new(0).bare_body("Hello World!"));

    let response = exchange(&mut reactor, &server, b"GET / HTTP/1.1\r\n\r\n");

    assert_eq!(
        response,
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 12\r\n\r\nHello World!"
    );
}

#[test]
fn unmatched_path_gets_not_found() {
    let (mut reactor, mut server) = start();
    let calls = recording_route(&mut server, "/a", "A");

    let response = exchange(&mut reactor, &server, b"GET /b HTTP/1.1\r\n\r\n");

    assert_eq!(response, NOT_FOUND);
    assert!(calls.borrow().is_empty());
}

#[test]
fn query_string_is_part_of_the_matched_path() {
    let (mut reactor, mut server) = start();
    let calls = recording_route(&mut server, "/a", "A");

    let response = exchange(&mut reactor, &server, b"GET /a?x=1 HTTP/1.1\r\n\r\n");

    assert_eq!(response, NOT_FOUND);
    assert!(calls.borrow().is_empty());
}

#[test]
fn short_request_line_gets_bad_request_without_routing() {
    let (mut reactor, mut server) = start();
    let calls = recording_route(&mut server, "/a", "A");

    assert_eq!(exchange(&mut reactor, &server, b"GET /a\r\n\r\n"), BAD_REQUEST);
    assert_eq!(exchange(&mut reactor, &server, b"\r\n"), BAD_REQUEST);
    assert!(calls.borrow().is_empty());
}

#[test]
fn matched_route_receives_raw_request_once() {
    let (mut reactor, mut server) = start();
    let calls = recording_route(&mut server, "/a", "handled");
    let request = b"GET /a HTTP/1.1\r\nHost: localhost\r\n\r\n";

    let response = exchange(&mut reactor, &server, request);

    assert_eq!(
        response,
        b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 7\r\n\r\nhandled"
    );
    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, request);
}

#[test]
fn first_matching_route_wins() {
    let (mut reactor, mut server) = start();
    let first = recording_route(&mut server, "/dup", "first");
    let second = recording_route(&mut server, "/dup", "second");
    assert_eq!(server.route_count(), 2);
    assert_eq!(server.route_paths(), vec!["/dup", "/dup"]);

    let response = exchange(&mut reactor, &server, b"GET /dup HTTP/1.1\r\n\r\n");

    assert!(response.ends_with(b"first"));
    assert_eq!(first.borrow().len(), 1);
    assert!(second.borrow().is_empty());
}

#[test]
fn request_line_tokens_are_matched_as_raw_bytes() {
    let (mut reactor, mut server) = start();
    let calls = recording_route(&mut server, "/a", "A");

    let response = exchange(&mut reactor, &server, b"G\xffT /a HTTP/1.1\r\n\r\n");
    assert!(response.ends_with(b"A"));

    let response = exchange(&mut reactor, &server, b"GET\x0b/a\x0bHTTP/1.1\r\n\r\n");
    assert!(response.ends_with(b"A"));

    let mut request = vec![b'X'; 300];
    request.extend_from_slice(b" /a HTTP/1.1\r\n\r\n");
    let response = exchange(&mut reactor, &server, &request);
    assert!(response.ends_with(b"A"));

    assert_eq!(calls.borrow().len(), 3);
}

#[test]
fn handler_that_never_closes_keeps_connection_registered() {
    let (mut reactor, mut server) = start();
    let seen = Rc::new(RefCell::new(None));
    let record = seen.clone();
    server
        .add_route("/leak", move |conn: Connection<'_>, _request: &[u8]| {
            *record.borrow_mut() = Some(conn.descriptor());
        })
        .expect("add route");

    let mut client = connect(&server);
    client
        .set_read_timeout(Some(Duration::from_millis(200)))
        .expect("read timeout");
    client.write_all(b"GET /leak HTTP/1.1\r\n\r\n").expect("write");
    run_until(&mut reactor, |_| seen.borrow().is_some());

    let fd = seen.borrow().expect("handler ran");
    assert!(reactor.is_registered(fd));

    let mut buf = [0u8; 16];
    let err = client.read(&mut buf).expect_err("router must not write");
    assert!(matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut));

    reactor.deregister(fd).expect("still registered");
    unsafe { libc::close(fd) };
}

#[test]
fn oversized_request_is_truncated_to_buffer_minus_one() {
    let (mut reactor, mut server) = start_with(ServerBuilder::new(0).read_buffer_size(16));
    let calls = recording_route(&mut server, "/a", "ok");

    let request = b"GET /a HTTP/1.1\r\nHost: localhost\r\n\r\n";
    exchange(&mut reactor, &server, request);

    let calls = calls.borrow();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].1, &request[..15]);
}

#[test]
fn pending_connections_are_all_accepted_in_one_event() {
    let (mut reactor, server) = start();
    let clients: Vec<TcpStream> = (0..8).map(|_| connect(&server)).collect();
    // Let the handshakes land in the accept queue.
    std::thread::sleep(Duration::from_millis(50));

    let dispatched = reactor
        .turn(Some(Duration::from_secs(1)))
        .expect("reactor turn");

    assert_eq!(dispatched, 1);
    assert_eq!(reactor.len(), clients.len() + 1);
}

#[test]
fn peer_close_without_data_deregisters_connection() {
    let (mut reactor, server) = start();
    let client = connect(&server);
    run_until(&mut reactor, |r| r.len() == 2);

    drop(client);
    run_until(&mut reactor, |r| r.len() == 1);

    assert_eq!(reactor.descriptors(), vec![server.listener_fd()]);
}

#[test]
fn empty_route_path_is_rejected() {
    let (_reactor, mut server) = start();

    let err = server
        .add_route("", |conn: Connection<'_>, _request: &[u8]| conn.close())
        .expect_err("empty path");

    assert!(matches!(err, Error::EmptyRoutePath));
    assert!(server.is_bare());
}

#[test]
fn bind_failure_leaves_nothing_registered() {
    let (mut reactor, server) = start();

    let err = ServerBuilder::new(server.port())
        .host(Ipv4Addr::LOCALHOST)
        .build(&mut reactor)
        .err()
        .expect("port already in use");

    assert!(matches!(err, Error::Socket { op: "bind", .. }));
    assert_eq!(reactor.descriptors(), vec![server.listener_fd()]);
}

#[test]
fn request_after_shutdown_is_closed_without_response() {
    let (mut reactor, mut server) = start();
    let calls = recording_route(&mut server, "/a", "A");
    let mut client = connect(&server);
    run_until(&mut reactor, |r| r.len() == 2);

    server.shutdown(&mut reactor);
    assert_eq!(reactor.len(), 1);

    client.write_all(b"GET /a HTTP/1.1\r\n\r\n").expect("write");
    run_until(&mut reactor, Reactor::is_empty);

    let mut response = Vec::new();
    client.read_to_end(&mut response).expect("read");
    assert!(response.is_empty());
    assert!(calls.borrow().is_empty());
}

#[test]
fn shutdown_deregisters_and_closes_listener() {
    let (mut reactor, server) = start();
    let port = server.port();
    let fd = server.listener_fd();

    server.shutdown(&mut reactor);

    assert!(!reactor.is_registered(fd));
    assert!(reactor.is_empty());
    let err = TcpStream::connect((Ipv4Addr::LOCALHOST, port)).expect_err("listener closed");
    assert_eq!(err.kind(), ErrorKind::ConnectionRefused);
}
