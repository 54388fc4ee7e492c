//! Blocking client against real TCP peers on loopback.

use std::io::Read;
use std::io::Write;
use std::net::TcpListener;
use std::net::TcpStream;
use std::thread;
use std::thread::JoinHandle;
use std::time::Duration;

use sodepnet::Client;
use sodepnet::ClientConfig;
use sodepnet::Connection;
use sodepnet::Error;
use sodepnet::Fault;
use sodepnet::Message;
use sodepnet::Value;

const TIMEOUT: Duration = Duration::from_secs(5);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Accepts a single connection and hands it to `handler` on a new thread.
fn serve<F>(handler: F) -> (u16, JoinHandle<()>)
where
    F: FnOnce(TcpStream) + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("local addr").port();
    let handle = thread::spawn(move || {
        let (stream, _) = listener.accept().expect("accept");
        handler(stream);
    });
    (port, handle)
}

/// Replies to every request with `reply(request)` until the client leaves.
fn serve_replies<F>(reply: F) -> (u16, JoinHandle<()>)
where
    F: Fn(Message) -> Message + Send + 'static,
{
    serve(move |stream| {
        let mut conn = Connection::new(stream);
        loop {
            match conn.read_message() {
                Ok(request) => conn.write_message(&reply(request)).expect("server write"),
                Err(Error::Closed) => break,
                Err(e) => panic!("server read failed: {}", e),
            }
        }
    })
}

fn echo(request: Message) -> Message {
    let (id, path, op, _, payload) = request.into_parts();
    Message::new(id, path, op, payload)
}

// --- Exchanges ---

#[test]
fn test_hello_exchange() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve_replies(echo);

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    let request = Message::new(1, "/", "operation", Value::new("hello"));
    let reply = client.call(&request)?;

    assert_eq!(reply.id(), 1);
    assert_eq!(reply.resource_path(), "/");
    assert_eq!(reply.operation_name(), "operation");
    assert!(reply.fault().is_none());
    assert_eq!(reply.payload().content().as_str(), Some("hello"));

    client.close()?;
    server.join().expect("server thread");
    Ok(())
}

#[test]
fn test_request_bytes_on_the_wire() -> anyhow::Result<()> {
    init_tracing();
    let request = Message::new(1, "/", "operation", Value::new("hello"));
    let expected = request.to_bytes()?;
    let len = expected.len();

    let (port, server) = serve(move |mut stream| {
        let mut received = vec![0u8; len];
        stream.read_exact(&mut received).expect("read request");
        assert_eq!(received, expected);
    });

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    client.write_message(&request)?;
    server.join().expect("server thread");
    Ok(())
}

#[test]
fn test_fault_reply() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve_replies(|request| {
        Message::new(request.id(), request.resource_path(), request.operation_name(), Value::default())
            .with_fault(Fault::with_detail("IOException", Value::new("connection refused")))
    });

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    let reply = client.call(&Message::new(4, "/files", "read", Value::new("a.txt")))?;

    let fault = reply.fault().expect("fault reply");
    assert_eq!(fault.name(), "IOException");
    assert_eq!(fault.detail().content().as_str(), Some("connection refused"));

    client.close()?;
    server.join().expect("server thread");
    Ok(())
}

#[test]
fn test_sequential_calls_on_one_connection() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve_replies(|request| {
        let n = request.payload().content().as_i32().unwrap_or_default();
        Message::new(request.id(), "/", "double", Value::new(n * 2))
    });

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    for i in 0..20 {
        let reply = client.call(&Message::new(i as i64, "/", "double", Value::new(i)))?;
        assert_eq!(reply.payload().content().as_i32(), Some(i * 2));
    }

    client.close()?;
    server.join().expect("server thread");
    Ok(())
}

#[test]
fn test_nested_payload_survives_exchange() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve_replies(echo);

    let payload = Value::new("root")
        .with_child("user", Value::new("ada").with_child("age", Value::new(36)))
        .with_children("scores", vec![Value::new(1.5), Value::new(-2.25), Value::default()]);

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    let reply = client.call(&Message::new(9, "/", "echo", payload.clone()))?;
    assert_eq!(reply.payload(), &payload);

    client.close()?;
    server.join().expect("server thread");
    Ok(())
}

// --- Failures ---

#[test]
fn test_reply_with_wrong_id() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve_replies(|request| Message::new(request.id() + 1, "/", "op", Value::default()));

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    let err = client.call(&Message::new(10, "/", "op", Value::default())).expect_err("mismatch");
    assert!(matches!(err, Error::UnexpectedReply { expected: 10, found: 11 }));

    client.close()?;
    server.join().expect("server thread");
    Ok(())
}

#[test]
fn test_peer_closes_before_reply() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve(drop);

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    server.join().expect("server thread");
    assert!(matches!(client.read_message(), Err(Error::Closed)));
    Ok(())
}

#[test]
fn test_peer_closes_mid_message() -> anyhow::Result<()> {
    init_tracing();
    let bytes = Message::new(2, "/", "op", Value::new("cut short")).to_bytes()?;
    let (port, server) = serve(move |mut stream| {
        stream.write_all(&bytes[..bytes.len() / 2]).expect("partial write");
    });

    let mut client = Client::connect("127.0.0.1", port, TIMEOUT)?;
    server.join().expect("server thread");
    let err = client.read_message().expect_err("truncated");
    assert!(matches!(
        err,
        Error::Codec(sodeprpc::Error::Serialization(sodepack::Error::UnexpectedEnd))
    ));
    Ok(())
}

#[test]
fn test_connect_refused() {
    init_tracing();
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.local_addr().expect("local addr").port()
    };

    let err = Client::connect("127.0.0.1", port, TIMEOUT).err().expect("nobody listening");
    assert!(matches!(err, Error::Connect { .. }));
}

#[test]
fn test_read_timeout() -> anyhow::Result<()> {
    init_tracing();
    let (port, server) = serve(|stream| {
        thread::sleep(Duration::from_millis(500));
        drop(stream);
    });

    let config = ClientConfig::new().with_read_timeout(Duration::from_millis(100));
    let mut client = Client::connect_with("127.0.0.1", port, &config)?;
    assert!(matches!(client.read_message(), Err(Error::Timeout)));

    server.join().expect("server thread");
    Ok(())
}
