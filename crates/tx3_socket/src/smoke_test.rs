use crate::*;
use std::net::SocketAddr;
use std::time::Duration;
use std::time::Instant;

fn init_tracing() {
    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::from_default_env(),
        )
        .with_file(true)
        .with_line_number(true)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

fn listener() -> (std::net::TcpListener, SocketAddr) {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

#[test]
fn smoke_connect_timeout() {
    init_tracing();

    // a SYN sent here sits unanswered behind the full accept queue
    let (addr, _listener, _fill) = dev_utils::full_backlog_listener();
    let mut socket = RawSocket::plain(&addr).unwrap();

    let start = Instant::now();
    let err = initialize(
        &mut socket,
        &TargetEndpoint::new("db.example.com", addr),
        &SocketSettings::new().with_connect_timeout_ms(50),
        &SslSettings::new(),
    )
    .unwrap_err();
    let elapsed = start.elapsed();
    tracing::info!(?elapsed, %err);

    assert!(err.is_retryable());
    assert_eq!(std::io::ErrorKind::TimedOut, err.as_io().unwrap().kind());
    assert!(elapsed >= Duration::from_millis(50));
    assert!(elapsed < Duration::from_millis(500));
}

#[test]
fn smoke_plain_connect() {
    init_tracing();

    let (listener, addr) = listener();
    let mut socket = RawSocket::plain(&addr).unwrap();
    initialize(
        &mut socket,
        &TargetEndpoint::new("localhost", addr),
        &SocketSettings {
            connect_timeout_ms: 1000,
            read_timeout_ms: 2000,
            receive_buffer_size: 0,
            send_buffer_size: 0,
        },
        &SslSettings::new(),
    )
    .unwrap();

    let tcp = socket.tcp();
    assert_eq!(Some(addr), tcp.peer_addr().unwrap().as_socket());
    assert!(tcp.nodelay().unwrap());
    assert!(tcp.keepalive().unwrap());
    assert_eq!(Some(Duration::from_secs(2)), tcp.read_timeout().unwrap());

    let (_con, peer) = listener.accept().unwrap();
    assert_eq!(tcp.local_addr().unwrap().as_socket(), Some(peer));

    // connect lets the os autotune unlocked buffers, so compare against
    // a socket connected to the same listener with no sizes set
    let reference = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )
    .unwrap();
    reference.connect(&addr.into()).unwrap();
    assert_eq!(
        reference.recv_buffer_size().unwrap(),
        tcp.recv_buffer_size().unwrap(),
    );
    assert_eq!(
        reference.send_buffer_size().unwrap(),
        tcp.send_buffer_size().unwrap(),
    );

    // the caller owns the socket from here on
    let mut stream = socket.into_tcp_stream();
    let mut buf = [0; 1];
    let err = std::io::Read::read(&mut stream, &mut buf[..]).unwrap_err();
    assert!(matches!(
        err.kind(),
        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut,
    ));
}

#[test]
fn smoke_secure_parameters() {
    init_tracing();

    let (_listener, addr) = listener();
    let mut socket = dev_utils::localhost_secure_socket(&addr);
    initialize(
        &mut socket,
        &TargetEndpoint::new("db.example.com", addr),
        &SocketSettings::new().with_connect_timeout_ms(1000),
        &SslSettings::new().with_enabled(true),
    )
    .unwrap();

    let secure = socket.as_secure().unwrap();
    let params = secure.tls_parameters().unwrap();
    assert_eq!(Some("db.example.com"), params.sni_host_name());
    assert_eq!(Some("db.example.com"), params.verify_host_name());
    assert_eq!(
        rustls::ServerName::try_from("db.example.com").unwrap(),
        secure.server_name().unwrap(),
    );
    assert!(secure.client_config().enable_sni);
    assert_eq!(Some(addr), secure.tcp().peer_addr().unwrap().as_socket());
}

#[test]
fn smoke_concurrent_initialize() {
    init_tracing();

    let (_listener, addr) = listener();
    let all = (0..8)
        .map(|_| {
            std::thread::spawn(move || {
                let mut socket = RawSocket::plain(&addr).unwrap();
                initialize(
                    &mut socket,
                    &TargetEndpoint::new("localhost", addr),
                    &SocketSettings::new().with_connect_timeout_ms(1000),
                    &SslSettings::new(),
                )
                .unwrap();
                socket.tcp().peer_addr().unwrap().as_socket()
            })
        })
        .collect::<Vec<_>>();
    for t in all {
        assert_eq!(Some(addr), t.join().unwrap());
    }
}
