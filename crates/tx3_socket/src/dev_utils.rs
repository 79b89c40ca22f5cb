//! `feature = "dev_utils"` Helper utilities to aid in development

/// Get a "localhost" ephemeral self signed tls certificate
pub fn localhost_self_signed_tls_cert(
) -> (rustls::Certificate, rustls::PrivateKey) {
    let cert =
        rcgen::generate_simple_self_signed(vec!["localhost".into()]).unwrap();
    let pk = rustls::PrivateKey(cert.serialize_private_key_der());
    let cert = rustls::Certificate(cert.serialize_der().unwrap());
    (cert, pk)
}

/// Get a root store trusting only `cert`
pub fn root_store(cert: &rustls::Certificate) -> rustls::RootCertStore {
    let mut roots = rustls::RootCertStore::empty();
    roots.add(cert).unwrap();
    roots
}

/// Open a secure socket for `addr` that trusts a fresh
/// self signed "localhost" certificate
pub fn localhost_secure_socket(
    addr: &std::net::SocketAddr,
) -> crate::RawSocket {
    let (cert, _pk) = localhost_self_signed_tls_cert();
    crate::RawSocket::secure(addr, root_store(&cert)).unwrap()
}

/// A loopback listener whose accept queue is already full, so any
/// further connect attempt hangs until it times out.
/// Keep the returned sockets alive for as long as the queue must stay full.
pub fn full_backlog_listener(
) -> (std::net::SocketAddr, socket2::Socket, Vec<socket2::Socket>) {
    let addr: std::net::SocketAddr = "127.0.0.1:0".parse().unwrap();
    let listener = socket2::Socket::new(
        socket2::Domain::IPV4,
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )
    .unwrap();
    listener.bind(&addr.into()).unwrap();
    listener.listen(0).unwrap();
    let addr = listener.local_addr().unwrap().as_socket().unwrap();

    let mut fill = Vec::new();
    for _ in 0..16 {
        let socket = socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        )
        .unwrap();
        match socket.connect_timeout(
            &addr.into(),
            std::time::Duration::from_millis(100),
        ) {
            Ok(()) => fill.push(socket),
            Err(err) if err.kind() == std::io::ErrorKind::TimedOut => {
                return (addr, listener, fill);
            }
            Err(err) => panic!("unexpected connect error: {:?}", err),
        }
    }
    panic!("listener accept queue never filled");
}
