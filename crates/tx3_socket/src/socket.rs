use crate::tls::*;
use crate::*;
use std::net::SocketAddr;
use std::sync::Arc;

fn new_tcp(addr: &SocketAddr) -> Result<socket2::Socket> {
    socket2::Socket::new(
        socket2::Domain::for_address(*addr),
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )
}

/// A tcp socket that will perform a tls handshake once connected.
/// Holds the trust roots and the tls parameters applied so far.
pub struct SecureSocket {
    socket: socket2::Socket,
    roots: rustls::RootCertStore,
    params: Option<TlsParameters>,
}

impl std::fmt::Debug for SecureSocket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureSocket")
            .field("socket", &self.socket)
            .field("roots", &self.roots.len())
            .field("params", &self.params)
            .finish()
    }
}

impl SecureSocket {
    /// Wrap an unconnected tcp socket, trusting `roots`.
    pub fn new(socket: socket2::Socket, roots: rustls::RootCertStore) -> Self {
        Self {
            socket,
            roots,
            params: None,
        }
    }

    /// Seed the socket with tls parameters, e.g. alpn protocols,
    /// that should survive parameter negotiation.
    pub fn with_tls_parameters(mut self, params: TlsParameters) -> Self {
        self.params = Some(params);
        self
    }

    /// The underlying tcp socket.
    pub fn tcp(&self) -> &socket2::Socket {
        &self.socket
    }

    /// The tls parameters currently applied, if any.
    pub fn tls_parameters(&self) -> Option<&TlsParameters> {
        self.params.as_ref()
    }

    /// Apply tls parameters. Must happen before connecting,
    /// as they govern the handshake.
    pub fn set_tls_parameters(&mut self, params: TlsParameters) {
        self.params = Some(params);
    }

    /// A rustls client config reflecting the applied parameters.
    pub fn client_config(&self) -> Arc<rustls::ClientConfig> {
        let params = self.params.clone().unwrap_or_default();
        Arc::new(client_config(&params, &self.roots))
    }

    /// The server name to hand the rustls client connection.
    pub fn server_name(&self) -> Result<rustls::ServerName> {
        match &self.params {
            Some(params) => server_name(params),
            None => Err(other_err("NoTlsParameters")),
        }
    }

    /// Split into the tcp socket and the applied parameters.
    pub fn into_parts(self) -> (socket2::Socket, Option<TlsParameters>) {
        (self.socket, self.params)
    }
}

/// A byte-stream socket, either plain tcp or tls capable.
#[derive(Debug)]
pub enum RawSocket {
    /// Plain tcp, no tls.
    Plain(socket2::Socket),

    /// Tcp with a tls handshake once connected.
    Secure(SecureSocket),
}

impl From<socket2::Socket> for RawSocket {
    fn from(socket: socket2::Socket) -> Self {
        RawSocket::Plain(socket)
    }
}

impl From<SecureSocket> for RawSocket {
    fn from(socket: SecureSocket) -> Self {
        RawSocket::Secure(socket)
    }
}

impl RawSocket {
    /// Open a new, unconnected, plain tcp socket able to reach `addr`.
    pub fn plain(addr: &SocketAddr) -> Result<Self> {
        Ok(RawSocket::Plain(new_tcp(addr)?))
    }

    /// Open a new, unconnected, secure socket able to reach `addr`.
    pub fn secure(
        addr: &SocketAddr,
        roots: rustls::RootCertStore,
    ) -> Result<Self> {
        Ok(RawSocket::Secure(SecureSocket::new(new_tcp(addr)?, roots)))
    }

    /// Open a socket suited to `endpoint` and `ssl`: secure if tls is
    /// enabled, plain otherwise.
    pub fn for_endpoint(
        endpoint: &TargetEndpoint,
        ssl: &SslSettings,
        roots: rustls::RootCertStore,
    ) -> Result<Self> {
        if ssl.enabled {
            Self::secure(&endpoint.resolved_address, roots)
        } else {
            Self::plain(&endpoint.resolved_address)
        }
    }

    /// `true` for the [RawSocket::Secure] variant.
    pub fn is_secure(&self) -> bool {
        matches!(self, RawSocket::Secure(_))
    }

    /// The underlying tcp socket.
    pub fn tcp(&self) -> &socket2::Socket {
        match self {
            RawSocket::Plain(socket) => socket,
            RawSocket::Secure(socket) => socket.tcp(),
        }
    }

    /// Access the secure variant, if this is one.
    pub fn as_secure(&self) -> Option<&SecureSocket> {
        match self {
            RawSocket::Plain(_) => None,
            RawSocket::Secure(socket) => Some(socket),
        }
    }

    /// Mutably access the secure variant, if this is one.
    pub fn as_secure_mut(&mut self) -> Option<&mut SecureSocket> {
        match self {
            RawSocket::Plain(_) => None,
            RawSocket::Secure(socket) => Some(socket),
        }
    }

    /// Hand the tcp socket over as a std stream, dropping any tls state.
    pub fn into_tcp_stream(self) -> std::net::TcpStream {
        match self {
            RawSocket::Plain(socket) => socket.into(),
            RawSocket::Secure(socket) => socket.into_parts().0.into(),
        }
    }
}
