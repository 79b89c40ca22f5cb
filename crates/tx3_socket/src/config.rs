//! Socket and ssl settings

use std::net::SocketAddr;
use std::time::Duration;

fn default_connect_timeout_ms() -> u64 {
    10_000
}

fn is_false(v: &bool) -> bool {
    !*v
}

fn ms_to_timeout(ms: u64) -> Option<Duration> {
    if ms == 0 {
        None
    } else {
        Some(Duration::from_millis(ms))
    }
}

fn positive_size(size: i32) -> Option<usize> {
    if size > 0 {
        Some(size as usize)
    } else {
        None
    }
}

/// Tcp level settings applied to a socket before it is connected.
/// A timeout of `0` means "no timeout", i.e. block indefinitely.
/// A buffer size `<= 0` means "leave the platform default alone".
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SocketSettings {
    /// Maximum time to wait for the connect to complete, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// Read timeout to set on the socket, in milliseconds.
    #[serde(default)]
    pub read_timeout_ms: u64,

    /// Receive buffer size (SO_RCVBUF) in bytes.
    #[serde(default)]
    pub receive_buffer_size: i32,

    /// Send buffer size (SO_SNDBUF) in bytes.
    #[serde(default)]
    pub send_buffer_size: i32,
}

impl Default for SocketSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            read_timeout_ms: 0,
            receive_buffer_size: 0,
            send_buffer_size: 0,
        }
    }
}

impl SocketSettings {
    /// Construct a new default SocketSettings
    pub fn new() -> Self {
        SocketSettings::default()
    }

    /// Set the connect timeout in milliseconds (`0` for none).
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = ms;
        self
    }

    /// Set the read timeout in milliseconds (`0` for none).
    pub fn with_read_timeout_ms(mut self, ms: u64) -> Self {
        self.read_timeout_ms = ms;
        self
    }

    /// Set the receive buffer size (`<= 0` for platform default).
    pub fn with_receive_buffer_size(mut self, size: i32) -> Self {
        self.receive_buffer_size = size;
        self
    }

    /// Set the send buffer size (`<= 0` for platform default).
    pub fn with_send_buffer_size(mut self, size: i32) -> Self {
        self.send_buffer_size = size;
        self
    }

    /// The connect timeout, `None` if connecting should block indefinitely.
    pub fn connect_timeout(&self) -> Option<Duration> {
        ms_to_timeout(self.connect_timeout_ms)
    }

    /// The read timeout, `None` if reads should block indefinitely.
    pub fn read_timeout(&self) -> Option<Duration> {
        ms_to_timeout(self.read_timeout_ms)
    }

    /// The receive buffer size to apply, if any.
    pub fn receive_buffer_size(&self) -> Option<usize> {
        positive_size(self.receive_buffer_size)
    }

    /// The send buffer size to apply, if any.
    pub fn send_buffer_size(&self) -> Option<usize> {
        positive_size(self.send_buffer_size)
    }
}

/// Transport security policy.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct SslSettings {
    /// If true, the socket must be a secure socket.
    #[serde(default)]
    pub enabled: bool,

    /// If true, the server certificate is not checked against the host
    /// name used to address the endpoint. This is a risk the caller
    /// explicitly accepts, usually for testing.
    #[serde(default, skip_serializing_if = "is_false")]
    pub invalid_host_name_allowed: bool,
}

impl SslSettings {
    /// Construct a new default (disabled) SslSettings
    pub fn new() -> Self {
        SslSettings::default()
    }

    /// Enable or disable tls.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Allow or disallow certificates not valid for the host name.
    pub fn with_invalid_host_name_allowed(mut self, allowed: bool) -> Self {
        self.invalid_host_name_allowed = allowed;
        self
    }
}

/// The endpoint a socket is being prepared for. The `host_name` is the
/// name originally used to address the endpoint and is what tls SNI and
/// hostname verification are checked against. The `resolved_address`
/// is where the connect actually goes.
#[derive(
    Clone,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct TargetEndpoint {
    /// Host name used to address the endpoint.
    pub host_name: String,

    /// Already resolved socket address to connect to.
    pub resolved_address: SocketAddr,
}

impl TargetEndpoint {
    /// Construct a new TargetEndpoint
    pub fn new<H: Into<String>>(host_name: H, resolved_address: SocketAddr) -> Self {
        Self {
            host_name: host_name.into(),
            resolved_address,
        }
    }
}

impl std::fmt::Display for TargetEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.host_name, self.resolved_address)
    }
}
