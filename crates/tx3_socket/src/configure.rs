use crate::keepalive::*;
use crate::tls::*;
use crate::*;

/// Prepares raw sockets and connects them. See [SocketConfigurator::initialize].
///
/// The type parameter decides how extended keepalive support is detected.
/// Outside of tests, the default [PlatformCapability] is what you want.
#[derive(Clone, Debug, Default)]
pub struct SocketConfigurator<C: KeepAliveCapability = PlatformCapability> {
    capability: C,
}

impl SocketConfigurator {
    /// Construct a configurator probing the running platform.
    pub fn new() -> Self {
        SocketConfigurator::default()
    }
}

impl<C: KeepAliveCapability> SocketConfigurator<C> {
    /// Construct a configurator with a specific keepalive capability.
    pub fn with_capability(capability: C) -> Self {
        Self { capability }
    }

    /// Tune `socket`, apply tls parameters if needed, then connect it to
    /// `endpoint.resolved_address`.
    ///
    /// In order:
    /// 1. no-delay on
    /// 2. read timeout from `settings` (`0` = none)
    /// 3. keepalive on
    /// 4. extended keepalive, best-effort, never fails
    /// 5. receive / send buffer sizes, only if `> 0`
    /// 6. tls parameters, if `ssl.enabled` or the socket is secure
    /// 7. connect, bounded by the connect timeout
    ///
    /// Requesting tls on a plain socket fails at step 6 with
    /// [ConfigureError::Configuration], no connect is attempted.
    /// Everything else surfaces as [ConfigureError::Io].
    #[tracing::instrument(skip_all, fields(endpoint = %endpoint))]
    pub fn initialize(
        &self,
        socket: &mut RawSocket,
        endpoint: &TargetEndpoint,
        settings: &SocketSettings,
        ssl: &SslSettings,
    ) -> ConfigureResult<()> {
        let tcp = socket.tcp();
        tcp.set_nodelay(true)?;
        tcp.set_read_timeout(settings.read_timeout())?;
        tcp.set_keepalive(true)?;

        tune_keepalive(tcp, &self.capability);

        apply_buffer_sizes(tcp, settings)?;

        if ssl.enabled || socket.is_secure() {
            let secure = match socket.as_secure_mut() {
                Some(secure) => secure,
                None => {
                    return Err(ConfigureError::configuration(
                        "secure transport requested on non-secure socket",
                    ))
                }
            };

            let params = compute_parameters(
                secure.tls_parameters().cloned(),
                &endpoint.host_name,
                ssl.invalid_host_name_allowed,
            );
            secure.set_tls_parameters(params);
        }

        connect::connect(
            socket.tcp(),
            endpoint.resolved_address,
            settings.connect_timeout(),
        )?;

        tracing::debug!("socket initialized");
        Ok(())
    }
}

/// [SocketConfigurator::initialize] with the platform keepalive capability.
pub fn initialize(
    socket: &mut RawSocket,
    endpoint: &TargetEndpoint,
    settings: &SocketSettings,
    ssl: &SslSettings,
) -> ConfigureResult<()> {
    SocketConfigurator::new().initialize(socket, endpoint, settings, ssl)
}

fn apply_buffer_sizes(
    tcp: &socket2::Socket,
    settings: &SocketSettings,
) -> Result<()> {
    match settings.receive_buffer_size() {
        Some(size) => tcp.set_recv_buffer_size(size)?,
        None => tracing::trace!("keeping platform receive buffer size"),
    }
    match settings.send_buffer_size() {
        Some(size) => tcp.set_send_buffer_size(size)?,
        None => tracing::trace!("keeping platform send buffer size"),
    }
    Ok(())
}
