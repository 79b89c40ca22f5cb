//! TLS parameter selection

use crate::*;
use rustls::client::ServerCertVerifier;
use std::sync::Arc;

/// The tls parameters applied to a [SecureSocket] before it connects.
/// These govern the handshake that starts once the connection is up.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct TlsParameters {
    sni_host_name: Option<String>,
    verify_host_name: Option<String>,
    alpn_protocols: Vec<Vec<u8>>,
}

impl TlsParameters {
    /// Construct a new, empty, TlsParameters. No SNI, no hostname
    /// verification, no alpn.
    pub fn new() -> Self {
        TlsParameters::default()
    }

    /// Send `host_name` as the Server Name Indication.
    pub fn with_sni<H: Into<String>>(mut self, host_name: H) -> Self {
        self.sni_host_name = Some(host_name.into());
        self
    }

    /// Require the server certificate to be valid for `host_name`.
    pub fn with_host_name_verification<H: Into<String>>(
        mut self,
        host_name: H,
    ) -> Self {
        self.verify_host_name = Some(host_name.into());
        self
    }

    /// Do not check the server certificate against any host name.
    pub fn without_host_name_verification(mut self) -> Self {
        self.verify_host_name = None;
        self
    }

    /// Push an alpn protocol to offer. The most preferred protocol
    /// should be pushed first.
    pub fn with_alpn(mut self, alpn: &[u8]) -> Self {
        self.alpn_protocols.push(alpn.into());
        self
    }

    /// The host name sent as SNI, if any.
    pub fn sni_host_name(&self) -> Option<&str> {
        self.sni_host_name.as_deref()
    }

    /// The host name the server certificate is verified against, if any.
    pub fn verify_host_name(&self) -> Option<&str> {
        self.verify_host_name.as_deref()
    }

    /// The alpn protocols offered, most preferred first.
    pub fn alpn_protocols(&self) -> &[Vec<u8>] {
        &self.alpn_protocols
    }
}

/// Derive the tls parameters for connecting to `host_name`.
///
/// Starts from `existing` (or empty parameters) and always sets SNI to
/// `host_name`, which must be the name used to address the endpoint and
/// never a resolved ip. Unless `invalid_host_name_allowed`, hostname
/// verification against that same name is enabled. When it is allowed,
/// verification is left off, even if `existing` had it on.
pub fn compute_parameters(
    existing: Option<TlsParameters>,
    host_name: &str,
    invalid_host_name_allowed: bool,
) -> TlsParameters {
    let params = existing.unwrap_or_default().with_sni(host_name);

    if invalid_host_name_allowed {
        tracing::debug!(%host_name, "tls hostname verification disabled");
        params.without_host_name_verification()
    } else {
        params.with_host_name_verification(host_name)
    }
}

/// Build a rustls client config honoring `params`, trusting `roots`.
pub(crate) fn client_config(
    params: &TlsParameters,
    roots: &rustls::RootCertStore,
) -> rustls::ClientConfig {
    let verifier = HostNameVerifier {
        inner: rustls::client::WebPkiVerifier::new(roots.clone(), None),
        verify_host_name: params.verify_host_name.is_some(),
    };

    let mut config = rustls::ClientConfig::builder()
        .with_safe_defaults()
        .with_custom_certificate_verifier(Arc::new(verifier))
        .with_no_client_auth();

    config.enable_sni = params.sni_host_name.is_some();
    for alpn in params.alpn_protocols.iter() {
        config.alpn_protocols.push(alpn.clone());
    }

    config
}

/// The name the handshake is addressed to. Prefers the verification
/// host, falls back to the SNI host.
pub(crate) fn server_name(params: &TlsParameters) -> Result<rustls::ServerName> {
    let name = params
        .verify_host_name
        .as_deref()
        .or(params.sni_host_name.as_deref())
        .ok_or_else(|| other_err("NoTlsHostName"))?;
    rustls::ServerName::try_from(name).map_err(other_err)
}

/// Always validates the certificate chain. Only enforces the
/// certificate being valid for the server name if `verify_host_name`.
pub(crate) struct HostNameVerifier {
    inner: rustls::client::WebPkiVerifier,
    verify_host_name: bool,
}

impl ServerCertVerifier for HostNameVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &rustls::Certificate,
        intermediates: &[rustls::Certificate],
        server_name: &rustls::ServerName,
        scts: &mut dyn Iterator<Item = &[u8]>,
        ocsp_response: &[u8],
        now: std::time::SystemTime,
    ) -> std::result::Result<rustls::client::ServerCertVerified, rustls::Error>
    {
        match self.inner.verify_server_cert(
            end_entity,
            intermediates,
            server_name,
            scts,
            ocsp_response,
            now,
        ) {
            Err(rustls::Error::InvalidCertificate(
                rustls::CertificateError::NotValidForName,
            )) if !self.verify_host_name => {
                Ok(rustls::client::ServerCertVerified::assertion())
            }
            res => res,
        }
    }
}
