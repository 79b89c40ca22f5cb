/// Failure outcomes of [crate::initialize].
#[derive(Debug, thiserror::Error)]
pub enum ConfigureError {
    /// The caller asked for something the supplied socket cannot do,
    /// such as TLS on a plain socket. Raised before any tls parameters
    /// are applied and before any connect attempt. Never retryable.
    #[error("ConfigurationError: {0}")]
    Configuration(String),

    /// An environmental failure: connect timeout, refusal, or an
    /// underlying system call error. Retrying is the caller's decision.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ConfigureError {
    pub(crate) fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// `true` for environmental failures a caller may reasonably retry
    /// with a fresh socket.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Io(_))
    }

    /// The underlying io error, if this is an environmental failure.
    pub fn as_io(&self) -> Option<&std::io::Error> {
        match self {
            Self::Io(err) => Some(err),
            Self::Configuration(_) => None,
        }
    }
}

/// Result type for socket configuration.
pub type ConfigureResult<T> = std::result::Result<T, ConfigureError>;
