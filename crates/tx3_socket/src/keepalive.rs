//! Best-effort extended tcp keepalive tuning.
//!
//! Plain `SO_KEEPALIVE` is available everywhere, but the knobs controlling
//! how soon and how often a dead peer is probed (idle time, probe interval,
//! probe count) only exist on some platforms. [tune_keepalive] applies them
//! where they exist and silently does nothing where they do not.
//!
//! **Failures here are intentionally invisible.** [tune_keepalive] has no
//! error channel: a missing capability, a rejected `setsockopt`, or any
//! other platform quirk is logged at `debug` and then dropped. A socket
//! without extended keepalive is still a perfectly usable socket, it just
//! takes longer to notice a vanished peer.

use once_cell::sync::Lazy;
use std::time::Duration;

/// Time a connection must be idle before the first keepalive probe.
pub const KEEPALIVE_IDLE: Duration = Duration::from_secs(300);

/// Time between unanswered keepalive probes.
pub const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

/// Unanswered probes before the connection is considered dead.
pub const KEEPALIVE_COUNT: u32 = 9;

/// Answers whether the extended keepalive option set (idle, interval,
/// count) can be used on this platform.
pub trait KeepAliveCapability {
    /// `true` if the extended keepalive options are available.
    fn extended_keepalive_supported(&self) -> bool;
}

impl KeepAliveCapability for bool {
    #[inline(always)]
    fn extended_keepalive_supported(&self) -> bool {
        *self
    }
}

/// The capability of the platform we are actually running on.
/// The probe runs once per process, the answer is cached.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlatformCapability;

static EXTENDED_KEEPALIVE: Lazy<bool> = Lazy::new(|| {
    let supported = imp::probe();
    tracing::debug!(supported, "extended keepalive capability probed");
    supported
});

impl KeepAliveCapability for PlatformCapability {
    fn extended_keepalive_supported(&self) -> bool {
        *EXTENDED_KEEPALIVE
    }
}

/// Apply [KEEPALIVE_COUNT], [KEEPALIVE_IDLE] and [KEEPALIVE_INTERVAL]
/// to `socket` if `capability` says the options exist.
/// Each option is attempted on its own, a failure to set one does not
/// prevent the others. Nothing is reported to the caller.
pub fn tune_keepalive<C: KeepAliveCapability + ?Sized>(
    socket: &socket2::Socket,
    capability: &C,
) {
    if !capability.extended_keepalive_supported() {
        tracing::trace!("extended keepalive unsupported, skipping");
        return;
    }

    imp::apply(socket);
}

fn best_effort(option: &'static str, res: std::io::Result<()>) {
    if let Err(err) = res {
        tracing::debug!(option, ?err, "ignoring keepalive tuning failure");
    }
}

// the probe count option is the marker: where socket2 exposes it,
// it also exposes idle and interval
#[cfg(any(
    target_os = "android",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "fuchsia",
    target_os = "illumos",
    target_os = "ios",
    target_os = "linux",
    target_os = "macos",
    target_os = "netbsd",
    target_os = "tvos",
    target_os = "watchos",
))]
mod imp {
    use super::*;
    use socket2::TcpKeepalive;

    pub(super) fn probe() -> bool {
        let socket = match socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        ) {
            Ok(socket) => socket,
            Err(err) => {
                tracing::debug!(?err, "unable to open keepalive probe socket");
                return false;
            }
        };

        socket.keepalive_retries().is_ok()
    }

    pub(super) fn apply(socket: &socket2::Socket) {
        best_effort(
            "TCP_KEEPCNT",
            socket.set_tcp_keepalive(
                &TcpKeepalive::new().with_retries(KEEPALIVE_COUNT),
            ),
        );
        best_effort(
            "TCP_KEEPIDLE",
            socket.set_tcp_keepalive(
                &TcpKeepalive::new().with_time(KEEPALIVE_IDLE),
            ),
        );
        best_effort(
            "TCP_KEEPINTVL",
            socket.set_tcp_keepalive(
                &TcpKeepalive::new().with_interval(KEEPALIVE_INTERVAL),
            ),
        );
    }
}

#[cfg(not(any(
    target_os = "android",
    target_os = "dragonfly",
    target_os = "freebsd",
    target_os = "fuchsia",
    target_os = "illumos",
    target_os = "ios",
    target_os = "linux",
    target_os = "macos",
    target_os = "netbsd",
    target_os = "tvos",
    target_os = "watchos",
)))]
mod imp {
    use super::*;

    pub(super) fn probe() -> bool {
        false
    }

    pub(super) fn apply(_socket: &socket2::Socket) {
        best_effort(
            "TCP_KEEPCNT",
            Err(std::io::ErrorKind::Unsupported.into()),
        );
    }
}
