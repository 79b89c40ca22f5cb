//! Bounded-timeout blocking connect

use crate::*;
use std::net::SocketAddr;
use std::time::Duration;

/// Connect `socket` to `addr`, blocking the calling thread for at most
/// `timeout` (`None` blocks until the os gives up).
///
/// - expiry fails with [std::io::ErrorKind::TimedOut]
/// - refusal, reset, or any other transport failure is returned as is
/// - a signal interrupting the wait fails with
///   [std::io::ErrorKind::Interrupted], the wait is not resumed
pub fn connect(
    socket: &socket2::Socket,
    addr: SocketAddr,
    timeout: Option<Duration>,
) -> Result<()> {
    tracing::trace!(%addr, ?timeout, "connecting");

    let sock_addr = socket2::SockAddr::from(addr);
    let res = match timeout {
        Some(timeout) => bounded::connect(socket, &sock_addr, timeout),
        None => socket.connect(&sock_addr),
    };

    if let Err(err) = &res {
        tracing::debug!(%addr, ?err, "connect failed");
    }

    res
}

// socket2's connect_timeout restarts its poll on EINTR,
// so the wait is driven here instead
#[cfg(unix)]
mod bounded {
    use crate::*;
    use nix::errno::Errno;
    use nix::poll::PollFd;
    use nix::poll::PollFlags;
    use nix::poll::PollTimeout;
    use std::os::unix::io::AsFd;
    use std::time::Duration;
    use std::time::Instant;

    pub(super) fn connect(
        socket: &socket2::Socket,
        addr: &socket2::SockAddr,
        timeout: Duration,
    ) -> Result<()> {
        socket.set_nonblocking(true)?;
        let res = connect_nonblocking(socket, addr, timeout);
        let restore = socket.set_nonblocking(false);
        res?;
        restore
    }

    fn connect_nonblocking(
        socket: &socket2::Socket,
        addr: &socket2::SockAddr,
        timeout: Duration,
    ) -> Result<()> {
        match socket.connect(addr) {
            Ok(()) => return Ok(()),
            Err(err)
                if err.raw_os_error() == Some(Errno::EINPROGRESS as i32)
                    || err.kind() == std::io::ErrorKind::WouldBlock => {}
            Err(err) => return Err(err),
        }

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::TimedOut,
                    "connect timed out",
                ));
            }

            let mut fds = [PollFd::new(socket.as_fd(), PollFlags::POLLOUT)];
            // EINTR is returned, not retried
            let ready = nix::poll::poll(&mut fds, poll_timeout(remaining))
                .map_err(std::io::Error::from)?;
            if ready == 0 {
                continue;
            }

            let revents = fds[0].revents().unwrap_or(PollFlags::empty());
            return match socket.take_error()? {
                Some(err) => Err(err),
                None if revents.contains(PollFlags::POLLHUP) => {
                    Err(other_err("no error set after POLLHUP"))
                }
                None => Ok(()),
            };
        }
    }

    // whole milliseconds, rounded up so a sub-millisecond
    // remainder doesn't spin, chunked to what PollTimeout takes
    fn poll_timeout(remaining: Duration) -> PollTimeout {
        let ms = (remaining.as_micros() + 999) / 1000;
        PollTimeout::from(ms.clamp(1, u16::MAX as u128) as u16)
    }
}

// no signals to interrupt a connect here
#[cfg(not(unix))]
mod bounded {
    use crate::*;
    use std::time::Duration;

    pub(super) fn connect(
        socket: &socket2::Socket,
        addr: &socket2::SockAddr,
        timeout: Duration,
    ) -> Result<()> {
        socket.connect_timeout(addr, timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn tcp_socket() -> socket2::Socket {
        socket2::Socket::new(
            socket2::Domain::IPV4,
            socket2::Type::STREAM,
            Some(socket2::Protocol::TCP),
        )
        .unwrap()
    }

    #[test]
    fn connects_to_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let socket = tcp_socket();
        connect(&socket, addr, Some(Duration::from_secs(1))).unwrap();
        assert_eq!(Some(addr), socket.peer_addr().unwrap().as_socket());

        let (_con, peer) = listener.accept().unwrap();
        assert_eq!(
            socket.local_addr().unwrap().as_socket(),
            Some(peer),
        );

        // back in blocking mode: a read waits for the timeout
        socket
            .set_read_timeout(Some(Duration::from_millis(50)))
            .unwrap();
        let mut stream: std::net::TcpStream = socket.into();
        let start = Instant::now();
        let mut buf = [0; 1];
        assert!(std::io::Read::read(&mut stream, &mut buf[..]).is_err());
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn unbounded_connect_to_listener() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let socket = tcp_socket();
        connect(&socket, addr, None).unwrap();
        assert_eq!(Some(addr), socket.peer_addr().unwrap().as_socket());
    }

    #[test]
    fn refused() {
        let addr = {
            let listener =
                std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let socket = tcp_socket();
        let err =
            connect(&socket, addr, Some(Duration::from_secs(1))).unwrap_err();
        assert_ne!(std::io::ErrorKind::TimedOut, err.kind());
        assert!(socket.peer_addr().is_err());
    }

    #[test]
    fn times_out_against_full_backlog() {
        let (addr, _listener, _fill) = dev_utils::full_backlog_listener();

        let socket = tcp_socket();
        let start = Instant::now();
        let err = connect(&socket, addr, Some(Duration::from_millis(50)))
            .unwrap_err();
        let elapsed = start.elapsed();

        assert_eq!(std::io::ErrorKind::TimedOut, err.kind());
        assert!(elapsed >= Duration::from_millis(50));
        assert!(elapsed < Duration::from_millis(500));
    }

    #[cfg(unix)]
    #[allow(unsafe_code)]
    #[test]
    fn signal_interrupts_bounded_connect() {
        use nix::sys::pthread::pthread_kill;
        use nix::sys::pthread::pthread_self;
        use nix::sys::signal::*;

        extern "C" fn ignore(_: nix::libc::c_int) {}

        // no SA_RESTART, the handler only exists to interrupt the wait
        let action = SigAction::new(
            SigHandler::Handler(ignore),
            SaFlags::empty(),
            SigSet::empty(),
        );
        unsafe { sigaction(Signal::SIGUSR1, &action) }.unwrap();

        let (addr, _listener, _fill) = dev_utils::full_backlog_listener();

        let (s_thread, r_thread) = std::sync::mpsc::channel();
        let task = std::thread::spawn(move || {
            let socket = tcp_socket();
            s_thread.send(pthread_self()).unwrap();
            let start = Instant::now();
            let res = connect(&socket, addr, Some(Duration::from_millis(1500)));
            (res, start.elapsed())
        });

        let thread = r_thread.recv().unwrap();
        std::thread::sleep(Duration::from_millis(200));
        pthread_kill(thread, Signal::SIGUSR1).unwrap();

        let (res, elapsed) = task.join().unwrap();
        assert_eq!(
            std::io::ErrorKind::Interrupted,
            res.unwrap_err().kind(),
        );
        assert!(elapsed < Duration::from_millis(1000));
    }
}
