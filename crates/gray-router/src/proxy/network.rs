//! Listener setup.
//!
//! Router instances on one host share a port through `SO_REUSEPORT`, so a
//! rolling restart can bind the new process before the old one exits.

use socket2::{Domain, Protocol, Socket, Type};
use std::net::SocketAddr;
use tokio::net::TcpListener;

const LISTEN_BACKLOG: i32 = 1024;

/// Create a non-blocking TCP listener with `SO_REUSEADDR` and, on Unix,
/// `SO_REUSEPORT`.
pub fn create_reusable_listener(addr: SocketAddr) -> std::io::Result<TcpListener> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    set_reuse_port(&socket)?;
    socket.set_nodelay(true)?;
    socket.set_nonblocking(true)?;

    socket.bind(&addr.into())?;
    socket.listen(LISTEN_BACKLOG)?;

    let std_listener: std::net::TcpListener = socket.into();
    TcpListener::from_std(std_listener)
}

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "ios"))]
fn set_reuse_port(socket: &Socket) -> std::io::Result<()> {
    use std::os::fd::AsRawFd;

    let optval: libc::c_int = 1;
    // SAFETY: the fd is owned by `socket` and optval outlives the call.
    let ret = unsafe {
        libc::setsockopt(
            socket.as_raw_fd(),
            libc::SOL_SOCKET,
            libc::SO_REUSEPORT,
            &optval as *const _ as *const libc::c_void,
            std::mem::size_of_val(&optval) as libc::socklen_t,
        )
    };
    if ret != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

#[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "ios")))]
fn set_reuse_port(_socket: &Socket) -> std::io::Result<()> {
    Ok(())
}
