use crate::error::{Error, ErrorKind, IoError, IoOperation, IoResult, Result};
use crate::net::socket::Socket;
use itertools::Itertools;
use socket2::{Domain, Protocol, SockAddr, Type};
use std::io::{Error as StdIoError, Result as StdIoResult};
use std::mem::MaybeUninit;
use std::net::SocketAddr;
use std::os::windows::prelude::AsRawSocket;
use std::ptr::addr_of_mut;
use std::time::Duration;
use tracing::instrument;
use windows_sys::Win32::Networking::WinSock::{
    POLLRDNORM, SOCKET, SOCKET_ERROR, WSADATA, WSAEHOSTUNREACH, WSAENETUNREACH, WSAENOBUFS,
    WSAPOLLFD,
};

/// Execute a `Win32::Networking::WinSock` syscall.
///
/// The result of the syscall will be passed to the supplied boolean closure to determine if it
/// represents an error and if so returns the last OS error, otherwise the result of the syscall is
/// returned.
macro_rules! syscall {
    ($fn: ident ( $($arg: expr),* $(,)* ), $err_fn: expr) => {{
        #[expect(unsafe_code)]
        let res = unsafe { windows_sys::Win32::Networking::WinSock::$fn($($arg, )*) };
        if $err_fn(res) {
            Err(StdIoError::last_os_error())
        } else {
            Ok(res)
        }
    }};
}

/// `WinSock` version 2.2
const WINSOCK_VERSION: u16 = 0x202;

#[instrument(level = "trace")]
pub fn startup() -> Result<()> {
    let mut wsa_data = MaybeUninit::<WSADATA>::zeroed();
    syscall!(
        WSAStartup(WINSOCK_VERSION, addr_of_mut!(wsa_data).cast()),
        |res| res != 0
    )
    .map_err(|err| Error::IoError(IoError::Other(err, IoOperation::Startup)))
    .map(|_| ())
}

/// A network socket.
pub struct SocketImpl {
    inner: socket2::Socket,
}

impl SocketImpl {
    fn new(domain: Domain, ty: Type, protocol: Protocol) -> IoResult<Self> {
        Ok(Self {
            inner: socket2::Socket::new(domain, ty, Some(protocol))
                .map_err(|err| IoError::Other(err, IoOperation::NewSocket))?,
        })
    }

    const fn socket_type(raw: bool) -> Type {
        if raw {
            Type::RAW
        } else {
            Type::DGRAM
        }
    }
}

impl Socket for SocketImpl {
    #[instrument(level = "trace")]
    fn new_icmp_socket_ipv4(raw: bool) -> IoResult<Self> {
        Self::new(Domain::IPV4, Self::socket_type(raw), Protocol::ICMPV4)
    }
    #[instrument(level = "trace")]
    fn new_icmp_socket_ipv6(raw: bool) -> IoResult<Self> {
        Self::new(Domain::IPV6, Self::socket_type(raw), Protocol::ICMPV6)
    }
    #[instrument(skip(self), level = "trace")]
    fn bind(&self, address: SocketAddr) -> IoResult<()> {
        self.inner
            .bind(&SockAddr::from(address))
            .map_err(|err| IoError::Bind(err, address))
    }
    #[instrument(skip(self), level = "trace")]
    fn set_ttl(&self, ttl: u32) -> IoResult<()> {
        self.inner
            .set_ttl(ttl)
            .map_err(|err| IoError::Other(err, IoOperation::SetTtl))
    }
    #[instrument(skip(self), level = "trace")]
    fn set_unicast_hops_v6(&self, hops: u8) -> IoResult<()> {
        self.inner
            .set_unicast_hops_v6(u32::from(hops))
            .map_err(|err| IoError::Other(err, IoOperation::SetUnicastHopsV6))
    }
    #[instrument(skip(self, buf), level = "trace")]
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> IoResult<()> {
        tracing::trace!(buf = format!("{:02x?}", buf.iter().format(" ")), ?addr);
        self.inner
            .send_to(buf, &SockAddr::from(addr))
            .map_err(|err| IoError::SendTo(err, addr))?;
        Ok(())
    }
    #[instrument(skip(self), level = "trace")]
    fn is_readable(&self, timeout: Duration) -> IoResult<bool> {
        let mut fd = WSAPOLLFD {
            fd: self.inner.as_raw_socket() as SOCKET,
            events: POLLRDNORM,
            revents: 0,
        };
        let millis = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        let ready = syscall!(WSAPoll(addr_of_mut!(fd), 1, millis), |res| res
            == SOCKET_ERROR)
        .map_err(|err| IoError::Other(err, IoOperation::Select))?;
        Ok(ready > 0)
    }
    #[instrument(skip(self, buf), level = "trace")]
    fn recv_from(&self, buf: &mut [u8]) -> IoResult<(usize, Option<SocketAddr>)> {
        let (bytes_read, addr) = self
            .inner
            .recv_from_into_buf(buf)
            .map_err(|err| IoError::Other(err, IoOperation::RecvFrom))?;
        tracing::trace!(
            buf = format!("{:02x?}", buf[..bytes_read].iter().format(" ")),
            bytes_read,
            ?addr
        );
        Ok((bytes_read, addr))
    }
}

impl From<&StdIoError> for ErrorKind {
    fn from(value: &StdIoError) -> Self {
        match value.raw_os_error() {
            Some(WSAEHOSTUNREACH) => Self::HostUnreachable,
            Some(WSAENETUNREACH) => Self::NetUnreachable,
            Some(WSAENOBUFS) => Self::NoBufferSpace,
            _ => Self::Std(value.kind()),
        }
    }
}

// only used for unit tests
#[cfg(test)]
impl From<ErrorKind> for StdIoError {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::HostUnreachable => Self::from_raw_os_error(WSAEHOSTUNREACH),
            ErrorKind::NetUnreachable => Self::from_raw_os_error(WSAENETUNREACH),
            ErrorKind::NoBufferSpace => Self::from_raw_os_error(WSAENOBUFS),
            ErrorKind::Std(kind) => Self::from(kind),
        }
    }
}

/// An extension trait to allow `recv_from` method which writes to a `&mut [u8]`.
trait RecvFrom {
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> StdIoResult<(usize, Option<SocketAddr>)>;
}

impl RecvFrom for socket2::Socket {
    // Safety: the `recv` implementation promises not to write uninitialised
    // bytes to the `buf`fer, so this casting is safe.
    #![allow(unsafe_code)]
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> StdIoResult<(usize, Option<SocketAddr>)> {
        let buf = unsafe {
            &mut *(std::ptr::from_mut::<[u8]>(buf) as *mut [std::mem::MaybeUninit<u8>])
        };
        self.recv_from(buf)
            .map(|(size, addr)| (size, addr.as_socket()))
    }
}
