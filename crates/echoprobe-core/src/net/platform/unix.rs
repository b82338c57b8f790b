use crate::error::{ErrorKind, IoError, IoOperation};
use crate::error::{IoResult, Result};
use crate::net::socket::Socket;
use itertools::Itertools;
use nix::{
    sys::select::FdSet,
    sys::time::{TimeVal, TimeValLike},
    Error,
};
use socket2::{Domain, Protocol, SockAddr, Type};
use std::io;
use std::net::SocketAddr;
use std::os::fd::AsFd;
use std::time::Duration;
use tracing::instrument;

#[instrument(level = "trace")]
pub fn startup() -> Result<()> {
    Ok(())
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
        let mut read = FdSet::new();
        read.insert(self.inner.as_fd());
        let readable = nix::sys::select::select(
            None,
            Some(&mut read),
            None,
            None,
            Some(&mut TimeVal::microseconds(timeout.as_micros() as i64)),
        );
        match readable {
            Ok(readable) => Ok(readable == 1),
            Err(Error::EINTR) => Ok(false),
            Err(err) => Err(IoError::Other(io::Error::from(err), IoOperation::Select)),
        }
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

impl From<&io::Error> for ErrorKind {
    fn from(value: &io::Error) -> Self {
        match value.raw_os_error().map(Error::from_raw) {
            Some(Error::EHOSTUNREACH) => Self::HostUnreachable,
            Some(Error::ENETUNREACH) => Self::NetUnreachable,
            Some(Error::ENOBUFS) => Self::NoBufferSpace,
            _ => Self::Std(value.kind()),
        }
    }
}

// only used for unit tests
#[cfg(test)]
impl From<ErrorKind> for io::Error {
    fn from(value: ErrorKind) -> Self {
        match value {
            ErrorKind::HostUnreachable => Self::from(Error::EHOSTUNREACH),
            ErrorKind::NetUnreachable => Self::from(Error::ENETUNREACH),
            ErrorKind::NoBufferSpace => Self::from(Error::ENOBUFS),
            ErrorKind::Std(kind) => Self::from(kind),
        }
    }
}

/// An extension trait to allow `recv_from` method which writes to a `&mut [u8]`.
///
/// This is required for `socket2::Socket` which [does not currently provide] this method.
///
/// [does not currently provide]: https://github.com/rust-lang/socket2/issues/223
trait RecvFrom {
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)>;
}

impl RecvFrom for socket2::Socket {
    // Safety: the `recv` implementation promises not to write uninitialised
    // bytes to the `buf`fer, so this casting is safe.
    #![allow(unsafe_code)]
    fn recv_from_into_buf(&self, buf: &mut [u8]) -> io::Result<(usize, Option<SocketAddr>)> {
        let buf = unsafe {
            &mut *(std::ptr::from_mut::<[u8]>(buf) as *mut [std::mem::MaybeUninit<u8>])
        };
        self.recv_from(buf)
            .map(|(size, addr)| (size, addr.as_socket()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Error::EHOSTUNREACH, ErrorKind::HostUnreachable; "host unreachable")]
    #[test_case(Error::ENETUNREACH, ErrorKind::NetUnreachable; "net unreachable")]
    #[test_case(Error::ENOBUFS, ErrorKind::NoBufferSpace; "no buffer space")]
    #[test_case(Error::EPERM, ErrorKind::Std(io::ErrorKind::PermissionDenied); "eperm")]
    #[test_case(Error::EACCES, ErrorKind::Std(io::ErrorKind::PermissionDenied); "eacces")]
    #[test_case(Error::EAGAIN, ErrorKind::Std(io::ErrorKind::WouldBlock); "eagain")]
    fn test_error_kind_from_errno(errno: Error, expected: ErrorKind) {
        assert_eq!(expected, ErrorKind::from(&io::Error::from(errno)));
    }
}
