use crate::error::{Error, ErrorKind};
use std::io;

/// Send errors which affect a single probe only.
pub const TRANSIENT_SEND_ERRORS: [ErrorKind; 6] = [
    ErrorKind::HostUnreachable,
    ErrorKind::NetUnreachable,
    ErrorKind::NoBufferSpace,
    ErrorKind::Std(io::ErrorKind::WouldBlock),
    ErrorKind::Std(io::ErrorKind::PermissionDenied),
    ErrorKind::Std(io::ErrorKind::AddrNotAvailable),
];

/// Receive errors which affect a single read only.
pub const TRANSIENT_RECV_ERRORS: [ErrorKind; 4] = [
    ErrorKind::HostUnreachable,
    ErrorKind::NetUnreachable,
    ErrorKind::Std(io::ErrorKind::ConnectionRefused),
    ErrorKind::Std(io::ErrorKind::ConnectionReset),
];

/// Utility methods to map errors.
pub struct ErrorMapper;

impl ErrorMapper {
    /// Convert a given [`ErrorKind`] to [`Error::ProbeFailed`].
    #[must_use]
    pub fn probe_failed(err: Error, kind: ErrorKind) -> Error {
        match err {
            Error::IoError(io_err) if io_err.kind() == kind => Error::ProbeFailed(io_err),
            _ => err,
        }
    }

    /// Convert a given [`ErrorKind`] to [`Error::RecvFailed`].
    #[must_use]
    pub fn recv_failed(err: Error, kind: ErrorKind) -> Error {
        match err {
            Error::IoError(io_err) if io_err.kind() == kind => Error::RecvFailed(io_err),
            _ => err,
        }
    }

    /// Convert [`io::ErrorKind::PermissionDenied`] to [`Error::PermissionDenied`].
    #[must_use]
    pub fn permission_denied(err: Error) -> Error {
        match err {
            Error::IoError(io_err)
                if io_err.kind() == ErrorKind::Std(io::ErrorKind::PermissionDenied) =>
            {
                Error::PermissionDenied(io_err)
            }
            _ => err,
        }
    }

    /// Convert any of the transient send error kinds to [`Error::ProbeFailed`].
    #[must_use]
    pub fn transient_send(err: Error) -> Error {
        TRANSIENT_SEND_ERRORS
            .into_iter()
            .fold(err, Self::probe_failed)
    }

    /// Convert any of the transient receive error kinds to [`Error::RecvFailed`].
    #[must_use]
    pub fn transient_recv(err: Error) -> Error {
        TRANSIENT_RECV_ERRORS
            .into_iter()
            .fold(err, Self::recv_failed)
    }
}
