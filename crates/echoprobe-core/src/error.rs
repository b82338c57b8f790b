use crate::constants::{MAX_PAYLOAD_SIZE, MIN_PAYLOAD_SIZE};
use std::fmt::{Display, Formatter};
use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// A pinger error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A pinger error.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid payload size: {0} (must be between {MIN_PAYLOAD_SIZE} and {MAX_PAYLOAD_SIZE})")]
    InvalidPayloadSize(usize),
    #[error("invalid packet: {0}")]
    PacketError(#[from] echoprobe_packet::error::Error),
    #[error("invalid config: {0}")]
    BadConfig(String),
    #[error("permission denied: {0}")]
    PermissionDenied(IoError),
    #[error("IO error: {0}")]
    IoError(#[from] IoError),
    #[error("probe failed to send: {0}")]
    ProbeFailed(IoError),
    #[error("failed to receive reply: {0}")]
    RecvFailed(IoError),
    #[error("clock failure: {0}")]
    ClockFailure(String),
    #[error("privilege error: {0}")]
    PrivilegeError(#[from] echoprobe_privilege::Error),
    #[error("pinger has already been started")]
    AlreadyStarted,
    #[error("pinger error: {0}")]
    Other(String),
}

impl Error {
    /// Is this error confined to a single probe or read?
    ///
    /// A transient error is reported to the handler and the run continues, any other error
    /// ends the run.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::ProbeFailed(_) | Self::RecvFailed(_))
    }

    /// Is this error caused by the supplied configuration?
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::BadConfig(_) | Self::InvalidPayloadSize(_))
    }

    /// Is this error caused by insufficient rights to open the socket?
    #[must_use]
    pub const fn is_permission(&self) -> bool {
        matches!(self, Self::PermissionDenied(_) | Self::PrivilegeError(_))
    }
}

/// Custom IO error result.
pub type IoResult<T> = std::result::Result<T, IoError>;

/// Custom IO error.
#[derive(Error, Debug)]
pub enum IoError {
    #[error("Bind error for {1}: {0}")]
    Bind(io::Error, SocketAddr),
    #[error("Sendto error for {1}: {0}")]
    SendTo(io::Error, SocketAddr),
    #[error("Failed to {0}: {1}")]
    Other(io::Error, IoOperation),
}

impl IoError {
    /// Get the custom error kind.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Bind(e, _) | Self::SendTo(e, _) | Self::Other(e, _) => ErrorKind::from(e),
        }
    }
}

/// Custom error kind.
///
/// This includes additional error kinds that are not part of the standard [`io::ErrorKind`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ErrorKind {
    HostUnreachable,
    NetUnreachable,
    NoBufferSpace,
    Std(io::ErrorKind),
}

/// Io operation.
#[derive(Debug)]
pub enum IoOperation {
    NewSocket,
    Select,
    RecvFrom,
    SetTtl,
    SetUnicastHopsV6,
    Startup,
}

impl Display for IoOperation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NewSocket => write!(f, "create new socket"),
            Self::Select => write!(f, "select"),
            Self::RecvFrom => write!(f, "recv from"),
            Self::SetTtl => write!(f, "set TTL"),
            Self::SetUnicastHopsV6 => write!(f, "set unicast hops v6"),
            Self::Startup => write!(f, "startup"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn io_error() -> IoError {
        IoError::Other(io::Error::from(io::ErrorKind::Other), IoOperation::RecvFrom)
    }

    #[test_case(Error::ProbeFailed(io_error()), true; "probe failed")]
    #[test_case(Error::RecvFailed(io_error()), true; "recv failed")]
    #[test_case(Error::IoError(io_error()), false; "io error")]
    #[test_case(Error::ClockFailure(String::from("stopped")), false; "clock failure")]
    #[test_case(Error::AlreadyStarted, false; "already started")]
    fn test_is_transient(err: Error, expected: bool) {
        assert_eq!(expected, err.is_transient());
    }

    #[test]
    fn test_error_categories() {
        assert!(Error::InvalidPayloadSize(4).is_config());
        assert!(Error::BadConfig(String::from("ttl")).is_config());
        assert!(Error::PermissionDenied(io_error()).is_permission());
        assert!(!Error::IoError(io_error()).is_permission());
        assert!(!Error::IoError(io_error()).is_config());
    }

    #[test]
    fn test_invalid_payload_size_display() {
        assert_eq!(
            format!("invalid payload size: 4 (must be between 8 and {MAX_PAYLOAD_SIZE})"),
            Error::InvalidPayloadSize(4).to_string()
        );
    }
}
