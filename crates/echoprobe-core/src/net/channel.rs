use crate::clock::Clock;
use crate::codec;
use crate::config::{ChannelConfig, IpVersion, PrivilegeMode};
use crate::constants::MAX_PACKET_SIZE;
use crate::error::{Error, ErrorKind, Result};
use crate::net::common::ErrorMapper;
use crate::net::socket::Socket;
use crate::net::{platform, Network};
use crate::probe::{Probe, Reply};
use crate::types::PayloadPattern;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// A channel for sending echo requests and receiving replies over a single `ICMP` socket.
pub struct Channel<S: Socket> {
    socket: S,
    target: SocketAddr,
    version: IpVersion,
    ip_header: bool,
    payload_pattern: PayloadPattern,
    read_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl<S: Socket> Channel<S> {
    /// Open the `ICMP` socket described by `config`.
    ///
    /// In privileged mode this requires the `CAP_NET_RAW` capability on Linux, or administrator
    /// rights on Windows.
    #[instrument(skip_all, level = "trace")]
    pub fn connect(config: &ChannelConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        tracing::debug!(?config);
        platform::startup()?;
        let version = IpVersion::from(config.target_addr);
        let raw = config.privilege_mode == PrivilegeMode::Privileged;
        let socket = match version {
            IpVersion::V4 => S::new_icmp_socket_ipv4(raw),
            IpVersion::V6 => S::new_icmp_socket_ipv6(raw),
        }
        .map_err(|err| ErrorMapper::permission_denied(Error::IoError(err)))?;
        if let Some(source_addr) = config.source_addr {
            socket.bind(SocketAddr::new(source_addr, 0))?;
        }
        match version {
            IpVersion::V4 => socket.set_ttl(u32::from(config.ttl.0))?,
            IpVersion::V6 => socket.set_unicast_hops_v6(config.ttl.0)?,
        }
        Ok(Self::new(socket, config, clock))
    }

    fn new(socket: S, config: &ChannelConfig, clock: Arc<dyn Clock>) -> Self {
        let version = IpVersion::from(config.target_addr);
        Self {
            socket,
            target: SocketAddr::new(config.target_addr, 0),
            version,
            ip_header: config
                .policy
                .includes_ip_header(version, config.privilege_mode),
            payload_pattern: config.payload_pattern,
            read_timeout: config.read_timeout,
            clock,
        }
    }
}

impl<S: Socket> Network for Channel<S> {
    #[instrument(skip(self), level = "trace")]
    fn send_probe(&self, probe: &Probe) -> Result<()> {
        tracing::debug!(?probe);
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        let len =
            codec::encode_echo_request(&mut buf, self.version, probe, self.payload_pattern)?;
        self.socket
            .send_to(&buf[..len], self.target)
            .map_err(|err| ErrorMapper::transient_send(Error::IoError(err)))
    }

    #[instrument(skip_all, level = "trace")]
    fn recv_reply(&self) -> Result<Option<Reply>> {
        if !self.socket.is_readable(self.read_timeout)? {
            return Ok(None);
        }
        let mut buf = [0_u8; MAX_PACKET_SIZE];
        let (len, addr) = match self.socket.recv_from(&mut buf) {
            Ok(read) => read,
            Err(err) if err.kind() == ErrorKind::Std(io::ErrorKind::WouldBlock) => {
                return Ok(None)
            }
            Err(err) => return Err(ErrorMapper::transient_recv(Error::IoError(err))),
        };
        let received = self.clock.now()?;
        let from = addr.map(|addr| addr.ip());
        match codec::decode_reply(&buf[..len], self.version, self.ip_header, from, received) {
            Ok(reply) => {
                if let Some(reply) = &reply {
                    tracing::debug!(?reply);
                }
                Ok(reply)
            }
            Err(err) => {
                tracing::debug!(%err, ?from, "discarding malformed frame");
                Ok(None)
            }
        }
    }
}
