use crate::config::AddressFamilyConfig;
use anyhow::anyhow;
use std::net::IpAddr;
use std::str::FromStr;
use tracing::instrument;

/// Resolve a target hostname or IP address to a single address of the requested family.
///
/// IP address literals are used as given without a DNS lookup.
#[instrument(level = "trace")]
pub fn resolve_target(target: &str, addr_family: AddressFamilyConfig) -> anyhow::Result<IpAddr> {
    let addrs = match IpAddr::from_str(target) {
        Ok(addr) => vec![addr],
        Err(_) => dns_lookup::lookup_host(target)
            .map_err(|err| anyhow!("failed to resolve target: {} ({})", target, err))?,
    };
    tracing::debug!(?addrs);
    select_addr(&addrs, addr_family).ok_or_else(|| {
        anyhow!(
            "failed to find any valid IP addresses for {} for address family {}",
            target,
            addr_family
        )
    })
}

fn select_addr(addrs: &[IpAddr], addr_family: AddressFamilyConfig) -> Option<IpAddr> {
    addrs
        .iter()
        .find(|addr| match addr_family {
            AddressFamilyConfig::Ipv4 => addr.is_ipv4(),
            AddressFamilyConfig::Ipv6 => addr.is_ipv6(),
            AddressFamilyConfig::System => true,
        })
        .copied()
}
