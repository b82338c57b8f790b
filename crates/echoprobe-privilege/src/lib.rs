//! Discover the privileges needed to send `ICMP` echo probes.
//!
//! Echo probes can be sent in two ways:
//!
//! - via a raw `ICMP` socket, which requires elevated privileges on every platform
//! - via an `IPPROTO_ICMP` datagram socket ("unprivileged" mode), which the
//!   kernel allows for ordinary users on some platforms only
//!
//! [`Privilege::has_privileges`] reports whether raw sockets may be opened:
//!
//! - On Linux we check if `CAP_NET_RAW` is in the effective set
//! - On other Unix platforms we check that the effective user is root
//! - On Windows we check if the current process has an elevated token
//!
//! [`Privilege::unprivileged_supported`] reports whether datagram `ICMP`
//! sockets may be opened:
//!
//! - On Linux the effective group, or one of the supplementary groups, must
//!   fall within `net.ipv4.ping_group_range`
//! - On macOS this is always supported
//! - On Windows and other Unix platforms this is never supported
//!
//! [`Privilege::acquire_privileges`] raises `CAP_NET_RAW` from the permitted
//! to the effective set on Linux and is a no-op elsewhere, and
//! [`Privilege::drop_privileges`] clears the effective set on Linux and is a
//! no-op elsewhere.
//!
//! # Examples
//!
//! ```rust
//! # fn main() -> anyhow::Result<()> {
//! # use echoprobe_privilege::Privilege;
//! let privilege = Privilege::acquire_privileges()?;
//! if privilege.has_privileges() {
//!     println!("raw ICMP sockets are available");
//! } else if privilege.unprivileged_supported() {
//!     println!("only datagram ICMP sockets are available");
//! } else {
//!     println!("ICMP echo probes cannot be sent");
//! }
//! Privilege::drop_privileges()?;
//! # Ok(())
//! # }
//! ```

/// A privilege error result.
pub type Result<T> = std::result::Result<T, Error>;

/// A privilege error.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[cfg(target_os = "linux")]
    #[error("caps error: {0}")]
    CapsError(#[from] caps::errors::CapsError),
    #[cfg(windows)]
    #[error("OpenProcessToken failed")]
    OpenProcessTokenError,
    #[cfg(windows)]
    #[error("GetTokenInformation failed")]
    GetTokenInformationError,
}

/// Run-time platform privilege information.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Privilege {
    has_privileges: bool,
    unprivileged_supported: bool,
}

impl Privilege {
    /// Discover information about the platform privileges.
    pub fn discover() -> Result<Self> {
        Ok(Self {
            has_privileges: Self::check_has_privileges()?,
            unprivileged_supported: Self::check_unprivileged_supported(),
        })
    }

    #[must_use]
    pub const fn new(has_privileges: bool, unprivileged_supported: bool) -> Self {
        Self {
            has_privileges,
            unprivileged_supported,
        }
    }

    /// Can raw `ICMP` sockets be opened?
    #[must_use]
    pub const fn has_privileges(&self) -> bool {
        self.has_privileges
    }

    /// Can datagram `ICMP` sockets be opened without elevated privileges?
    #[must_use]
    pub const fn unprivileged_supported(&self) -> bool {
        self.unprivileged_supported
    }

    // Linux

    #[cfg(target_os = "linux")]
    /// Acquire privileges, if possible.
    ///
    /// Check if `CAP_NET_RAW` is in the permitted set and if so raise it to the effective set.
    pub fn acquire_privileges() -> Result<Self> {
        if caps::has_cap(None, caps::CapSet::Permitted, caps::Capability::CAP_NET_RAW)? {
            caps::raise(None, caps::CapSet::Effective, caps::Capability::CAP_NET_RAW)?;
        }
        Self::discover()
    }

    #[cfg(target_os = "linux")]
    fn check_has_privileges() -> Result<bool> {
        Ok(caps::has_cap(
            None,
            caps::CapSet::Effective,
            caps::Capability::CAP_NET_RAW,
        )?)
    }

    #[cfg(target_os = "linux")]
    /// Drop all privileges.
    ///
    /// Clears the effective set.
    pub fn drop_privileges() -> Result<()> {
        caps::clear(None, caps::CapSet::Effective)?;
        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn check_unprivileged_supported() -> bool {
        let Ok(range) = std::fs::read_to_string(PING_GROUP_RANGE) else {
            return false;
        };
        let Some((min, max)) = parse_group_range(&range) else {
            return false;
        };
        let egid = nix::unistd::getegid().as_raw();
        let groups = nix::unistd::getgroups().unwrap_or_default();
        std::iter::once(egid)
            .chain(groups.into_iter().map(nix::unistd::Gid::as_raw))
            .any(|gid| (min..=max).contains(&gid))
    }

    // Unix (excl. Linux)

    #[cfg(all(unix, not(target_os = "linux")))]
    /// Acquire privileges, if possible.
    ///
    /// This is a no-op on non-Linux unix systems.
    pub fn acquire_privileges() -> Result<Self> {
        Self::discover()
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    #[expect(clippy::unnecessary_wraps)]
    fn check_has_privileges() -> Result<bool> {
        Ok(nix::unistd::Uid::effective().is_root())
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    /// Drop all privileges.
    ///
    /// This is a no-op on non-Linux unix systems.
    pub const fn drop_privileges() -> Result<()> {
        Ok(())
    }

    #[cfg(all(unix, not(target_os = "linux")))]
    const fn check_unprivileged_supported() -> bool {
        cfg!(target_os = "macos")
    }

    // Windows

    #[cfg(windows)]
    /// Acquire privileges, if possible.
    ///
    /// This is a no-op on `Windows`.
    pub fn acquire_privileges() -> Result<Self> {
        Self::discover()
    }

    #[cfg(windows)]
    /// Check if the current process has an elevated token.
    fn check_has_privileges() -> Result<bool> {
        use windows_sys::Win32::Foundation::HANDLE;
        use windows_sys::Win32::Security::{TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY};

        macro_rules! syscall {
            ($p: path, $fn: ident ( $($arg: expr),* $(,)* ) ) => {{
                #[expect(unsafe_code)]
                unsafe { paste::paste!(windows_sys::Win32::$p::$fn) ($($arg, )*) }
            }};
        }

        /// Closes the process token when dropped.
        struct Token(HANDLE);

        impl Drop for Token {
            fn drop(&mut self) {
                if self.0 != 0 {
                    syscall!(Foundation, CloseHandle(self.0));
                }
            }
        }

        let mut handle: HANDLE = 0;
        let process = syscall!(System::Threading, GetCurrentProcess());
        if syscall!(
            System::Threading,
            OpenProcessToken(process, TOKEN_QUERY, std::ptr::addr_of_mut!(handle))
        ) == 0
        {
            return Err(Error::OpenProcessTokenError);
        }
        let token = Token(handle);
        let mut elevation = TOKEN_ELEVATION { TokenIsElevated: 0 };
        let size = std::mem::size_of::<TOKEN_ELEVATION>() as u32;
        let mut ret_size = 0_u32;
        if syscall!(
            Security,
            GetTokenInformation(
                token.0,
                TokenElevation,
                std::ptr::addr_of_mut!(elevation).cast(),
                size,
                std::ptr::addr_of_mut!(ret_size),
            )
        ) == 0
        {
            return Err(Error::GetTokenInformationError);
        }
        Ok(elevation.TokenIsElevated != 0)
    }

    #[cfg(windows)]
    /// Drop all privileges.
    ///
    /// This is a no-op on `Windows`.
    pub const fn drop_privileges() -> Result<()> {
        Ok(())
    }

    #[cfg(windows)]
    const fn check_unprivileged_supported() -> bool {
        false
    }
}

#[cfg(target_os = "linux")]
const PING_GROUP_RANGE: &str = "/proc/sys/net/ipv4/ping_group_range";

/// Parse the `min max` group id pair of `net.ipv4.ping_group_range`.
///
/// The kernel disables unprivileged ping with the default `1 0`, which parses
/// as an empty range.
#[cfg(any(target_os = "linux", test))]
fn parse_group_range(value: &str) -> Option<(u32, u32)> {
    let mut fields = value.split_whitespace().map(str::parse::<u32>);
    match (fields.next(), fields.next(), fields.next()) {
        (Some(Ok(min)), Some(Ok(max)), None) => Some((min, max)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0\t2147483647\n", Some((0, 2_147_483_647)); "all groups")]
    #[test_case("1\t0\n", Some((1, 0)); "disabled")]
    #[test_case("100 200", Some((100, 200)); "space separated")]
    #[test_case("", None; "empty")]
    #[test_case("1", None; "single value")]
    #[test_case("a b", None; "not numeric")]
    #[test_case("1 2 3", None; "too many values")]
    fn test_parse_group_range(value: &str, expected: Option<(u32, u32)>) {
        assert_eq!(expected, parse_group_range(value));
    }

    #[test]
    fn test_new() {
        let privilege = Privilege::new(false, true);
        assert!(!privilege.has_privileges());
        assert!(privilege.unprivileged_supported());
    }

    #[test]
    fn test_discover() -> anyhow::Result<()> {
        let privilege = Privilege::discover()?;
        if cfg!(windows) {
            assert!(!privilege.unprivileged_supported());
        }
        Ok(())
    }
}
