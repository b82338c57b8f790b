use derive_more::Display;

/// `Sequence` number newtype.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Sequence(pub u16);

impl Sequence {
    /// The sequence number which follows this one, wrapping at `u16::MAX`.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

/// `Identifier` newtype.
///
/// The ICMP echo identifier shared by every probe of a single run.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub struct Identifier(pub u16);

impl Identifier {
    /// Derive an identifier from the current process id.
    #[must_use]
    pub fn from_process() -> Self {
        Self((std::process::id() % u32::from(u16::MAX)) as u16)
    }
}

/// `TimeToLive` (ttl) newtype.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct TimeToLive(pub u8);

/// `PayloadSize` newtype.
///
/// The number of bytes of echo payload, excluding the ICMP header.
#[derive(Debug, Display, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct PayloadSize(pub u16);

/// `PayloadPattern` newtype.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Ord, PartialOrd)]
pub struct PayloadPattern(pub u8);

impl From<Sequence> for usize {
    fn from(sequence: Sequence) -> Self {
        sequence.0 as Self
    }
}

impl From<PayloadSize> for usize {
    fn from(size: PayloadSize) -> Self {
        size.0 as Self
    }
}
