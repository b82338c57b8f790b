use crate::error::{Error, Result};

/// A byte buffer that holds either a mutable or an immutable byte slice.
#[derive(Debug)]
pub enum Buffer<'a> {
    Immutable(&'a [u8]),
    Mutable(&'a mut [u8]),
}

impl<'a> Buffer<'a> {
    /// Wrap a read-only slice, checking it holds at least `min` bytes.
    pub fn view(name: &'static str, packet: &'a [u8], min: usize) -> Result<Self> {
        if packet.len() >= min {
            Ok(Self::Immutable(packet))
        } else {
            Err(Error::InsufficientPacketBuffer(name, min, packet.len()))
        }
    }

    /// Wrap a writable slice, checking it holds at least `min` bytes.
    pub fn writable(name: &'static str, packet: &'a mut [u8], min: usize) -> Result<Self> {
        if packet.len() >= min {
            Ok(Self::Mutable(packet))
        } else {
            Err(Error::InsufficientPacketBuffer(name, min, packet.len()))
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        match self {
            Buffer::Immutable(packet) => packet,
            Buffer::Mutable(packet) => packet,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Get `N` bytes starting at `offset`.
    pub fn get_bytes<const N: usize>(&self, offset: usize) -> [u8; N] {
        core::array::from_fn(|i| self.read(offset + i))
    }

    /// Set `N` bytes starting at `offset`.
    pub fn set_bytes<const N: usize>(&mut self, offset: usize, bytes: [u8; N]) {
        self.as_slice_mut()[offset..offset + N].copy_from_slice(&bytes);
    }

    pub fn read(&self, offset: usize) -> u8 {
        self.as_slice()[offset]
    }

    pub fn write(&mut self, offset: usize) -> &mut u8 {
        &mut self.as_slice_mut()[offset]
    }

    /// Access the buffer as a mutable slice.
    ///
    /// # Panics
    ///
    /// Panics if the buffer was created as a read-only view.
    pub fn as_slice_mut(&mut self) -> &mut [u8] {
        match self {
            Buffer::Immutable(_) => panic!("write operation called on readonly buffer"),
            Buffer::Mutable(packet) => packet,
        }
    }
}
