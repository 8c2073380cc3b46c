//! Endpoints
//!
//! An endpoint names a process across its lifetime: the low half is the
//! arena slot, the high half the slot generation. Once a slot is recycled
//! its old endpoints stop resolving.

/// Bits of the raw endpoint holding the slot number.
const SLOT_BITS: u32 = 16;
const SLOT_MASK: u32 = (1 << SLOT_BITS) - 1;

/// Raw encoding of the `ANY` source filter in syscall registers.
pub const ANY_RAW: u32 = u32::MAX;

/// Global name of a process.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Endpoint(u32);

impl Endpoint {
    /// Source of interrupt notifications.
    pub const HARDWARE: Self = Self(0xFFFF_FFFE);
    /// Source of signal notifications.
    pub const SYSTEM: Self = Self(0xFFFF_FFFD);
    /// Source of asynchronous-send completion notifications.
    pub const ASYNCM: Self = Self(0xFFFF_FFFC);

    #[inline]
    pub const fn new(slot: usize, generation: u16) -> Self {
        Self(((generation as u32) << SLOT_BITS) | (slot as u32 & SLOT_MASK))
    }

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    #[inline]
    pub const fn slot(self) -> usize {
        (self.0 & SLOT_MASK) as usize
    }

    #[inline]
    pub const fn generation(self) -> u16 {
        (self.0 >> SLOT_BITS) as u16
    }

    /// True for the kernel-internal notification sources.
    #[inline]
    pub const fn is_kernel_source(self) -> bool {
        self.0 == Self::HARDWARE.0 || self.0 == Self::SYSTEM.0 || self.0 == Self::ASYNCM.0
    }
}

impl core::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match *self {
            Self::HARDWARE => write!(f, "HARDWARE"),
            Self::SYSTEM => write!(f, "SYSTEM"),
            Self::ASYNCM => write!(f, "ASYNCM"),
            ep => write!(f, "ep({}:{})", ep.slot(), ep.generation()),
        }
    }
}

/// Which senders a receive accepts.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum SourceFilter {
    Any,
    From(Endpoint),
}

impl SourceFilter {
    #[inline]
    pub fn matches(self, source: Endpoint) -> bool {
        match self {
            Self::Any => true,
            Self::From(ep) => ep == source,
        }
    }

    /// Decode a filter from its register encoding.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        if raw == ANY_RAW {
            Self::Any
        } else {
            Self::From(Endpoint::from_raw(raw))
        }
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        match self {
            Self::Any => ANY_RAW,
            Self::From(ep) => ep.raw(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_and_generation() {
        let ep = Endpoint::new(37, 5);
        assert_eq!(ep.slot(), 37);
        assert_eq!(ep.generation(), 5);
        assert_eq!(Endpoint::from_raw(ep.raw()), ep);
    }

    #[test]
    fn test_filter_matching() {
        let a = Endpoint::new(1, 0);
        let b = Endpoint::new(2, 0);
        assert!(SourceFilter::Any.matches(a));
        assert!(SourceFilter::From(a).matches(a));
        assert!(!SourceFilter::From(a).matches(b));
        assert_eq!(SourceFilter::from_raw(ANY_RAW), SourceFilter::Any);
        assert_eq!(SourceFilter::from_raw(a.raw()), SourceFilter::From(a));
    }

    #[test]
    fn test_kernel_sources_never_collide_with_slots() {
        assert!(Endpoint::HARDWARE.is_kernel_source());
        let last = crate::config::MAX_PROCS - 1;
        assert!(!Endpoint::new(last, u16::MAX).is_kernel_source());
        assert_ne!(Endpoint::SYSTEM.raw(), ANY_RAW);
    }
}
