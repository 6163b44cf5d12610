// SPDX-License-Identifier: MPL-2.0

//! Per-vcpu execution context.
//!
//! A vcpu is a logical execution unit assigned a subset of the memory
//! map. It may run on its own core or sequentially with its peers; the
//! engine does not care. Everything a vcpu mutates while testing, its
//! random state in particular, lives inside its own [`Vcpu`] context,
//! owned exclusively by that vcpu's execution. There are no shared
//! per-vcpu arrays and therefore nothing to lock.

use crate::chunk::Share;
use crate::random::VcpuRng;

/// Identity of one logical execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VcpuId {
    /// A live unit that reads and writes memory.
    Unit(u16),
    /// A placeholder that advances through strides to keep tick and stage
    /// counting in step with its peers, but never touches memory, the
    /// tick sink, or the bailout flag.
    Shadow,
}

impl VcpuId {
    /// Is this the placeholder identity?
    #[inline]
    pub const fn is_shadow(self) -> bool {
        matches!(self, VcpuId::Shadow)
    }
}

/// Context owned by one vcpu for the duration of a test run.
///
/// The scheduler builds one per execution unit and threads it through
/// every algorithm invocation. Only the designated `reporter` vcpu drives
/// the display collaborator; all vcpus still walk every stride so that
/// progress accounting stays symmetric.
#[derive(Debug, Clone)]
pub struct Vcpu {
    /// This vcpu's identity, as seen by the tick sink and address
    /// publisher.
    pub id: VcpuId,
    /// How this vcpu partitions each segment.
    pub share: Share,
    /// Whether this vcpu updates the display between stage changes.
    pub reporter: bool,
    rng: VcpuRng,
}

impl Vcpu {
    /// Default seed for contexts that never reseed explicitly.
    const DEFAULT_SEED: u64 = 0x5eed_0000_0000_5eed;

    /// Build a context for one execution unit.
    ///
    /// The random state is seeded deterministically from the identity;
    /// use [`reseed`](Self::reseed) to select a run-specific sequence.
    pub const fn new(id: VcpuId, share: Share) -> Self {
        let unit = match id {
            VcpuId::Unit(unit) => unit,
            VcpuId::Shadow => 0,
        };
        Self {
            id,
            share,
            reporter: false,
            rng: VcpuRng::seed_for(Self::DEFAULT_SEED, unit),
        }
    }

    /// Restart this vcpu's random sequence from `seed`.
    ///
    /// Distinct units mix their identity into the seed, so peers reseeded
    /// with the same value still produce distinct streams.
    pub fn reseed(&mut self, seed: u64) {
        let unit = match self.id {
            VcpuId::Unit(unit) => unit,
            VcpuId::Shadow => 0,
        };
        self.rng = VcpuRng::seed_for(seed, unit);
    }

    /// Exclusive access to this vcpu's random state.
    #[inline]
    pub fn rng_mut(&mut self) -> &mut VcpuRng {
        &mut self.rng
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reseed_restarts_the_sequence() {
        let mut vcpu = Vcpu::new(VcpuId::Unit(2), Share::Whole);
        vcpu.reseed(99);
        let first: std::vec::Vec<_> = (0..8).map(|_| vcpu.rng_mut().next_u64()).collect();
        vcpu.reseed(99);
        let second: std::vec::Vec<_> = (0..8).map(|_| vcpu.rng_mut().next_u64()).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn peers_share_a_seed_but_not_a_stream() {
        let mut a = Vcpu::new(VcpuId::Unit(0), Share::Whole);
        let mut b = Vcpu::new(VcpuId::Unit(1), Share::Whole);
        a.reseed(7);
        b.reseed(7);
        assert_ne!(a.rng_mut().next_u64(), b.rng_mut().next_u64());
    }

    #[test]
    fn shadow_identity() {
        assert!(VcpuId::Shadow.is_shadow());
        assert!(!VcpuId::Unit(0).is_shadow());
    }
}
