// SPDX-License-Identifier: MPL-2.0

//! Segment partitioning across execution units.
//!
//! [`compute_chunk`] splits one segment among the active vcpus so that the
//! union of all shares covers the segment exactly once: no word untested,
//! no word tested twice. It is pure; algorithms call it afresh on every
//! per-segment loop iteration rather than caching the result, so a vcpu
//! running in aggregate mode ([`Share::Whole`]) can always request the
//! entire segment.
//!
//! Correctness of the whole engine's lock-free concurrency model rests on
//! this partition: vcpus never synchronize over memory, they simply never
//! receive overlapping chunks.

use core::num::NonZero;

use crate::addr::{Segment, WordAddr};
use crate::walk::{Strides, StridesRev};

/// How a vcpu divides each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Share {
    /// Sequential or aggregate execution: the vcpu covers every segment
    /// whole. This is the "no parallel partitioning" sentinel.
    Whole,
    /// Parallel execution: the vcpu covers slice `index` of `count`.
    Split {
        /// This vcpu's position, in `0..count`.
        index: u16,
        /// The number of active vcpus sharing the map.
        count: NonZero<u16>,
    },
}

/// The inclusive sub-range of a segment assigned to one vcpu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Chunk {
    first: WordAddr,
    last: WordAddr,
}

impl Chunk {
    /// The first word of the chunk.
    #[inline]
    pub const fn first(&self) -> WordAddr {
        self.first
    }

    /// The last word of the chunk (inclusive).
    #[inline]
    pub const fn last(&self) -> WordAddr {
        self.last
    }

    /// The number of words the chunk covers.
    #[inline]
    pub const fn word_count(&self) -> usize {
        self.first.words_until(self.last) + 1
    }

    /// Walk the chunk bottom-up in bounded strides.
    #[inline]
    pub fn strides(&self) -> Strides {
        Strides::forward(self.first, self.last)
    }

    /// Walk the chunk top-down in bounded strides.
    #[inline]
    pub fn strides_rev(&self) -> StridesRev {
        StridesRev::reverse(self.first, self.last)
    }
}

/// Round `value` down to a multiple of `align`, a power of two.
#[inline]
pub const fn round_down(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    value & !(align - 1)
}

/// Round `value` up to a multiple of `align`, a power of two.
#[inline]
pub const fn round_up(value: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    (value + (align - 1)) & !(align - 1)
}

/// Compute the sub-range of `segment` that one vcpu is responsible for.
///
/// `Share::Whole` returns the full segment unchanged. `Share::Split`
/// divides the segment's word count by the vcpu count, rounds each start
/// boundary up to `align_words` (a power of two), and assigns the final
/// vcpu any remainder so that total coverage is exact.
///
/// There is no error condition: a segment too small to subdivide for the
/// requested vcpu count yields `None`, an empty chunk with zero work, for
/// the surplus vcpus.
pub fn compute_chunk(
    segment: &Segment,
    share: Share,
    align_words: NonZero<usize>,
) -> Option<Chunk> {
    let (index, count) = match share {
        Share::Whole => {
            return Some(Chunk {
                first: segment.first(),
                last: segment.last(),
            })
        }
        Share::Split { index, count } => (usize::from(index), usize::from(count.get())),
    };
    debug_assert!(index < count);

    let align = align_words.get();
    let total = segment.word_count();
    let per_vcpu = total / count;

    // Word offsets within the segment, start inclusive, end exclusive.
    let begin = round_up(index * per_vcpu, align).min(total);
    let end = if index + 1 == count {
        total
    } else {
        round_up((index + 1) * per_vcpu, align).min(total)
    };

    (begin < end).then(|| Chunk {
        first: segment.first().add_words(begin),
        last: segment.first().add_words(end - 1),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::{TestWord, WORD_BYTES};

    fn segment(words: usize) -> Segment {
        let first = WordAddr::new(0x8000_0000);
        // Safety: partition arithmetic never dereferences the segment.
        unsafe { Segment::from_raw(first, first.add_words(words - 1)) }
    }

    fn split(index: u16, count: u16) -> Share {
        Share::Split {
            index,
            count: NonZero::new(count).unwrap(),
        }
    }

    const ONE_WORD: NonZero<usize> = NonZero::<usize>::MIN;

    #[test]
    fn whole_share_is_the_segment() {
        let segment = segment(1000);
        let chunk = compute_chunk(&segment, Share::Whole, ONE_WORD).unwrap();
        assert_eq!(chunk.first(), segment.first());
        assert_eq!(chunk.last(), segment.last());
        assert_eq!(chunk.word_count(), 1000);
    }

    #[test]
    fn split_covers_exactly_without_overlap() {
        let segment = segment(1003);
        for count in 1..=8u16 {
            let mut covered = 0;
            let mut next_expected = segment.first();
            for index in 0..count {
                let Some(chunk) =
                    compute_chunk(&segment, split(index, count), ONE_WORD)
                else {
                    continue;
                };
                assert_eq!(chunk.first(), next_expected, "gap before vcpu {index}");
                covered += chunk.word_count();
                if chunk.last() != segment.last() {
                    next_expected = chunk.last().add_words(1);
                }
            }
            assert_eq!(covered, 1003, "coverage for {count} vcpus");
        }
    }

    #[test]
    fn last_vcpu_takes_the_remainder() {
        let segment = segment(10);
        let chunk = compute_chunk(&segment, split(3, 4), ONE_WORD).unwrap();
        // 10 / 4 = 2 words each; the last vcpu gets 2 + 2 remainder words.
        assert_eq!(chunk.word_count(), 4);
        assert_eq!(chunk.last(), segment.last());
    }

    #[test]
    fn alignment_rounds_start_boundaries() {
        let segment = segment(64);
        let align = NonZero::new(8).unwrap();
        for index in 0..3u16 {
            let chunk = compute_chunk(&segment, split(index, 3), align).unwrap();
            let offset_words =
                (chunk.first().get() - segment.first().get()) / WORD_BYTES;
            assert_eq!(offset_words % 8, 0);
        }
    }

    #[test]
    fn tiny_segment_degenerates_to_empty_chunks() {
        let segment = segment(3);
        let align = NonZero::new(4).unwrap();
        // Word 0..3 all land in vcpu 0's aligned slice; the rest get nothing.
        let mut covered = 0;
        for index in 0..4u16 {
            if let Some(chunk) = compute_chunk(&segment, split(index, 4), align) {
                covered += chunk.word_count();
            }
        }
        assert_eq!(covered, 3);
    }

    #[test]
    fn single_vcpu_split_matches_whole() {
        let segment = segment(77);
        let whole = compute_chunk(&segment, Share::Whole, ONE_WORD).unwrap();
        let split = compute_chunk(&segment, split(0, 1), ONE_WORD).unwrap();
        assert_eq!(whole, split);
    }

    #[test]
    fn rounding_helpers() {
        assert_eq!(round_up(0, 8), 0);
        assert_eq!(round_up(1, 8), 8);
        assert_eq!(round_up(8, 8), 8);
        assert_eq!(round_down(15, 8), 8);
        assert_eq!(round_down(16, 8), 16);
    }

    #[test]
    fn word_type_is_native_width() {
        assert_eq!(core::mem::size_of::<TestWord>(), WORD_BYTES);
    }
}
