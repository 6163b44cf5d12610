// SPDX-License-Identifier: MPL-2.0

//! Overflow-safe bounded-stride iteration.
//!
//! Every test algorithm streams over its address range in strides of at
//! most [`SPIN_SIZE`] words. The stride boundary is where the algorithm
//! reports one progress tick and polls for cooperative cancellation, so
//! `SPIN_SIZE` bounds the time between progress updates and bailout
//! checks.
//!
//! The iterators here are lazy and finite. They are built so that no
//! cursor is ever advanced past an inclusive bound unless that bound is
//! strictly interior to the range: a chunk whose last word sits at the top
//! of the address space walks to completion without any wrapping
//! arithmetic. The per-word cursors ([`Stride::words`],
//! [`Stride::words_rev`]) apply the same compare-then-step discipline.

use crate::addr::WordAddr;

/// Words processed between progress ticks and bailout checks.
pub const SPIN_SIZE: usize = 1 << 27;

/// One bounded unit of iteration: an inclusive word range of at most
/// [`SPIN_SIZE`] words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Stride {
    first: WordAddr,
    last: WordAddr,
}

impl Stride {
    /// The lowest word of the stride.
    #[inline]
    pub const fn first(&self) -> WordAddr {
        self.first
    }

    /// The highest word of the stride (inclusive).
    #[inline]
    pub const fn last(&self) -> WordAddr {
        self.last
    }

    /// The number of words the stride covers.
    #[inline]
    pub const fn word_count(&self) -> usize {
        self.first.words_until(self.last) + 1
    }

    /// Every word address from lowest to highest.
    #[inline]
    pub fn words(&self) -> Words {
        Words {
            next: Some(self.first),
            last: self.last,
        }
    }

    /// Every word address from highest to lowest.
    #[inline]
    pub fn words_rev(&self) -> WordsRev {
        WordsRev {
            next: Some(self.last),
            first: self.first,
        }
    }
}

/// Forward stride sequence over an inclusive word range.
///
/// Yields exactly `ceil(word_count / SPIN_SIZE)` strides, then `None`.
/// Not restartable; build a fresh walker for another pass.
#[derive(Debug, Clone)]
pub struct Strides {
    cursor: Option<WordAddr>,
    last: WordAddr,
}

impl Strides {
    /// Walk `[first, last]` from the bottom up.
    ///
    /// Requires `first <= last`.
    #[inline]
    pub fn forward(first: WordAddr, last: WordAddr) -> Self {
        debug_assert!(first <= last);
        Self {
            cursor: Some(first),
            last,
        }
    }
}

impl Iterator for Strides {
    type Item = Stride;

    fn next(&mut self) -> Option<Stride> {
        let first = self.cursor.take()?;
        let span = first.words_until(self.last);
        Some(if span >= SPIN_SIZE {
            let last = first.add_words(SPIN_SIZE - 1);
            // `last` is strictly below the range end, so its successor
            // exists even at the top of the address space.
            self.cursor = Some(last.add_words(1));
            Stride { first, last }
        } else {
            // Final stride; the cursor stays exhausted rather than being
            // advanced past the range end.
            Stride {
                first,
                last: self.last,
            }
        })
    }
}

/// Reverse stride sequence over an inclusive word range.
///
/// The mirror image of [`Strides`], walking from the top down with the
/// symmetric underflow care at the bottom boundary.
#[derive(Debug, Clone)]
pub struct StridesRev {
    cursor: Option<WordAddr>,
    first: WordAddr,
}

impl StridesRev {
    /// Walk `[first, last]` from the top down.
    ///
    /// Requires `first <= last`.
    #[inline]
    pub fn reverse(first: WordAddr, last: WordAddr) -> Self {
        debug_assert!(first <= last);
        Self {
            cursor: Some(last),
            first,
        }
    }
}

impl Iterator for StridesRev {
    type Item = Stride;

    fn next(&mut self) -> Option<Stride> {
        let last = self.cursor.take()?;
        let span = self.first.words_until(last);
        Some(if span >= SPIN_SIZE {
            let first = last.sub_words(SPIN_SIZE - 1);
            // `first` is strictly above the range start, so its
            // predecessor exists even at address zero.
            self.cursor = Some(first.sub_words(1));
            Stride { first, last }
        } else {
            Stride {
                first: self.first,
                last,
            }
        })
    }
}

/// Ascending word cursor within one stride.
#[derive(Debug, Clone)]
pub struct Words {
    next: Option<WordAddr>,
    last: WordAddr,
}

impl Iterator for Words {
    type Item = WordAddr;

    #[inline]
    fn next(&mut self) -> Option<WordAddr> {
        let addr = self.next?;
        // Compare before stepping: the successor is only formed while the
        // cursor is strictly below the stride's last word.
        self.next = (addr < self.last).then(|| addr.add_words(1));
        Some(addr)
    }
}

/// Descending word cursor within one stride.
#[derive(Debug, Clone)]
pub struct WordsRev {
    next: Option<WordAddr>,
    first: WordAddr,
}

impl Iterator for WordsRev {
    type Item = WordAddr;

    #[inline]
    fn next(&mut self) -> Option<WordAddr> {
        let addr = self.next?;
        self.next = (addr > self.first).then(|| addr.sub_words(1));
        Some(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addr::WORD_BYTES;

    fn addr(words: usize) -> WordAddr {
        WordAddr::new(0x10_0000 + words * WORD_BYTES)
    }

    #[test]
    fn single_stride_for_short_ranges() {
        let strides: std::vec::Vec<_> = Strides::forward(addr(0), addr(99)).collect();
        assert_eq!(strides.len(), 1);
        assert_eq!(strides[0].first(), addr(0));
        assert_eq!(strides[0].last(), addr(99));
        assert_eq!(strides[0].word_count(), 100);
    }

    #[test]
    fn exact_spin_size_is_one_stride() {
        let strides: std::vec::Vec<_> =
            Strides::forward(addr(0), addr(SPIN_SIZE - 1)).collect();
        assert_eq!(strides.len(), 1);
        assert_eq!(strides[0].word_count(), SPIN_SIZE);
    }

    #[test]
    fn one_past_spin_size_splits() {
        let strides: std::vec::Vec<_> = Strides::forward(addr(0), addr(SPIN_SIZE)).collect();
        assert_eq!(strides.len(), 2);
        assert_eq!(strides[0].word_count(), SPIN_SIZE);
        assert_eq!(strides[1].word_count(), 1);
        assert_eq!(strides[1].first(), strides[1].last());
    }

    #[test]
    fn forward_strides_tile_the_range() {
        let len = 3 * SPIN_SIZE + 17;
        let mut expected_first = addr(0);
        let mut total = 0;
        for stride in Strides::forward(addr(0), addr(len - 1)) {
            assert_eq!(stride.first(), expected_first);
            total += stride.word_count();
            if stride.last() != addr(len - 1) {
                expected_first = stride.last().add_words(1);
            }
        }
        assert_eq!(total, len);
    }

    #[test]
    fn reverse_strides_tile_the_range() {
        let len = 2 * SPIN_SIZE + 5;
        let mut total = 0;
        let mut previous_first = None;
        for stride in StridesRev::reverse(addr(0), addr(len - 1)) {
            if let Some(previous_first) = previous_first {
                assert_eq!(stride.last().add_words(1), previous_first);
            } else {
                assert_eq!(stride.last(), addr(len - 1));
            }
            total += stride.word_count();
            previous_first = Some(stride.first());
        }
        assert_eq!(total, len);
        assert_eq!(previous_first, Some(addr(0)));
    }

    #[test]
    fn terminates_at_top_of_address_space() {
        // The last representable word. Advancing one past it would wrap.
        let top = WordAddr::new(usize::MAX - (WORD_BYTES - 1));
        let first = top.sub_words(SPIN_SIZE + 10 - 1);
        let strides: std::vec::Vec<_> = Strides::forward(first, top).collect();
        assert_eq!(strides.len(), 2);
        assert_eq!(strides[1].last(), top);
        assert_eq!(strides[1].words().last(), Some(top));
    }

    #[test]
    fn terminates_at_bottom_of_address_space() {
        let bottom = WordAddr::new(0);
        let last = bottom.add_words(SPIN_SIZE + 3 - 1);
        let strides: std::vec::Vec<_> = StridesRev::reverse(bottom, last).collect();
        assert_eq!(strides.len(), 2);
        assert_eq!(strides[1].first(), bottom);
        assert_eq!(strides[1].words_rev().last(), Some(bottom));
    }

    #[test]
    fn word_cursors_are_exact_mirrors() {
        let stride = Strides::forward(addr(3), addr(12)).next().unwrap();
        let forward: std::vec::Vec<_> = stride.words().collect();
        let mut reverse: std::vec::Vec<_> = stride.words_rev().collect();
        reverse.reverse();
        assert_eq!(forward, reverse);
        assert_eq!(forward.len(), 10);
    }
}
