// SPDX-License-Identifier: MPL-2.0

//! Word-granular addresses and testable memory segments.
//!
//! The engine walks physical memory in units of [`TestWord`], the native
//! machine word. A [`WordAddr`] is a word-aligned byte address with checked
//! word arithmetic; it never silently wraps, even for words adjacent to the
//! top of the address space. A [`Segment`] is one contiguous testable range,
//! and an ordered slice of segments forms the virtual memory map handed to
//! every test algorithm.
//!
//! Segments are produced by an external mapping step. Creating one is
//! `unsafe` because the engine performs raw volatile loads and stores
//! through it; see [`Segment::from_raw`].

use core::fmt;

/// The native test word.
///
/// Pattern semantics (rotation, inversion) operate over the full width of
/// this type, which is 4 or 8 bytes depending on the target.
pub type TestWord = usize;

/// Size of one test word, in bytes.
pub const WORD_BYTES: usize = core::mem::size_of::<TestWord>();

/// A word-aligned address of one [`TestWord`].
///
/// `WordAddr` wraps the raw byte address. All arithmetic is in whole words
/// and is bounds-disciplined: successor and predecessor addresses are only
/// computed when the caller has established that they exist within a live
/// range, so a word adjacent to the top of the address space never wraps.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct WordAddr(usize);

impl WordAddr {
    /// Wrap a raw byte address.
    ///
    /// The address must be aligned to [`WORD_BYTES`].
    #[inline]
    pub const fn new(addr: usize) -> Self {
        debug_assert!(addr % WORD_BYTES == 0);
        Self(addr)
    }

    /// The raw byte address.
    #[inline]
    pub const fn get(self) -> usize {
        self.0
    }

    /// The number of words strictly between `self` and `last`.
    ///
    /// Both addresses are inclusive, so a span of `[self, last]` holds
    /// `self.words_until(last) + 1` words. Requires `self <= last`.
    #[inline]
    pub const fn words_until(self, last: WordAddr) -> usize {
        debug_assert!(self.0 <= last.0);
        (last.0 - self.0) / WORD_BYTES
    }

    /// The address `words` words above `self`.
    ///
    /// Callers only invoke this when the result is known to lie within a
    /// live range, so the addition cannot overflow.
    #[inline]
    pub(crate) const fn add_words(self, words: usize) -> Self {
        Self(self.0 + words * WORD_BYTES)
    }

    /// The address `words` words below `self`.
    ///
    /// Callers only invoke this when the result is known to lie within a
    /// live range, so the subtraction cannot underflow.
    #[inline]
    pub(crate) const fn sub_words(self, words: usize) -> Self {
        Self(self.0 - words * WORD_BYTES)
    }

    /// Volatile load of the test word at this address.
    ///
    /// # Safety
    ///
    /// The address must lie within a segment whose backing memory is mapped
    /// and readable, and no other execution unit may concurrently write it.
    /// Chunk partitioning provides the exclusivity guarantee; see
    /// [`compute_chunk`](crate::chunk::compute_chunk).
    #[inline]
    pub unsafe fn read_volatile(self) -> TestWord {
        // Safety: caller upholds the mapping and exclusivity contract.
        unsafe { (self.0 as *const TestWord).read_volatile() }
    }

    /// Volatile store of `word` to this address.
    ///
    /// # Safety
    ///
    /// Same contract as [`read_volatile`](Self::read_volatile), plus the
    /// memory must be writable.
    #[inline]
    pub unsafe fn write_volatile(self, word: TestWord) {
        // Safety: caller upholds the mapping and exclusivity contract.
        unsafe { (self.0 as *mut TestWord).write_volatile(word) }
    }
}

impl fmt::Debug for WordAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WordAddr({:#x})", self.0)
    }
}

/// One contiguous testable range of words, bounds inclusive.
///
/// Segments are immutable for the duration of a test pass. Ordering within
/// the memory map is significant: algorithms that test bottom-up and then
/// top-down traverse the map and its exact reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Segment {
    first: WordAddr,
    last: WordAddr,
}

impl Segment {
    /// Describe the range `[first, last]`, both bounds inclusive.
    ///
    /// Requires `first <= last`; a segment always holds at least one word.
    ///
    /// # Safety
    ///
    /// Whenever a test algorithm is handed this segment, every word in the
    /// range must be mapped and valid for volatile reads and writes. The
    /// external memory map provider is responsible for this; the engine
    /// never validates addressability itself.
    #[inline]
    pub const unsafe fn from_raw(first: WordAddr, last: WordAddr) -> Self {
        debug_assert!(first.0 <= last.0);
        Self { first, last }
    }

    /// Describe the segment covering a host-side word buffer.
    ///
    /// Returns `None` for an empty buffer. Intended for harnesses that
    /// exercise the engine against ordinary allocations.
    ///
    /// # Safety
    ///
    /// The buffer must outlive every test pass that is handed the returned
    /// segment, and nothing else may access it during a pass. The segment
    /// captures raw addresses; the borrow checker cannot enforce this.
    #[inline]
    pub unsafe fn from_buffer(words: &mut [TestWord]) -> Option<Self> {
        let (first, rest) = words.split_first_mut()?;
        let first_addr = core::ptr::from_mut(first) as usize;
        let last_addr = rest
            .last_mut()
            .map_or(first_addr, |w| core::ptr::from_mut(w) as usize);
        let first = WordAddr::new(first_addr);
        let last = WordAddr::new(last_addr);
        // Safety: first and last come from the same live allocation, in order.
        Some(unsafe { Self::from_raw(first, last) })
    }

    /// The first word of the segment.
    #[inline]
    pub const fn first(&self) -> WordAddr {
        self.first
    }

    /// The last word of the segment (inclusive).
    #[inline]
    pub const fn last(&self) -> WordAddr {
        self.last
    }

    /// The number of words the segment holds. Always at least one.
    #[inline]
    pub const fn word_count(&self) -> usize {
        self.first.words_until(self.last) + 1
    }

    /// Walk the whole segment in bounded forward strides.
    #[inline]
    pub fn strides(&self) -> crate::walk::Strides {
        crate::walk::Strides::forward(self.first, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_spans() {
        let a = WordAddr::new(0x1000);
        let b = a.add_words(7);
        assert_eq!(a.words_until(b), 7);
        assert_eq!(b.sub_words(7), a);
        assert_eq!(b.get(), 0x1000 + 7 * WORD_BYTES);
    }

    #[test]
    fn buffer_segment_bounds() {
        let mut words = std::vec![0 as TestWord; 8];
        let base = words.as_ptr() as usize;
        // Safety: the buffer is live for the whole test and only the
        // segment accessors run against it.
        let segment = unsafe { Segment::from_buffer(&mut words) }.unwrap();
        assert_eq!(segment.first().get(), base);
        assert_eq!(segment.last().get(), base + 7 * WORD_BYTES);
        assert_eq!(segment.word_count(), 8);
    }

    #[test]
    fn single_word_buffer() {
        let mut words = [0xdead as TestWord];
        // Safety: as above.
        let segment = unsafe { Segment::from_buffer(&mut words) }.unwrap();
        assert_eq!(segment.first(), segment.last());
        assert_eq!(segment.word_count(), 1);
    }

    #[test]
    fn empty_buffer_is_no_segment() {
        // Safety: as above.
        assert!(unsafe { Segment::from_buffer(&mut []) }.is_none());
    }
}
