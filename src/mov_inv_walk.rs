// SPDX-License-Identifier: MPL-2.0

//! Moving inversions with a walking single bit.
//!
//! The pattern starts as one set bit at a caller-given offset (or one
//! clear bit, when the whole test is inverted) and rotates left by one
//! position after every word, cyclically over the full word width: the
//! bit that leaves the top re-enters at the bottom, so exactly one bit is
//! set at every point of the pattern's evolution.
//!
//! Each iteration restarts the schedule from the offset, verifies
//! bottom-up with left rotation while storing bit complements, then
//! verifies top-down with right rotation, the exact inverse schedule, so
//! the sequence of expected values visited on the way down is precisely
//! the reverse of the sequence visited on the way up. Any drift between
//! the two schedules corrupts error detection silently, which is why the
//! rotation symmetry is pinned by tests.

use core::num::NonZero;

use crate::addr::{Segment, TestWord};
use crate::chunk::compute_chunk;
use crate::env::{Mismatch, TestEnv};
use crate::vcpu::Vcpu;

const WORD_ALIGN: NonZero<usize> = NonZero::<usize>::MIN;

/// The single-bit pattern for a walking offset.
///
/// Rotation keeps any offset on exactly one set bit, so offsets at or
/// beyond the word width simply wrap.
#[inline]
pub const fn walking_bit(offset: u32) -> TestWord {
    (1 as TestWord).rotate_left(offset)
}

/// Run the walking-bit moving-inversions test.
///
/// `offset` selects the starting bit position; `inverse` complements the
/// whole test, walking a single clear bit through set words instead.
/// Returns the accumulated tick count.
pub fn run<E: TestEnv>(
    map: &[Segment],
    vcpu: &Vcpu,
    env: &mut E,
    iterations: usize,
    offset: u32,
    inverse: bool,
) -> usize {
    let mut ticks = 0;

    let mut pattern = walking_bit(offset);

    if vcpu.reporter {
        env.show_pattern_value(if inverse { !pattern } else { pattern });
    }

    // Initialize every chunk, rotating the pattern once per word.
    for segment in map {
        let Some(chunk) = compute_chunk(segment, vcpu.share, WORD_ALIGN) else {
            continue;
        };
        for stride in chunk.strides() {
            ticks += 1;
            if vcpu.id.is_shadow() {
                continue;
            }
            env.publish_test_address(vcpu.id, stride.first());
            for addr in stride.words() {
                // Safety: the chunk lies within `segment`, which the map
                // provider guarantees is mapped and writable; the
                // partition gives this vcpu exclusive access.
                unsafe { addr.write_volatile(if inverse { !pattern } else { pattern }) };
                pattern = pattern.rotate_left(1);
            }
            env.record_tick(vcpu.id);
            if env.should_bail() {
                return ticks;
            }
        }
    }

    for _ in 0..iterations {
        // Each iteration restarts the schedule at the caller's offset.
        pattern = walking_bit(offset);

        // Bottom up: verify with the left-rotation schedule, store the
        // complement of each expected word.
        for segment in map {
            let Some(chunk) = compute_chunk(segment, vcpu.share, WORD_ALIGN) else {
                continue;
            };
            for stride in chunk.strides() {
                ticks += 1;
                if vcpu.id.is_shadow() {
                    continue;
                }
                env.publish_test_address(vcpu.id, stride.first());
                for addr in stride.words() {
                    let expected = if inverse { !pattern } else { pattern };
                    // Safety: as for the initialization pass.
                    let actual = unsafe { addr.read_volatile() };
                    if actual != expected {
                        env.report_mismatch(Mismatch {
                            addr,
                            expected,
                            actual,
                            readback: true,
                        });
                    }
                    // Safety: as above.
                    unsafe { addr.write_volatile(!expected) };
                    pattern = pattern.rotate_left(1);
                }
                env.record_tick(vcpu.id);
                if env.should_bail() {
                    return ticks;
                }
            }
        }

        // Top down: right rotation rewinds the schedule one word at a
        // time, so each address sees the complement of what the upward
        // pass expected there.
        for segment in map.iter().rev() {
            let Some(chunk) = compute_chunk(segment, vcpu.share, WORD_ALIGN) else {
                continue;
            };
            for stride in chunk.strides_rev() {
                ticks += 1;
                if vcpu.id.is_shadow() {
                    continue;
                }
                // Publishes the stride's low end; see the fixed-pattern
                // test for the other observed convention.
                env.publish_test_address(vcpu.id, stride.first());
                for addr in stride.words_rev() {
                    pattern = pattern.rotate_right(1);
                    let expected = if inverse { pattern } else { !pattern };
                    // Safety: as for the initialization pass.
                    let actual = unsafe { addr.read_volatile() };
                    if actual != expected {
                        env.report_mismatch(Mismatch {
                            addr,
                            expected,
                            actual,
                            readback: true,
                        });
                    }
                    // Safety: as above.
                    unsafe { addr.write_volatile(!expected) };
                }
                env.record_tick(vcpu.id);
                if env.should_bail() {
                    return ticks;
                }
            }
        }
    }

    ticks
}
