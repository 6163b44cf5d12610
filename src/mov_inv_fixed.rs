// SPDX-License-Identifier: MPL-2.0

//! Moving inversions with a fixed pattern pair.
//!
//! Every chunk is initialized to `pattern1`. Each iteration then makes
//! two passes: bottom-up, verifying `pattern1` and overwriting with
//! `pattern2`; and top-down over the reversed segment order, verifying
//! `pattern2` and restoring `pattern1`. Checking each word against its
//! last-written value from both traversal directions exposes address-line
//! and bit-coupling faults that a single-direction sweep misses.
//!
//! The initialization pass may be accelerated with a custom
//! [`FillStrategy`]; the checked passes always read before writing and
//! never go through a strategy, so error semantics are identical either
//! way.

use core::num::NonZero;

use crate::addr::{Segment, TestWord};
use crate::chunk::compute_chunk;
use crate::env::{Mismatch, TestEnv};
use crate::pattern::{FillStrategy, WordFill};
use crate::vcpu::Vcpu;

const WORD_ALIGN: NonZero<usize> = NonZero::<usize>::MIN;

/// Run the fixed-pattern moving-inversions test with the portable fill.
pub fn run<E: TestEnv>(
    map: &[Segment],
    vcpu: &Vcpu,
    env: &mut E,
    iterations: usize,
    pattern1: TestWord,
    pattern2: TestWord,
) -> usize {
    run_with_fill(map, vcpu, env, iterations, pattern1, pattern2, &mut WordFill)
}

/// Run the fixed-pattern moving-inversions test, initializing memory
/// through `fill`.
///
/// Returns the accumulated tick count.
pub fn run_with_fill<E: TestEnv, F: FillStrategy>(
    map: &[Segment],
    vcpu: &Vcpu,
    env: &mut E,
    iterations: usize,
    pattern1: TestWord,
    pattern2: TestWord,
    fill: &mut F,
) -> usize {
    let mut ticks = 0;

    if vcpu.reporter {
        env.show_pattern_value(pattern1);
    }

    // Initialize every chunk with the first pattern.
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
            // Safety: the chunk lies within `segment`, which the map
            // provider guarantees is mapped and writable; the partition
            // gives this vcpu exclusive access to the chunk.
            unsafe { fill.fill_stride(&stride, pattern1) };
            env.record_tick(vcpu.id);
            if env.should_bail() {
                return ticks;
            }
        }
    }

    for _ in 0..iterations {
        // Bottom up: verify the current pattern, store the alternate.
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
                    // Safety: as for the initialization pass.
                    let actual = unsafe { addr.read_volatile() };
                    if actual != pattern1 {
                        env.report_mismatch(Mismatch {
                            addr,
                            expected: pattern1,
                            actual,
                            readback: true,
                        });
                    }
                    // Safety: as above.
                    unsafe { addr.write_volatile(pattern2) };
                }
                env.record_tick(vcpu.id);
                if env.should_bail() {
                    return ticks;
                }
            }
        }

        // Top down over the reversed map: verify the alternate, restore
        // the first pattern.
        for segment in map.iter().rev() {
            let Some(chunk) = compute_chunk(segment, vcpu.share, WORD_ALIGN) else {
                continue;
            };
            for stride in chunk.strides_rev() {
                ticks += 1;
                if vcpu.id.is_shadow() {
                    continue;
                }
                // The reverse walk publishes the stride's high end; the
                // walking-bit test publishes the low end instead. Both
                // preserve long-observed behavior of this engine.
                env.publish_test_address(vcpu.id, stride.last());
                for addr in stride.words_rev() {
                    // Safety: as for the initialization pass.
                    let actual = unsafe { addr.read_volatile() };
                    if actual != pattern2 {
                        env.report_mismatch(Mismatch {
                            addr,
                            expected: pattern2,
                            actual,
                            readback: true,
                        });
                    }
                    // Safety: as above.
                    unsafe { addr.write_volatile(pattern1) };
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
