// SPDX-License-Identifier: MPL-2.0

//! Moving inversions over a per-vcpu pseudo-random sequence.
//!
//! Where the fixed and walking-bit variants stress specific bit
//! relationships, this variant fills each chunk with a reproducible
//! random stream and alternates between checking the stream and checking
//! its complement. Reseeding at the top of every iteration replays the
//! exact sequence, so the expected value for any word is always
//! recomputable without storing it.
//!
//! Each vcpu derives its own stream from the caller's seed, so adjacent
//! chunks never carry identical data. The pass is single-direction by
//! design; directional coverage comes from the other variants.

use core::num::NonZero;

use crate::addr::{Segment, TestWord};
use crate::chunk::compute_chunk;
use crate::env::{Mismatch, TestEnv};
use crate::vcpu::Vcpu;

const WORD_ALIGN: NonZero<usize> = NonZero::<usize>::MIN;

/// Run the random-pattern moving-inversions test.
///
/// Returns the accumulated tick count.
pub fn run<E: TestEnv>(
    map: &[Segment],
    vcpu: &mut Vcpu,
    env: &mut E,
    iterations: usize,
    seed: u64,
) -> usize {
    let mut ticks = 0;

    if vcpu.reporter {
        env.show_stage_description(format_args!("random sequence, seed {seed:#018x}"));
    }

    // Fill every chunk with this vcpu's stream.
    vcpu.reseed(seed);
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
                let word = vcpu.rng_mut().next_word();
                // Safety: the chunk lies within `segment`, which the map
                // provider guarantees is mapped and writable; the
                // partition gives this vcpu exclusive access.
                unsafe { addr.write_volatile(word) };
            }
            env.record_tick(vcpu.id);
            if env.should_bail() {
                return ticks;
            }
        }
    }

    // Alternate between expecting the stream and its complement.
    let mut invert: TestWord = 0;
    for _ in 0..iterations {
        vcpu.reseed(seed);
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
                    let expected = vcpu.rng_mut().next_word() ^ invert;
                    // Safety: as for the fill pass.
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
        invert = !invert;
    }

    ticks
}
