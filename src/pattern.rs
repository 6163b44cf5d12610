// SPDX-License-Identifier: MPL-2.0

//! Constant-pattern fill and read-back check over the whole map.
//!
//! These two passes are the simplest exercise the engine performs and the
//! building blocks of the bit-fade test: [`fill`] streams a constant word
//! into every testable address, [`check`] re-reads everything and reports
//! each mismatch without stopping. Both walk the full memory map rather
//! than per-vcpu chunks; a shadow vcpu still advances through every
//! stride so that tick accounting stays aligned across units.

use crate::addr::{Segment, TestWord};
use crate::env::{Mismatch, TestEnv};
use crate::vcpu::Vcpu;
use crate::walk::Stride;

/// A swappable chunk-fill implementation.
///
/// The moving-inversions initialization pass may use a bulk-store
/// primitive where the hardware has one. Whatever the strategy, it must
/// leave every word of the stride equal to `pattern`. The checked passes
/// that follow never go through a strategy, so a fill that skips words is
/// indistinguishable from a memory fault.
pub trait FillStrategy {
    /// Store `pattern` to every word of `stride`.
    ///
    /// # Safety
    ///
    /// The stride must lie within a segment that is mapped and writable,
    /// with no concurrent access from another execution unit.
    unsafe fn fill_stride(&mut self, stride: &Stride, pattern: TestWord);
}

/// The portable word-by-word volatile store.
///
/// This is the default strategy and the reference for what any
/// accelerated replacement must do.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordFill;

impl FillStrategy for WordFill {
    unsafe fn fill_stride(&mut self, stride: &Stride, pattern: TestWord) {
        for addr in stride.words() {
            // Safety: caller guarantees the stride is addressable and
            // exclusively ours.
            unsafe { addr.write_volatile(pattern) };
        }
    }
}

/// Write `pattern` to every word of every segment.
///
/// Returns the accumulated tick count. The reporter vcpu shows the
/// pattern value before the pass begins.
pub fn fill<E: TestEnv>(
    map: &[Segment],
    vcpu: &Vcpu,
    env: &mut E,
    pattern: TestWord,
) -> usize {
    let mut ticks = 0;

    if vcpu.reporter {
        env.show_pattern_value(pattern);
    }

    for segment in map {
        for stride in segment.strides() {
            ticks += 1;
            if vcpu.id.is_shadow() {
                continue;
            }
            env.publish_test_address(vcpu.id, stride.first());
            for addr in stride.words() {
                // Safety: the map provider guarantees every segment word
                // is mapped and writable for the duration of the pass.
                unsafe { addr.write_volatile(pattern) };
            }
            env.record_tick(vcpu.id);
            if env.should_bail() {
                return ticks;
            }
        }
    }

    ticks
}

/// Verify that every word of every segment reads back as `pattern`.
///
/// Reports a [`Mismatch`] for each discrepancy and keeps going; the
/// return value is the accumulated tick count, not an error count.
pub fn check<E: TestEnv>(
    map: &[Segment],
    vcpu: &Vcpu,
    env: &mut E,
    pattern: TestWord,
) -> usize {
    let mut ticks = 0;

    for segment in map {
        for stride in segment.strides() {
            ticks += 1;
            if vcpu.id.is_shadow() {
                continue;
            }
            env.publish_test_address(vcpu.id, stride.first());
            for addr in stride.words() {
                // Safety: the map provider guarantees every segment word
                // is mapped and readable for the duration of the pass.
                let actual = unsafe { addr.read_volatile() };
                if actual != pattern {
                    env.report_mismatch(Mismatch {
                        addr,
                        expected: pattern,
                        actual,
                        readback: true,
                    });
                }
            }
            env.record_tick(vcpu.id);
            if env.should_bail() {
                return ticks;
            }
        }
    }

    ticks
}
