// SPDX-License-Identifier: MPL-2.0

//! External collaborator surface.
//!
//! The engine does not own a display, an error log, a progress bar, or a
//! clock. It consumes them through [`TestEnv`], which the scheduler
//! implements and hands to every algorithm invocation. All display and
//! address-publishing calls are advisory with no-op defaults; mismatch
//! reporting and progress ticks must be wired up for the engine to be
//! useful.
//!
//! Nothing here may block or fail. A mismatch report returns `()`; any
//! accumulation, deduplication, or formatting is the reporter's problem.
//! The only blocking collaborator in the whole engine is [`SecondTimer`],
//! which exists solely for the bit-fade decay window and is therefore a
//! separate bound.

use core::fmt;

use crate::addr::{TestWord, WordAddr};
use crate::vcpu::VcpuId;

/// One detected discrepancy between the value written and the value read
/// back.
///
/// The engine reports these as they are found and keeps going; it never
/// stores error history itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Mismatch {
    /// The word address where the discrepancy was observed.
    pub addr: WordAddr,
    /// The value the engine expected to read.
    pub expected: TestWord,
    /// The value actually read.
    pub actual: TestWord,
    /// Whether the mismatch was detected on a read-back pass.
    pub readback: bool,
}

/// The collaborators every test algorithm runs against.
///
/// Implementations must not block. `should_bail` is polled at every
/// stride boundary and once per second of a fade sleep; returning `true`
/// makes the running algorithm return its accumulated ticks at the next
/// checkpoint, leaving already-committed writes in place.
pub trait TestEnv {
    /// Show the pattern value a test is about to use.
    ///
    /// Advisory; called only by the designated reporter vcpu.
    fn show_pattern_value(&mut self, _pattern: TestWord) {}

    /// Show a human-readable description of the current stage.
    ///
    /// Advisory; called only by the designated reporter vcpu.
    fn show_stage_description(&mut self, _desc: fmt::Arguments<'_>) {}

    /// Record one detected mismatch.
    ///
    /// Called for every faulty word; the engine continues past mismatches
    /// so a single pass surfaces every bad address.
    fn report_mismatch(&mut self, mismatch: Mismatch);

    /// Record one unit of progress: a completed stride, or one second of
    /// a fade sleep.
    fn record_tick(&mut self, vcpu: VcpuId);

    /// Has cooperative cancellation been requested?
    fn should_bail(&self) -> bool;

    /// Publish the address a vcpu is about to test.
    ///
    /// Advisory; lets a watchdog or display show where each unit is.
    fn publish_test_address(&mut self, _vcpu: VcpuId, _addr: WordAddr) {}
}

/// A one-second blocking delay, used only by the bit-fade decay stages.
pub trait SecondTimer {
    /// Block the calling context for roughly one second.
    fn sleep_second(&mut self);
}
