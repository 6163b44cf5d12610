// SPDX-License-Identifier: MPL-2.0

//! Ramscour is a bare-metal RAM diagnostic engine.
//!
//! It exercises physical memory with a battery of deterministic bit
//! patterns, detects discrepancies between what was written and what
//! reads back, and cooperatively shares the work across multiple logical
//! execution units ("vcpus") without any locking: each vcpu is handed a
//! disjoint chunk of every memory segment and touches nothing else.
//!
//! The crate is the test-algorithm and partitioning core only. Boot and
//! CPU bring-up, memory-map construction, configuration, display
//! rendering, and error formatting are external collaborators consumed
//! through the [`env::TestEnv`] trait. The engine assumes the map it is
//! handed is already validated and addressable; it never allocates,
//! frees, or persists anything.
//!
//! # Getting started
//!
//! The scheduler supplies three things per algorithm invocation: the
//! memory map (an ordered slice of [`Segment`]s), a per-vcpu context
//! ([`vcpu::Vcpu`]), and the collaborator surface. Algorithms return the
//! number of progress ticks they accumulated; one tick is one stride of
//! at most [`walk::SPIN_SIZE`] words, which is also the granularity of
//! cooperative cancellation.
//!
//! The example below runs a fixed-pattern moving-inversions pass over a
//! host-side buffer with a minimal environment.
//!
//! ```
//! use ramscour::env::{Mismatch, TestEnv};
//! use ramscour::vcpu::{Vcpu, VcpuId};
//! use ramscour::chunk::Share;
//! use ramscour::{Segment, TestWord};
//!
//! #[derive(Default)]
//! struct Harness {
//!     mismatches: usize,
//!     ticks: usize,
//! }
//!
//! impl TestEnv for Harness {
//!     fn report_mismatch(&mut self, _: Mismatch) {
//!         self.mismatches += 1;
//!     }
//!     fn record_tick(&mut self, _: VcpuId) {
//!         self.ticks += 1;
//!     }
//!     fn should_bail(&self) -> bool {
//!         false
//!     }
//! }
//!
//! let mut words = vec![0 as TestWord; 4096];
//! // Safety: the buffer outlives the pass, and nothing else touches it
//! // while the engine runs.
//! let segment = unsafe { Segment::from_buffer(&mut words) }.unwrap();
//! let map = [segment];
//!
//! let mut vcpu = Vcpu::new(VcpuId::Unit(0), Share::Whole);
//! vcpu.reporter = true;
//!
//! let mut env = Harness::default();
//! let ticks = ramscour::mov_inv_fixed::run(&map, &vcpu, &mut env, 2, !0, 0);
//! assert!(ticks > 0);
//! assert_eq!(env.mismatches, 0);
//! ```
//!
//! # Concurrency model
//!
//! Scheduling is cooperative and lock-free. Vcpus running the same
//! algorithm concurrently coordinate purely by address-space
//! partitioning ([`chunk::compute_chunk`]) plus caller-managed stage
//! advancement; the engine itself never blocks on another vcpu. The one
//! blocking primitive is the bit-fade decay window, which sleeps in
//! one-second units interleaved with cancellation polling.
//!
//! Cancellation is a cooperative flag polled at every stride boundary.
//! On bailout an algorithm returns the ticks accumulated so far; writes
//! already committed stay committed, and the caller must treat the pass
//! as "not completed" rather than "failed."
//!
//! # Logging
//!
//! Enable the `defmt` feature to derive [`defmt::Format`] on the public
//! data types, matching however the rest of your firmware logs.

#![no_std]
#![warn(
    elided_lifetimes_in_paths,
    let_underscore_drop,
    missing_docs,
    semicolon_in_expressions_from_macros,
    trivial_numeric_casts,
    unsafe_op_in_unsafe_fn,
    unreachable_pub,
    unused_qualifications,
    clippy::cast_possible_truncation,
    clippy::map_unwrap_or,
    clippy::manual_assert,
    clippy::missing_safety_doc,
    clippy::ref_as_ptr,
    clippy::semicolon_if_nothing_returned,
    clippy::undocumented_unsafe_blocks
)]

#[cfg(test)]
extern crate std;

pub mod addr;
pub mod bit_fade;
pub mod chunk;
pub mod env;
pub mod mov_inv_fixed;
pub mod mov_inv_random;
pub mod mov_inv_walk;
pub mod pattern;
pub mod random;
pub mod vcpu;
pub mod walk;

pub use addr::{Segment, TestWord, WordAddr, WORD_BYTES};
