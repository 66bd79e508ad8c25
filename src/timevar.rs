//! Partitioned convolution with exchangeable partitions.
//!
//! A [`TimeVaryingConvolver`] runs on the audio thread. New partitions are
//! published from any other thread through a [`PartitionUpdater`]. In the
//! block after a publish, the convolver computes the block once with the old
//! and once with the new partitions over the same input history, and
//! crossfades the two results with sine-squared ramps.
//!
//! ## Handoff
//!
//! The convolver and its updaters share one standby [`PartitionSet`] guarded
//! by a single atomic state:
//!
//! ```text
//!  IDLE ──claim──▶ WRITING ──publish──▶ PENDING ──take──▶ SWAPPING ──▶ IDLE
//!                     ▲                    │
//!                     └──────claim─────────┘  (last writer wins)
//! ```
//!
//! Updaters claim with an acquire CAS and publish with a release store, so
//! the audio thread never sees a partially written set. The audio thread only
//! ever tries one CAS per block and never waits. On a successful take it
//! swaps the boxed arenas of the active and standby sets, no bins are copied.
//!
//! ## Example
//!
//! ```
//! use mkconvolution::timevar::TimeVaryingConvolver;
//!
//! let mut convolver = TimeVaryingConvolver::new(&[1.0, 0.5], 64).unwrap();
//! let updater = convolver.updater();
//!
//! let control = std::thread::spawn(move || updater.set_impulse(&[0.5, 0.25]));
//! control.join().unwrap().unwrap();
//!
//! let mut output = [0.0; 64];
//! convolver.process(&[1.0; 64], &mut output).unwrap();
//! ```

use std::cell::UnsafeCell;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use log::{debug, warn};
use no_denormals::*;
use num_complex::Complex64;

use crate::buffer::PartitionSet;
use crate::convolution::ConvolutionState;
use crate::dsp::CrossFader;
use crate::error::*;

// ==========================================
// Swap Slot
// ==========================================

const IDLE : u8 = 0;
const WRITING : u8 = 1;
const PENDING : u8 = 2;
const SWAPPING : u8 = 3;

/// Standby partitions shared between the audio thread and the updaters.
struct SwapSlot
{
    state : AtomicU8,
    standby : UnsafeCell<PartitionSet>
}

// SAFETY: `standby` is only accessed by the holder of the WRITING or SWAPPING state.
unsafe impl Sync for SwapSlot {}

impl SwapSlot
{
    fn new(standby : PartitionSet) -> Self
    {
        Self { state : AtomicU8::new(IDLE), standby : UnsafeCell::new(standby) }
    }

    /// Copy `bins` into the standby set and mark it pending.
    fn publish(&self, bins : &[Complex64]) -> DspResult<()>
    {
        let previous = self.claim();

        // SAFETY: WRITING is held, neither the audio thread nor another writer touches `standby`.
        let result = unsafe { (*self.standby.get()).copy_from(bins) };

        // A rejected copy leaves the standby set untouched, so an earlier pending set stays valid.
        let next = if result.is_ok() { PENDING } else { previous };
        self.state.store(next, Ordering::Release);
        result
    }

    /// Spin until the slot is taken from IDLE or PENDING into WRITING.
    fn claim(&self) -> u8
    {
        loop
        {
            let current = self.state.load(Ordering::Relaxed);
            if (current == IDLE || current == PENDING)
                && self.state.compare_exchange_weak(current, WRITING, Ordering::Acquire, Ordering::Relaxed).is_ok()
            {
                return current;
            }
            std::hint::spin_loop();
        }
    }

    /// Swap `active` with the pending standby set. Returns false if nothing was pending.
    fn take(&self, active : &mut PartitionSet) -> bool
    {
        if self.state.compare_exchange(PENDING, SWAPPING, Ordering::Acquire, Ordering::Relaxed).is_err()
        {
            return false;
        }

        // SAFETY: SWAPPING is held, no writer touches `standby`.
        unsafe { std::mem::swap(active, &mut *self.standby.get()); }

        self.state.store(IDLE, Ordering::Release);
        true
    }

    fn is_pending(&self) -> bool { self.state.load(Ordering::Acquire) == PENDING }
}

// ==========================================
// Partition Updater
// ==========================================

/// Publishes new partitions to a [`TimeVaryingConvolver`] from any thread.
///
/// Publishing copies into the shared standby set and may allocate or spin
/// briefly, so call it from a control thread, not from the audio callback.
#[derive(Clone)]
pub struct PartitionUpdater
{
    slot : Arc<SwapSlot>,
    block_size : usize,
    partition_count : usize,
    spectrum_size : usize
}
impl PartitionUpdater
{
    /// Publish frequency-domain partitions.
    ///
    /// `bins` must hold `partition_count * spectrum_size` values in the layout
    /// of [`PartitionSet`]. Replaces a set that was published but not yet picked up.
    pub fn set_partitions(&self, bins : &[Complex64]) -> DspResult<()>
    {
        let expected = self.partition_count * self.spectrum_size;
        if let Err(error) = check_len(expected, bins.len())
        {
            warn!("Rejected partition update: {}", error);
            return Err(error);
        }
        self.slot.publish(bins)
    }

    /// Partition a new impulse response and publish it.
    ///
    /// The impulse must split into the same number of partitions as the
    /// convolver's, i.e. its length rounded up to whole blocks must match.
    pub fn set_impulse(&self, impulse : &[f64]) -> DspResult<()>
    {
        let partitions = PartitionSet::from_impulse(impulse, self.block_size)?;
        if let Err(error) = check_len(self.partition_count, partitions.partition_count())
        {
            warn!("Rejected impulse update of {} samples: {}", impulse.len(), error);
            return Err(error);
        }
        self.slot.publish(partitions.as_slice())
    }

    /// True while a published set has not been picked up by the audio thread.
    pub fn is_pending(&self) -> bool { self.slot.is_pending() }
}

// ==========================================
// Time Varying Convolver
// ==========================================

/// Partitioned convolver whose partitions can be replaced while it runs.
///
/// Exactly one block pays for a replacement: it runs the accumulate and
/// inverse transform stages twice and blends the results. Input bookkeeping
/// happens once per block regardless.
pub struct TimeVaryingConvolver
{
    state : ConvolutionState,
    active : PartitionSet,
    slot : Arc<SwapSlot>,
    fader : CrossFader,
    fade_out_buffer : Box<[f64]>,
    fade_in_buffer : Box<[f64]>
}
impl TimeVaryingConvolver
{
    /// Create a convolver for `impulse` processing blocks of `block_size` samples.
    pub fn new(impulse : &[f64], block_size : usize) -> DspResult<Self>
    {
        if block_size == 0 { return Err(DspError::ZeroSize("block_size")) }
        if impulse.is_empty() { return Err(DspError::EmptyImpulse) }

        let mut state = ConvolutionState::new(block_size, impulse.len().div_ceil(block_size))?;
        let active = state.partition(impulse)?;
        let standby = PartitionSet::zeroed(active.partition_count(), active.spectrum_size());
        debug!("TimeVaryingConvolver: {} samples in {} partitions of {} samples",
               impulse.len(), active.partition_count(), block_size);

        Ok(Self
        {
            state,
            active,
            slot : Arc::new(SwapSlot::new(standby)),
            fader : CrossFader::open(block_size)?,
            fade_out_buffer : vec![0.0; block_size].into_boxed_slice(),
            fade_in_buffer : vec![0.0; block_size].into_boxed_slice()
        })
    }

    /// Handle for publishing partitions from another thread.
    pub fn updater(&self) -> PartitionUpdater
    {
        PartitionUpdater
        {
            slot : self.slot.clone(),
            block_size : self.state.block_size(),
            partition_count : self.state.partition_count(),
            spectrum_size : self.state.spectrum_size()
        }
    }

    /// Publish new partitions from the thread owning the convolver.
    ///
    /// Same contract as [`PartitionUpdater::set_partitions`].
    pub fn set_partitions(&self, bins : &[Complex64]) -> DspResult<()>
    {
        self.updater().set_partitions(bins)
    }

    /// Convolve one block, crossfading to newly published partitions if any.
    ///
    /// Both `input` and `output` must hold exactly `block_size` samples.
    pub fn process(&mut self, input : &[f64], output : &mut [f64]) -> DspResult<()>
    {
        check_len(self.state.block_size(), input.len())?;
        check_len(self.state.block_size(), output.len())?;

        let mut status = Ok(());
        no_denormals(|| { status = self.process_block(input, output); });
        self.state.commit_block();
        status
    }

    fn process_block(&mut self, input : &[f64], output : &mut [f64]) -> DspResult<()>
    {
        self.state.push_block(input)?;
        self.state.accumulate(&self.active, output)?;

        if !self.slot.take(&mut self.active) { return Ok(()) }

        // Same history, new partitions.
        self.fade_out_buffer.copy_from_slice(output);
        self.state.accumulate(&self.active, &mut self.fade_in_buffer)?;
        self.fader.process(&self.fade_out_buffer, &self.fade_in_buffer, output)
    }

    /// Zero the stored input. Pending partitions stay pending.
    pub fn reset_input_buffer(&mut self) { self.state.reset(); }

    /// True while published partitions wait for the next block.
    pub fn is_swap_pending(&self) -> bool { self.slot.is_pending() }

    /// Partitions currently in use.
    pub fn partitions(&self) -> &PartitionSet { &self.active }

    /// Crossfade applied in the block of a swap.
    pub fn fader(&self) -> &CrossFader { &self.fader }

    /// FFT length, twice the block size.
    pub fn fft_size(&self) -> usize { self.state.block_size() * 2 }

    /// Samples per block.
    pub fn block_size(&self) -> usize { self.state.block_size() }

    /// Bins of one partition, `block_size + 1`.
    pub fn spectrum_size(&self) -> usize { self.state.spectrum_size() }

    /// Bins of all partitions combined.
    pub fn spectra_size(&self) -> usize { self.spectrum_size() * self.partition_count() }

    /// Number of partitions.
    pub fn partition_count(&self) -> usize { self.state.partition_count() }
}
