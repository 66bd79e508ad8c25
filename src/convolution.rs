//! Uniformly partitioned overlap-save convolution.
//!
//! The impulse response is cut into partitions of one block each, and every
//! partition is transformed once at construction. Per block the engine only
//! transforms the newest input window, multiplies the spectra of the last
//! `partition_count` windows with the matching partitions, and transforms the
//! sum back. Cost per block is one forward FFT, one inverse FFT and
//! `partition_count` spectrum multiplications, independent of the impulse
//! response length otherwise.
//!
//! ## Example
//!
//! ```
//! use mkconvolution::convolution::Convolver;
//!
//! let mut convolver = Convolver::new(&[1.0, 0.5], 4).unwrap();
//! let mut output = [0.0; 4];
//!
//! convolver.process(&[1.0, 0.0, 0.0, 0.0], &mut output).unwrap();
//! assert!((output[1] - 0.5).abs() < 1e-12);
//! ```

use log::debug;
use no_denormals::*;
use num_complex::Complex64;

use crate::buffer::*;
use crate::complex;
use crate::error::*;
use crate::fft::Fft;

// ==========================================
// Convolution State
// ==========================================

/// Per-block state of a partitioned convolution, without the partitions.
///
/// Split out of [`Convolver`] so several partition sets can be run against
/// the same input history within one block. One block is processed as
/// [`push_block`](Self::push_block), one or more
/// [`accumulate`](Self::accumulate) calls, then [`commit_block`](Self::commit_block).
pub struct ConvolutionState
{
    block_size : usize,
    fft : Fft,
    window : TimeWindow,
    history : SpectrumHistory,
    accumulator : Box<[Complex64]>,
    result : Box<[f64]>
}
impl ConvolutionState
{
    /// Create zeroed state for `partition_count` partitions of `block_size` samples.
    pub fn new(block_size : usize, partition_count : usize) -> DspResult<Self>
    {
        if block_size == 0 { return Err(DspError::ZeroSize("block_size")) }
        if partition_count == 0 { return Err(DspError::ZeroSize("partition_count")) }

        let fft = Fft::new(block_size * 2)?;
        let spectrum_size = fft.spectrum_size();
        Ok(Self
        {
            block_size,
            window : TimeWindow::new(block_size),
            history : SpectrumHistory::new(partition_count, spectrum_size),
            accumulator : vec![Complex64::default(); spectrum_size].into_boxed_slice(),
            result : vec![0.0; block_size * 2].into_boxed_slice(),
            fft
        })
    }

    /// Partition an impulse response with this state's FFT.
    ///
    /// Allocates. Not for use on the audio thread.
    pub fn partition(&mut self, impulse : &[f64]) -> DspResult<PartitionSet>
    {
        PartitionSet::from_impulse_with(impulse, self.block_size, &mut self.fft)
    }

    /// Number of samples per block.
    pub fn block_size(&self) -> usize { self.block_size }

    /// Number of input spectra kept, equal to the partition count.
    pub fn partition_count(&self) -> usize { self.history.len() }

    /// Number of bins per spectrum.
    pub fn spectrum_size(&self) -> usize { self.fft.spectrum_size() }

    /// Check that `partitions` matches the layout of this state.
    pub fn check_partitions(&self, partitions : &PartitionSet) -> DspResult<()>
    {
        check_len(self.partition_count(), partitions.partition_count())?;
        check_len(self.spectrum_size(), partitions.spectrum_size())
    }

    /// Place `input` in the window and push the spectrum of the window into the history.
    pub fn push_block(&mut self, input : &[f64]) -> DspResult<()>
    {
        check_len(self.block_size, input.len())?;
        self.window.write_current(input);
        self.fft.forward(self.window.as_slice(), self.history.push_slot(), true)
    }

    /// Convolve the current history with `partitions` and write one block to `output`.
    ///
    /// Does not touch the history or the window, so it may run any number of
    /// times between [`push_block`](Self::push_block) and [`commit_block`](Self::commit_block).
    pub fn accumulate(&mut self, partitions : &PartitionSet, output : &mut [f64]) -> DspResult<()>
    {
        check_len(self.block_size, output.len())?;
        self.check_partitions(partitions)?;

        self.accumulator.fill(Complex64::default());
        for age in 0..self.history.len()
        {
            complex::multiply_accumulate(self.history.get(age), partitions.partition(age), &mut self.accumulator);
        }
        self.fft.inverse(&self.accumulator, &mut self.result)?;

        // The first half is circular aliasing.
        output.copy_from_slice(&self.result[self.block_size..]);
        Ok(())
    }

    /// Keep the current block as the previous block of the next call.
    #[inline]
    pub fn commit_block(&mut self) { self.window.commit(); }

    /// Forget all past input.
    pub fn reset(&mut self)
    {
        self.window.clear();
        self.history.clear();
    }
}

// ==========================================
// Convolver
// ==========================================

/// Partitioned fast convolution with a fixed impulse response.
///
/// Input and output blocks always have the block size chosen at construction.
/// The output is the linear convolution of the whole input stream with the
/// impulse response, with no latency added on top of the response itself.
///
/// # Thread Safety
/// `process` and `set_freq_response` both take `&mut self`, so the partitions
/// can never be replaced while a block is processed. Use
/// [`TimeVaryingConvolver`](crate::timevar::TimeVaryingConvolver) to replace
/// them from another thread.
pub struct Convolver
{
    state : ConvolutionState,
    partitions : PartitionSet
}
impl Convolver
{
    /// Create a convolver for `impulse` processing blocks of `block_size` samples.
    ///
    /// # Arguments
    /// * `impulse` - Impulse response, at least one sample
    /// * `block_size` - Samples per block, sets latency and cost per call
    pub fn new(impulse : &[f64], block_size : usize) -> DspResult<Self>
    {
        if block_size == 0 { return Err(DspError::ZeroSize("block_size")) }
        if impulse.is_empty() { return Err(DspError::EmptyImpulse) }

        let mut state = ConvolutionState::new(block_size, impulse.len().div_ceil(block_size))?;
        let partitions = state.partition(impulse)?;
        debug!("Convolver: {} samples in {} partitions of {} samples",
               impulse.len(), partitions.partition_count(), block_size);

        Ok(Self { state, partitions })
    }

    /// Convolve one block.
    ///
    /// Both `input` and `output` must hold exactly `block_size` samples.
    pub fn process(&mut self, input : &[f64], output : &mut [f64]) -> DspResult<()>
    {
        check_len(self.state.block_size(), input.len())?;
        check_len(self.state.block_size(), output.len())?;

        let state = &mut self.state;
        let partitions = &self.partitions;
        let mut status = Ok(());
        no_denormals(||
        {
            status = state.push_block(input).and_then(|_| state.accumulate(partitions, output));
            state.commit_block();
        });
        status
    }

    /// Replace the frequency-domain partitions.
    ///
    /// `bins` must hold `spectra_size()` values in the layout built at
    /// construction (see [`PartitionSet`]). Input history is kept.
    pub fn set_freq_response(&mut self, bins : &[Complex64]) -> DspResult<()>
    {
        self.partitions.copy_from(bins)
    }

    /// Zero the stored input, as if the convolver had only been fed silence.
    pub fn reset_input_buffer(&mut self) { self.state.reset(); }

    /// Active partitions.
    pub fn partitions(&self) -> &PartitionSet { &self.partitions }

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
