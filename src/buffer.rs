//! Fixed-size block storage used by the convolution engines.
//!
//! - `TimeWindow` : the doubled time-domain window (previous block, current block).
//! - `SpectrumHistory` : ring of input spectra, read newest-first.
//! - `PartitionSet` : frequency-domain partitions of an impulse response.
//!
//! All storage is allocated once at construction. Nothing here allocates while processing.

use num_complex::Complex64;

use crate::error::*;
use crate::fft::Fft;

/// Time window of two blocks. The first half holds the previous input block, the second half the current one.
pub struct TimeWindow
{
    buffer : Box<[f64]>,
    block_size : usize
}
impl TimeWindow
{
    /// New zeroed TimeWindow for blocks of `block_size` samples.
    #[inline]
    pub fn new(block_size : usize) -> Self
    {
        Self { buffer : vec![0.0; block_size * 2].into_boxed_slice(), block_size }
    }
    /// Writes the current block into the second half.
    #[inline]
    pub fn write_current(&mut self, block : &[f64]) { self.buffer[self.block_size..].copy_from_slice(block); }
    /// Moves the current block into the first half, making it the previous block of the next call.
    #[inline]
    pub fn commit(&mut self) { self.buffer.copy_within(self.block_size.., 0); }
    /// Converts the whole window as slice.
    #[inline]
    pub fn as_slice(&self) -> &[f64] { &self.buffer }
    /// Fills the window with zeros.
    #[inline]
    pub fn clear(&mut self) { self.buffer.fill(0.0); }
    /// Returns the length of the window.
    #[inline]
    pub fn len(&self) -> usize { self.buffer.len() }
}

/// Ring of spectra read newest-first. Index `k` is always the spectrum pushed `k` pushes ago.
///
/// Pushing rotates a write index instead of moving data, the oldest spectrum is overwritten.
pub struct SpectrumHistory
{
    bins : Box<[Complex64]>,
    spectrum_size : usize,
    count : usize,
    newest : usize
}
impl SpectrumHistory
{
    /// New SpectrumHistory of `count` zeroed spectra.
    #[inline]
    pub fn new(count : usize, spectrum_size : usize) -> Self
    {
        Self
        {
            bins : vec![Complex64::default(); count * spectrum_size].into_boxed_slice(),
            spectrum_size,
            count,
            newest : 0
        }
    }
    /// Drops the oldest spectrum and returns the slot of the new index 0 to be written.
    #[inline]
    pub fn push_slot(&mut self) -> &mut [Complex64]
    {
        self.newest = (self.newest + self.count - 1) % self.count;
        let start = self.newest * self.spectrum_size;
        &mut self.bins[start..start + self.spectrum_size]
    }
    /// Returns the spectrum pushed `age` pushes ago.
    #[inline]
    pub fn get(&self, age : usize) -> &[Complex64]
    {
        let start = ((self.newest + age) % self.count) * self.spectrum_size;
        &self.bins[start..start + self.spectrum_size]
    }
    /// Fills every spectrum with zeros.
    #[inline]
    pub fn clear(&mut self) { self.bins.fill(Complex64::default()); }
    /// Returns the number of spectra.
    #[inline]
    pub fn len(&self) -> usize { self.count }
}

/// Frequency-domain partitions of an impulse response.
///
/// Partition `k` is the spectrum of impulse samples `[k * B, (k + 1) * B)`
/// zero-padded to `2 * B` and transformed without normalization. The bins are
/// stored partition-major, bin-minor: `partition_count * (B + 1)` values.
#[derive(Clone, Debug, PartialEq)]
pub struct PartitionSet
{
    bins : Box<[Complex64]>,
    spectrum_size : usize,
    partition_count : usize
}
impl PartitionSet
{
    /// Partition `impulse` for blocks of `block_size` samples.
    ///
    /// Allocates and plans an FFT. Build replacement sets with this on a
    /// control thread, never on the audio thread.
    pub fn from_impulse(impulse : &[f64], block_size : usize) -> DspResult<Self>
    {
        if block_size == 0 { return Err(DspError::ZeroSize("block_size")) }
        let mut fft = Fft::new(block_size * 2)?;
        Self::from_impulse_with(impulse, block_size, &mut fft)
    }

    /// Partition `impulse` with an FFT of `2 * block_size` owned by the caller.
    pub(crate) fn from_impulse_with(impulse : &[f64], block_size : usize, fft : &mut Fft) -> DspResult<Self>
    {
        if impulse.is_empty() { return Err(DspError::EmptyImpulse) }
        check_len(block_size * 2, fft.size())?;

        let mut set = Self::zeroed(impulse.len().div_ceil(block_size), fft.spectrum_size());
        let mut padded_block = vec![0.0; fft.size()];

        for (part, chunk) in impulse.chunks(block_size).enumerate()
        {
            // The tail of the last chunk and the second half stay zero.
            padded_block.fill(0.0);
            padded_block[..chunk.len()].copy_from_slice(chunk);
            fft.forward(&padded_block, set.partition_mut(part), false)?;
        }
        Ok(set)
    }

    /// Zeroed set of `partition_count` spectra of `spectrum_size` bins.
    pub fn zeroed(partition_count : usize, spectrum_size : usize) -> Self
    {
        Self
        {
            bins : vec![Complex64::default(); partition_count * spectrum_size].into_boxed_slice(),
            spectrum_size,
            partition_count
        }
    }

    /// Number of partitions.
    #[inline]
    pub fn partition_count(&self) -> usize { self.partition_count }

    /// Number of bins per partition.
    #[inline]
    pub fn spectrum_size(&self) -> usize { self.spectrum_size }

    /// Spectrum of partition `part`.
    #[inline]
    pub fn partition(&self, part : usize) -> &[Complex64]
    {
        &self.bins[part * self.spectrum_size..(part + 1) * self.spectrum_size]
    }

    #[inline]
    fn partition_mut(&mut self, part : usize) -> &mut [Complex64]
    {
        &mut self.bins[part * self.spectrum_size..(part + 1) * self.spectrum_size]
    }

    /// All bins in partition-major order.
    #[inline]
    pub fn as_slice(&self) -> &[Complex64] { &self.bins }

    /// Overwrite every bin. `bins` must have exactly the length of this set.
    pub fn copy_from(&mut self, bins : &[Complex64]) -> DspResult<()>
    {
        check_len(self.bins.len(), bins.len())?;
        self.bins.copy_from_slice(bins);
        Ok(())
    }
}
