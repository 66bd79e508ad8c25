//! Signal processors built on the convolution engine.
//!
//! This module provides:
//!
//! - **Window functions** - Blackman window for FIR design
//! - **Crossfade** - Complementary sine-squared ramps for click-free blending of two blocks
//! - **Steep lowpass** - Windowed-sinc FIR run through a [`Convolver`]
//!
//! ## Example: Lowpass
//!
//! ```
//! use mkconvolution::dsp::{SincLowpass, SincLowpassParameters};
//!
//! let mut lowpass = SincLowpass::new(SincLowpassParameters
//! {
//!     cutoff : 1000.0,
//!     sample_rate : 48000.0,
//!     block_size : 128,
//!     length : 511,
//! }).unwrap();
//!
//! let input = [0.0; 128];
//! let mut output = [0.0; 128];
//! lowpass.process(&input, &mut output).unwrap();
//! ```

use std::f64::consts::PI;

use log::debug;

use crate::convolution::Convolver;
use crate::error::*;

// ==========================================
// Window Functions
// ==========================================

/// Write a Blackman window over the whole of `window`.
///
/// Formula: `w[n] = 0.42 - 0.5 cos(2πn / (L-1)) + 0.08 cos(4πn / (L-1))`
pub fn blackman(window : &mut [f64])
{
    if window.len() < 2 { window.fill(1.0); return; }

    let span = (window.len() - 1) as f64;
    for (index, value) in window.iter_mut().enumerate()
    {
        let x = index as f64 / span;
        *value = 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos();
    }
}

// ==========================================
// CrossFader
// ==========================================

/// Sine-squared crossfade over a fixed number of samples.
///
/// `fade_out[i] = cos²(i · step)` and `fade_in[i] = 1 - fade_out[i]`, so the
/// weights sum to one at every sample. Two shapes share this type:
///
/// - [`new`](Self::new) : `step = π/2 / (len - 1)`, the ramps end exactly at 0 and 1.
/// - [`open`](Self::open) : `step = π/2 / len`, the ramps stop one step short of
///   the end point, so the sample following the fade continues the curve
///   instead of repeating its last value. Used to blend one block into the next.
#[derive(Clone, Debug)]
pub struct CrossFader
{
    fade_in : Box<[f64]>,
    fade_out : Box<[f64]>,
    open : bool
}
impl CrossFader
{
    /// Create a crossfader of `len` samples ending at full weight.
    pub fn new(len : usize) -> DspResult<Self> { Self::with_shape(len, false) }

    /// Create a crossfader of `len` samples ending one step before full weight.
    pub fn open(len : usize) -> DspResult<Self> { Self::with_shape(len, true) }

    fn with_shape(len : usize, open : bool) -> DspResult<Self>
    {
        if len == 0 { return Err(DspError::ZeroSize("fade length")) }
        let (fade_in, fade_out) = Self::ramps(len, open);
        Ok(Self { fade_in, fade_out, open })
    }

    fn ramps(len : usize, open : bool) -> (Box<[f64]>, Box<[f64]>)
    {
        // A single closed sample has no span to ramp over and stays on the outgoing side.
        let steps = if open { len } else { (len - 1).max(1) };
        let increment = PI * 0.5 / steps as f64;
        let fade_out : Box<[f64]> = (0..len).map(|index| (index as f64 * increment).cos().powi(2)).collect();
        let fade_in = fade_out.iter().map(|down| 1.0 - down).collect();
        (fade_in, fade_out)
    }

    /// Length of the fade in samples.
    pub fn len(&self) -> usize { self.fade_in.len() }

    /// True if the ramps stop one step short of the end point.
    pub fn is_open(&self) -> bool { self.open }

    /// Change the length of the fade, keeping its shape. Allocates.
    pub fn set_len(&mut self, len : usize) -> DspResult<()>
    {
        if len == 0 { return Err(DspError::ZeroSize("fade length")) }
        (self.fade_in, self.fade_out) = Self::ramps(len, self.open);
        Ok(())
    }

    /// Rising ramp, `sin²`.
    pub fn fade_in(&self) -> &[f64] { &self.fade_in }

    /// Falling ramp, `cos²`.
    pub fn fade_out(&self) -> &[f64] { &self.fade_out }

    /// `output[i] = fade_out[i] · down[i] + fade_in[i] · up[i]`
    ///
    /// All three slices must have the fade length.
    pub fn process(&self, fade_out : &[f64], fade_in : &[f64], output : &mut [f64]) -> DspResult<()>
    {
        check_len(self.len(), fade_out.len())?;
        check_len(self.len(), fade_in.len())?;
        check_len(self.len(), output.len())?;

        for index in 0..self.len()
        {
            output[index] = fade_out[index] * self.fade_out[index] + fade_in[index] * self.fade_in[index];
        }
        Ok(())
    }
}

// ==========================================
// Sinc Lowpass
// ==========================================

/// Parameters of a [`SincLowpass`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SincLowpassParameters
{
    /// Cutoff frequency in Hz, between 0 and half the sample rate.
    pub cutoff : f64,
    /// Sample rate in Hz.
    pub sample_rate : f64,
    /// Samples per processed block.
    pub block_size : usize,
    /// Number of filter taps, odd. Longer filters are steeper and delay more.
    pub length : usize,
}

impl Default for SincLowpassParameters
{
    fn default() -> Self
    {
        Self
        {
            cutoff : 1000.0,
            sample_rate : 44100.0,
            block_size : 256,
            length : 1023,
        }
    }
}

impl SincLowpassParameters
{
    fn validate(&self) -> DspResult<()>
    {
        if self.length == 0 { return Err(DspError::ZeroSize("length")) }
        if self.length % 2 == 0
        {
            // An even window has no centre tap and delays by a fractional sample.
            return Err(DspError::InvalidParameter(format!("length {} must be odd", self.length)));
        }
        if self.block_size == 0 { return Err(DspError::ZeroSize("block_size")) }
        if !(self.sample_rate > 0.0)
        {
            return Err(DspError::InvalidParameter(format!("sample rate {} must be positive", self.sample_rate)));
        }
        if !(self.cutoff > 0.0 && self.cutoff < self.sample_rate * 0.5)
        {
            return Err(DspError::InvalidParameter(
                format!("cutoff {} Hz must lie between 0 and {} Hz", self.cutoff, self.sample_rate * 0.5)));
        }
        Ok(())
    }
}

/// Steep lowpass using convolution with a Blackman-windowed sinc impulse.
///
/// The tap count is odd and the impulse is symmetric around its centre tap
/// `(length - 1) / 2`, so the filter has linear phase and delays the signal
/// by exactly [`latency`](Self::latency) samples.
pub struct SincLowpass
{
    parameters : SincLowpassParameters,
    convolver : Convolver
}
impl SincLowpass
{
    /// Design the filter and set up its convolver.
    pub fn new(parameters : SincLowpassParameters) -> DspResult<Self>
    {
        parameters.validate()?;

        let impulse = Self::impulse(&parameters);
        let convolver = Convolver::new(&impulse, parameters.block_size)?;
        debug!("SincLowpass: {} Hz at {} Hz, {} taps", parameters.cutoff, parameters.sample_rate, parameters.length);

        Ok(Self { parameters, convolver })
    }

    /// Windowed sinc impulse with normalized cutoff `cutoff / sample_rate`.
    fn impulse(parameters : &SincLowpassParameters) -> Vec<f64>
    {
        let cutoff_norm = parameters.cutoff / parameters.sample_rate;
        let center = ((parameters.length - 1) / 2) as f64;

        let mut impulse = vec![0.0; parameters.length];
        blackman(&mut impulse);
        for (index, tap) in impulse.iter_mut().enumerate()
        {
            let x = (index as f64 - center) * 2.0 * cutoff_norm * PI;
            let sinc = if x == 0.0 { 1.0 } else { x.sin() / x };
            *tap *= 2.0 * cutoff_norm * sinc;
        }
        impulse
    }

    /// Filter one block of `block_size` samples.
    pub fn process(&mut self, input : &[f64], output : &mut [f64]) -> DspResult<()>
    {
        self.convolver.process(input, output)
    }

    /// Clear the filter's memory of past input.
    pub fn reset(&mut self) { self.convolver.reset_input_buffer(); }

    /// Group delay in samples.
    pub fn latency(&self) -> usize { (self.parameters.length - 1) / 2 }

    /// Cutoff frequency in Hz.
    pub fn cutoff(&self) -> f64 { self.parameters.cutoff }

    /// Parameters the filter was built with.
    pub fn parameters(&self) -> &SincLowpassParameters { &self.parameters }
}
