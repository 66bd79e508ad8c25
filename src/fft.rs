//! Fixed-size real FFT with configurable normalization.
//!
//! Wraps a `realfft` forward/inverse plan pair together with every buffer the
//! transforms need, so the per-block calls never allocate. Only the
//! non-redundant half of the spectrum (`size / 2 + 1` bins) is exchanged with
//! callers.

use std::sync::Arc;

use num_complex::Complex64;
use realfft::{ComplexToReal, RealFftPlanner, RealToComplex};

use crate::error::*;

/// Forward (real to complex) and inverse (complex to real) transform of one size.
///
/// The forward transform can scale its output by a normalization factor,
/// `1 / size` by default. The inverse transform is never scaled, so a
/// normalized forward pass followed by an inverse pass reproduces the input.
pub struct Fft
{
    requested_size : usize,
    size : usize,
    spectrum_size : usize,
    norm_factor : f64,
    forward_plan : Arc<dyn RealToComplex<f64>>,
    inverse_plan : Arc<dyn ComplexToReal<f64>>,
    time_domain : Vec<f64>,
    freq_domain : Vec<Complex64>,
    forward_scratch : Vec<Complex64>,
    inverse_scratch : Vec<Complex64>
}
impl Fft
{
    /// Plan transforms for `size` samples. Odd sizes are padded by one sample.
    pub fn new(size : usize) -> DspResult<Self>
    {
        if size == 0 { return Err(DspError::ZeroSize("fft size")) }

        let padded = size + size % 2;
        let spectrum_size = padded / 2 + 1;

        let mut planner = RealFftPlanner::<f64>::new();
        let forward_plan = planner.plan_fft_forward(padded);
        let inverse_plan = planner.plan_fft_inverse(padded);

        Ok(Self
        {
            requested_size : size,
            size : padded,
            spectrum_size,
            norm_factor : Self::default_norm_factor(spectrum_size),
            time_domain : vec![0.0; padded],
            freq_domain : vec![Complex64::default(); spectrum_size],
            forward_scratch : forward_plan.make_scratch_vec(),
            inverse_scratch : inverse_plan.make_scratch_vec(),
            forward_plan,
            inverse_plan
        })
    }

    #[inline]
    fn default_norm_factor(spectrum_size : usize) -> f64 { 0.5 / (spectrum_size - 1) as f64 }

    /// Transform length after padding.
    pub fn size(&self) -> usize { self.size }

    /// Number of bins in a spectrum.
    pub fn spectrum_size(&self) -> usize { self.spectrum_size }

    /// Get the factor applied by normalized forward transforms.
    pub fn norm_factor(&self) -> f64 { self.norm_factor }

    /// Set the factor applied by normalized forward transforms.
    pub fn set_norm_factor(&mut self, norm_factor : f64) { self.norm_factor = norm_factor; }

    /// Restore the default factor, `0.5 / (spectrum_size - 1)`.
    pub fn reset_norm_factor(&mut self) { self.norm_factor = Self::default_norm_factor(self.spectrum_size); }

    /// Real to complex transform.
    ///
    /// `input` holds `size()` samples, or the unpadded size requested at
    /// construction in which case the pad sample is zero. `output` receives
    /// `spectrum_size()` bins, scaled by the normalization factor if `normalize`.
    pub fn forward(&mut self, input : &[f64], output : &mut [Complex64], normalize : bool) -> DspResult<()>
    {
        if input.len() != self.requested_size { check_len(self.size, input.len())?; }
        check_len(self.spectrum_size, output.len())?;

        self.time_domain[..input.len()].copy_from_slice(input);
        self.time_domain[input.len()..].fill(0.0);
        self.forward_plan.process_with_scratch(&mut self.time_domain, output, &mut self.forward_scratch)?;

        if normalize
        {
            let norm_factor = self.norm_factor;
            output.iter_mut().for_each(|bin| *bin *= norm_factor);
        }
        Ok(())
    }

    /// Complex to real transform, unnormalized.
    ///
    /// The imaginary parts of the DC and Nyquist bins are ignored.
    pub fn inverse(&mut self, input : &[Complex64], output : &mut [f64]) -> DspResult<()>
    {
        check_len(self.spectrum_size, input.len())?;
        check_len(self.size, output.len())?;

        self.freq_domain.copy_from_slice(input);
        self.freq_domain[0].im = 0.0;
        self.freq_domain[self.spectrum_size - 1].im = 0.0;
        self.inverse_plan.process_with_scratch(&mut self.freq_domain, output, &mut self.inverse_scratch)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_abs_diff_eq;

    fn test_signal(len : usize) -> Vec<f64>
    {
        (0..len).map(|i| (i as f64 * 0.37).sin() + 0.25 * (i as f64 * 1.91).cos() + 0.1).collect()
    }

    #[test]
    fn test_zero_size_rejected()
    {
        assert!(matches!(Fft::new(0), Err(DspError::ZeroSize(_))));
    }

    #[test]
    fn test_sizes()
    {
        let fft = Fft::new(16).unwrap();
        assert_eq!(fft.size(), 16);
        assert_eq!(fft.spectrum_size(), 9);

        let odd = Fft::new(15).unwrap();
        assert_eq!(odd.size(), 16);
        assert_eq!(odd.spectrum_size(), 9);
    }

    #[test]
    fn test_round_trip()
    {
        let mut fft = Fft::new(64).unwrap();
        let input = test_signal(64);
        let mut spectrum = vec![Complex64::default(); fft.spectrum_size()];
        let mut output = vec![0.0; 64];

        fft.forward(&input, &mut spectrum, true).unwrap();
        fft.inverse(&spectrum, &mut output).unwrap();
        for (a, b) in input.iter().zip(&output) { assert_abs_diff_eq!(a, b, epsilon = 1e-10); }
    }

    #[test]
    fn test_unnormalized_round_trip_scales_by_size()
    {
        let mut fft = Fft::new(32).unwrap();
        let input = test_signal(32);
        let mut spectrum = vec![Complex64::default(); fft.spectrum_size()];
        let mut output = vec![0.0; 32];

        fft.forward(&input, &mut spectrum, false).unwrap();
        fft.inverse(&spectrum, &mut output).unwrap();
        for (a, b) in input.iter().zip(&output) { assert_abs_diff_eq!(a * 32.0, *b, epsilon = 1e-9); }
    }

    #[test]
    fn test_odd_size_pads_with_zero()
    {
        let mut fft = Fft::new(7).unwrap();
        let input = test_signal(7);
        let mut spectrum = vec![Complex64::default(); fft.spectrum_size()];
        let mut output = vec![0.0; 8];

        fft.forward(&input, &mut spectrum, true).unwrap();
        fft.inverse(&spectrum, &mut output).unwrap();
        for (a, b) in input.iter().zip(&output) { assert_abs_diff_eq!(a, b, epsilon = 1e-10); }
        assert_abs_diff_eq!(output[7], 0.0, epsilon = 1e-10);
    }

    #[test]
    fn test_norm_factor()
    {
        let mut fft = Fft::new(8).unwrap();
        assert_abs_diff_eq!(fft.norm_factor(), 0.125, epsilon = 1e-15);

        fft.set_norm_factor(1.0);
        let mut spectrum = vec![Complex64::default(); 5];
        fft.forward(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], &mut spectrum, true).unwrap();
        assert_abs_diff_eq!(spectrum[3].re, 1.0, epsilon = 1e-12);

        fft.reset_norm_factor();
        assert_abs_diff_eq!(fft.norm_factor(), 0.125, epsilon = 1e-15);
    }

    #[test]
    fn test_length_mismatch_rejected()
    {
        let mut fft = Fft::new(8).unwrap();
        let mut spectrum = vec![Complex64::default(); 5];
        assert_eq!(fft.forward(&[0.0; 6], &mut spectrum, true), Err(DspError::SizeMismatch { expected : 8, got : 6 }));
        let mut short = vec![Complex64::default(); 4];
        assert_eq!(fft.forward(&[0.0; 8], &mut short, true), Err(DspError::SizeMismatch { expected : 5, got : 4 }));
        let mut output = vec![0.0; 7];
        assert_eq!(fft.inverse(&spectrum, &mut output), Err(DspError::SizeMismatch { expected : 8, got : 7 }));
    }
}
