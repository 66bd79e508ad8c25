//! Bin-wise arithmetic over arrays of complex frequency-domain samples.
//!
//! Every kernel walks its arguments in lockstep and stops at the shortest one,
//! so callers are expected to pass slices of equal length (usually one
//! spectrum, `fft_size / 2 + 1` bins).
//!
//! The interpolation kernels are not used by the convolution engines
//! themselves. They exist to blend between partition sets indexed by an
//! external parameter (source position, filter setting) before handing the
//! result to [`TimeVaryingConvolver`](crate::timevar::TimeVaryingConvolver).

use std::f64::consts::{PI, TAU};

use num_complex::Complex64;

/// `result[i] = factor1[i] * factor2[i]`
#[inline]
pub fn multiply(factor1 : &[Complex64], factor2 : &[Complex64], result : &mut [Complex64])
{
    for ((out, a), b) in result.iter_mut().zip(factor1).zip(factor2) { *out = a * b; }
}

/// `accumulator[i] += factor1[i] * factor2[i]`
#[inline]
pub fn multiply_accumulate(factor1 : &[Complex64], factor2 : &[Complex64], accumulator : &mut [Complex64])
{
    for ((acc, a), b) in accumulator.iter_mut().zip(factor1).zip(factor2) { *acc += a * b; }
}

/// Linear interpolation between two spectra.
///
/// `base_fract` is the weight of `base`: 1.0 returns `base`, 0.0 returns `neighbour`.
pub fn interpolate(base : &[Complex64], neighbour : &[Complex64], result : &mut [Complex64], base_fract : f64)
{
    let inv_fract = 1.0 - base_fract;
    for ((out, b), n) in result.iter_mut().zip(base).zip(neighbour)
    {
        *out = b * base_fract + n * inv_fract;
    }
}

/// Bilinear interpolation over a 2x2 grid of spectra.
///
/// `x_fract` moves from `base` towards `x_neighbour`, `y_fract` from `base`
/// towards `y_neighbour`; `diag_neighbour` is the corner reached at (1, 1).
pub fn bilinear_interpolate(base : &[Complex64], x_neighbour : &[Complex64],
                            y_neighbour : &[Complex64], diag_neighbour : &[Complex64],
                            result : &mut [Complex64], x_fract : f64, y_fract : f64)
{
    let next_x_fract = 1.0 - x_fract;
    let next_y_fract = 1.0 - y_fract;

    let corners = base.iter().zip(x_neighbour).zip(y_neighbour).zip(diag_neighbour);
    for (out, (((b, x), y), d)) in result.iter_mut().zip(corners)
    {
        *out = (b * next_x_fract + x * x_fract) * next_y_fract
             + (y * next_x_fract + d * x_fract) * y_fract;
    }
}

/// Magnitude of a single bin.
#[inline]
pub fn magnitude(value : Complex64) -> f64 { value.norm() }

/// Phase of a single bin in (-pi, pi].
#[inline]
pub fn phase(value : Complex64) -> f64 { value.im.atan2(value.re) }

/// Interpolation in the magnitude/phase domain.
///
/// Magnitude and phase are blended separately and recombined, which keeps
/// the level of two spectra with different phase from collapsing the way a
/// linear blend does. Weights follow [`interpolate`].
pub fn polar_interpolate(base : &[Complex64], neighbour : &[Complex64], result : &mut [Complex64], base_fract : f64)
{
    let inv_fract = 1.0 - base_fract;
    for ((out, &b), &n) in result.iter_mut().zip(base).zip(neighbour)
    {
        let abs = magnitude(b) * base_fract + magnitude(n) * inv_fract;
        let angle = phase(b) * base_fract + phase(n) * inv_fract;
        *out = Complex64::from_polar(abs, angle);
    }
}

/// Write the unwrapped phase of every bin of `spectrum` into `phases`.
///
/// Bin 0 keeps its principal phase. Every following bin is shifted by a
/// multiple of 2pi so that its difference to the previous *unwrapped* phase
/// lies in (-pi, pi].
pub fn unwrap_phase(spectrum : &[Complex64], phases : &mut [f64])
{
    let mut previous : Option<f64> = None;
    for (out, &bin) in phases.iter_mut().zip(spectrum)
    {
        let raw = phase(bin);
        *out = match previous
        {
            None => raw,
            Some(last) =>
            {
                let delta = raw - last;
                let wraps = ((delta - PI) / TAU).ceil();
                last + delta - wraps * TAU
            }
        };
        previous = Some(*out);
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use approx::assert_abs_diff_eq;

    fn c(re : f64, im : f64) -> Complex64 { Complex64::new(re, im) }

    #[test]
    fn test_multiply()
    {
        let a = [c(1.0, 2.0), c(0.0, 1.0)];
        let b = [c(3.0, -1.0), c(0.0, 1.0)];
        let mut out = [Complex64::default(); 2];
        multiply(&a, &b, &mut out);
        assert_eq!(out[0], c(5.0, 5.0));
        assert_eq!(out[1], c(-1.0, 0.0));
    }

    #[test]
    fn test_multiply_accumulate()
    {
        let a = [c(1.0, 1.0)];
        let b = [c(2.0, 0.0)];
        let mut acc = [c(0.5, -0.5)];
        multiply_accumulate(&a, &b, &mut acc);
        multiply_accumulate(&a, &b, &mut acc);
        assert_eq!(acc[0], c(4.5, 3.5));
    }

    #[test]
    fn test_interpolate_weights()
    {
        let base = [c(1.0, 0.0), c(0.0, 2.0)];
        let neighbour = [c(3.0, 0.0), c(0.0, -2.0)];
        let mut out = [Complex64::default(); 2];

        interpolate(&base, &neighbour, &mut out, 1.0);
        assert_eq!(out, base);
        interpolate(&base, &neighbour, &mut out, 0.0);
        assert_eq!(out, neighbour);
        interpolate(&base, &neighbour, &mut out, 0.25);
        assert_abs_diff_eq!(out[0].re, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[1].im, -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_bilinear_corners()
    {
        let base = [c(1.0, 0.0)];
        let x = [c(2.0, 0.0)];
        let y = [c(3.0, 0.0)];
        let d = [c(4.0, 1.0)];
        let mut out = [Complex64::default()];

        bilinear_interpolate(&base, &x, &y, &d, &mut out, 0.0, 0.0);
        assert_eq!(out[0], base[0]);
        bilinear_interpolate(&base, &x, &y, &d, &mut out, 1.0, 0.0);
        assert_eq!(out[0], x[0]);
        bilinear_interpolate(&base, &x, &y, &d, &mut out, 0.0, 1.0);
        assert_eq!(out[0], y[0]);
        bilinear_interpolate(&base, &x, &y, &d, &mut out, 1.0, 1.0);
        assert_eq!(out[0], d[0]);
        bilinear_interpolate(&base, &x, &y, &d, &mut out, 0.5, 0.5);
        assert_abs_diff_eq!(out[0].re, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(out[0].im, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn test_magnitude_phase()
    {
        assert_abs_diff_eq!(magnitude(c(3.0, 4.0)), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(phase(c(0.0, 1.0)), PI / 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(phase(c(-1.0, 0.0)), PI, epsilon = 1e-12);
    }

    #[test]
    fn test_polar_interpolate_keeps_magnitude()
    {
        // A linear blend of opposite phases cancels, the polar blend does not.
        let base = [Complex64::from_polar(2.0, 0.1)];
        let neighbour = [Complex64::from_polar(2.0, 0.1 + PI * 0.9)];
        let mut out = [Complex64::default()];
        polar_interpolate(&base, &neighbour, &mut out, 0.5);
        assert_abs_diff_eq!(magnitude(out[0]), 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(phase(out[0]), 0.1 + PI * 0.45, epsilon = 1e-12);
    }

    #[test]
    fn test_unwrap_linear_phase()
    {
        // Linear phase of a pure delay wraps several times across the bins.
        let slope = -1.3;
        let spectrum : Vec<Complex64> = (0..32).map(|k| Complex64::from_polar(1.0, slope * k as f64)).collect();
        let mut phases = vec![0.0; spectrum.len()];
        unwrap_phase(&spectrum, &mut phases);
        for (k, value) in phases.iter().enumerate()
        {
            assert_abs_diff_eq!(*value, slope * k as f64, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_unwrap_keeps_small_steps()
    {
        let spectrum = [Complex64::from_polar(1.0, 0.2), Complex64::from_polar(1.0, 0.5), Complex64::from_polar(1.0, 0.1)];
        let mut phases = [0.0; 3];
        unwrap_phase(&spectrum, &mut phases);
        assert_abs_diff_eq!(phases[0], 0.2, epsilon = 1e-12);
        assert_abs_diff_eq!(phases[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(phases[2], 0.1, epsilon = 1e-12);
    }
}
