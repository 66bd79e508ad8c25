//! Partitioned fast convolution engine for real-time audio based on Rust.
//! buffer : includes time window, spectrum history, and partition storage.
//! complex : bin-wise complex arithmetic, interpolation, and phase unwrapping.
//! error : includes the crate error type and result alias.
//! fft : fixed-size real FFT with configurable normalization.
//! convolution : uniformly partitioned overlap-save convolution.
//! timevar : convolution with impulse responses exchanged from another thread, crossfaded without clicks.
//! dsp : crossfade ramps, windows, and a steep windowed-sinc lowpass.

//! # License
//! The library is offered under GPLv3.0 license.

/// includes time window, spectrum history, and partition storage.
pub mod buffer;
/// includes complex spectrum arithmetic and interpolation.
pub mod complex;
/// includes the partitioned convolver.
pub mod convolution;
/// includes window functions, crossfader, and sinc lowpass.
pub mod dsp;
/// includes the crate error type.
pub mod error;
/// includes the real FFT wrapper.
pub mod fft;
/// includes the time varying convolver.
pub mod timevar;
