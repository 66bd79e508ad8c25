// ==========================================
// Error Types
// ==========================================

use thiserror::Error;

/// Error type shared by every processor in the crate.
///
/// Every variant describes a rejected call: the processor that returned it
/// has not been mutated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DspError
{
    /// A size argument was zero. Carries the name of the argument.
    #[error("Invalid size: {0} must be greater than zero")]
    ZeroSize(&'static str),
    /// The impulse response contained no samples.
    #[error("Impulse response is empty")]
    EmptyImpulse,
    /// A buffer did not have the length fixed at construction.
    #[error("Buffer size mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected : usize, got : usize },
    /// A parameter was outside of its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// The underlying FFT rejected its buffers.
    #[error("Transform error: {0}")]
    Transform(String),
}

impl From<realfft::FftError> for DspError
{
    fn from(error : realfft::FftError) -> Self { DspError::Transform(error.to_string()) }
}

/// Result type for processor construction and processing.
pub type DspResult<T> = Result<T, DspError>;

/// Reject `got` unless it equals `expected`.
#[inline]
pub(crate) fn check_len(expected : usize, got : usize) -> DspResult<()>
{
    if expected == got { Ok(()) } else { Err(DspError::SizeMismatch { expected, got }) }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_check_len()
    {
        assert!(check_len(4, 4).is_ok());
        assert_eq!(check_len(4, 3), Err(DspError::SizeMismatch { expected : 4, got : 3 }));
    }

    #[test]
    fn test_display()
    {
        let error = DspError::SizeMismatch { expected : 8, got : 2 };
        assert_eq!(error.to_string(), "Buffer size mismatch: expected 8, got 2");
        assert_eq!(DspError::ZeroSize("block_size").to_string(), "Invalid size: block_size must be greater than zero");
    }
}
