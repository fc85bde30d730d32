//! Error types for rayo operations
//!
//! Kernels themselves never fail: a contract violation (short slice, bad index)
//! panics through ordinary slice indexing. Errors here cover the surfaces around
//! the kernels: the backend context, value-type construction and report output.

use thiserror::Error;

/// Result type for rayo operations
pub type Result<T> = std::result::Result<T, RayoError>;

/// Errors that can occur around the kernel catalogue
#[derive(Debug, Error)]
pub enum RayoError {
    /// No backend is installed in the context
    #[error("No SIMD backend installed; call init() or init_best() first")]
    NotInitialized,

    /// Size mismatch between operands
    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Audio source rate outside the fixed set
    #[error("Unsupported sample rate: {0} Hz (expected 11025, 22050 or 44100)")]
    UnsupportedSampleRate(u32),

    /// Writing the diagnostic stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_initialized_error() {
        let err = RayoError::NotInitialized;
        assert_eq!(
            err.to_string(),
            "No SIMD backend installed; call init() or init_best() first"
        );
    }

    #[test]
    fn test_size_mismatch_error() {
        let err = RayoError::SizeMismatch {
            expected: 10,
            actual: 5,
        };
        assert_eq!(err.to_string(), "Size mismatch: expected 10, got 5");
    }

    #[test]
    fn test_unsupported_sample_rate_error() {
        let err = RayoError::UnsupportedSampleRate(48000);
        assert_eq!(
            err.to_string(),
            "Unsupported sample rate: 48000 Hz (expected 11025, 22050 or 44100)"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: RayoError = io.into();
        assert!(matches!(err, RayoError::Io(_)));
        assert_eq!(err.to_string(), "I/O error: closed");
    }
}
