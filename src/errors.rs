// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the capture-to-framebuffer pipeline

use std::fmt;

/// Result type alias using PipelineError
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type alias for capture source operations
pub type CaptureResult<T> = Result<T, CaptureError>;

/// Result type alias for display sink operations
pub type DisplayResult<T> = Result<T, DisplayError>;

/// Capture source errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureError {
    /// Device missing, busy at open, or refused every usable format
    DeviceUnavailable(String),
    /// Dequeue failed or timed out
    ReadFailure(String),
    /// A frame arrived but could not be decoded
    Decode(String),
}

impl CaptureError {
    /// Whether the controller may absorb this error and try again next cycle
    pub fn is_transient(&self) -> bool {
        matches!(self, CaptureError::ReadFailure(_) | CaptureError::Decode(_))
    }
}

/// Display sink errors
///
/// All of these are raised at open time. Blitting itself cannot fail once
/// the geometry and pixel layout have been validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayError {
    /// Device node missing, not openable or not mappable
    DeviceUnavailable(String),
    /// Reported bit depth or channel layout cannot be packed
    UnsupportedPixelFormat(String),
    /// Reported stride or memory size cannot hold the visible area
    InvalidGeometry(String),
}

/// Top-level error surfaced to the process boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Capture source errors
    Capture(CaptureError),
    /// Display sink errors
    Display(DisplayError),
    /// Configuration errors
    Config(String),
    /// Signal handler registration failed
    Signal(String),
}

impl fmt::Display for CaptureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureError::DeviceUnavailable(msg) => {
                write!(f, "Capture device unavailable: {}", msg)
            }
            CaptureError::ReadFailure(msg) => write!(f, "Frame read failed: {}", msg),
            CaptureError::Decode(msg) => write!(f, "Frame decode failed: {}", msg),
        }
    }
}

impl fmt::Display for DisplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayError::DeviceUnavailable(msg) => {
                write!(f, "Display device unavailable: {}", msg)
            }
            DisplayError::UnsupportedPixelFormat(msg) => {
                write!(f, "Unsupported pixel format: {}", msg)
            }
            DisplayError::InvalidGeometry(msg) => write!(f, "Invalid display geometry: {}", msg),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::Capture(e) => write!(f, "Capture error: {}", e),
            PipelineError::Display(e) => write!(f, "Display error: {}", e),
            PipelineError::Config(msg) => write!(f, "Configuration error: {}", msg),
            PipelineError::Signal(msg) => write!(f, "Signal handler error: {}", msg),
        }
    }
}

impl std::error::Error for CaptureError {}
impl std::error::Error for DisplayError {}
impl std::error::Error for PipelineError {}

impl From<CaptureError> for PipelineError {
    fn from(err: CaptureError) -> Self {
        PipelineError::Capture(err)
    }
}

impl From<DisplayError> for PipelineError {
    fn from(err: DisplayError) -> Self {
        PipelineError::Display(err)
    }
}

impl From<ctrlc::Error> for PipelineError {
    fn from(err: ctrlc::Error) -> Self {
        PipelineError::Signal(err.to_string())
    }
}

impl From<serde_json::Error> for PipelineError {
    fn from(err: serde_json::Error) -> Self {
        PipelineError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(CaptureError::ReadFailure("timeout".into()).is_transient());
        assert!(CaptureError::Decode("bad marker".into()).is_transient());
        assert!(!CaptureError::DeviceUnavailable("gone".into()).is_transient());
    }

    #[test]
    fn test_display_wraps_source_message() {
        let err: PipelineError = DisplayError::UnsupportedPixelFormat("8 bpp".into()).into();
        assert_eq!(
            err.to_string(),
            "Display error: Unsupported pixel format: 8 bpp"
        );
    }
}
