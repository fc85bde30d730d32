//! Audio buffer constants and source formats

use crate::{RayoError, Result};

/// Samples per channel in one mixer block
pub const MIXBUFFER_SAMPLES: usize = 4096;

/// Output rate every source is upsampled to
pub const OUTPUT_RATE: u32 = 44_100;

/// Source sample rate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleRate {
    Hz11025,
    Hz22050,
    Hz44100,
}

impl SampleRate {
    /// All rates, slowest first
    pub const ALL: [SampleRate; 3] =
        [SampleRate::Hz11025, SampleRate::Hz22050, SampleRate::Hz44100];

    /// Parse a rate in Hz
    ///
    /// # Errors
    ///
    /// Returns `UnsupportedSampleRate` for anything but 11025, 22050 or 44100.
    pub fn from_hz(hz: u32) -> Result<Self> {
        match hz {
            11_025 => Ok(SampleRate::Hz11025),
            22_050 => Ok(SampleRate::Hz22050),
            44_100 => Ok(SampleRate::Hz44100),
            other => Err(RayoError::UnsupportedSampleRate(other)),
        }
    }

    pub const fn hz(self) -> u32 {
        match self {
            SampleRate::Hz11025 => 11_025,
            SampleRate::Hz22050 => 22_050,
            SampleRate::Hz44100 => 44_100,
        }
    }

    /// How many output frames each source frame becomes
    pub const fn factor(self) -> usize {
        match self {
            SampleRate::Hz11025 => 4,
            SampleRate::Hz22050 => 2,
            SampleRate::Hz44100 => 1,
        }
    }
}

/// Interleaved channel layout of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channels {
    Mono,
    Stereo,
}

impl Channels {
    pub const fn count(self) -> usize {
        match self {
            Channels::Mono => 1,
            Channels::Stereo => 2,
        }
    }
}
