use std::fmt;
use std::io;

/// Everything that can stop an emulator from being built.
///
/// Once a [`crate::Nes`] exists, nothing it does can fail: illegal opcodes,
/// sprite overflow and interrupt races are modeled hardware behavior.
#[derive(Debug)]
pub enum Error {
    /// Audio sample rate below 11050 Hz
    SampleRate(u32),
    /// Audio bit depth other than 8 or 16
    BitDepth(u32),
    /// Malformed iNES image
    InvalidRom(&'static str),
    /// iNES mapper number without an implementation
    UnsupportedMapper(u8),
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SampleRate(rate) => {
                write!(f, "audio sample rate must be >= 11050 (got {})", rate)
            }
            Error::BitDepth(bits) => write!(f, "audio bit depth must be 8 or 16 (got {})", bits),
            Error::InvalidRom(reason) => write!(f, "invalid iNES image: {}", reason),
            Error::UnsupportedMapper(n) => write!(f, "unsupported mapper: {}", n),
            Error::Io(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
