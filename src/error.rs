// error.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
use std::fmt;
use std::io;

/// Errors encountered while encoding
#[derive(Debug)]
pub enum Error {
    /// A wrapped I/O error.
    Io(io::Error),
    /// Encoder width or height is zero.
    InvalidRasterDimensions,
    /// Frame buffer does not match the encoder width and height.
    InvalidFrameDimensions,
    /// Operation not allowed in the current encoder state, such as adding a
    /// frame after [finish](struct.Encoder.html#method.finish).
    InvalidBlockSequence,
    /// Compressed LZW data invalid or corrupt
    InvalidLzwData,
    /// Color index not less than the palette length.
    InvalidColorIndex,
    /// Palette has more than 256 colors.
    TooManyColors,
}

/// Gifreel result type
pub type Result<T> = std::result::Result<T, Error>;

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(err) => err.fmt(fmt),
            _ => fmt::Debug::fmt(self, fmt),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(err)
    }
}
