// lib.rs      gifreel crate.
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! A library for encoding animated GIFs from RGBA frames.
//!
//! Each frame is reduced to its own palette with median cut quantization,
//! then LZW compressed.  The animation loops forever.
//!
//! ## Example
//! ```
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut enc = gifreel::Encoder::new(4, 1)?;
//! enc.add_frame(&[
//!     255, 0, 0, 255, 0, 255, 0, 255, 0, 0, 255, 255, 255, 255, 255, 255,
//! ])?;
//! enc.finish()?;
//! assert_eq!(&enc.output()[..6], b"GIF89a");
//! # Ok(())
//! # }
//! ```
#![forbid(unsafe_code)]

#[macro_use]
extern crate log;

pub mod block;
mod encode;
mod error;
pub mod lzw;
mod private;
pub mod quantize;

pub use crate::encode::BlockEnc;
pub use crate::error::{Error, Result};
pub use crate::private::{Blob, Encoder, MEDIA_TYPE};
