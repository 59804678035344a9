// private.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! Private module for top-level items
use crate::block::{
    Application, ColorTableConfig, Frame, GraphicControl, ImageData, ImageDesc,
    LocalColorTable, Preamble, Trailer,
};
use crate::encode::BlockEnc;
use crate::error::{Error, Result};
use crate::quantize::{quantize, IndexedFrame};
use pix::rgb::SRgba8;
use pix::Raster;
use std::convert::TryFrom;

/// Media type of encoded output
pub const MEDIA_TYPE: &str = "image/gif";

/// Default delay between frames, in milliseconds
const DEFAULT_DELAY_MS: u32 = 100;

/// Bytes per RGBA pixel
const RGBA: usize = 4;

/// Animated GIF encoder
///
/// Frames are quantized to a local palette of up to 256 colors each, and
/// the animation loops forever.  Output is kept in memory until the encoder
/// is dropped.
///
/// ## Encoding Example
/// ```
/// use gifreel::Encoder;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut enc = Encoder::new(2, 2)?.with_delay_ms(50);
/// let red = [255u8, 0, 0, 255].repeat(4);
/// let blue = [0u8, 0, 255, 255].repeat(4);
/// enc.add_frame(&red)?;
/// enc.add_frame(&blue)?;
/// enc.finish()?;
/// let blob = enc.blob();
/// assert_eq!(blob.media_type(), "image/gif");
/// assert_eq!(blob.as_bytes().last(), Some(&0x3B));
/// # Ok(())
/// # }
/// ```
pub struct Encoder {
    /// Screen width
    width: u16,
    /// Screen height
    height: u16,
    /// Delay between frames, in milliseconds
    delay_ms: u32,
    /// Preamble written latch
    preamble_written: bool,
    /// Trailer written latch
    finished: bool,
    /// Number of frames encoded
    n_frames: usize,
    /// Block encoder for output
    enc: BlockEnc<Vec<u8>>,
}

/// Encoded output tagged with its media type
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Blob {
    bytes: Vec<u8>,
}

impl Blob {
    /// Get the media type (`image/gif`)
    pub fn media_type(&self) -> &'static str {
        MEDIA_TYPE
    }

    /// Get the size in bytes
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Check if the blob is empty
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Get the bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Convert into bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

impl Encoder {
    /// Create a new encoder.
    ///
    /// Width and height must both be non-zero.
    pub fn new(width: u16, height: u16) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidRasterDimensions);
        }
        Ok(Encoder {
            width,
            height,
            delay_ms: DEFAULT_DELAY_MS,
            preamble_written: false,
            finished: false,
            n_frames: 0,
            enc: BlockEnc::new(Vec::new()),
        })
    }

    /// Set the delay between frames, in milliseconds (default 100).
    ///
    /// Delay is stored in hundredths of a second, rounded to nearest.  An
    /// explicit 0 is kept as 0, not replaced by the default.
    pub fn with_delay_ms(mut self, delay_ms: u32) -> Self {
        self.delay_ms = delay_ms;
        if u64::from(delay_ms) + 5 > u64::from(u16::MAX) * 10 + 9 {
            warn!("delay {} ms saturated to {} cs", delay_ms, u16::MAX);
        }
        self
    }

    /// Get the screen width
    pub fn width(&self) -> u16 {
        self.width
    }

    /// Get the screen height
    pub fn height(&self) -> u16 {
        self.height
    }

    /// Get the delay between frames, in milliseconds
    pub fn delay_ms(&self) -> u32 {
        self.delay_ms
    }

    /// Get the number of frames added
    pub fn frame_count(&self) -> usize {
        self.n_frames
    }

    /// Check whether the trailer has been written
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Get the number of pixels in one frame
    fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }

    /// Add a frame of RGBA pixels.
    ///
    /// The buffer must contain `width * height` pixels, 4 bytes each, in
    /// row-major order.  Alpha is ignored.
    pub fn add_frame(&mut self, rgba: &[u8]) -> Result<()> {
        self.check_open()?;
        if rgba.len() != self.pixel_count() * RGBA {
            return Err(Error::InvalidFrameDimensions);
        }
        self.encode_indexed(quantize(rgba))
    }

    /// Add a frame from an RGBA raster.
    ///
    /// Raster dimensions must match the encoder.
    pub fn add_raster(&mut self, raster: &Raster<SRgba8>) -> Result<()> {
        let width = u16::try_from(raster.width())
            .map_err(|_| Error::InvalidFrameDimensions)?;
        let height = u16::try_from(raster.height())
            .map_err(|_| Error::InvalidFrameDimensions)?;
        if width != self.width || height != self.height {
            return Err(Error::InvalidFrameDimensions);
        }
        self.add_frame(raster.as_u8_slice())
    }

    /// Add a frame which is already indexed.
    ///
    /// The frame must contain `width * height` indices.
    pub fn add_indexed_frame(&mut self, frame: IndexedFrame) -> Result<()> {
        self.check_open()?;
        if frame.indices().len() != self.pixel_count() {
            return Err(Error::InvalidFrameDimensions);
        }
        self.encode_indexed(frame)
    }

    /// Finish encoding by writing the trailer.
    ///
    /// If no frames were added, the output is an empty GIF.
    pub fn finish(&mut self) -> Result<()> {
        self.check_open()?;
        if !self.preamble_written {
            let preamble = Preamble::new(self.width, self.height);
            self.enc.encode_preamble(&preamble)?;
            self.preamble_written = true;
        }
        self.enc.encode(&Trailer::default().into())?;
        self.finished = true;
        debug!(
            "finished {} frames, {} bytes",
            self.n_frames,
            self.output().len()
        );
        Ok(())
    }

    /// Get the encoded output
    pub fn output(&self) -> &[u8] {
        self.enc.get_ref()
    }

    /// Convert into the encoded output
    pub fn into_output(self) -> Vec<u8> {
        self.enc.into_inner()
    }

    /// Get the encoded output as a [Blob](struct.Blob.html)
    pub fn blob(&self) -> Blob {
        Blob {
            bytes: self.output().to_vec(),
        }
    }

    /// Check that the trailer has not been written
    fn check_open(&self) -> Result<()> {
        if self.finished {
            Err(Error::InvalidBlockSequence)
        } else {
            Ok(())
        }
    }

    /// Encode an indexed frame, after the preamble if needed
    fn encode_indexed(&mut self, frame: IndexedFrame) -> Result<()> {
        let frame = self.make_frame(frame)?;
        let start = self.output().len();
        if !self.preamble_written {
            let mut preamble = Preamble::new(self.width, self.height);
            preamble.loop_count_ext = Some(Application::with_loop_count(0));
            self.enc.encode_preamble(&preamble)?;
            self.preamble_written = true;
        }
        self.enc.encode_frame(&frame)?;
        self.n_frames += 1;
        debug!(
            "frame {}: {} table entries, {} bytes",
            self.n_frames,
            frame.local_color_table.len(),
            self.output().len() - start
        );
        Ok(())
    }

    /// Make frame blocks from an indexed frame
    fn make_frame(&self, frame: IndexedFrame) -> Result<Frame> {
        let (palette, indices) = frame.into_parts();
        let tbl = ColorTableConfig::with_palette(&palette);
        let mut graphic_control_ext = GraphicControl::default();
        graphic_control_ext.set_delay_time_cs(delay_time_cs(self.delay_ms));
        let image_desc = ImageDesc::default()
            .with_width(self.width)
            .with_height(self.height)
            .with_color_table_config(&tbl);
        let local_color_table = LocalColorTable::with_palette(&palette, &tbl)?;
        let image_data = ImageData::with_indices(tbl.table_bits(), indices);
        Ok(Frame {
            graphic_control_ext,
            image_desc,
            local_color_table,
            image_data,
        })
    }
}

/// Convert milliseconds to centiseconds, rounded half up
fn delay_time_cs(delay_ms: u32) -> u16 {
    let cs = (u64::from(delay_ms) + 5) / 10;
    u16::try_from(cs).unwrap_or(u16::MAX)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn delay_rounding() {
        assert_eq!(delay_time_cs(0), 0);
        assert_eq!(delay_time_cs(4), 0);
        assert_eq!(delay_time_cs(5), 1);
        assert_eq!(delay_time_cs(100), 10);
        assert_eq!(delay_time_cs(33), 3);
        assert_eq!(delay_time_cs(655_350), u16::MAX);
        assert_eq!(delay_time_cs(u32::MAX), u16::MAX);
    }

    #[test]
    fn zero_dimensions() {
        assert!(matches!(
            Encoder::new(0, 5),
            Err(Error::InvalidRasterDimensions)
        ));
        assert!(matches!(
            Encoder::new(5, 0),
            Err(Error::InvalidRasterDimensions)
        ));
    }

    #[test]
    fn defaults() {
        let enc = Encoder::new(320, 240).unwrap();
        assert_eq!(enc.width(), 320);
        assert_eq!(enc.height(), 240);
        assert_eq!(enc.delay_ms(), 100);
        assert_eq!(enc.frame_count(), 0);
        assert!(!enc.is_finished());
        assert!(enc.output().is_empty());
        let enc = enc.with_delay_ms(50);
        assert_eq!(enc.delay_ms(), 50);
    }

    #[test]
    fn zero_delay_kept() {
        let mut enc = Encoder::new(1, 1).unwrap().with_delay_ms(0);
        assert_eq!(enc.delay_ms(), 0);
        enc.add_frame(&[5, 6, 7, 255]).unwrap();
        // graphic control follows header, screen desc and loop extension
        assert_eq!(&enc.output()[32..38], [0x21, 0xF9, 0x04, 0x00, 0, 0]);
    }

    #[test]
    fn bad_length_writes_nothing() {
        let mut enc = Encoder::new(2, 2).unwrap();
        assert!(matches!(
            enc.add_frame(&[0; 15]),
            Err(Error::InvalidFrameDimensions)
        ));
        assert!(enc.output().is_empty());
        assert_eq!(enc.frame_count(), 0);
    }
}
