// encode.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! Block encoding
use crate::block::*;
use crate::error::Result;
use crate::lzw::Compressor;
use std::io::{self, Write};

/// Block encoder
///
/// Writes GIF [Block]s, in the order given, to any `Write`.
///
/// [Block]: block/enum.Block.html
pub struct BlockEnc<W: Write> {
    /// Writer for output data
    writer: W,
}

impl<W: Write> BlockEnc<W> {
    /// Create a new block encoder
    pub fn new(writer: W) -> Self {
        BlockEnc { writer }
    }

    /// Get a reference to the writer
    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    /// Get the writer back
    pub fn into_inner(self) -> W {
        self.writer
    }

    /// Encode one block
    pub fn encode(&mut self, block: &Block) -> Result<()> {
        use crate::block::Block::*;
        let w = &mut self.writer;
        match block {
            Header(b) => b.format(w),
            LogicalScreenDesc(b) => b.format(w),
            GraphicControl(b) => b.format(w),
            Application(b) => b.format(w),
            ImageDesc(b) => b.format(w),
            LocalColorTable(b) => b.format(w),
            ImageData(b) => b.format(w),
            Trailer(b) => b.format(w),
        }
    }

    /// Encode preamble blocks
    pub fn encode_preamble(&mut self, preamble: &Preamble) -> Result<()> {
        let w = &mut self.writer;
        preamble.header.format(w)?;
        preamble.logical_screen_desc.format(w)?;
        if let Some(ext) = &preamble.loop_count_ext {
            ext.format(w)?;
        }
        Ok(())
    }

    /// Encode the blocks of one frame
    pub fn encode_frame(&mut self, frame: &Frame) -> Result<()> {
        let w = &mut self.writer;
        frame.graphic_control_ext.format(w)?;
        frame.image_desc.format(w)?;
        frame.local_color_table.format(w)?;
        frame.image_data.format(w)
    }
}

impl Header {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(b"GIF")?;
        w.write_all(&self.version())?;
        Ok(())
    }
}

impl LogicalScreenDesc {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut buf = Vec::with_capacity(7);
        buf.extend_from_slice(&self.screen_width().to_le_bytes());
        buf.extend_from_slice(&self.screen_height().to_le_bytes());
        buf.push(self.flags());
        buf.push(self.background_color_idx());
        buf.push(self.pixel_aspect_ratio());
        w.write_all(&buf)?;
        Ok(())
    }
}

impl GraphicControl {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BlockCode::Extension_.signature())?;
        let mut buf = Vec::with_capacity(7);
        buf.push(ExtensionCode::GraphicControl_.into());
        buf.push(4); // block size
        buf.push(self.flags());
        buf.extend_from_slice(&self.delay_time_cs().to_le_bytes());
        buf.push(self.transparent_color_idx());
        buf.push(0); // block size
        w.write_all(&buf)?;
        Ok(())
    }
}

impl Application {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BlockCode::Extension_.signature())?;
        w.write_all(&[ExtensionCode::Application_.into()])?;
        for c in self.app_data() {
            assert!(c.len() < 256);
            let len = c.len() as u8;
            w.write_all(&[len])?; // block size
            w.write_all(c)?;
        }
        w.write_all(&[0])?; // block size
        Ok(())
    }
}

impl ImageDesc {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BlockCode::ImageDesc_.signature())?;
        let mut buf = Vec::with_capacity(9);
        buf.extend_from_slice(&self.left().to_le_bytes());
        buf.extend_from_slice(&self.top().to_le_bytes());
        buf.extend_from_slice(&self.width().to_le_bytes());
        buf.extend_from_slice(&self.height().to_le_bytes());
        buf.push(self.flags());
        w.write_all(&buf)?;
        Ok(())
    }
}

impl LocalColorTable {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(self.colors())?;
        Ok(())
    }
}

impl ImageData {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        let mut compressor = Compressor::new(self.min_code_size());
        let mut buffer = Vec::with_capacity(self.data().len() / 2);
        compressor.compress(self.data(), &mut buffer)?;
        w.write_all(&[compressor.min_code_bits()])?;
        let mut bw = BlockWriter::new(w);
        bw.write_all(&buffer)?;
        bw.flush()?;
        w.write_all(&[0])?; // block size
        Ok(())
    }
}

impl Trailer {
    fn format<W: Write>(&self, w: &mut W) -> Result<()> {
        w.write_all(BlockCode::Trailer_.signature())?;
        Ok(())
    }
}

/// Writer for data sub-blocks (up to 255 bytes each)
struct BlockWriter<'a, W: Write> {
    writer: &'a mut W,
    buf: Vec<u8>,
}

impl<'a, W: Write> BlockWriter<'a, W> {
    fn new(writer: &'a mut W) -> Self {
        let buf = Vec::with_capacity(256);
        BlockWriter { writer, buf }
    }
}

impl<'a, W: Write> Write for BlockWriter<'a, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let remaining = 0xFF - self.buf.len();
        let consumed = remaining.min(buf.len());
        self.buf.extend_from_slice(&buf[..consumed]);
        if self.buf.len() == 0xFF {
            self.writer.write_all(&[0xFF])?;
            self.writer.write_all(&self.buf)?;
            self.buf.clear();
        }
        Ok(consumed)
    }

    fn flush(&mut self) -> io::Result<()> {
        let len = self.buf.len();
        if len > 0 {
            self.writer.write_all(&[len as u8])?;
            self.writer.write_all(&self.buf[..len])?;
            self.buf.clear();
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::quantize::Palette;

    fn encode(block: Block) -> Vec<u8> {
        let mut enc = BlockEnc::new(vec![]);
        enc.encode(&block).unwrap();
        enc.into_inner()
    }

    #[test]
    fn header() {
        assert_eq!(encode(Header::default().into()), b"GIF89a");
    }

    #[test]
    fn screen_desc() {
        let b = LogicalScreenDesc::default()
            .with_screen_width(320)
            .with_screen_height(240);
        assert_eq!(encode(b.into()), [0x40, 0x01, 0xF0, 0x00, 0, 0, 0]);
    }

    #[test]
    fn looping() {
        let b = encode(Application::with_loop_count(0).into());
        assert_eq!(&b[..3], [0x21, 0xFF, 0x0B]);
        assert_eq!(&b[3..14], b"NETSCAPE2.0");
        assert_eq!(&b[14..], [0x03, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn graphic_control() {
        let mut b = GraphicControl::default();
        b.set_delay_time_cs(300);
        assert_eq!(
            encode(b.into()),
            [0x21, 0xF9, 0x04, 0x00, 0x2C, 0x01, 0x00, 0x00]
        );
    }

    #[test]
    fn image_desc() {
        let p = Palette::with_colors(vec![[0, 0, 0]; 9]).unwrap();
        let b = ImageDesc::default()
            .with_width(2)
            .with_height(258)
            .with_color_table_config(&ColorTableConfig::with_palette(&p));
        assert_eq!(
            encode(b.into()),
            [0x2C, 0, 0, 0, 0, 0x02, 0x00, 0x02, 0x01, 0x83]
        );
    }

    #[test]
    fn image_data() {
        let b = ImageData::with_indices(2, vec![0; 4]);
        assert_eq!(encode(b.into()), [0x02, 0x02, 0x84, 0x51, 0x00]);
    }

    #[test]
    fn trailer() {
        assert_eq!(encode(Trailer::default().into()), [0x3B]);
    }

    #[test]
    fn sub_blocks() {
        let mut out = vec![];
        let mut bw = BlockWriter::new(&mut out);
        bw.write_all(&[7; 600]).unwrap();
        bw.flush().unwrap();
        assert_eq!(out.len(), 600 + 3);
        assert_eq!(out[0], 0xFF);
        assert_eq!(out[256], 0xFF);
        assert_eq!(out[512], 90);
    }

    #[test]
    fn sub_blocks_exact() {
        let mut out = vec![];
        let mut bw = BlockWriter::new(&mut out);
        bw.write_all(&[1; 255]).unwrap();
        bw.flush().unwrap();
        assert_eq!(out.len(), 256);
        assert_eq!(out[0], 0xFF);
    }
}
