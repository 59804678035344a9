// block.rs
//
// Copyright (c) 2019-2023  Douglas Lau
//
//! GIF blocks written by the encoder
use crate::error::{Error, Result};
use crate::quantize::Palette;

/// Number of channels in a color table entry
const CHANNELS: usize = 3;

/// Color table existence flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorTableExistence {
    Absent,
    Present,
}

/// Color table configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTableConfig {
    existence: ColorTableExistence,
    table_len: usize, // must be between 4...256
}

impl Default for ColorTableConfig {
    fn default() -> Self {
        let existence = ColorTableExistence::Absent;
        let table_len = 4;
        ColorTableConfig {
            existence,
            table_len,
        }
    }
}

impl ColorTableConfig {
    /// Minimum color table length
    const MIN_LEN: usize = 4;

    /// Maximum color table length
    const MAX_LEN: usize = 256;

    /// Create a color table config.
    ///
    /// The table length is rounded up to a power of two between 4 and 256.
    pub fn new(existence: ColorTableExistence, palette_len: usize) -> Self {
        let table_len = palette_len
            .max(Self::MIN_LEN)
            .next_power_of_two()
            .min(Self::MAX_LEN);
        ColorTableConfig {
            existence,
            table_len,
        }
    }

    /// Create a present color table config for a palette
    pub fn with_palette(palette: &Palette) -> Self {
        Self::new(ColorTableExistence::Present, palette.len())
    }

    pub fn existence(&self) -> ColorTableExistence {
        self.existence
    }

    /// Get the number of table entries (0 if absent)
    pub fn len(&self) -> usize {
        match self.existence {
            ColorTableExistence::Absent => 0,
            ColorTableExistence::Present => self.table_len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the number of bits needed for a table index
    pub fn table_bits(&self) -> u8 {
        self.table_len.trailing_zeros() as u8
    }

    /// Get the size field for packed flags (table bits - 1)
    fn len_bits(&self) -> u8 {
        self.table_bits() - 1
    }

    /// Get the table size in bytes (0 if absent)
    pub fn size_bytes(&self) -> usize {
        self.len() * CHANNELS
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum BlockCode {
    Extension_,
    ImageDesc_,
    Trailer_,
}

impl BlockCode {
    pub fn signature(self) -> &'static [u8] {
        use self::BlockCode::*;
        match self {
            ImageDesc_ => b",", // (0x2C) Image separator
            Extension_ => b"!", // (0x21) Extension introducer
            Trailer_ => b";",   // (0x3B) GIF trailer
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(crate) enum ExtensionCode {
    GraphicControl_,
    Application_,
}

impl From<ExtensionCode> for u8 {
    fn from(t: ExtensionCode) -> Self {
        use self::ExtensionCode::*;
        match t {
            GraphicControl_ => 0xF9,
            Application_ => 0xFF,
        }
    }
}

/// Header block (signature and version)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    version: [u8; 3],
}

impl Default for Header {
    fn default() -> Self {
        Self::with_version(*b"89a")
    }
}

impl Header {
    pub fn with_version(version: [u8; 3]) -> Self {
        Header { version }
    }
    pub fn version(&self) -> [u8; 3] {
        self.version
    }
}

/// Logical screen descriptor block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LogicalScreenDesc {
    screen_width: u16,
    screen_height: u16,
    flags: u8,
    background_color_idx: u8, // index into global color table
    pixel_aspect_ratio: u8,
}

impl LogicalScreenDesc {
    const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;
    const COLOR_RESOLUTION: u8 = 0b0111_0000;
    const COLOR_TABLE_SIZE: u8 = 0b0000_0111;

    pub fn with_screen_width(mut self, screen_width: u16) -> Self {
        self.screen_width = screen_width;
        self
    }
    pub fn screen_width(&self) -> u16 {
        self.screen_width
    }
    pub fn with_screen_height(mut self, screen_height: u16) -> Self {
        self.screen_height = screen_height;
        self
    }
    pub fn screen_height(&self) -> u16 {
        self.screen_height
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    /// Set the global color table config.
    ///
    /// An absent table leaves all flags clear.
    pub fn with_color_table_config(mut self, tbl: &ColorTableConfig) -> Self {
        self.flags = match tbl.existence() {
            ColorTableExistence::Absent => 0,
            ColorTableExistence::Present => {
                let sz = tbl.len_bits() & Self::COLOR_TABLE_SIZE;
                Self::COLOR_TABLE_PRESENT
                    | ((sz << 4) & Self::COLOR_RESOLUTION)
                    | sz
            }
        };
        self
    }
    pub fn background_color_idx(&self) -> u8 {
        self.background_color_idx
    }
    pub fn pixel_aspect_ratio(&self) -> u8 {
        self.pixel_aspect_ratio
    }
}

/// Application extension block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Application {
    app_data: Vec<Vec<u8>>, // sequence of sub-blocks
}

impl Application {
    /// Application ID / authentication code for looping
    const LOOPING_ID: &'static [u8] = b"NETSCAPE2.0";

    /// Create a looping extension (zero loops forever)
    pub fn with_loop_count(loop_count: u16) -> Self {
        let mut app_data = vec![];
        app_data.push(Self::LOOPING_ID.to_vec());
        let mut v = vec![1];
        v.extend_from_slice(&loop_count.to_le_bytes());
        app_data.push(v);
        Application { app_data }
    }
    pub fn app_data(&self) -> &[Vec<u8>] {
        &self.app_data
    }
    pub fn loop_count(&self) -> Option<u16> {
        let d = &self.app_data;
        let exists = d.len() == 2 &&        // 2 sub-blocks
            d[0] == Self::LOOPING_ID &&     // app ID / auth code
            d[1].len() == 3 &&              // app data sub-block length
            d[1][0] == 1; // sub-block ID
        if exists {
            // Number of times to loop animation (zero means loop forever)
            Some(u16::from_le_bytes([d[1][1], d[1][2]]))
        } else {
            None
        }
    }
}

/// Graphic control extension block
///
/// No disposal method, no user input and no transparent color.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GraphicControl {
    flags: u8,
    delay_time_cs: u16, // delay in centiseconds (hundredths of a second)
    transparent_color_idx: u8,
}

impl GraphicControl {
    pub fn flags(&self) -> u8 {
        self.flags
    }
    pub fn delay_time_cs(&self) -> u16 {
        self.delay_time_cs
    }
    pub fn set_delay_time_cs(&mut self, delay_time_cs: u16) {
        self.delay_time_cs = delay_time_cs;
    }
    pub fn transparent_color_idx(&self) -> u8 {
        self.transparent_color_idx
    }
}

/// Image descriptor block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ImageDesc {
    left: u16,
    top: u16,
    width: u16,
    height: u16,
    flags: u8,
}

impl ImageDesc {
    const COLOR_TABLE_PRESENT: u8 = 0b1000_0000;
    const COLOR_TABLE_SIZE: u8 = 0b0000_0111;

    pub fn left(&self) -> u16 {
        self.left
    }
    pub fn top(&self) -> u16 {
        self.top
    }
    pub fn with_width(mut self, width: u16) -> Self {
        self.width = width;
        self
    }
    pub fn width(&self) -> u16 {
        self.width
    }
    pub fn with_height(mut self, height: u16) -> Self {
        self.height = height;
        self
    }
    pub fn height(&self) -> u16 {
        self.height
    }
    pub fn flags(&self) -> u8 {
        self.flags
    }
    /// Set the local color table config
    pub fn with_color_table_config(mut self, tbl: &ColorTableConfig) -> Self {
        self.flags = match tbl.existence() {
            ColorTableExistence::Absent => 0,
            ColorTableExistence::Present => {
                Self::COLOR_TABLE_PRESENT
                    | (tbl.len_bits() & Self::COLOR_TABLE_SIZE)
            }
        };
        self
    }
}

/// Local color table block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalColorTable {
    colors: Vec<u8>,
}

impl LocalColorTable {
    /// Create a color table from a palette.
    ///
    /// Entries past the end of the palette are padded with black.
    pub fn with_palette(palette: &Palette, tbl: &ColorTableConfig) -> Result<Self> {
        if palette.len() > tbl.len() {
            return Err(Error::TooManyColors);
        }
        let mut colors = Vec::with_capacity(tbl.size_bytes());
        for clr in palette.colors() {
            colors.extend_from_slice(clr);
        }
        colors.resize(tbl.size_bytes(), 0);
        Ok(LocalColorTable { colors })
    }
    pub fn len(&self) -> usize {
        self.colors.len() / CHANNELS
    }
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
    pub fn colors(&self) -> &[u8] {
        &self.colors
    }
}

/// Image data block (uncompressed color indices)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageData {
    min_code_size: u8,
    data: Vec<u8>,
}

impl ImageData {
    /// Create image data from color indices
    pub fn with_indices(min_code_size: u8, data: Vec<u8>) -> Self {
        ImageData {
            min_code_size,
            data,
        }
    }
    /// Get the LZW minimum code size (2 or more)
    pub fn min_code_size(&self) -> u8 {
        self.min_code_size.max(2)
    }
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

/// Trailer block
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Trailer {}

/// One block of a GIF file
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Header(Header),
    LogicalScreenDesc(LogicalScreenDesc),
    GraphicControl(GraphicControl),
    Application(Application),
    ImageDesc(ImageDesc),
    LocalColorTable(LocalColorTable),
    ImageData(ImageData),
    Trailer(Trailer),
}

impl From<Header> for Block {
    fn from(b: Header) -> Self {
        Block::Header(b)
    }
}

impl From<LogicalScreenDesc> for Block {
    fn from(b: LogicalScreenDesc) -> Self {
        Block::LogicalScreenDesc(b)
    }
}

impl From<GraphicControl> for Block {
    fn from(b: GraphicControl) -> Self {
        Block::GraphicControl(b)
    }
}

impl From<Application> for Block {
    fn from(b: Application) -> Self {
        Block::Application(b)
    }
}

impl From<ImageDesc> for Block {
    fn from(b: ImageDesc) -> Self {
        Block::ImageDesc(b)
    }
}

impl From<LocalColorTable> for Block {
    fn from(b: LocalColorTable) -> Self {
        Block::LocalColorTable(b)
    }
}

impl From<ImageData> for Block {
    fn from(b: ImageData) -> Self {
        Block::ImageData(b)
    }
}

impl From<Trailer> for Block {
    fn from(b: Trailer) -> Self {
        Block::Trailer(b)
    }
}

/// Blocks at the beginning of a file, before any frame blocks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Preamble {
    pub header: Header,
    pub logical_screen_desc: LogicalScreenDesc,
    pub loop_count_ext: Option<Application>,
}

impl Preamble {
    /// Create a preamble with no global color table
    pub fn new(width: u16, height: u16) -> Self {
        let logical_screen_desc = LogicalScreenDesc::default()
            .with_screen_width(width)
            .with_screen_height(height)
            .with_color_table_config(&ColorTableConfig::default());
        Preamble {
            header: Header::default(),
            logical_screen_desc,
            loop_count_ext: None,
        }
    }
}

/// Blocks for one frame of an animation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub graphic_control_ext: GraphicControl,
    pub image_desc: ImageDesc,
    pub local_color_table: LocalColorTable,
    pub image_data: ImageData,
}

#[cfg(test)]
mod test {
    use super::*;

    fn table_bits(palette_len: usize) -> u8 {
        ColorTableConfig::new(ColorTableExistence::Present, palette_len)
            .table_bits()
    }

    #[test]
    fn block_size() {
        assert!(std::mem::size_of::<Block>() <= 40);
    }

    #[test]
    fn color_table_len() {
        assert_eq!(table_bits(0), 2);
        assert_eq!(table_bits(1), 2); // 1-4
        assert_eq!(table_bits(4), 2);
        assert_eq!(table_bits(5), 3); // 5-8
        assert_eq!(table_bits(16), 4); // 9-16
        assert_eq!(table_bits(17), 5); // 17-32
        assert_eq!(table_bits(64), 6); // 33-64
        assert_eq!(table_bits(65), 7); // 65-128
        assert_eq!(table_bits(130), 8); // 129-256
        assert_eq!(table_bits(256), 8);
        let t = ColorTableConfig::new(ColorTableExistence::Present, 300);
        assert_eq!(t.len(), 256);
        let t = ColorTableConfig::default();
        assert_eq!(t.len(), 0);
        assert_eq!(t.size_bytes(), 0);
    }

    #[test]
    fn loop_count() {
        let b = Application::default();
        assert_eq!(b.loop_count(), None);
        let b = Application::with_loop_count(0);
        assert_eq!(b.loop_count(), Some(0));
        let b = Application::with_loop_count(260);
        assert_eq!(b.app_data()[1], [1, 4, 1]);
        assert_eq!(b.loop_count(), Some(260));
    }

    #[test]
    fn image_desc_flags() {
        let p = Palette::with_colors(vec![[0, 0, 0]; 3]).unwrap();
        let d = ImageDesc::default()
            .with_color_table_config(&ColorTableConfig::with_palette(&p));
        assert_eq!(d.flags(), 0x81);
        let p = Palette::with_colors(vec![[0, 0, 0]; 200]).unwrap();
        let d = ImageDesc::default()
            .with_color_table_config(&ColorTableConfig::with_palette(&p));
        assert_eq!(d.flags(), 0x87);
    }

    #[test]
    fn screen_desc_flags() {
        let d = LogicalScreenDesc::default()
            .with_color_table_config(&ColorTableConfig::default());
        assert_eq!(d.flags(), 0);
        let tbl = ColorTableConfig::new(ColorTableExistence::Present, 256);
        let d = LogicalScreenDesc::default().with_color_table_config(&tbl);
        assert_eq!(d.flags(), 0xF7);
    }

    #[test]
    fn padded_table() {
        let p = Palette::with_colors(vec![[1, 2, 3], [4, 5, 6], [7, 8, 9]])
            .unwrap();
        let tbl = ColorTableConfig::with_palette(&p);
        let t = LocalColorTable::with_palette(&p, &tbl).unwrap();
        assert_eq!(t.len(), 4);
        assert_eq!(t.colors(), &[1, 2, 3, 4, 5, 6, 7, 8, 9, 0, 0, 0]);
        let small = ColorTableConfig::new(ColorTableExistence::Present, 2);
        let p = Palette::with_colors(vec![[0, 0, 0]; 5]).unwrap();
        assert!(matches!(
            LocalColorTable::with_palette(&p, &small),
            Err(Error::TooManyColors)
        ));
    }
}
