// quantize.rs
//
// Copyright (c) 2023  Douglas Lau
//
//! Median cut color quantization
use crate::error::{Error, Result};

/// Maximum number of colors in a palette
pub const MAX_COLORS: usize = 256;

/// Maximum number of pixels sampled while building a palette
const MAX_SAMPLES: usize = 10_000;

/// Bytes per RGBA pixel
const RGBA: usize = 4;

/// Number of color channels used for quantizing (alpha is ignored)
const CHANNELS: usize = 3;

/// Red, green, blue color sample
pub type Rgb = [u8; CHANNELS];

/// Color palette for one frame
///
/// A palette always has between 1 and 256 colors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<Rgb>,
}

/// A frame of color indices with its palette
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IndexedFrame {
    palette: Palette,
    indices: Vec<u8>,
}

impl Palette {
    /// Create a palette from a list of colors.
    ///
    /// An empty list makes a palette with one black entry.
    pub fn with_colors(colors: Vec<Rgb>) -> Result<Self> {
        if colors.len() > MAX_COLORS {
            return Err(Error::TooManyColors);
        }
        let colors = if colors.is_empty() {
            vec![[0; CHANNELS]]
        } else {
            colors
        };
        Ok(Palette { colors })
    }

    /// Get the number of colors
    pub fn len(&self) -> usize {
        self.colors.len()
    }

    /// Check if the palette is empty (never true)
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Get a slice of all colors
    pub fn colors(&self) -> &[Rgb] {
        &self.colors
    }

    /// Get one color entry
    pub fn entry(&self, idx: usize) -> Option<Rgb> {
        self.colors.get(idx).copied()
    }

    /// Find the index of the closest color.
    ///
    /// Distance is squared euclidean in RGB space; ties go to the lowest
    /// index.
    pub fn nearest(&self, rgb: Rgb) -> u8 {
        let mut best = 0;
        let mut best_dist = u32::MAX;
        for (i, clr) in self.colors.iter().enumerate() {
            let dist = distance_sq(rgb, *clr);
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best as u8
    }
}

/// Squared distance between two colors
fn distance_sq(a: Rgb, b: Rgb) -> u32 {
    a.iter()
        .zip(b.iter())
        .map(|(a, b)| {
            let d = i32::from(*a) - i32::from(*b);
            (d * d) as u32
        })
        .sum()
}

impl IndexedFrame {
    /// Create an indexed frame.
    ///
    /// Every index must be less than the palette length.
    pub fn new(palette: Palette, indices: Vec<u8>) -> Result<Self> {
        let len = palette.len();
        if indices.iter().any(|idx| usize::from(*idx) >= len) {
            return Err(Error::InvalidColorIndex);
        }
        Ok(IndexedFrame { palette, indices })
    }

    /// Get the palette
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Get the color indices
    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Split into palette and indices
    pub fn into_parts(self) -> (Palette, Vec<u8>) {
        (self.palette, self.indices)
    }
}

/// Quantize a buffer of RGBA pixels.
///
/// Builds a palette of up to 256 colors with median cut, then maps every
/// pixel to its nearest palette color.  Alpha is ignored, as is any trailing
/// partial pixel.
pub fn quantize(rgba: &[u8]) -> IndexedFrame {
    let palette = Palette {
        colors: median_cut(sample(rgba)),
    };
    let mut indices = Vec::with_capacity(rgba.len() / RGBA);
    let mut last: Option<(Rgb, u8)> = None;
    for px in rgba.chunks_exact(RGBA) {
        let rgb = [px[0], px[1], px[2]];
        let idx = match last {
            Some((clr, idx)) if clr == rgb => idx,
            _ => palette.nearest(rgb),
        };
        last = Some((rgb, idx));
        indices.push(idx);
    }
    IndexedFrame { palette, indices }
}

/// Sample colors from RGBA pixels.
///
/// Large frames are subsampled at an even pixel interval.
fn sample(rgba: &[u8]) -> Vec<Rgb> {
    let n_pixels = rgba.len() / RGBA;
    let step = if n_pixels > MAX_SAMPLES {
        (n_pixels + MAX_SAMPLES - 1) / MAX_SAMPLES
    } else {
        1
    };
    rgba.chunks_exact(RGBA)
        .step_by(step)
        .map(|px| [px[0], px[1], px[2]])
        .collect()
}

/// Reduce color samples to at most 256 representative colors
fn median_cut(samples: Vec<Rgb>) -> Vec<Rgb> {
    if samples.is_empty() {
        return vec![[0; CHANNELS]];
    }
    let mut buckets = vec![samples];
    while buckets.len() < MAX_COLORS {
        let (idx, ch) = match widest_bucket(&buckets) {
            Some(w) => w,
            None => {
                trace!("median cut stopped at {} colors", buckets.len());
                break;
            }
        };
        let bucket = &mut buckets[idx];
        bucket.sort_by_key(|clr| clr[ch]);
        let upper = bucket.split_off(bucket.len() / 2);
        buckets.push(upper);
    }
    buckets.iter().map(|b| mean(b)).collect()
}

/// Find the bucket and channel with the widest range of values.
///
/// Only buckets with at least two colors are eligible; `None` when no
/// eligible bucket has a positive range.
fn widest_bucket(buckets: &[Vec<Rgb>]) -> Option<(usize, usize)> {
    let mut best = None;
    let mut best_range = 0;
    for (idx, bucket) in buckets.iter().enumerate() {
        if bucket.len() < 2 {
            continue;
        }
        for ch in 0..CHANNELS {
            let range = channel_range(bucket, ch);
            if range > best_range {
                best_range = range;
                best = Some((idx, ch));
            }
        }
    }
    best
}

/// Get the range of one channel within a bucket
fn channel_range(bucket: &[Rgb], ch: usize) -> u8 {
    let (min, max) = bucket.iter().fold((u8::MAX, u8::MIN), |(min, max), clr| {
        (min.min(clr[ch]), max.max(clr[ch]))
    });
    max.saturating_sub(min)
}

/// Average color of a bucket, rounded to nearest
fn mean(bucket: &[Rgb]) -> Rgb {
    let n = bucket.len() as u64;
    if n == 0 {
        return [0; CHANNELS];
    }
    let mut sum = [0u64; CHANNELS];
    for clr in bucket {
        for ch in 0..CHANNELS {
            sum[ch] += u64::from(clr[ch]);
        }
    }
    let mut rgb = [0; CHANNELS];
    for ch in 0..CHANNELS {
        rgb[ch] = ((2 * sum[ch] + n) / (2 * n)) as u8;
    }
    rgb
}
