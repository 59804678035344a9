// lzw.rs
//
// Copyright (c) 2020-2023  Douglas Lau
//
//! Lempel-Ziv-Welch compression for GIF image data
use crate::error::{Error, Result};
use std::cmp::Ordering;
use std::ops::AddAssign;

/// Code Bits
#[derive(Clone, Copy, Debug, PartialEq)]
struct Bits(u8);

impl From<u8> for Bits {
    fn from(bits: u8) -> Self {
        Bits(bits.min(Self::MAX.0))
    }
}

impl From<Bits> for u8 {
    fn from(bits: Bits) -> Self {
        bits.0
    }
}

impl AddAssign<u8> for Bits {
    fn add_assign(&mut self, rhs: u8) {
        self.0 = (self.0 + rhs).min(Self::MAX.0)
    }
}

impl Bits {
    /// Maximum code bits allowed for GIF
    const MAX: Self = Bits(12);

    /// Get the number of entries
    fn entries(self) -> u16 {
        1 << (self.0 as u16)
    }

    /// Get the bit mask
    fn mask(self) -> u32 {
        (1 << (self.0 as u32)) - 1
    }
}

/// Code type
type Code = u16;

/// Node for code dictionary
trait Node {
    /// Create a new node
    fn new(next: Option<Code>, byte: u8) -> Self;

    /// Get the byte value
    fn byte(self) -> u8;
}

/// Node for Compressor
///
/// Children of a node are kept in a binary tree ordered by byte value:
/// `next` points to the first child, `left` and `right` to its siblings.
#[derive(Clone, Copy, Debug)]
struct CNode {
    /// Next node code
    next: Option<Code>,
    /// Left node code
    left: Option<Code>,
    /// Right node code
    right: Option<Code>,
    /// Byte value
    byte: u8,
}

/// Node for Decompressor
#[derive(Clone, Copy, Debug)]
struct DNode {
    /// Prefix node code
    next: Option<Code>,
    /// Byte value
    byte: u8,
}

/// Code dictionary trie
#[derive(Debug)]
struct Trie<N: Node> {
    /// Table of codes
    table: Vec<N>,
    /// Minimum code bits
    min_code_bits: u8,
}

/// Link where a missing node would be attached
type Vacancy = (Code, Ordering);

/// LZW Data Compressor
///
/// Codes are packed least-significant bit first.  The dictionary is reset
/// with a clear code once all 4096 codes have been assigned.
pub struct Compressor {
    /// Code dictionary
    trie: Trie<CNode>,
    /// Minimum code bits
    min_code_bits: u8,
    /// Current code bits
    code_bits: Bits,
    /// Current code
    code: u32,
    /// Number of bits in current code
    n_bits: u8,
}

/// LZW Data Decompressor
///
/// Used for verifying compressed image data; stops at the end code.
#[derive(Debug)]
pub struct Decompressor {
    /// Code dictionary
    trie: Trie<DNode>,
    /// Minimum code bits
    min_code_bits: u8,
    /// Current code bits
    code_bits: Bits,
    /// Last code
    last: Option<Code>,
    /// Current code
    code: u32,
    /// Number of bits in current code
    n_bits: u8,
    /// End code found
    done: bool,
}

impl Node for CNode {
    fn new(next: Option<Code>, byte: u8) -> Self {
        CNode {
            next,
            left: None,
            right: None,
            byte,
        }
    }

    fn byte(self) -> u8 {
        self.byte
    }
}

impl Node for DNode {
    fn new(next: Option<Code>, byte: u8) -> Self {
        DNode { next, byte }
    }

    fn byte(self) -> u8 {
        self.byte
    }
}

impl CNode {
    /// Get a link code
    fn link(&self, ordering: Ordering) -> Option<Code> {
        match ordering {
            Ordering::Less => self.left,
            Ordering::Equal => self.next,
            Ordering::Greater => self.right,
        }
    }

    /// Set a link code
    fn set_link(&mut self, ordering: Ordering, code: Code) {
        match ordering {
            Ordering::Less => self.left = Some(code),
            Ordering::Equal => self.next = Some(code),
            Ordering::Greater => self.right = Some(code),
        }
    }
}

impl<N: Node> Trie<N> {
    /// Create a new code dictionary
    fn new(min_code_bits: u8) -> Self {
        let mut trie = Trie {
            table: Vec::with_capacity(usize::from(Bits::MAX.entries()) + 1),
            min_code_bits,
        };
        trie.reset();
        trie
    }

    /// Get the clear code
    fn clear_code(&self) -> Code {
        1 << self.min_code_bits
    }

    /// Get the end code
    fn end_code(&self) -> Code {
        self.clear_code() + 1
    }

    /// Get the next available code
    fn next_code(&self) -> Code {
        self.table.len() as Code
    }

    /// Reset the dictionary
    fn reset(&mut self) {
        self.table.clear();
        for byte in 0..self.clear_code() {
            self.push_node(None, byte as u8);
        }
        self.push_node(None, 0); // clear code
        self.push_node(None, 0); // end code
    }

    /// Push a node into the dictionary
    fn push_node(&mut self, next: Option<Code>, byte: u8) {
        self.table.push(N::new(next, byte))
    }
}

impl Trie<CNode> {
    /// Search for the code of a prefix extended by one byte
    fn search(&self, code: Code, byte: u8) -> std::result::Result<Code, Vacancy> {
        let mut code = code;
        let mut ordering = Ordering::Equal;
        while let Some(link) = self.table[code as usize].link(ordering) {
            code = link;
            ordering = byte.cmp(&self.table[code as usize].byte());
            if ordering == Ordering::Equal {
                return Ok(code);
            }
        }
        Err((code, ordering))
    }

    /// Insert a node at a vacant link
    fn insert(&mut self, vacancy: Vacancy, byte: u8) {
        let (code, ordering) = vacancy;
        let next_code = self.next_code();
        self.table[code as usize].set_link(ordering, next_code);
        self.push_node(None, byte);
    }
}

impl Compressor {
    /// Create a new compressor
    ///
    /// * `min_code_bits` LZW minimum code size, clamped to 2-8.
    pub fn new(min_code_bits: u8) -> Self {
        let min_code_bits = min_code_bits.max(2).min(8);
        let trie = Trie::<CNode>::new(min_code_bits);
        let code_bits = Bits::from(min_code_bits + 1);
        Compressor {
            min_code_bits,
            trie,
            code_bits,
            code: 0,
            n_bits: 0,
        }
    }

    /// Get the minimum code bits
    pub fn min_code_bits(&self) -> u8 {
        self.min_code_bits
    }

    /// Pack a code into a buffer
    fn pack(&mut self, code: Code, buffer: &mut Vec<u8>) {
        self.code |= (code as u32) << self.n_bits;
        self.n_bits += u8::from(self.code_bits);
        while self.n_bits >= 8 {
            buffer.push(self.code as u8);
            self.code >>= 8;
            self.n_bits -= 8;
        }
    }

    /// Flush a partial byte into a buffer
    fn pack_finish(&mut self, buffer: &mut Vec<u8>) {
        if self.n_bits > 0 {
            buffer.push(self.code as u8);
            self.code = 0;
            self.n_bits = 0;
        }
    }

    /// Reset the dictionary and code bits
    fn reset(&mut self) {
        self.trie.reset();
        self.code_bits = Bits::from(self.min_code_bits + 1);
    }

    /// Compress a buffer of color indices
    ///
    /// The stream starts with a clear code and ends with the end code.  Every
    /// index must be less than the clear code.
    pub fn compress(&mut self, indices: &[u8], buffer: &mut Vec<u8>) -> Result<()> {
        let clear_code = self.trie.clear_code();
        if indices.iter().any(|idx| Code::from(*idx) >= clear_code) {
            return Err(Error::InvalidColorIndex);
        }
        self.reset();
        self.pack(clear_code, buffer);
        let mut code: Option<Code> = None;
        for &byte in indices {
            let prefix = match code {
                Some(prefix) => prefix,
                None => {
                    code = Some(Code::from(byte));
                    continue;
                }
            };
            match self.trie.search(prefix, byte) {
                Ok(c) => code = Some(c),
                Err(vacancy) => {
                    self.pack(prefix, buffer);
                    if self.trie.next_code() < Bits::MAX.entries() {
                        self.trie.insert(vacancy, byte);
                        if self.trie.next_code() > self.code_bits.entries() {
                            self.code_bits += 1;
                        }
                    } else {
                        trace!("LZW dictionary full, clearing");
                        self.pack(clear_code, buffer);
                        self.reset();
                    }
                    code = Some(Code::from(byte));
                }
            }
        }
        if let Some(code) = code {
            self.pack(code, buffer);
        }
        self.pack(self.trie.end_code(), buffer);
        self.pack_finish(buffer);
        Ok(())
    }
}

impl Trie<DNode> {
    /// Lookup the first byte of a code
    fn lookup(&self, code: Code) -> u8 {
        let mut node = self.table[code as usize];
        while let Some(code) = node.next {
            node = self.table[code as usize];
        }
        node.byte()
    }

    /// Decompress a code into a buffer (reversed)
    fn decompress_reversed(&self, code: Code, buffer: &mut Vec<u8>) {
        let mut node = self.table[code as usize];
        while let Some(code) = node.next {
            buffer.push(node.byte());
            node = self.table[code as usize];
        }
        buffer.push(node.byte());
    }
}

impl Decompressor {
    /// Create a new decompressor
    pub fn new(min_code_bits: u8) -> Self {
        let min_code_bits = min_code_bits.max(2).min(8);
        Decompressor {
            min_code_bits,
            trie: Trie::<DNode>::new(min_code_bits),
            code_bits: Bits::from(min_code_bits + 1),
            last: None,
            code: 0,
            n_bits: 0,
            done: false,
        }
    }

    /// Check whether the end code has been found
    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Get the most recent code
    fn code(&mut self) -> Option<Code> {
        let b = u8::from(self.code_bits);
        if self.n_bits >= b {
            let code = (self.code & self.code_bits.mask()) as Code;
            self.code >>= b;
            self.n_bits -= b;
            Some(code)
        } else {
            None
        }
    }

    /// Unpack one code from a buffer
    fn unpack(&mut self, buffer: &[u8]) -> (usize, Option<Code>) {
        let mut n_consumed = 0;
        for byte in buffer {
            if self.n_bits >= self.code_bits.into() {
                break;
            }
            self.code |= (*byte as u32) << self.n_bits;
            self.n_bits += 8;
            n_consumed += 1;
        }
        (n_consumed, self.code())
    }

    /// Decompress a byte buffer
    pub fn decompress(&mut self, bytes: &[u8], buffer: &mut Vec<u8>) -> Result<()> {
        let mut bytes = bytes;
        while !bytes.is_empty() && !self.done {
            let (consumed, code) = self.unpack(bytes);
            if let Some(code) = code {
                self.decompress_code(code, buffer)?;
            }
            bytes = &bytes[consumed..];
        }
        Ok(())
    }

    /// Finish decompressing
    pub fn decompress_finish(&mut self, buffer: &mut Vec<u8>) -> Result<()> {
        while !self.done {
            match self.code() {
                Some(code) => self.decompress_code(code, buffer)?,
                None => break,
            }
        }
        Ok(())
    }

    /// Decompress one code
    fn decompress_code(&mut self, code: Code, buffer: &mut Vec<u8>) -> Result<()> {
        if code == self.trie.clear_code() {
            self.trie.reset();
            self.code_bits = Bits::from(self.min_code_bits + 1);
            self.last = None;
        } else if code == self.trie.end_code() {
            self.done = true;
        } else {
            let start = buffer.len();
            self.decompress_reversed(code, buffer)?;
            buffer[start..].reverse();
            self.last = Some(code);
        }
        Ok(())
    }

    /// Decompress one code (reversed)
    fn decompress_reversed(&mut self, code: Code, buffer: &mut Vec<u8>) -> Result<()> {
        let next_code = self.trie.next_code();
        match (self.last, code.cmp(&next_code)) {
            (_, Ordering::Greater) => return Err(Error::InvalidLzwData),
            (Some(last), Ordering::Less) => {
                self.trie.decompress_reversed(code, buffer);
                let byte = self.trie.lookup(code);
                self.trie.push_node(Some(last), byte);
            }
            (Some(last), Ordering::Equal) => {
                self.trie.push_node(Some(last), self.trie.lookup(last));
                self.trie.decompress_reversed(code, buffer);
            }
            (None, Ordering::Less) if code < self.trie.clear_code() => {
                buffer.push(code as u8)
            }
            (None, _) => return Err(Error::InvalidLzwData),
        }
        if next_code + 1 == self.code_bits.entries() {
            self.code_bits += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn compress(min_code_bits: u8, indices: &[u8]) -> Vec<u8> {
        let mut buffer = vec![];
        Compressor::new(min_code_bits)
            .compress(indices, &mut buffer)
            .unwrap();
        buffer
    }

    fn decompress(min_code_bits: u8, bytes: &[u8]) -> Vec<u8> {
        let mut dec = Decompressor::new(min_code_bits);
        let mut buffer = vec![];
        dec.decompress(bytes, &mut buffer).unwrap();
        dec.decompress_finish(&mut buffer).unwrap();
        assert!(dec.is_done());
        buffer
    }

    #[test]
    fn solid_2x2() {
        // clear(4) 0 6 0 end(5), 3 bits each
        assert_eq!(compress(2, &[0, 0, 0, 0]), [0x84, 0x51]);
    }

    #[test]
    fn empty() {
        // clear(4) end(5)
        assert_eq!(compress(2, &[]), [0x2C]);
        assert!(decompress(2, &[0x2C]).is_empty());
    }

    #[test]
    fn single() {
        // clear(4) 1 end(5)
        assert_eq!(compress(2, &[1]), [0x4C, 0x01]);
    }

    #[test]
    fn invalid_index() {
        let mut buffer = vec![];
        let res = Compressor::new(2).compress(&[0, 1, 4], &mut buffer);
        assert!(matches!(res, Err(Error::InvalidColorIndex)));
        assert!(buffer.is_empty());
    }

    #[test]
    fn min_code_bits() {
        assert_eq!(Compressor::new(0).min_code_bits(), 2);
        assert_eq!(Compressor::new(5).min_code_bits(), 5);
        assert_eq!(Compressor::new(12).min_code_bits(), 8);
    }

    #[test]
    fn code_bits_grow() {
        let indices: Vec<u8> = (0..200).map(|i| (i * 7 % 4) as u8).collect();
        let bytes = compress(2, &indices);
        assert_eq!(decompress(2, &bytes), indices);
    }

    #[test]
    fn dictionary_reset() {
        // pseudo-random data fills the dictionary several times
        let mut seed = 0x1234_5678_u32;
        let indices: Vec<u8> = (0..100_000)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                (seed >> 24) as u8
            })
            .collect();
        let bytes = compress(8, &indices);
        assert_eq!(decompress(8, &bytes), indices);
    }

    #[test]
    fn long_runs() {
        let mut indices = vec![3; 5000];
        indices.extend(vec![0; 3000]);
        indices.extend((0..4000).map(|i| (i % 3) as u8));
        let bytes = compress(2, &indices);
        assert_eq!(decompress(2, &bytes), indices);
    }

    #[test]
    fn reused_compressor() {
        let mut enc = Compressor::new(3);
        let mut a = vec![];
        let mut b = vec![];
        let indices: Vec<u8> = (0..1000).map(|i| (i % 8) as u8).collect();
        enc.compress(&indices, &mut a).unwrap();
        enc.compress(&indices, &mut b).unwrap();
        assert_eq!(a, b);
    }
}
