//! Huffman codebooks as serialized in the Vorbis setup header.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::bitpack::{ilog, BitWriter};
use crate::error::CodecError;

const SYNC_PATTERN: u32 = 0x56_4342;

/// Value lookup attached to a codebook (lookup type 1).
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub minimum: f32,
    pub delta: f32,
    pub value_bits: u32,
    pub multiplicands: Vec<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Codebook {
    dimensions: u16,
    lengths: Vec<u8>,
    codewords: Vec<u32>,
    lookup: Option<Lookup>,
}

impl Codebook {
    /// Build a book from explicit codeword lengths.
    pub fn new(
        dimensions: u16,
        lengths: Vec<u8>,
        lookup: Option<Lookup>,
    ) -> Result<Self, CodecError> {
        if dimensions == 0 {
            return Err(CodecError::InvalidCodebook("zero dimensions".into()));
        }
        let codewords = make_words(&lengths)?;
        if let Some(lookup) = &lookup {
            if lookup.multiplicands.len() != lookup1_values(lengths.len(), dimensions) {
                return Err(CodecError::InvalidCodebook(format!(
                    "{} multiplicands for {} entries",
                    lookup.multiplicands.len(),
                    lengths.len()
                )));
            }
            let limit = 1u64 << lookup.value_bits;
            if lookup
                .multiplicands
                .iter()
                .any(|&m| u64::from(m) >= limit)
            {
                return Err(CodecError::InvalidCodebook(
                    "multiplicand exceeds value bits".into(),
                ));
            }
        }
        Ok(Self {
            dimensions,
            lengths,
            codewords,
            lookup,
        })
    }

    /// One-bit book with two entries and no value lookup.
    pub fn binary() -> Result<Self, CodecError> {
        Self::new(1, vec![1, 1], None)
    }

    /// Scalar book over `-max..=max`, shorter codes towards zero.
    pub fn scalar(max: i32) -> Result<Self, CodecError> {
        if max <= 0 {
            return Err(CodecError::InvalidCodebook(format!(
                "scalar range {} must be positive",
                max
            )));
        }
        let weights: Vec<u64> = (-max..=max)
            .map(|v| 1u64 << (max - v.abs()) as u32)
            .collect();
        let lengths = huffman_lengths(&weights)?;
        let span = (2 * max) as u32;
        let lookup = Lookup {
            minimum: -(max as f32),
            delta: 1.0,
            value_bits: ilog(span),
            multiplicands: (0..=span).collect(),
        };
        Self::new(1, lengths, Some(lookup))
    }

    pub fn entries(&self) -> usize {
        self.lengths.len()
    }

    pub fn dimensions(&self) -> u16 {
        self.dimensions
    }

    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    /// Decoded value of a scalar entry.
    pub fn value(&self, entry: usize) -> Option<f32> {
        let lookup = self.lookup.as_ref()?;
        let m = *lookup.multiplicands.get(entry)?;
        Some(lookup.minimum + lookup.delta * m as f32)
    }

    /// Emit the codeword for `entry`.
    pub fn encode(&self, w: &mut BitWriter, entry: usize) -> Result<(), CodecError> {
        match (self.codewords.get(entry), self.lengths.get(entry)) {
            (Some(&code), Some(&len)) => {
                w.write_codeword(code, len);
                Ok(())
            }
            _ => Err(CodecError::InvalidCodebook(format!(
                "entry {} out of {}",
                entry,
                self.entries()
            ))),
        }
    }

    /// Serialize the book into a setup header.
    pub fn write_header(&self, w: &mut BitWriter) {
        w.write(SYNC_PATTERN, 24);
        w.write(u32::from(self.dimensions), 16);
        w.write(self.lengths.len() as u32, 24);
        w.write_bit(false); // ordered
        w.write_bit(false); // sparse
        for &len in &self.lengths {
            w.write(u32::from(len) - 1, 5);
        }
        match &self.lookup {
            None => w.write(0, 4),
            Some(lookup) => {
                w.write(1, 4);
                w.write(float32_pack(lookup.minimum), 32);
                w.write(float32_pack(lookup.delta), 32);
                w.write(lookup.value_bits - 1, 4);
                w.write_bit(false); // sequence_p
                for &m in &lookup.multiplicands {
                    w.write(m, lookup.value_bits);
                }
            }
        }
    }
}

/// Number of multiplicands a lookup type 1 book carries.
pub fn lookup1_values(entries: usize, dimensions: u16) -> usize {
    let dims = u32::from(dimensions);
    let mut r = (entries as f64).powf(1.0 / f64::from(dims)).floor() as usize;
    while (r + 1).pow(dims) <= entries {
        r += 1;
    }
    while r > 0 && r.pow(dims) > entries {
        r -= 1;
    }
    r
}

/// Optimal prefix code lengths for the given symbol weights.
pub fn huffman_lengths(weights: &[u64]) -> Result<Vec<u8>, CodecError> {
    if weights.len() < 2 {
        return Err(CodecError::InvalidCodebook(
            "need at least two symbols".into(),
        ));
    }

    // Node ids break weight ties so the tree is deterministic.
    let mut heap: BinaryHeap<Reverse<(u64, usize)>> = BinaryHeap::new();
    let mut members: Vec<Vec<usize>> = Vec::with_capacity(weights.len() * 2);
    for (symbol, &weight) in weights.iter().enumerate() {
        heap.push(Reverse((weight.max(1), members.len())));
        members.push(vec![symbol]);
    }

    let mut depth = vec![0u8; weights.len()];
    while heap.len() > 1 {
        let (Some(Reverse((wa, a))), Some(Reverse((wb, b)))) = (heap.pop(), heap.pop()) else {
            break;
        };
        let mut merged = std::mem::take(&mut members[a]);
        merged.append(&mut members[b]);
        for &symbol in &merged {
            depth[symbol] += 1;
        }
        heap.push(Reverse((wa + wb, members.len())));
        members.push(merged);
    }

    if let Some(&deepest) = depth.iter().max() {
        if deepest > 32 {
            return Err(CodecError::InvalidCodebook(format!(
                "codeword length {} exceeds 32",
                deepest
            )));
        }
    }
    Ok(depth)
}

/// Assign canonical Vorbis codewords to a list of lengths.
///
/// Entries take the numerically lowest available codeword of their length in
/// order; the tree must be neither over- nor underspecified.
pub fn make_words(lengths: &[u8]) -> Result<Vec<u32>, CodecError> {
    let mut marker = [0u32; 33];
    let mut words = Vec::with_capacity(lengths.len());

    for &length in lengths {
        let length = usize::from(length);
        if length == 0 || length > 32 {
            return Err(CodecError::InvalidCodebook(format!(
                "codeword length {} outside 1..=32",
                length
            )));
        }
        let entry = marker[length];
        if length < 32 && (entry >> length) != 0 {
            return Err(CodecError::InvalidCodebook("overspecified tree".into()));
        }
        words.push(entry);

        for j in (1..=length).rev() {
            if marker[j] & 1 == 1 {
                if j == 1 {
                    marker[1] += 1;
                } else {
                    marker[j] = marker[j - 1] << 1;
                }
                break;
            }
            marker[j] += 1;
        }

        let mut entry = entry;
        for j in length + 1..33 {
            if marker[j] >> 1 == entry {
                entry = marker[j];
                marker[j] = marker[j - 1] << 1;
            } else {
                break;
            }
        }
    }

    let kraft: f64 = lengths.iter().map(|&l| 0.5f64.powi(i32::from(l))).sum();
    if (kraft - 1.0).abs() > 1e-9 {
        return Err(CodecError::InvalidCodebook("underspecified tree".into()));
    }
    Ok(words)
}

/// Pack a float into the 32-bit Vorbis float format.
pub fn float32_pack(value: f32) -> u32 {
    if value == 0.0 {
        return 0;
    }
    let mut v = f64::from(value);
    let mut sign = 0u32;
    if v < 0.0 {
        sign = 0x8000_0000;
        v = -v;
    }
    let exp = (v.log2() + 0.001).floor() as i32;
    let mant = (v * 2f64.powi(20 - exp)).round() as u32;
    sign | (((exp + 768) as u32) << 21) | (mant & 0x1f_ffff)
}

/// Inverse of [`float32_pack`].
pub fn float32_unpack(packed: u32) -> f32 {
    let mantissa = f64::from(packed & 0x1f_ffff);
    let exponent = ((packed & 0x7fe0_0000) >> 21) as i32;
    let value = mantissa * 2f64.powi(exponent - 788);
    if packed & 0x8000_0000 != 0 {
        -value as f32
    } else {
        value as f32
    }
}
