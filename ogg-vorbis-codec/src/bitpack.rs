/// LSB-first bit packer used by both Ogg and Vorbis.
///
/// Values are written least significant bit first, filling each byte from
/// bit 0 upwards. A partially filled final byte is zero padded.
#[derive(Debug, Default, Clone)]
pub struct BitWriter {
    bytes: Vec<u8>,
    bit: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            bit: 0,
        }
    }

    /// Write the low `bits` bits of `value` (at most 32).
    pub fn write(&mut self, value: u32, bits: u32) {
        debug_assert!(bits <= 32);
        for i in 0..bits {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    pub fn write_bit(&mut self, set: bool) {
        if self.bit == 0 {
            self.bytes.push(0);
        }
        if set {
            if let Some(last) = self.bytes.last_mut() {
                *last |= 1 << self.bit;
            }
        }
        self.bit = (self.bit + 1) % 8;
    }

    /// Write a Huffman codeword of `length` bits, root branch first.
    pub fn write_codeword(&mut self, codeword: u32, length: u8) {
        for i in (0..u32::from(length)).rev() {
            self.write_bit((codeword >> i) & 1 == 1);
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        for &byte in data {
            self.write(u32::from(byte), 8);
        }
    }

    /// Number of bits written so far.
    pub fn bit_len(&self) -> usize {
        if self.bit == 0 {
            self.bytes.len() * 8
        } else {
            (self.bytes.len() - 1) * 8 + self.bit as usize
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Number of bits needed to represent `value` (the Vorbis `ilog`).
pub fn ilog(value: u32) -> u32 {
    32 - value.leading_zeros()
}

/// LSB-first reader mirroring [`BitWriter`], used to check packed output.
#[cfg(test)]
pub(crate) struct BitReader<'a> {
    data: &'a [u8],
    pos: usize,
}

#[cfg(test)]
impl<'a> BitReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn read(&mut self, bits: u32) -> Option<u32> {
        let mut value = 0u32;
        for i in 0..bits {
            let byte = *self.data.get(self.pos / 8)?;
            let bit = (byte >> (self.pos % 8)) & 1;
            value |= u32::from(bit) << i;
            self.pos += 1;
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packs_lsb_first() {
        let mut w = BitWriter::new();
        w.write(0b1, 1);
        w.write(0b10, 2);
        w.write(0b11111, 5);
        assert_eq!(w.into_bytes(), vec![0b1111_1101]);
    }

    #[test]
    fn spans_bytes() {
        let mut w = BitWriter::new();
        w.write(0x564342, 24);
        w.write(0x3, 2);
        assert_eq!(w.bit_len(), 26);
        let bytes = w.into_bytes();
        assert_eq!(&bytes[..3], &[0x42, 0x43, 0x56]);
        assert_eq!(bytes[3], 0x03);
    }

    #[test]
    fn codeword_root_bit_first() {
        let mut w = BitWriter::new();
        w.write_codeword(0b110, 3);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(1), Some(1));
        assert_eq!(r.read(1), Some(1));
        assert_eq!(r.read(1), Some(0));
    }

    #[test]
    fn round_trips_through_reader() {
        let mut w = BitWriter::new();
        w.write(1234, 11);
        w.write(7, 3);
        w.write(u32::MAX, 32);
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(11), Some(1234));
        assert_eq!(r.read(3), Some(7));
        assert_eq!(r.read(32), Some(u32::MAX));
    }

    #[test]
    fn ilog_matches_vorbis_definition() {
        assert_eq!(ilog(0), 0);
        assert_eq!(ilog(1), 1);
        assert_eq!(ilog(2), 2);
        assert_eq!(ilog(7), 3);
        assert_eq!(ilog(255), 8);
    }
}
