//! The three Vorbis header packets: identification, comments and setup.

use crate::bitpack::BitWriter;
use crate::error::CodecError;
use crate::ogg::OggPacket;
use crate::vorbis::codebook::Codebook;
use crate::vorbis::{floor, residue, VorbisInfo, BLOCKSIZE_EXPONENT, MAX_RESIDUE};

const PACKET_INFO: u32 = 1;
const PACKET_COMMENTS: u32 = 3;
const PACKET_SETUP: u32 = 5;

/// Index of the one-bit book in the setup header.
pub(crate) const CLASS_BOOK: usize = 0;
/// Index of the scalar residue book in the setup header.
pub(crate) const VALUE_BOOK: usize = 1;

/// Vendor string and user comments carried by the comment header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comments {
    pub vendor: String,
    pub user: Vec<(String, String)>,
}

impl Default for Comments {
    fn default() -> Self {
        Self {
            vendor: format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            user: Vec::new(),
        }
    }
}

impl Comments {
    pub fn with_tag(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.user.push((tag.into(), value.into()));
        self
    }
}

/// The codebooks in setup-header order.
pub(crate) fn codebooks() -> Result<Vec<Codebook>, CodecError> {
    Ok(vec![Codebook::binary()?, Codebook::scalar(MAX_RESIDUE)?])
}

fn common_header(w: &mut BitWriter, packet_type: u32) {
    w.write(packet_type, 8);
    w.write_bytes(b"vorbis");
}

fn write_string(w: &mut BitWriter, s: &str) {
    w.write(s.len() as u32, 32);
    w.write_bytes(s.as_bytes());
}

pub fn build_info_packet(info: &VorbisInfo) -> OggPacket {
    let mut w = BitWriter::with_capacity(30);
    common_header(&mut w, PACKET_INFO);
    w.write(0, 32); // version
    w.write(info.channels() as u32, 8);
    w.write(info.sample_rate(), 32);
    w.write(0, 32); // bitrate maximum
    w.write(0, 32); // bitrate nominal
    w.write(0, 32); // bitrate minimum
    w.write(BLOCKSIZE_EXPONENT, 4);
    w.write(BLOCKSIZE_EXPONENT, 4);
    w.write_bit(true);

    let mut packet = OggPacket::new(w.into_bytes(), 0, 0);
    packet.bos = true;
    packet
}

pub fn build_comments_packet(comments: &Comments) -> OggPacket {
    let mut w = BitWriter::new();
    common_header(&mut w, PACKET_COMMENTS);
    write_string(&mut w, &comments.vendor);
    w.write(comments.user.len() as u32, 32);
    for (tag, value) in &comments.user {
        write_string(&mut w, &format!("{}={}", tag, value));
    }
    w.write_bit(true);
    OggPacket::new(w.into_bytes(), 0, 1)
}

pub fn build_books_packet(books: &[Codebook]) -> OggPacket {
    let mut w = BitWriter::with_capacity(256);
    common_header(&mut w, PACKET_SETUP);

    w.write(books.len() as u32 - 1, 8);
    for book in books {
        book.write_header(&mut w);
    }

    // time domain transforms: one placeholder
    w.write(0, 6);
    w.write(0, 16);

    w.write(0, 6);
    w.write(floor::FLOOR_TYPE, 16);
    floor::write_header(&mut w, CLASS_BOOK);

    w.write(0, 6);
    w.write(residue::RESIDUE_TYPE, 16);
    residue::write_header(&mut w, CLASS_BOOK, VALUE_BOOK);

    // mapping 0: one submap, no coupling
    w.write(0, 6);
    w.write(0, 16);
    w.write_bit(false);
    w.write_bit(false);
    w.write(0, 2);
    w.write(0, 8); // time config
    w.write(0, 8); // floor
    w.write(0, 8); // residue

    // mode 0: short blocks, mapping 0
    w.write(0, 6);
    w.write_bit(false);
    w.write(0, 16);
    w.write(0, 16);
    w.write(0, 8);

    w.write_bit(true);
    OggPacket::new(w.into_bytes(), 0, 2)
}

/// All three header packets in stream order.
pub fn header_packets(
    info: &VorbisInfo,
    comments: &Comments,
) -> Result<[OggPacket; 3], CodecError> {
    Ok([
        build_info_packet(info),
        build_comments_packet(comments),
        build_books_packet(&codebooks()?),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitpack::BitReader;

    #[test]
    fn info_packet_layout() {
        let info = VorbisInfo::new(2, 44_100, 0.4).unwrap();
        let packet = build_info_packet(&info);
        assert!(packet.bos);
        assert_eq!(packet.len(), 30);
        assert_eq!(&packet.data[..7], b"\x01vorbis");

        let mut r = BitReader::new(&packet.data[7..]);
        assert_eq!(r.read(32), Some(0));
        assert_eq!(r.read(8), Some(2));
        assert_eq!(r.read(32), Some(44_100));
        r.read(96);
        assert_eq!(r.read(4), Some(8));
        assert_eq!(r.read(4), Some(8));
        assert_eq!(r.read(1), Some(1));
    }

    #[test]
    fn comments_carry_vendor_and_tags() {
        let comments = Comments::default().with_tag("TITLE", "take one");
        let packet = build_comments_packet(&comments);
        assert_eq!(&packet.data[..7], b"\x03vorbis");
        let text = String::from_utf8_lossy(&packet.data);
        assert!(text.contains("ogg-vorbis-codec"));
        assert!(text.contains("TITLE=take one"));
        assert_eq!(packet.data.last(), Some(&1));
    }

    #[test]
    fn setup_packet_lists_both_books() {
        let packet = build_books_packet(&codebooks().unwrap());
        assert_eq!(packet.packet_no, 2);
        assert_eq!(&packet.data[..7], b"\x05vorbis");
        let mut r = BitReader::new(&packet.data[7..]);
        assert_eq!(r.read(8), Some(1));
        assert_eq!(r.read(24), Some(0x56_4342));
    }
}
