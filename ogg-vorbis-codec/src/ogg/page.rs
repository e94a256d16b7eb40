use crate::error::CodecError;
use crate::ogg::crc;

/// Capture pattern at the start of every page.
pub const CAPTURE_PATTERN: &[u8; 4] = b"OggS";

/// Fixed part of a page header, before the segment table.
pub const HEADER_SIZE: usize = 27;

pub const FLAG_CONTINUED: u8 = 0x01;
pub const FLAG_BOS: u8 = 0x02;
pub const FLAG_EOS: u8 = 0x04;

/// A complete Ogg page: header (including segment table) and body.
///
/// Layout of `header`:
/// ```text
/// [0-3]    "OggS"
/// [4]      stream structure version (0)
/// [5]      flags: 0x01 continued, 0x02 bos, 0x04 eos
/// [6-13]   granule position (i64 LE, -1 when no packet ends here)
/// [14-17]  bitstream serial number
/// [18-21]  page sequence number
/// [22-25]  CRC-32 over header (this field zeroed) and body
/// [26]     segment count
/// [27..]   lacing values
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPage {
    pub header: Vec<u8>,
    pub body: Vec<u8>,
}

impl OggPage {
    pub fn flags(&self) -> u8 {
        self.header[5]
    }

    pub fn is_continued(&self) -> bool {
        self.flags() & FLAG_CONTINUED != 0
    }

    pub fn is_bos(&self) -> bool {
        self.flags() & FLAG_BOS != 0
    }

    pub fn is_eos(&self) -> bool {
        self.flags() & FLAG_EOS != 0
    }

    pub fn granule_position(&self) -> i64 {
        i64::from_le_bytes(le_array(&self.header[6..14]))
    }

    pub fn serial(&self) -> u32 {
        u32::from_le_bytes(le_array(&self.header[14..18]))
    }

    pub fn sequence(&self) -> u32 {
        u32::from_le_bytes(le_array(&self.header[18..22]))
    }

    pub fn checksum(&self) -> u32 {
        u32::from_le_bytes(le_array(&self.header[22..26]))
    }

    pub fn segment_table(&self) -> &[u8] {
        &self.header[HEADER_SIZE..]
    }

    /// Number of packets that finish on this page.
    pub fn packets_completed(&self) -> usize {
        self.segment_table().iter().filter(|&&lace| lace < 255).count()
    }

    pub fn len(&self) -> usize {
        self.header.len() + self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Recompute the checksum and compare against the stored one.
    pub fn verify_checksum(&self) -> bool {
        let mut header = self.header.clone();
        header[22..26].fill(0);
        crc::page_checksum(&header, &self.body) == self.checksum()
    }

    /// Header followed by body, as written to a sink.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.header);
        bytes.extend_from_slice(&self.body);
        bytes
    }
}

fn le_array<const N: usize>(bytes: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(bytes);
    out
}

/// Split a byte stream into pages, checking capture pattern, version and CRC.
pub fn split_pages(mut data: &[u8]) -> Result<Vec<OggPage>, CodecError> {
    let mut pages = Vec::new();
    while !data.is_empty() {
        if data.len() < HEADER_SIZE {
            return Err(CodecError::CorruptPage(format!(
                "truncated header: {} bytes left",
                data.len()
            )));
        }
        if &data[..4] != CAPTURE_PATTERN {
            return Err(CodecError::CorruptPage("missing capture pattern".into()));
        }
        if data[4] != 0 {
            return Err(CodecError::CorruptPage(format!(
                "unsupported version {}",
                data[4]
            )));
        }
        let segments = data[26] as usize;
        let header_len = HEADER_SIZE + segments;
        if data.len() < header_len {
            return Err(CodecError::CorruptPage("truncated segment table".into()));
        }
        let body_len: usize = data[HEADER_SIZE..header_len]
            .iter()
            .map(|&lace| lace as usize)
            .sum();
        if data.len() < header_len + body_len {
            return Err(CodecError::CorruptPage("truncated body".into()));
        }
        let page = OggPage {
            header: data[..header_len].to_vec(),
            body: data[header_len..header_len + body_len].to_vec(),
        };
        if !page.verify_checksum() {
            return Err(CodecError::CorruptPage(format!(
                "checksum mismatch on page {}",
                page.sequence()
            )));
        }
        pages.push(page);
        data = &data[header_len + body_len..];
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::{OggPacket, OggStream};

    fn sample_stream() -> Vec<u8> {
        let mut stream = OggStream::new(0x1234_5678);
        let mut first = OggPacket::new(vec![1, 2, 3], 0, 0);
        first.bos = true;
        stream.packet_in(&first).unwrap();
        let mut last = OggPacket::new(vec![9; 300], 512, 1);
        last.eos = true;
        stream.packet_in(&last).unwrap();

        let mut bytes = Vec::new();
        while let Some(page) = stream.flush() {
            bytes.extend(page.to_bytes());
        }
        bytes
    }

    #[test]
    fn split_recovers_pages() {
        let bytes = sample_stream();
        let pages = split_pages(&bytes).unwrap();

        assert_eq!(pages.len(), 2);
        assert!(pages[0].is_bos());
        assert!(pages[1].is_eos());
        assert_eq!(pages[1].granule_position(), 512);
        assert_eq!(pages[0].serial(), 0x1234_5678);
        assert_eq!(pages[1].sequence(), 1);
    }

    #[test]
    fn detects_corruption() {
        let mut bytes = sample_stream();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xff;
        assert!(matches!(
            split_pages(&bytes),
            Err(CodecError::CorruptPage(_))
        ));
    }

    #[test]
    fn rejects_truncated_input() {
        let bytes = sample_stream();
        assert!(split_pages(&bytes[..bytes.len() - 10]).is_err());
        assert!(split_pages(&bytes[..10]).is_err());
    }
}
