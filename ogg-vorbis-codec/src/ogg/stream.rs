use std::collections::VecDeque;

use crate::error::CodecError;
use crate::ogg::crc;
use crate::ogg::packet::OggPacket;
use crate::ogg::page::{
    OggPage, CAPTURE_PATTERN, FLAG_BOS, FLAG_CONTINUED, FLAG_EOS, HEADER_SIZE,
};

/// Body size at which a page is emitted without being forced.
pub const PAGE_FILL: usize = 4096;

/// Upper bound of lacing values per page.
pub const MAX_SEGMENTS: usize = 255;

#[derive(Debug, Clone, Copy)]
struct Segment {
    lace: u8,
    /// Granule of the packet finishing on this segment.
    ends_packet: Option<i64>,
}

/// Packs packets of a single logical bitstream into pages.
///
/// The first page carries only the first packet and has the BOS flag.
/// Once a packet flagged `eos` has been submitted, [`page_out`] drains
/// everything that remains and marks the last page EOS.
///
/// [`page_out`]: OggStream::page_out
#[derive(Debug)]
pub struct OggStream {
    serial: u32,
    sequence: u32,
    segments: VecDeque<Segment>,
    body: VecDeque<u8>,
    bos_written: bool,
    continued: bool,
    eos_pending: bool,
    finished: bool,
}

impl OggStream {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            sequence: 0,
            segments: VecDeque::new(),
            body: VecDeque::new(),
            bos_written: false,
            continued: false,
            eos_pending: false,
            finished: false,
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Pages emitted so far.
    pub fn pages_written(&self) -> u32 {
        self.sequence
    }

    /// True once the EOS page has been emitted.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Bytes queued but not yet paged.
    pub fn pending_bytes(&self) -> usize {
        self.body.len()
    }

    /// Queue a packet for paging.
    pub fn packet_in(&mut self, packet: &OggPacket) -> Result<(), CodecError> {
        if self.finished || self.eos_pending {
            return Err(CodecError::StreamFinished);
        }

        let full = packet.len() / 255;
        for _ in 0..full {
            self.segments.push_back(Segment {
                lace: 255,
                ends_packet: None,
            });
        }
        self.segments.push_back(Segment {
            lace: (packet.len() % 255) as u8,
            ends_packet: Some(packet.granule_position),
        });
        self.body.extend(packet.data.iter().copied());

        if packet.eos {
            self.eos_pending = true;
        }
        Ok(())
    }

    /// Emit the next page if one is ready.
    ///
    /// A page is ready when it is the BOS page, when it holds at least
    /// [`PAGE_FILL`] bytes or [`MAX_SEGMENTS`] lacing values, or when the
    /// stream has seen its EOS packet.
    pub fn page_out(&mut self) -> Option<OggPage> {
        self.assemble(self.eos_pending)
    }

    /// Emit a page with whatever is queued, regardless of fill.
    pub fn flush(&mut self) -> Option<OggPage> {
        self.assemble(true)
    }

    fn assemble(&mut self, force: bool) -> Option<OggPage> {
        if self.segments.is_empty() {
            return None;
        }

        let mut count = 0;
        let mut bytes = 0usize;
        let mut granule = -1i64;
        let mut ready = false;

        for segment in self.segments.iter().take(MAX_SEGMENTS) {
            count += 1;
            bytes += segment.lace as usize;
            if let Some(end) = segment.ends_packet {
                granule = end;
                if !self.bos_written {
                    ready = true;
                    break;
                }
            }
            if bytes >= PAGE_FILL || count == MAX_SEGMENTS {
                ready = true;
                break;
            }
        }

        if !ready && !force {
            return None;
        }

        let laces: Vec<Segment> = self.segments.drain(..count).collect();
        let body: Vec<u8> = self.body.drain(..bytes).collect();

        let mut flags = 0u8;
        if self.continued {
            flags |= FLAG_CONTINUED;
        }
        if !self.bos_written {
            flags |= FLAG_BOS;
        }
        let last_page = self.eos_pending && self.segments.is_empty();
        if last_page {
            flags |= FLAG_EOS;
        }

        let mut header = Vec::with_capacity(HEADER_SIZE + laces.len());
        header.extend_from_slice(CAPTURE_PATTERN);
        header.push(0);
        header.push(flags);
        header.extend_from_slice(&granule.to_le_bytes());
        header.extend_from_slice(&self.serial.to_le_bytes());
        header.extend_from_slice(&self.sequence.to_le_bytes());
        header.extend_from_slice(&[0; 4]);
        header.push(laces.len() as u8);
        header.extend(laces.iter().map(|s| s.lace));

        let checksum = crc::page_checksum(&header, &body);
        header[22..26].copy_from_slice(&checksum.to_le_bytes());

        self.continued = laces.last().map(|s| s.lace == 255).unwrap_or(false);
        self.bos_written = true;
        self.sequence = self.sequence.wrapping_add(1);
        if last_page {
            self.finished = true;
        }

        Some(OggPage { header, body })
    }
}
