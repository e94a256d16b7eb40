//! Ogg container framing (RFC 3533).

pub mod crc;
mod packet;
mod page;
mod stream;

pub use packet::OggPacket;
pub use page::{
    split_pages, OggPage, CAPTURE_PATTERN, FLAG_BOS, FLAG_CONTINUED, FLAG_EOS, HEADER_SIZE,
};
pub use stream::{OggStream, MAX_SEGMENTS, PAGE_FILL};
