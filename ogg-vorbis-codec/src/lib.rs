//! # ogg-vorbis-codec
//!
//! Packet and page primitives for producing Ogg Vorbis streams
//! incrementally: Vorbis header packet builders, an analysis state that
//! turns float samples into audio packets, and an Ogg page assembler.
//!
//! The usual flow is:
//!
//! 1. build [`VorbisInfo`] and push the three [`vorbis::header::header_packets`]
//!    into an [`OggStream`], flushing so they sit on their own pages;
//! 2. feed samples to [`AnalysisState::write_data`] and move every
//!    [`AnalysisState::packet_out`] into the stream;
//! 3. collect pages with [`OggStream::page_out`];
//! 4. call [`AnalysisState::write_end_of_stream`] and drain the rest.

pub mod bitpack;
pub mod error;
pub mod ogg;
pub mod vorbis;

pub use error::CodecError;
pub use ogg::{split_pages, OggPacket, OggPage, OggStream};
pub use vorbis::{AnalysisState, Comments, VorbisInfo};
