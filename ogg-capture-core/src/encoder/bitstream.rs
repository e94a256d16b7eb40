use log::debug;
use ogg_vorbis_codec::vorbis::header::header_packets;
use ogg_vorbis_codec::vorbis::HOP;
use ogg_vorbis_codec::{AnalysisState, Comments, OggPacket, OggPage, OggStream};

use crate::models::audio_models::StreamInfo;
use crate::models::error::{InputError, RecorderError};
use crate::models::state::EncoderState;
use crate::processing::sample_window::SampleChunk;

/// Packets produced by a state transition and the pages they filled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOutput {
    pub packets: Vec<OggPacket>,
    pub pages: Vec<OggPage>,
}

/// Incremental Ogg Vorbis encoder.
///
/// ```text
/// Uninitialized --open--> HeaderEmitted --submit--> Streaming --finalize--> Finalized
/// ```
///
/// Header packets are flushed at [`open`](Self::open) so they sit on their
/// own pages ahead of any audio. Audio packets go straight into page
/// assembly; [`drain_pages`](Self::drain_pages) hands out whatever pages
/// are ready.
pub struct BitstreamEncoder {
    info: StreamInfo,
    serial: u32,
    comments: Comments,
    state: EncoderState,
    analysis: Option<AnalysisState>,
    stream: OggStream,
}

impl BitstreamEncoder {
    /// New encoder with a random stream serial.
    pub fn new(info: StreamInfo) -> Result<Self, RecorderError> {
        let serial = (uuid::Uuid::new_v4().as_u128() & 0xffff_ffff) as u32;
        Self::with_serial(info, serial)
    }

    pub fn with_serial(info: StreamInfo, serial: u32) -> Result<Self, RecorderError> {
        info.validate().map_err(RecorderError::Configuration)?;
        Ok(Self {
            info,
            serial,
            comments: Comments::default(),
            state: EncoderState::Uninitialized,
            analysis: None,
            stream: OggStream::new(serial),
        })
    }

    /// Attach a user comment (e.g. `TITLE`). Only effective before `open`.
    pub fn with_comment(mut self, tag: &str, value: &str) -> Self {
        self.comments = self.comments.with_tag(tag, value);
        self
    }

    pub fn info(&self) -> &StreamInfo {
        &self.info
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state.is_finalized()
    }

    /// Samples per channel each audio packet advances the stream by.
    pub fn granularity(&self) -> usize {
        HOP
    }

    /// Samples per channel accepted so far.
    pub fn samples_submitted(&self) -> u64 {
        self.analysis
            .as_ref()
            .map(|a| a.samples_written())
            .unwrap_or(0)
    }

    /// Emit the identification, comment and setup headers.
    pub fn open(&mut self) -> Result<StreamOutput, RecorderError> {
        match self.state {
            EncoderState::Uninitialized => {}
            EncoderState::Finalized => return Err(RecorderError::StreamAlreadyFinalized),
            _ => return Err(RecorderError::Encoding("encoder already open".into())),
        }

        let vorbis = self.info.vorbis_info()?;
        let analysis = AnalysisState::new(vorbis)?;
        let packets = header_packets(&vorbis, &self.comments)?;
        for packet in &packets {
            self.stream.packet_in(packet)?;
        }
        let pages = self.drain_pages(true);

        debug!(
            "BitstreamEncoder: opened stream {:08x} ({} ch, {} Hz), {} header pages",
            self.serial,
            self.info.channels,
            self.info.sample_rate,
            pages.len()
        );

        self.analysis = Some(analysis);
        self.state = EncoderState::HeaderEmitted;
        Ok(StreamOutput {
            packets: packets.to_vec(),
            pages,
        })
    }

    /// Encode one chunk. Returns the packets it completed, possibly none.
    ///
    /// A chunk with mismatched channels is rejected without touching the
    /// encoder; an empty chunk is a no-op.
    pub fn submit(&mut self, chunk: &SampleChunk<'_>) -> Result<Vec<OggPacket>, RecorderError> {
        let analysis = match self.state {
            EncoderState::Uninitialized => return Err(RecorderError::EncoderNotOpen),
            EncoderState::Finalized => return Err(RecorderError::StreamAlreadyFinalized),
            _ => self.analysis.as_mut().ok_or(RecorderError::EncoderNotOpen)?,
        };

        let expected = usize::from(self.info.channels);
        if chunk.channel_count() != expected {
            return Err(InputError::ChannelCountMismatch {
                expected,
                actual: chunk.channel_count(),
            }
            .into());
        }
        if chunk.frames()? == 0 {
            return Ok(Vec::new());
        }

        analysis.write_data(chunk.channels())?;
        self.state = EncoderState::Streaming;

        let mut packets = Vec::new();
        while let Some(packet) = analysis.packet_out() {
            self.stream.packet_in(&packet)?;
            packets.push(packet);
        }
        Ok(packets)
    }

    /// Pages ready for the sink.
    ///
    /// Without `force` only naturally full pages are returned; with it any
    /// partially filled page is emitted as well.
    pub fn drain_pages(&mut self, force: bool) -> Vec<OggPage> {
        let mut pages = Vec::new();
        loop {
            let page = if force {
                self.stream.flush()
            } else {
                self.stream.page_out()
            };
            match page {
                Some(page) => pages.push(page),
                None => break,
            }
        }
        pages
    }

    /// Write the end-of-stream packet and flush everything.
    pub fn finalize(&mut self) -> Result<StreamOutput, RecorderError> {
        let mut analysis = match self.state {
            EncoderState::Uninitialized => return Err(RecorderError::EncoderNotOpen),
            EncoderState::Finalized => return Err(RecorderError::StreamAlreadyFinalized),
            _ => self.analysis.take().ok_or(RecorderError::EncoderNotOpen)?,
        };

        analysis.write_end_of_stream()?;
        let mut packets = Vec::new();
        while let Some(packet) = analysis.packet_out() {
            self.stream.packet_in(&packet)?;
            packets.push(packet);
        }
        let pages = self.drain_pages(true);
        self.state = EncoderState::Finalized;

        debug!(
            "BitstreamEncoder: finalized stream {:08x} after {} samples, {} pages total",
            self.serial,
            analysis.samples_written(),
            self.stream.pages_written()
        );
        Ok(StreamOutput { packets, pages })
    }
}
