use std::collections::VecDeque;

use log::trace;

use crate::bitpack::BitWriter;
use crate::error::CodecError;
use crate::ogg::OggPacket;
use crate::vorbis::codebook::Codebook;
use crate::vorbis::floor::Floor;
use crate::vorbis::header::{self, CLASS_BOOK, VALUE_BOOK};
use crate::vorbis::mdct::Mdct;
use crate::vorbis::{residue, VorbisInfo, BLOCK_SIZE, HOP};

/// Turns per-channel float samples into Vorbis audio packets.
///
/// Samples are buffered until a full block is available; each block yields
/// one packet. The first block is preceded by half a block of silence, so
/// packet `j` ends at granule `j * HOP`. After
/// [`write_end_of_stream`](Self::write_end_of_stream) the buffer is padded
/// and the final packet carries the exact submitted sample count.
pub struct AnalysisState {
    info: VorbisInfo,
    books: Vec<Codebook>,
    mdct: Mdct,
    pending: Vec<Vec<f32>>,
    blocks: u64,
    samples_in: u64,
    packets: VecDeque<OggPacket>,
    eos: bool,
    coeffs: Vec<f32>,
    quantized: Vec<Vec<i32>>,
}

impl AnalysisState {
    pub fn new(info: VorbisInfo) -> Result<Self, CodecError> {
        let channels = info.channels();
        Ok(Self {
            info,
            books: header::codebooks()?,
            mdct: Mdct::new(BLOCK_SIZE),
            pending: vec![vec![0.0; HOP]; channels],
            blocks: 0,
            samples_in: 0,
            packets: VecDeque::new(),
            eos: false,
            coeffs: vec![0.0; HOP],
            quantized: vec![vec![0; HOP]; channels],
        })
    }

    pub fn info(&self) -> &VorbisInfo {
        &self.info
    }

    /// Samples per channel accepted so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_in
    }

    /// True once the end-of-stream packet has been produced.
    pub fn is_finished(&self) -> bool {
        self.eos
    }

    /// Submit one slice per channel, all of equal length.
    ///
    /// Nothing is buffered when validation fails.
    pub fn write_data(&mut self, channels: &[&[f32]]) -> Result<(), CodecError> {
        if self.eos {
            return Err(CodecError::EndOfStream);
        }
        if channels.len() != self.info.channels() {
            return Err(CodecError::ChannelCountMismatch {
                expected: self.info.channels(),
                actual: channels.len(),
            });
        }
        let frames = channels.first().map(|c| c.len()).unwrap_or(0);
        if let Some((channel, data)) = channels
            .iter()
            .enumerate()
            .find(|(_, c)| c.len() != frames)
        {
            return Err(CodecError::ChannelLengthMismatch {
                channel,
                expected: frames,
                actual: data.len(),
            });
        }
        if frames == 0 {
            return Ok(());
        }

        for (buffer, data) in self.pending.iter_mut().zip(channels) {
            buffer.extend(data.iter().map(|&s| if s.is_finite() { s } else { 0.0 }));
        }
        self.samples_in += frames as u64;

        while self.pending[0].len() >= BLOCK_SIZE {
            self.encode_block(false)?;
        }
        Ok(())
    }

    /// Pad the remaining input and produce the final packet.
    pub fn write_end_of_stream(&mut self) -> Result<(), CodecError> {
        if self.eos {
            return Err(CodecError::EndOfStream);
        }
        let hop = HOP as u64;
        let last_block = (self.samples_in + hop - 1) / hop;
        while self.blocks <= last_block {
            for buffer in &mut self.pending {
                if buffer.len() < BLOCK_SIZE {
                    buffer.resize(BLOCK_SIZE, 0.0);
                }
            }
            let last = self.blocks == last_block;
            self.encode_block(last)?;
        }
        self.eos = true;
        Ok(())
    }

    /// Next finished packet, in production order.
    pub fn packet_out(&mut self) -> Option<OggPacket> {
        self.packets.pop_front()
    }

    fn encode_block(&mut self, last: bool) -> Result<(), CodecError> {
        let level = self.info.residue_level();
        let mut floors = Vec::with_capacity(self.pending.len());

        for (buffer, quantized) in self.pending.iter().zip(self.quantized.iter_mut()) {
            self.mdct.forward(&buffer[..BLOCK_SIZE], &mut self.coeffs);
            let mut floor = Floor::fit(&self.coeffs, level);
            if floor != Floor::Unused {
                let curve = floor.render(HOP);
                residue::quantize(&self.coeffs, &curve, quantized);
                if quantized.iter().all(|&q| q == 0) {
                    floor = Floor::Unused;
                }
            }
            floors.push(floor);
        }

        let mut w = BitWriter::with_capacity(64 * self.pending.len());
        w.write_bit(false); // audio packet
        for floor in &floors {
            floor.write(&mut w, &self.books[CLASS_BOOK])?;
        }
        let coded: Vec<&[i32]> = floors
            .iter()
            .zip(&self.quantized)
            .filter(|(floor, _)| **floor != Floor::Unused)
            .map(|(_, q)| q.as_slice())
            .collect();
        residue::write_packet(
            &mut w,
            &coded,
            &self.books[CLASS_BOOK],
            &self.books[VALUE_BOOK],
        )?;

        let granule = if last {
            self.samples_in
        } else {
            self.blocks * HOP as u64
        };
        let mut packet = OggPacket::new(w.into_bytes(), granule as i64, 3 + self.blocks as i64);
        packet.eos = last;
        trace!(
            "vorbis: block {} -> {} bytes, granule {}",
            self.blocks,
            packet.len(),
            granule
        );
        self.packets.push_back(packet);

        for buffer in &mut self.pending {
            buffer.drain(..HOP);
        }
        self.blocks += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ogg::OggStream;
    use crate::vorbis::header::{header_packets, Comments};
    use lewton::inside_ogg::OggStreamReader;
    use std::io::Cursor;

    fn sine(frames: usize, freq: f32, rate: f32) -> Vec<f32> {
        (0..frames)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate).sin() * 0.5)
            .collect()
    }

    fn encode(channels: &[Vec<f32>], rate: u32, chunk: usize) -> Vec<u8> {
        let info = VorbisInfo::new(channels.len(), rate, 0.5).unwrap();
        let mut stream = OggStream::new(0x0bad_cafe);
        let mut bytes = Vec::new();

        for packet in header_packets(&info, &Comments::default()).unwrap() {
            stream.packet_in(&packet).unwrap();
        }
        while let Some(page) = stream.flush() {
            bytes.extend(page.to_bytes());
        }

        let mut state = AnalysisState::new(info).unwrap();
        let frames = channels[0].len();
        let mut start = 0;
        while start < frames {
            let end = (start + chunk).min(frames);
            let slices: Vec<&[f32]> = channels.iter().map(|c| &c[start..end]).collect();
            state.write_data(&slices).unwrap();
            while let Some(packet) = state.packet_out() {
                stream.packet_in(&packet).unwrap();
            }
            while let Some(page) = stream.page_out() {
                bytes.extend(page.to_bytes());
            }
            start = end;
        }
        state.write_end_of_stream().unwrap();
        while let Some(packet) = state.packet_out() {
            stream.packet_in(&packet).unwrap();
        }
        while let Some(page) = stream.page_out() {
            bytes.extend(page.to_bytes());
        }
        assert!(stream.is_finished());
        bytes
    }

    fn decode(bytes: Vec<u8>) -> (usize, Vec<Vec<i16>>) {
        let mut reader = OggStreamReader::new(Cursor::new(bytes)).unwrap();
        let channels = reader.ident_hdr.audio_channels as usize;
        let mut per_channel = vec![Vec::new(); channels];
        while let Some(interleaved) = reader.read_dec_packet_itl().unwrap() {
            for (i, s) in interleaved.into_iter().enumerate() {
                per_channel[i % channels].push(s);
            }
        }
        (channels, per_channel)
    }

    #[test]
    fn granules_advance_by_hop_and_end_at_sample_count() {
        let info = VorbisInfo::new(1, 8_000, 0.5).unwrap();
        let mut state = AnalysisState::new(info).unwrap();
        state.write_data(&[&sine(1000, 440.0, 8_000.0)]).unwrap();
        state.write_end_of_stream().unwrap();

        let packets: Vec<OggPacket> = std::iter::from_fn(|| state.packet_out()).collect();
        assert_eq!(packets.len(), 9); // blocks 0..=ceil(1000/128)
        for (j, packet) in packets.iter().enumerate().take(packets.len() - 1) {
            assert_eq!(packet.granule_position, (j * HOP) as i64);
            assert_eq!(packet.packet_no, 3 + j as i64);
            assert!(!packet.eos);
        }
        let last = packets.last().unwrap();
        assert!(last.eos);
        assert_eq!(last.granule_position, 1000);
    }

    #[test]
    fn rejects_mismatched_channels_without_buffering() {
        let info = VorbisInfo::new(2, 8_000, 0.5).unwrap();
        let mut state = AnalysisState::new(info).unwrap();
        let a = vec![0.1f32; 100];
        let b = vec![0.1f32; 99];

        assert_eq!(
            state.write_data(&[&a, &b]),
            Err(CodecError::ChannelLengthMismatch {
                channel: 1,
                expected: 100,
                actual: 99
            })
        );
        assert_eq!(
            state.write_data(&[&a]),
            Err(CodecError::ChannelCountMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(state.samples_written(), 0);
        state.write_data(&[&a, &a]).unwrap();
        assert_eq!(state.samples_written(), 100);
    }

    #[test]
    fn no_data_after_end_of_stream() {
        let info = VorbisInfo::new(1, 8_000, 0.5).unwrap();
        let mut state = AnalysisState::new(info).unwrap();
        state.write_end_of_stream().unwrap();
        assert!(state.is_finished());
        assert_eq!(state.write_data(&[&[0.0]]), Err(CodecError::EndOfStream));
        assert_eq!(state.write_end_of_stream(), Err(CodecError::EndOfStream));
    }

    #[test]
    fn decodes_exact_length_for_whole_hops() {
        let rate = 16_000;
        let left = sine(HOP * 40, 440.0, rate as f32);
        let right = sine(HOP * 40, 660.0, rate as f32);
        let bytes = encode(&[left, right], rate, 333);
        assert_eq!(&bytes[..4], b"OggS");

        let (channels, decoded) = decode(bytes);
        assert_eq!(channels, 2);
        assert_eq!(decoded[0].len(), HOP * 40);
        assert_eq!(decoded[1].len(), HOP * 40);
    }

    #[test]
    fn decodes_within_one_hop_otherwise() {
        let frames = 5_000;
        let bytes = encode(&[sine(frames, 220.0, 8_000.0)], 8_000, 1024);
        let (_, decoded) = decode(bytes);
        let len = decoded[0].len();
        assert!(len >= frames && len < frames + HOP, "decoded {}", len);
    }

    #[test]
    fn decoded_tone_carries_energy() {
        let frames = HOP * 64;
        let bytes = encode(&[sine(frames, 440.0, 16_000.0)], 16_000, 512);
        let (_, decoded) = decode(bytes);
        let middle = &decoded[0][HOP * 8..HOP * 56];
        let rms = (middle.iter().map(|&s| (s as f64).powi(2)).sum::<f64>()
            / middle.len() as f64)
            .sqrt();
        // 0.5 amplitude sine has RMS near 0.35 * 32767
        assert!(rms > 2_000.0, "rms {}", rms);
    }

    #[test]
    fn silence_decodes_to_silence() {
        let bytes = encode(&[vec![0.0; HOP * 10]], 8_000, 256);
        let (_, decoded) = decode(bytes);
        assert!(decoded[0].iter().all(|&s| s == 0));
    }
}
