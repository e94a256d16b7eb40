/// One codec packet awaiting page assembly.
///
/// `granule_position` is the absolute sample position at the end of this
/// packet's decoded output; pages take the granule of the last packet that
/// finishes on them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OggPacket {
    pub data: Vec<u8>,
    pub granule_position: i64,
    pub packet_no: i64,
    pub bos: bool,
    pub eos: bool,
}

impl OggPacket {
    pub fn new(data: Vec<u8>, granule_position: i64, packet_no: i64) -> Self {
        Self {
            data,
            granule_position,
            packet_no,
            bos: false,
            eos: false,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of lacing values this packet occupies in a segment table.
    pub fn segment_count(&self) -> usize {
        self.data.len() / 255 + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_count_includes_terminator() {
        assert_eq!(OggPacket::new(vec![], 0, 0).segment_count(), 1);
        assert_eq!(OggPacket::new(vec![0; 254], 0, 0).segment_count(), 1);
        assert_eq!(OggPacket::new(vec![0; 255], 0, 0).segment_count(), 2);
        assert_eq!(OggPacket::new(vec![0; 600], 0, 0).segment_count(), 3);
    }
}
