//! Residue type 1 over the whole half-block.
//!
//! Partitions of 16 values are classified as silent (class 0, nothing coded)
//! or active (class 1, every value coded with the scalar book in pass 0).

use crate::bitpack::BitWriter;
use crate::error::CodecError;
use crate::vorbis::codebook::Codebook;
use crate::vorbis::{HOP, MAX_RESIDUE};

pub(crate) const RESIDUE_TYPE: u32 = 1;
pub(crate) const PARTITION_SIZE: usize = 16;
const CLASSIFICATIONS: u32 = 2;
const PARTITIONS: usize = HOP / PARTITION_SIZE;

pub(crate) fn write_header(w: &mut BitWriter, classbook: usize, value_book: usize) {
    w.write(0, 24); // begin
    w.write(HOP as u32, 24); // end
    w.write(PARTITION_SIZE as u32 - 1, 24);
    w.write(CLASSIFICATIONS - 1, 6);
    w.write(classbook as u32, 8);
    // cascade: class 0 has no passes, class 1 codes pass 0 only
    w.write(0, 3);
    w.write_bit(false);
    w.write(1, 3);
    w.write_bit(false);
    w.write(value_book as u32, 8);
}

/// Quantize coefficients against a floor curve.
pub(crate) fn quantize(coeffs: &[f32], floor: &[f32], out: &mut [i32]) {
    for ((q, &x), &f) in out.iter_mut().zip(coeffs).zip(floor) {
        *q = if f > 0.0 {
            ((x / f).round() as i32).clamp(-MAX_RESIDUE, MAX_RESIDUE)
        } else {
            0
        };
    }
}

/// Write the residue for the coded channels, interleaved per partition.
pub(crate) fn write_packet(
    w: &mut BitWriter,
    channels: &[&[i32]],
    classbook: &Codebook,
    value_book: &Codebook,
) -> Result<(), CodecError> {
    let mut classes = vec![0usize; channels.len()];
    for partition in 0..PARTITIONS {
        let range = partition * PARTITION_SIZE..(partition + 1) * PARTITION_SIZE;
        for (class, values) in classes.iter_mut().zip(channels) {
            *class = usize::from(values[range.clone()].iter().any(|&q| q != 0));
            classbook.encode(w, *class)?;
        }
        for (&class, values) in classes.iter().zip(channels) {
            if class == 0 {
                continue;
            }
            for &q in &values[range.clone()] {
                value_book.encode(w, (q + MAX_RESIDUE) as usize)?;
            }
        }
    }
    Ok(())
}
