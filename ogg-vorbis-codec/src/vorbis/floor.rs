//! Floor type 1 with a single partition and a straight-line curve.
//!
//! The X list is `[0, 128, 64]`. The encoder only ever sends the two end
//! points; the midpoint is coded as zero so the decoder keeps its predicted
//! value and renders one line across the block.

use crate::bitpack::BitWriter;
use crate::error::CodecError;
use crate::vorbis::codebook::Codebook;

pub(crate) const FLOOR_TYPE: u32 = 1;
const MULTIPLIER: u32 = 1;
const RANGE_BITS: u32 = 7;
const Y_BITS: u32 = 8;
const MID_X: u32 = 64;
pub(crate) const MAX_Y: u8 = 255;

/// Amplitude of floor value `y`, spanning roughly -140 dB to 0 dB.
pub(crate) fn inverse_db(y: u8) -> f32 {
    10f32.powf(7.0 * (f32::from(y) + 1.0) / 256.0 - 7.0)
}

pub(crate) fn write_header(w: &mut BitWriter, subclass_book: usize) {
    w.write(1, 5); // partitions
    w.write(0, 4); // partition 0 -> class 0
    w.write(0, 3); // class dimensions - 1
    w.write(0, 2); // class subclasses
    w.write(subclass_book as u32 + 1, 8);
    w.write(MULTIPLIER - 1, 2);
    w.write(RANGE_BITS, 4);
    w.write(MID_X, RANGE_BITS);
}

/// Per-channel floor decision for one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Floor {
    /// Channel is silent; its residue is skipped.
    Unused,
    Line { start: u8, end: u8 },
}

impl Floor {
    /// Lowest flat floor that keeps every coefficient within `level` steps.
    pub(crate) fn fit(coeffs: &[f32], level: i32) -> Self {
        let peak = coeffs.iter().fold(0.0f32, |m, &x| m.max(x.abs()));
        if peak == 0.0 || !peak.is_finite() {
            return Floor::Unused;
        }
        let target = peak / level as f32;
        let y = (0..=MAX_Y).find(|&y| inverse_db(y) >= target).unwrap_or(MAX_Y);
        Floor::Line { start: y, end: y }
    }

    pub(crate) fn write(&self, w: &mut BitWriter, subclass_book: &Codebook) -> Result<(), CodecError> {
        match *self {
            Floor::Unused => w.write_bit(false),
            Floor::Line { start, end } => {
                w.write_bit(true);
                w.write(u32::from(start), Y_BITS);
                w.write(u32::from(end), Y_BITS);
                subclass_book.encode(w, 0)?;
            }
        }
        Ok(())
    }

    /// The curve a decoder renders for this floor, `n` values long.
    pub(crate) fn render(&self, n: usize) -> Vec<f32> {
        match *self {
            Floor::Unused => vec![0.0; n],
            Floor::Line { start, end } => {
                let mut ys = vec![0i32; n];
                render_line(0, i32::from(start), n as i32, i32::from(end), &mut ys);
                ys.iter()
                    .map(|&y| inverse_db((y * MULTIPLIER as i32).clamp(0, 255) as u8))
                    .collect()
            }
        }
    }
}

/// Integer line rasterization used by floor 1 decoding.
fn render_line(x0: i32, y0: i32, x1: i32, y1: i32, v: &mut [i32]) {
    let dy = y1 - y0;
    let adx = x1 - x0;
    if adx <= 0 {
        return;
    }
    let base = dy / adx;
    let sy = if dy < 0 { base - 1 } else { base + 1 };
    let ady = dy.abs() - base.abs() * adx;

    let mut y = y0;
    let mut err = 0;
    if let Some(slot) = v.get_mut(x0 as usize) {
        *slot = y;
    }
    for x in x0 + 1..x1 {
        err += ady;
        if err >= adx {
            err -= adx;
            y += sy;
        } else {
            y += base;
        }
        if let Some(slot) = v.get_mut(x as usize) {
            *slot = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitpack::BitReader;
    use approx::assert_relative_eq;

    #[test]
    fn inverse_db_endpoints() {
        assert_relative_eq!(inverse_db(255), 1.0, max_relative = 1e-5);
        assert_relative_eq!(inverse_db(0), 1.064_986_3e-7, max_relative = 1e-4);
    }

    #[test]
    fn render_line_hits_endpoints() {
        let mut v = vec![0; 8];
        render_line(0, 10, 8, 2, &mut v);
        assert_eq!(v[0], 10);
        assert!(v.windows(2).all(|p| p[1] <= p[0]));
        assert!(v[7] >= 2 && v[7] <= 3);

        let mut flat = vec![0; 4];
        render_line(0, 5, 4, 5, &mut flat);
        assert_eq!(flat, vec![5; 4]);
    }

    #[test]
    fn fit_bounds_quantized_range() {
        let coeffs = [0.5f32, -0.25, 0.01, 0.0];
        let level = 8;
        let floor = Floor::fit(&coeffs, level);
        let curve = floor.render(coeffs.len());
        for (&x, &f) in coeffs.iter().zip(&curve) {
            assert!((x / f).abs() <= level as f32);
        }
    }

    #[test]
    fn silence_is_unused() {
        assert_eq!(Floor::fit(&[0.0; 16], 8), Floor::Unused);
    }

    #[test]
    fn packet_layout() {
        let book = Codebook::binary().unwrap();
        let mut w = BitWriter::new();
        Floor::Line { start: 200, end: 200 }.write(&mut w, &book).unwrap();
        Floor::Unused.write(&mut w, &book).unwrap();
        let bytes = w.into_bytes();
        let mut r = BitReader::new(&bytes);
        assert_eq!(r.read(1), Some(1));
        assert_eq!(r.read(8), Some(200));
        assert_eq!(r.read(8), Some(200));
        assert_eq!(r.read(1), Some(0));
        assert_eq!(r.read(1), Some(0));
    }
}
