use std::f64::consts::PI;

/// Windowed forward MDCT for a fixed block size.
///
/// Scaled by `4/n` so that the unscaled inverse transform used by Vorbis
/// decoders, followed by windowed overlap-add, reconstructs the input.
pub(crate) struct Mdct {
    n: usize,
    window: Vec<f32>,
    cos: Vec<f32>,
}

impl Mdct {
    pub(crate) fn new(n: usize) -> Self {
        let half = n / 2;
        let window = (0..n)
            .map(|i| {
                let s = (PI * (i as f64 + 0.5) / n as f64).sin();
                (PI / 2.0 * s * s).sin() as f32
            })
            .collect();
        let mut cos = Vec::with_capacity(n * half);
        for i in 0..n {
            for k in 0..half {
                let phase = 2.0 * PI / n as f64
                    * (i as f64 + 0.5 + n as f64 / 4.0)
                    * (k as f64 + 0.5);
                cos.push(phase.cos() as f32);
            }
        }
        Self { n, window, cos }
    }

    #[cfg(test)]
    pub(crate) fn window(&self) -> &[f32] {
        &self.window
    }

    /// Transform `input` (length `n`) into `n/2` coefficients.
    pub(crate) fn forward(&self, input: &[f32], out: &mut [f32]) {
        let half = self.n / 2;
        debug_assert_eq!(input.len(), self.n);
        debug_assert_eq!(out.len(), half);

        out.iter_mut().for_each(|x| *x = 0.0);
        for (i, (&x, &w)) in input.iter().zip(&self.window).enumerate() {
            let sample = x * w;
            if sample == 0.0 {
                continue;
            }
            let row = &self.cos[i * half..(i + 1) * half];
            for (acc, &c) in out.iter_mut().zip(row) {
                *acc += sample * c;
            }
        }
        let scale = 4.0 / self.n as f32;
        out.iter_mut().for_each(|x| *x *= scale);
    }

    /// Unscaled inverse transform, windowed. Used to check reconstruction.
    #[cfg(test)]
    pub(crate) fn inverse(&self, coeffs: &[f32]) -> Vec<f32> {
        let half = self.n / 2;
        (0..self.n)
            .map(|i| {
                let row = &self.cos[i * half..(i + 1) * half];
                let sum: f32 = coeffs.iter().zip(row).map(|(&x, &c)| x * c).sum();
                sum * self.window[i]
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn window_satisfies_power_complement() {
        let mdct = Mdct::new(256);
        let w = mdct.window();
        for i in 0..128 {
            assert_abs_diff_eq!(w[i] * w[i] + w[i + 128] * w[i + 128], 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn overlap_add_reconstructs_signal() {
        let n = 256;
        let hop = n / 2;
        let mdct = Mdct::new(n);
        let mut signal = vec![0.0f32; hop];
        signal.extend((0..4 * hop).map(|i| (i as f32 * 0.05).sin() * 0.8));
        signal.extend(vec![0.0f32; n]);

        let mut out = vec![0.0f32; signal.len()];
        let mut coeffs = vec![0.0f32; hop];
        let mut start = 0;
        while start + n <= signal.len() {
            mdct.forward(&signal[start..start + n], &mut coeffs);
            for (o, y) in out[start..start + n].iter_mut().zip(mdct.inverse(&coeffs)) {
                *o += y;
            }
            start += hop;
        }

        for i in hop..hop * 5 {
            assert_abs_diff_eq!(out[i], signal[i], epsilon = 1e-3);
        }
    }
}
