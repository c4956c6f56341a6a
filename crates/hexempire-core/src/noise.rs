//! Multi-octave value noise for the fractal world type.
//!
//! A white-noise lattice is sampled at successively finer wavelengths,
//! each octave cosine-interpolated and weighted half as much as the one
//! before, then the sum is normalised to `[0, 1]`.

use crate::random::RandomSource;

/// A generated noise field, row-major.
#[derive(Clone, Debug)]
pub struct NoiseField {
    pub width: u32,
    pub height: u32,
    values: Vec<f64>,
}

impl NoiseField {
    /// Value at `(q, r)`, or 0 outside the field.
    pub fn get(&self, q: u32, r: u32) -> f64 {
        if q >= self.width || r >= self.height {
            return 0.0;
        }
        self.values[(r * self.width + q) as usize]
    }

    /// Value that `fraction` of the field lies at or below.
    pub fn quantile(&self, fraction: f64) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let mut sorted = self.values.clone();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let idx = ((sorted.len() - 1) as f64 * fraction.clamp(0.0, 1.0)).round() as usize;
        sorted[idx]
    }
}

/// Synthesize value noise with `octaves` layers.
///
/// The coarsest octave has a wavelength of `2^(octaves-1)` tiles and full
/// amplitude; each finer octave halves both.
pub fn value_noise(width: u32, height: u32, octaves: u32, rng: &mut dyn RandomSource) -> NoiseField {
    let size = (width * height) as usize;
    let white: Vec<f64> = (0..size).map(|_| rng.unit()).collect();
    let mut values = vec![0.0f64; size];
    let octaves = octaves.max(1);

    let mut amplitude = 1.0;
    let mut total_amplitude = 0.0;

    for octave in (0..octaves).rev() {
        let period = 1u32 << octave;
        let frequency = 1.0 / period as f64;

        for r in 0..height {
            let r0 = (r / period) * period;
            let r1 = (r0 + period) % height.max(1);
            let vertical = (r - r0) as f64 * frequency;

            for q in 0..width {
                let q0 = (q / period) * period;
                let q1 = (q0 + period) % width.max(1);
                let horizontal = (q - q0) as f64 * frequency;

                let top = interpolate(
                    white[(r0 * width + q0) as usize],
                    white[(r0 * width + q1) as usize],
                    horizontal,
                );
                let bottom = interpolate(
                    white[(r1 * width + q0) as usize],
                    white[(r1 * width + q1) as usize],
                    horizontal,
                );
                values[(r * width + q) as usize] += interpolate(top, bottom, vertical) * amplitude;
            }
        }

        total_amplitude += amplitude;
        amplitude *= 0.5;
    }

    for v in values.iter_mut() {
        *v /= total_amplitude;
    }

    NoiseField {
        width,
        height,
        values,
    }
}

/// Cosine interpolation between `a` and `b`.
fn interpolate(a: f64, b: f64, t: f64) -> f64 {
    let ft = t * std::f64::consts::PI;
    let f = (1.0 - ft.cos()) * 0.5;
    a * (1.0 - f) + b * f
}
