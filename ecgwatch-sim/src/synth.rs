//! Deterministic PQRST waveform generator.

use std::f64::consts::PI;

/// One Gaussian wave of the PQRST complex.
#[derive(Debug, Clone, Copy)]
struct Wave {
    /// Offset from the start of the cycle, in seconds.
    center: f64,
    amplitude: f64,
    /// Width, in seconds.
    sigma: f64,
}

const BASELINE: f64 = 0.1;

const WAVES: [Wave; 5] = [
    // P
    Wave { center: 0.10, amplitude: 0.12, sigma: 0.025 },
    // Q
    Wave { center: 0.20, amplitude: -0.08, sigma: 0.010 },
    // R
    Wave { center: 0.23, amplitude: 0.85, sigma: 0.020 },
    // S
    Wave { center: 0.26, amplitude: -0.12, sigma: 0.010 },
    // T
    Wave { center: 0.45, amplitude: 0.25, sigma: 0.040 },
];

/// A synthetic single-lead ECG.
///
/// Each call to [`next_sample`](Self::next_sample) advances by one sample
/// period. Output sits roughly between 0 and 0.95 with one R-wave per cycle
/// well above 0.5, so threshold beat detectors fire once per beat.
#[derive(Debug, Clone)]
pub struct SyntheticEcg {
    bpm: f64,
    sample_rate: f64,
    index: u64,
    wander: f64,
}

impl SyntheticEcg {
    /// Create a generator at `bpm` beats per minute, sampled at `sample_rate` Hz.
    ///
    /// Non-positive or non-finite values fall back to 72 BPM and 250 Hz.
    pub fn new(bpm: f64, sample_rate: f64) -> Self {
        let bpm = if bpm.is_finite() && bpm > 0.0 { bpm } else { 72.0 };
        let sample_rate = if sample_rate.is_finite() && sample_rate > 0.0 {
            sample_rate
        } else {
            250.0
        };
        Self {
            bpm,
            sample_rate,
            index: 0,
            wander: 0.0,
        }
    }

    /// Add a slow baseline wander of the given amplitude (0.33 Hz).
    pub fn with_wander(mut self, amplitude: f64) -> Self {
        self.wander = amplitude;
        self
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    /// Seconds per beat.
    pub fn period(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Samples produced so far.
    pub fn position(&self) -> u64 {
        self.index
    }

    /// Amplitude at `t` seconds from the start.
    pub fn value_at(&self, t: f64) -> f64 {
        let phase = t.rem_euclid(self.period());
        let complex: f64 = WAVES
            .iter()
            .map(|w| {
                let d = phase - w.center;
                w.amplitude * (-(d * d) / (2.0 * w.sigma * w.sigma)).exp()
            })
            .sum();
        BASELINE + complex + self.wander * (2.0 * PI * 0.33 * t).sin()
    }

    /// Produce the next sample.
    pub fn next_sample(&mut self) -> f64 {
        let t = self.index as f64 / self.sample_rate;
        self.index += 1;
        self.value_at(t)
    }
}

impl Default for SyntheticEcg {
    fn default() -> Self {
        Self::new(72.0, 250.0)
    }
}

impl Iterator for SyntheticEcg {
    type Item = f64;

    fn next(&mut self) -> Option<f64> {
        Some(self.next_sample())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_crossing_per_beat() {
        let ecg = SyntheticEcg::default();
        // 10 seconds at 72 BPM is 12 beats
        let samples: Vec<f64> = ecg.take(2500).collect();
        let crossings = samples
            .windows(2)
            .filter(|w| w[1] > 0.5 && w[0] <= 0.5)
            .count();
        assert_eq!(crossings, 12);
    }

    #[test]
    fn test_amplitude_range() {
        let samples: Vec<f64> = SyntheticEcg::default().take(500).collect();
        let max = samples.iter().copied().fold(f64::MIN, f64::max);
        let min = samples.iter().copied().fold(f64::MAX, f64::min);
        assert!(max > 0.9 && max < 1.0, "max {}", max);
        assert!(min > -0.05, "min {}", min);
    }

    #[test]
    fn test_r_peak_spans_render_ticks() {
        // R-wave stays above 0.5 for longer than one 33ms render tick
        let ecg = SyntheticEcg::default();
        let above = (0..250)
            .map(|i| ecg.value_at(i as f64 / 1000.0))
            .filter(|&v| v > 0.5)
            .count();
        assert!(above > 33, "above for {}ms", above);
    }

    #[test]
    fn test_invalid_parameters_fall_back() {
        let ecg = SyntheticEcg::new(0.0, f64::NAN);
        assert_eq!(ecg.bpm(), 72.0);
        assert_eq!(ecg.sample_rate(), 250.0);
    }

    #[test]
    fn test_deterministic() {
        let a: Vec<f64> = SyntheticEcg::new(60.0, 100.0).take(50).collect();
        let b: Vec<f64> = SyntheticEcg::new(60.0, 100.0).take(50).collect();
        assert_eq!(a, b);
    }
}
