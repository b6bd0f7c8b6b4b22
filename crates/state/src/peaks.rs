use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PeakSample {
    pub min: f32,
    pub max: f32,
}

impl PeakSample {
    pub fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn max_abs(&self) -> f32 {
        self.min.abs().max(self.max.abs())
    }
}

pub type PeakSequence = Arc<[PeakSample]>;

/// Reduces one channel of PCM into exactly `count` peaks.
///
/// `bucket = floor(samples.len() / count)`; bucket `i` scans
/// `[i * bucket, min((i + 1) * bucket, len))`. Samples past
/// `count * bucket` are never visited. When there are fewer samples than
/// peaks every bucket is empty and yields `{0, 0}`.
pub fn bucket_peaks(samples: &[f32], count: usize) -> Vec<PeakSample> {
    if count == 0 {
        return Vec::new();
    }

    let total = samples.len();
    let bucket = total / count;
    let mut peaks = Vec::with_capacity(count);

    for i in 0..count {
        let start = i * bucket;
        let end = ((i + 1) * bucket).min(total);
        let mut min_val: f32 = 0.0;
        let mut max_val: f32 = 0.0;
        for &sample in &samples[start.min(end)..end] {
            min_val = min_val.min(sample);
            max_val = max_val.max(sample);
        }
        peaks.push(PeakSample::new(min_val, max_val));
    }

    peaks
}

pub fn truncated_samples(total: usize, count: usize) -> usize {
    if count == 0 {
        return total;
    }
    total - (total / count) * count
}

/// Deterministic stand-in shown when the audio cannot be decoded. Two slow
/// sines give a calm, obviously synthetic envelope.
pub fn placeholder_peaks(count: usize) -> Vec<PeakSample> {
    (0..count)
        .map(|i| {
            let t = i as f32;
            let amp = 0.35 + 0.25 * (t * 0.05).sin() + 0.1 * (t * 0.013 + 1.0).sin();
            let amp = amp.clamp(0.05, 0.95);
            PeakSample::new(-amp, amp)
        })
        .collect()
}

pub fn global_max_abs(peaks: &[PeakSample]) -> f32 {
    peaks
        .iter()
        .map(PeakSample::max_abs)
        .filter(|v| v.is_finite())
        .fold(0.0, f32::max)
}

pub fn normalized(value: f32, global_max_abs: f32) -> f32 {
    if global_max_abs > 0.0 && value.is_finite() {
        (value.abs() / global_max_abs).min(1.0)
    } else {
        0.0
    }
}

/// Time at which peak `index` is drawn: `index / (N - 1) * duration`, so the
/// first and last peaks sit on the strip edges.
pub fn peak_time(index: usize, count: usize, duration: f64) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    index as f64 / (count - 1) as f64 * duration
}
