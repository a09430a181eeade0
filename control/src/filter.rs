//! Two-stage smoothing of raw thermistor ADC readings.
//!
//! A median over a short sample ring throws away single-sample spikes, and a
//! moving average over the medians grinds down ADC noise. At least
//! `SAMPLES_PER_MEDIAN · MEDIAN_HISTORY_LEN` raw readings go into the first
//! filtered value.

/// Raw readings per median window.
pub const SAMPLES_PER_MEDIAN: usize = 5;
/// Medians per moving average.
pub const MEDIAN_HISTORY_LEN: usize = 10;
/// Sampling cadence of the foreground loop.
pub const SAMPLE_INTERVAL_MS: u64 = 1000 / SAMPLES_PER_MEDIAN as u64;

/// Median-then-average filter over 10-bit ADC readings.
pub struct TemperatureFilter {
    /// Ring of raw readings for the median stage.
    samples: [u16; SAMPLES_PER_MEDIAN],
    /// Fill level of `samples`.
    sample_count: usize,
    /// Ring of medians for the averaging stage.
    history: [u16; MEDIAN_HISTORY_LEN],
    /// Number of valid entries in `history` during warm-up.
    history_len: usize,
    /// Write position in `history`.
    history_at: usize,
}

impl TemperatureFilter {
    /// An empty filter.
    pub const fn new() -> Self {
        Self {
            samples: [0; SAMPLES_PER_MEDIAN],
            sample_count: 0,
            history: [0; MEDIAN_HISTORY_LEN],
            history_len: 0,
            history_at: 0,
        }
    }

    /// Feed one raw reading.
    ///
    /// Returns the filtered value whenever a fresh median lands in a primed
    /// history ring; `None` while warming up or between medians.
    pub fn push(&mut self, raw: u16) -> Option<f32> {
        self.samples[self.sample_count] = raw;
        self.sample_count += 1;
        if self.sample_count < SAMPLES_PER_MEDIAN {
            return None;
        }
        self.sample_count = 0;

        let mut window = self.samples;
        window.sort_unstable();
        let median = window[SAMPLES_PER_MEDIAN / 2];

        self.history[self.history_at] = median;
        self.history_at = (self.history_at + 1) % MEDIAN_HISTORY_LEN;
        if self.history_len < MEDIAN_HISTORY_LEN {
            self.history_len += 1;
            if self.history_len < MEDIAN_HISTORY_LEN {
                return None;
            }
        }

        let sum: u32 = self.history.iter().map(|&value| value as u32).sum();
        Some(sum as f32 / MEDIAN_HISTORY_LEN as f32)
    }
}

impl Default for TemperatureFilter {
    fn default() -> Self {
        Self::new()
    }
}
