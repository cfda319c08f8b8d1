//! Noise smoothing for the raw GPS fix stream and the compass heading.
//!
//! Both smoothers are in-memory, single-threaded state machines fed one
//! sample at a time. They never fail: degenerate inputs (zero accuracy,
//! first-ever sample) fall back to passing the raw value through.

use crate::geo::GeoPoint;
use crate::types::Timestamp;

/// Maximum number of buffered fixes in the position window.
pub const MAX_WINDOW_SAMPLES: usize = 5;

/// Maximum age of a buffered fix, relative to the newest sample.
pub const MAX_SAMPLE_AGE_MS: i64 = 5_000;

/// Heading EMA smoothing factor. Lower means more smoothing.
pub const HEADING_ALPHA: f64 = 0.3;

/// Reported accuracy to assume when the device sends none.
pub const DEFAULT_ACCURACY_M: f64 = 100.0;

/// A single raw fix from a device location sensor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsSample {
    pub point: GeoPoint,
    /// Reported accuracy radius in meters. Larger means noisier.
    pub accuracy_m: f64,
    pub captured_at: Timestamp,
}

/// A stabilized position estimate derived from recent samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothedPosition {
    pub point: GeoPoint,
}

/// Bounded-window, accuracy-weighted moving average over GPS fixes.
///
/// Each new sample evicts anything older than [`MAX_SAMPLE_AGE_MS`] and
/// anything beyond the last [`MAX_WINDOW_SAMPLES`] fixes. With fewer than
/// two samples in the window, the raw point is returned unchanged.
#[derive(Debug, Default)]
pub struct LocationSmoother {
    window: Vec<GpsSample>,
}

impl LocationSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw sample and get back the current smoothed position.
    ///
    /// Sample age is measured against the newest sample's timestamp, so the
    /// smoother behaves the same under test clocks and wall clocks.
    pub fn push(&mut self, sample: GpsSample) -> SmoothedPosition {
        let now = sample.captured_at;
        self.window
            .retain(|s| (now - s.captured_at).num_milliseconds() < MAX_SAMPLE_AGE_MS);

        self.window.push(sample);
        if self.window.len() > MAX_WINDOW_SAMPLES {
            let excess = self.window.len() - MAX_WINDOW_SAMPLES;
            self.window.drain(..excess);
        }

        if self.window.len() < 2 {
            return SmoothedPosition {
                point: sample.point,
            };
        }

        // Weight inversely proportional to the reported accuracy radius:
        // a noisy fix contributes less. Accuracy 0 yields the maximal
        // weight of 1.
        let mut total_weight = 0.0;
        let mut lat = 0.0;
        let mut lon = 0.0;
        for s in &self.window {
            let weight = 1.0 / (1.0 + s.accuracy_m / 10.0);
            lat += s.point.lat * weight;
            lon += s.point.lon * weight;
            total_weight += weight;
        }

        SmoothedPosition {
            point: GeoPoint::new(lat / total_weight, lon / total_weight),
        }
    }

    /// Drop all buffered samples. Used when a session restarts.
    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// Exponential moving average over compass headings with circular
/// wrap-around handling.
///
/// The 359 -> 1 degree transition moves through the 2-degree short path,
/// never the 358-degree long way around.
#[derive(Debug, Default)]
pub struct HeadingSmoother {
    smoothed: Option<f64>,
}

impl HeadingSmoother {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one raw heading in degrees and get back the smoothed heading
    /// in `[0, 360)`.
    pub fn smooth(&mut self, heading: f64) -> f64 {
        let current = match self.smoothed {
            None => {
                self.smoothed = Some(heading.rem_euclid(360.0));
                return self.smoothed.unwrap();
            }
            Some(h) => h,
        };

        // Shortest signed angular difference, wrapped through +/-180.
        let mut diff = heading - current;
        if diff > 180.0 {
            diff -= 360.0;
        }
        if diff < -180.0 {
            diff += 360.0;
        }

        let next = (current + diff * HEADING_ALPHA).rem_euclid(360.0);
        self.smoothed = Some(next);
        next
    }

    /// Forget the prior heading.
    pub fn reset(&mut self) {
        self.smoothed = None;
    }
}
