//! Live bandwidth estimation.
//!
//! The transport sender reports `(bytes_written, elapsed_ms)` after each
//! successful network write; [`BandwidthEstimator`] turns those samples into
//! a smoothed throughput signal and pushes it to a registered
//! [`BandwidthListener`] (typically a bitrate controller driving the
//! encoder). Deciding *how* to react to the signal is the listener's
//! business — this layer only estimates and filters noise.
//!
//! One estimator instance is shared by all transport writers of a streaming
//! session; construct it at session setup and hand a clone of the `Arc` to
//! each writer.

pub mod average;

use parking_lot::Mutex;

pub use average::GeometricAverage;

/// Measured bandwidth below this (bits/ms) is treated as effectively zero
/// and ignored as measurement noise.
pub const BANDWIDTH_LOWER_BOUND: f64 = 10.0;

/// Default decay constant for the moving average.
///
/// The smaller this value is, the less responsive to new samples the
/// moving average becomes.
const DEFAULT_DECAY_CONSTANT: f64 = 0.05;

// Bucket bounds in bits/ms (equivalently kbit/s).
const POOR_BANDWIDTH: f64 = 150.0;
const MODERATE_BANDWIDTH: f64 = 550.0;
const GOOD_BANDWIDTH: f64 = 2_000.0;

/// Coarse classification of the current connection, derived from the
/// smoothed bandwidth estimate. `Unknown` until the first accepted sample
/// and after every [`BandwidthEstimator::reset`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionQuality {
    Unknown,
    /// Below 150 bits/ms.
    Poor,
    /// 150–550 bits/ms.
    Moderate,
    /// 550–2000 bits/ms.
    Good,
    /// Above 2000 bits/ms.
    Excellent,
}

impl ConnectionQuality {
    /// Classify a bandwidth value in bits/ms.
    pub fn from_bits_per_ms(bits_per_ms: f64) -> Self {
        if bits_per_ms < POOR_BANDWIDTH {
            Self::Poor
        } else if bits_per_ms < MODERATE_BANDWIDTH {
            Self::Moderate
        } else if bits_per_ms < GOOD_BANDWIDTH {
            Self::Good
        } else {
            Self::Excellent
        }
    }
}

/// Observer of bandwidth estimate updates.
///
/// Invoked synchronously on the thread that submitted the sample, while the
/// estimator's critical section is held — implementations must not block
/// indefinitely. Long-running reactions (encoder reconfiguration, network
/// probing) should hand off to their own context.
pub trait BandwidthListener: Send {
    /// Called with the updated smoothed estimate in bits/ms.
    fn on_bandwidth_estimate(&self, bits_per_ms: f64);
}

struct EstimatorState {
    average: GeometricAverage,
    listener: Option<Box<dyn BandwidthListener>>,
    quality: ConnectionQuality,
}

/// Smoothed live bandwidth estimator.
///
/// Safe to call from any number of transport-writer threads: the moving
/// average, quality bucket, and listener notification are updated under one
/// mutual-exclusion region, so a second sample cannot interleave between
/// another call's update and its notification, and notifications are
/// delivered in sample-submission order.
pub struct BandwidthEstimator {
    state: Mutex<EstimatorState>,
}

impl BandwidthEstimator {
    /// Create an estimator with the default decay constant.
    pub fn new() -> Self {
        Self::with_decay(DEFAULT_DECAY_CONSTANT)
    }

    /// Create an estimator with an explicit decay constant.
    pub fn with_decay(decay: f64) -> Self {
        Self {
            state: Mutex::new(EstimatorState {
                average: GeometricAverage::new(decay),
                listener: None,
                quality: ConnectionQuality::Unknown,
            }),
        }
    }

    /// Fold one transfer sample into the estimate.
    ///
    /// `bandwidth = bytes * 8 / elapsed_ms` (bits/ms). Zero-elapsed-time
    /// samples and readings below [`BANDWIDTH_LOWER_BOUND`] are discarded
    /// silently — no state mutation, no notification. They are measurement
    /// noise, not data.
    ///
    /// The listener receives the smoothed estimate, not the instantaneous
    /// sample; on the first accepted sample the two coincide, since the
    /// average initializes to it. Completes normally with no listener
    /// registered (state still updates).
    pub fn add_sample(&self, bytes: u64, elapsed_ms: u64) {
        if elapsed_ms == 0 {
            return;
        }
        let bandwidth = bytes as f64 * 8.0 / elapsed_ms as f64;
        if bandwidth < BANDWIDTH_LOWER_BOUND {
            return;
        }

        let mut state = self.state.lock();
        state.average.add_measurement(bandwidth);
        if let Some(smoothed) = state.average.value() {
            state.quality = ConnectionQuality::from_bits_per_ms(smoothed);
            tracing::trace!(bandwidth, smoothed, quality = ?state.quality, "bandwidth sample");
            if let Some(listener) = &state.listener {
                listener.on_bandwidth_estimate(smoothed);
            }
        }
    }

    /// Reinitialize the moving average and set the quality back to
    /// [`ConnectionQuality::Unknown`]. Safe to call at any time, with or
    /// without a registered listener.
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.average.reset();
        state.quality = ConnectionQuality::Unknown;
        tracing::debug!("bandwidth estimator reset");
    }

    /// Register the listener, replacing any previous one (last wins).
    pub fn register(&self, listener: Box<dyn BandwidthListener>) {
        self.state.lock().listener = Some(listener);
    }

    /// Clear the listener slot.
    pub fn unregister(&self) {
        self.state.lock().listener = None;
    }

    /// Current smoothed estimate in bits/ms, `None` before the first
    /// accepted sample or after a reset.
    pub fn estimate(&self) -> Option<f64> {
        self.state.lock().average.value()
    }

    /// Current connection classification.
    pub fn quality(&self) -> ConnectionQuality {
        self.state.lock().quality
    }
}

impl Default for BandwidthEstimator {
    fn default() -> Self {
        Self::new()
    }
}
