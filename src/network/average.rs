/// Exponential geometric moving average.
///
/// Smooths a noisy measurement series by weighting recent samples more
/// heavily, folding in the log domain so throughput ratios rather than
/// absolute differences drive the estimate. Used by
/// [`BandwidthEstimator`](super::BandwidthEstimator) to damp instantaneous
/// bandwidth readings.
///
/// The decay constant controls responsiveness:
/// - near 1.0: tracks input closely (low smoothing)
/// - near 0.0: retains history (high smoothing)
///
/// During warm-up — the first `ceil(1/decay)` samples — the retention factor
/// scales with the sample count, so the estimate is not dominated by the
/// very first measurement.
#[derive(Debug)]
pub struct GeometricAverage {
    decay: f64,
    cutover: u64,
    count: u64,
    value: Option<f64>,
}

impl GeometricAverage {
    /// Creates a new filter with the given decay constant (`0.0 < decay <= 1.0`).
    pub fn new(decay: f64) -> Self {
        let cutover = if decay == 0.0 {
            u64::MAX
        } else {
            (1.0 / decay).ceil() as u64
        };
        Self {
            decay,
            cutover,
            count: 0,
            value: None,
        }
    }

    /// Feeds a new measurement into the filter.
    ///
    /// Non-finite or non-positive measurements are silently ignored — the
    /// geometric fold is undefined for them and they would poison the
    /// smoothed value.
    pub fn add_measurement(&mut self, measurement: f64) {
        if !measurement.is_finite() || measurement <= 0.0 {
            return;
        }
        let keep = 1.0 - self.decay;
        self.value = Some(match self.value {
            None => measurement,
            Some(value) if self.count > self.cutover => {
                (keep * value.ln() + self.decay * measurement.ln()).exp()
            }
            Some(value) => {
                let retained = keep * self.count as f64 / (self.count as f64 + 1.0);
                (retained * value.ln() + (1.0 - retained) * measurement.ln()).exp()
            }
        });
        self.count += 1;
    }

    /// Current smoothed value, `None` until the first accepted measurement.
    pub fn value(&self) -> Option<f64> {
        self.value
    }

    /// Clears the filter back to the uninitialized state.
    pub fn reset(&mut self) {
        self.value = None;
        self.count = 0;
    }
}
