//! Error types for the streaming core.

/// Errors that can occur while packetizing encoded media.
///
/// Variants map to specific failure modes:
///
/// - **Malformed input**: [`TruncatedAccessUnit`](Self::TruncatedAccessUnit) —
///   an access unit shorter than its own declared header length. The unit is
///   dropped without emitting a partial packet; the encoder continues with
///   the next one.
/// - **Configuration**: [`MissingParameterSets`](Self::MissingParameterSets),
///   [`ParameterSetTooLarge`](Self::ParameterSetTooLarge),
///   [`InvalidMaxPacketSize`](Self::InvalidMaxPacketSize),
///   [`InvalidClockRate`](Self::InvalidClockRate) — rejected at construction
///   or first use rather than silently degraded.
///
/// The bandwidth estimator never raises errors: out-of-range samples are a
/// noise filter, not a failure mode.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// Access unit ends before its start code and NAL header are complete.
    #[error("truncated access unit: need at least {needed} bytes, got {got}")]
    TruncatedAccessUnit { needed: usize, got: usize },

    /// A video packetizer was constructed with an empty SPS/PPS (or VPS).
    #[error("missing codec parameter sets")]
    MissingParameterSets,

    /// A parameter set exceeds the u16 length prefix of the aggregation unit.
    #[error("parameter set too large for aggregation unit: {size} bytes")]
    ParameterSetTooLarge { size: usize },

    /// Packet size budget cannot hold an RTP header plus a fragmentation header.
    #[error("invalid max packet size: {size}")]
    InvalidMaxPacketSize { size: usize },

    /// Zero clock rate — RTP timestamps would be degenerate.
    #[error("invalid clock rate: {rate} Hz")]
    InvalidClockRate { rate: u32 },
}

/// Convenience alias for `Result<T, StreamError>`.
pub type Result<T> = std::result::Result<T, StreamError>;
