//! Media codecs and RTP packetization.
//!
//! This module converts encoded access units — H.264/H.265 NAL units and AAC
//! frames — into ready-to-send [`RtpFrame`]s.
//!
//! ## RTP overview (RFC 3550)
//!
//! Each encoded access unit becomes one or more RTP packets. Every packet
//! carries a 12-byte fixed header ([`rtp::RtpHeader`]) containing:
//!
//! - **Sequence number** (16-bit, wrapping) — for reordering and loss detection.
//! - **Timestamp** (32-bit) — media clock: 90 kHz for video, the sample rate
//!   for audio, scaled from the encoder's presentation time.
//! - **SSRC** (32-bit) — randomly chosen to identify the sender.
//! - **Marker bit** — set on the last packet of an access unit.
//!
//! ## Supported codecs
//!
//! | Codec | Module | RFC | Packetization |
//! |-------|--------|-----|---------------|
//! | H.264 | [`video`] | [RFC 6184](https://tools.ietf.org/html/rfc6184) | single NAL / STAP-A / FU |
//! | H.265 | [`video`] | [RFC 7798](https://tools.ietf.org/html/rfc7798) | single NAL / STAP-A / FU |
//! | AAC   | [`aac`]   | [RFC 3640](https://tools.ietf.org/html/rfc3640) | one frame per packet |

pub mod aac;
pub mod frame;
pub mod rtp;
pub mod video;

use crate::error::Result;
pub use frame::RtpFrame;

/// Encoder-supplied metadata accompanying one access unit.
///
/// Mirrors what a hardware encoder callback delivers alongside the output
/// buffer. The buffer length itself is carried by the slice.
#[derive(Debug, Clone, Copy)]
pub struct FrameMeta {
    /// Presentation time of the access unit in microseconds.
    pub presentation_time_us: u64,
    /// True when the encoder flagged this unit as a sync frame.
    pub is_key_frame: bool,
}

/// Codec-specific RTP packetizer.
///
/// The seam between the encoder collaborator and the transport sender: the
/// sender holds a `Box<dyn Packetizer>` per track and forwards emitted
/// frames without knowing the codec.
///
/// Implementations are single-writer — the encoder delivers access units to
/// one packetizer instance from one logical thread at a time. Concurrent
/// calls into the same instance must be serialized by the caller.
pub trait Packetizer: Send {
    /// Packetize one encoded access unit into zero or more RTP frames.
    ///
    /// Emitted frames carry strictly increasing (wrapping) sequence numbers
    /// in emission order. On error the unit is dropped whole: no partial
    /// packet is emitted and the caller continues with the next unit.
    fn packetize(&mut self, access_unit: &[u8], meta: FrameMeta) -> Result<Vec<RtpFrame>>;

    /// Codec name for the SDP `a=rtpmap` attribute (e.g. `"H264"`).
    fn codec_name(&self) -> &'static str;

    /// RTP clock rate in Hz.
    fn clock_rate(&self) -> u32;

    /// RTP payload type number (RFC 3551). Dynamic types use 96–127.
    fn payload_type(&self) -> u8;

    /// SDP media-level attribute lines for this codec, `a=` prefix included.
    fn sdp_attributes(&self) -> Vec<String>;

    /// Sequence number the next emitted packet will carry (for `RTP-Info`).
    fn next_sequence(&self) -> u16;

    /// Set the destination port pair stamped on emitted frames.
    fn set_ports(&mut self, rtp_port: u16, rtcp_port: u16);
}
