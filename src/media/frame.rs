/// Interleave channel for video frames (RTSP interleaved pair 2-3).
pub const VIDEO_CHANNEL: u8 = 2;

/// Interleave channel for audio frames (RTSP interleaved pair 0-1).
pub const AUDIO_CHANNEL: u8 = 0;

/// A ready-to-send RTP packet with its delivery addressing.
///
/// Produced by the packetizers and handed to the transport sender, which
/// writes `payload` to the socket. Immutable once constructed: the buffer is
/// exclusively owned by this frame until the sender releases it.
///
/// `rtp_port`/`rtcp_port` address UDP delivery; `channel` selects the
/// interleaved channel when the session runs over TCP instead.
#[derive(Debug, Clone)]
pub struct RtpFrame {
    /// Complete packet bytes: 12-byte RTP header followed by the payload.
    pub payload: Vec<u8>,
    /// Encoder presentation time of the access unit, microseconds.
    pub timestamp_us: u64,
    /// Packet length in bytes (equals `payload.len()`).
    pub length: u32,
    /// Destination RTP port.
    pub rtp_port: u16,
    /// Destination RTCP port (typically `rtp_port + 1`).
    pub rtcp_port: u16,
    /// Interleave channel identifier for TCP transport.
    pub channel: u8,
}

impl RtpFrame {
    pub fn new(
        payload: Vec<u8>,
        timestamp_us: u64,
        rtp_port: u16,
        rtcp_port: u16,
        channel: u8,
    ) -> Self {
        Self {
            length: payload.len() as u32,
            payload,
            timestamp_us,
            rtp_port,
            rtcp_port,
            channel,
        }
    }

    /// True when this frame carries video (by interleave channel convention).
    pub fn is_video(&self) -> bool {
        self.channel == VIDEO_CHANNEL
    }
}
