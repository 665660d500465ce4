use rand::RngExt;

/// Length of the RTP fixed header written by [`RtpHeader::write`].
pub const RTP_HEADER_LENGTH: usize = 12;

/// RTP clock rate for video payloads (RFC 3551 §4).
pub const VIDEO_CLOCK_RATE: u32 = 90_000;

/// Generic RTP fixed header builder (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// This struct is shared by all codec packetizers. It manages:
/// - **Sequence number**: 16-bit, wrapping — incremented on every packet.
///   Single-writer: each packetizer owns its header state exclusively, so no
///   two packets from the same instance can share a sequence number.
/// - **Timestamp**: derived from the encoder's presentation time in
///   microseconds, scaled to the codec clock rate and truncated to 32 bits
///   on the wire.
/// - **SSRC**: randomly generated per RFC 3550 §8.1 to avoid collisions.
///
/// Version is always 2. Padding, extension, and CSRC count are always 0.
#[derive(Debug)]
pub struct RtpHeader {
    /// RTP payload type (7-bit, RFC 3551).
    pub pt: u8,
    /// Synchronization source identifier (RFC 3550 §8.1).
    pub ssrc: u32,
    clock_rate: u32,
    sequence: u16,
}

impl RtpHeader {
    /// Create a new RTP header state with explicit SSRC.
    pub fn new(pt: u8, clock_rate: u32, ssrc: u32) -> Self {
        tracing::debug!(
            pt,
            clock_rate,
            ssrc = format_args!("{:#010X}", ssrc),
            "RTP header state created"
        );
        Self {
            pt,
            ssrc,
            clock_rate,
            sequence: 0,
        }
    }

    /// Create with a random SSRC.
    ///
    /// Per RFC 3550 §8.1, the SSRC should be chosen randomly to minimize
    /// the probability of collisions between independent sessions.
    pub fn with_random_ssrc(pt: u8, clock_rate: u32) -> Self {
        let ssrc = rand::rng().random::<u32>();
        Self::new(pt, clock_rate, ssrc)
    }

    /// Sequence number the next [`write`](Self::write) call will assign.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Codec clock rate in Hz.
    pub fn clock_rate(&self) -> u32 {
        self.clock_rate
    }

    /// Map a presentation time in microseconds to RTP clock ticks.
    ///
    /// `ticks = pts_us * clock_rate / 1_000_000`, wrapped to 32 bits for the
    /// wire. Widened to u128 so long-running sessions cannot overflow the
    /// intermediate product.
    pub fn rtp_timestamp(&self, presentation_time_us: u64) -> u32 {
        (presentation_time_us as u128 * self.clock_rate as u128 / 1_000_000) as u32
    }

    /// Serialize a 12-byte RTP fixed header and advance the sequence number.
    ///
    /// The `marker` bit (RFC 3550 §5.1) signals the last packet of an access
    /// unit (RFC 6184 §5.1 for H.264). It shares byte 1 with the payload
    /// type and never disturbs the PT bits.
    pub fn write(&mut self, marker: bool, presentation_time_us: u64) -> [u8; RTP_HEADER_LENGTH] {
        let first_byte: u8 = 2 << 6;
        let second_byte: u8 = ((marker as u8) << 7) | self.pt;

        let mut header = [0u8; RTP_HEADER_LENGTH];
        header[0] = first_byte;
        header[1] = second_byte;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&self.rtp_timestamp(presentation_time_us).to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_header() -> RtpHeader {
        RtpHeader::new(96, VIDEO_CLOCK_RATE, 0xAABBCCDD)
    }

    #[test]
    fn version_is_2() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        assert_eq!(buf[0] >> 6, 2);
    }

    #[test]
    fn marker_bit() {
        let mut h = make_header();
        let no_marker = h.write(false, 0);
        assert_eq!(no_marker[1] & 0x80, 0);

        let with_marker = h.write(true, 0);
        assert_eq!(with_marker[1] & 0x80, 0x80);
    }

    #[test]
    fn payload_type_survives_marker() {
        let mut h = make_header();
        let buf = h.write(true, 0);
        assert_eq!(buf[1] & 0x7f, 96);
    }

    #[test]
    fn sequence_increments() {
        let mut h = make_header();
        let b1 = h.write(false, 0);
        let seq1 = u16::from_be_bytes([b1[2], b1[3]]);
        let b2 = h.write(false, 0);
        let seq2 = u16::from_be_bytes([b2[2], b2[3]]);
        assert_eq!(seq2, seq1 + 1);
    }

    #[test]
    fn sequence_wraps() {
        let mut h = make_header();
        h.sequence = u16::MAX;
        let buf = h.write(false, 0);
        let seq = u16::from_be_bytes([buf[2], buf[3]]);
        assert_eq!(seq, u16::MAX);
        assert_eq!(h.sequence(), 0);
    }

    #[test]
    fn ssrc_written() {
        let mut h = make_header();
        let buf = h.write(false, 0);
        let ssrc = u32::from_be_bytes([buf[8], buf[9], buf[10], buf[11]]);
        assert_eq!(ssrc, 0xAABBCCDD);
    }

    #[test]
    fn timestamp_scaled_to_clock_rate() {
        // 1 second of presentation time = 90_000 ticks at the video clock.
        let mut h = make_header();
        let buf = h.write(false, 1_000_000);
        let ts = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(ts, 90_000);
    }

    #[test]
    fn timestamp_at_audio_clock_rate() {
        let mut h = RtpHeader::new(97, 44_100, 0x1234);
        let buf = h.write(false, 500_000);
        let ts = u32::from_be_bytes([buf[4], buf[5], buf[6], buf[7]]);
        assert_eq!(ts, 22_050);
    }

    #[test]
    fn timestamp_wraps_to_32_bits() {
        let h = make_header();
        // Past the 32-bit tick horizon: only the low 32 bits go on the wire.
        let big_pts = (u32::MAX as u64 + 1) * 1_000_000 / VIDEO_CLOCK_RATE as u64;
        let ticks = h.rtp_timestamp(big_pts);
        assert!(ticks < VIDEO_CLOCK_RATE);
    }

    #[test]
    fn random_ssrc_differs() {
        let h1 = RtpHeader::with_random_ssrc(96, VIDEO_CLOCK_RATE);
        let h2 = RtpHeader::with_random_ssrc(96, VIDEO_CLOCK_RATE);
        assert_ne!(h1.ssrc, h2.ssrc);
    }
}
