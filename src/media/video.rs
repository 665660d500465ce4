//! H.264 / H.265 RTP packetization (RFC 6184 / RFC 7798).
//!
//! One shared framing routine handles both codecs; everything that differs —
//! NAL header width, type-bit extraction, fragmentation and aggregation
//! constants, keyframe NAL types — lives in the [`VideoCodec`] descriptor.
//!
//! Three packet shapes are produced:
//!
//! - **Single NAL unit**: the NAL (header + payload) fits the packet size
//!   budget and is copied directly after the RTP header.
//!
//! - **Aggregation unit** (STAP-A-style): SPS and PPS bundled into one
//!   length-prefixed payload, built once at construction (and on parameter
//!   set change) and re-emitted ahead of every keyframe:
//!
//!   ```text
//!   [agg type] [len1 hi] [len1 lo] [SPS ...] [len2 hi] [len2 lo] [PPS ...]
//!   ```
//!
//! - **Fragmentation unit**: NALs exceeding the budget are split across
//!   packets, each prefixed with a 2-byte FU header:
//!
//!   ```text
//!   FU indicator:  importance bits | FU type constant   (1 byte)
//!   FU header:     [S|E|  NAL type]                     (1 byte)
//!   ```
//!
//!   **S** (0x80) is set on the first fragment only, **E** (0x40) on the
//!   last only; interior fragments carry neither. The RTP marker bit rides
//!   on the final fragment of the access unit.

use base64::prelude::{BASE64_STANDARD, Engine as _};

use super::frame::{RtpFrame, VIDEO_CHANNEL};
use super::rtp::{RTP_HEADER_LENGTH, RtpHeader, VIDEO_CLOCK_RATE};
use super::{FrameMeta, Packetizer};
use crate::error::{Result, StreamError};

const DEFAULT_MAX_PACKET_SIZE: usize = 1400;

/// Access units arrive with a 4-byte Annex B start code prefix.
const START_CODE_LENGTH: usize = 4;

/// FU indicator + FU header.
const FU_HEADER_LENGTH: usize = 2;

const FU_START_BIT: u8 = 0x80;
const FU_END_BIT: u8 = 0x40;

/// Codec descriptor: the bit-level constants that distinguish H.264 from
/// H.265 packetization. The framing loop itself is codec-agnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    /// NAL unit header width: 1 byte for H.264, 2 for H.265.
    fn nal_header_len(self) -> usize {
        match self {
            Self::H264 => 1,
            Self::H265 => 2,
        }
    }

    /// Extract the NAL unit type from the header.
    ///
    /// H.264: low 5 bits of the single header byte. H.265: bits 1–6 of the
    /// first header byte (`F | Type(6) | LayerId-high`).
    fn nal_type(self, header: &[u8]) -> u8 {
        match self {
            Self::H264 => header[0] & 0x1f,
            Self::H265 => (header[0] >> 1) & 0x3f,
        }
    }

    /// NAL types that open a keyframe and trigger the parameter-set
    /// aggregation packet: IDR slices (H.264 type 5; H.265 IDR_W_RADL /
    /// IDR_N_LP, types 19 and 20).
    fn is_keyframe_nal(self, nal_type: u8) -> bool {
        match self {
            Self::H264 => nal_type == 5,
            Self::H265 => nal_type == 19 || nal_type == 20,
        }
    }

    /// First byte of the aggregation unit.
    ///
    /// H.264: STAP-A, type 24 (RFC 6184 §5.7.1). H.265: the AP type 48 in
    /// payload-header position (RFC 7798 §4.4.2).
    fn aggregation_header(self) -> u8 {
        match self {
            Self::H264 => 24,
            Self::H265 => 48 << 1,
        }
    }

    /// FU indicator: the original NAL's importance bits OR'd with the
    /// codec's fragmentation-unit type constant (28 for H.264 FU-A, 49 for
    /// H.265 FU).
    fn fu_indicator(self, first_header_byte: u8) -> u8 {
        match self {
            Self::H264 => (first_header_byte & 0x60) | 28,
            Self::H265 => (first_header_byte & 0x81) | (49 << 1),
        }
    }

    /// NAL type bits carried in the FU header alongside the S/E flags.
    fn fu_type(self, first_header_byte: u8) -> u8 {
        match self {
            Self::H264 => first_header_byte & 0x1f,
            Self::H265 => (first_header_byte >> 1) & 0x3f,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::H264 => "H264",
            Self::H265 => "H265",
        }
    }
}

/// Video RTP packetizer, shared between H.264 and H.265.
///
/// Consumes one access unit per call (a start-code-prefixed NAL plus its
/// encoder metadata) and emits ready-to-send [`RtpFrame`]s. The parameter
/// sets supplied at construction are cached as an aggregation unit and
/// re-emitted ahead of every keyframe until
/// [`set_parameter_sets`](Self::set_parameter_sets) replaces them.
#[derive(Debug)]
pub struct VideoPacketizer {
    header: RtpHeader,
    codec: VideoCodec,
    max_packet_size: usize,
    aggregation: Vec<u8>,
    sps: Vec<u8>,
    pps: Vec<u8>,
    vps: Option<Vec<u8>>,
    rtp_port: u16,
    rtcp_port: u16,
}

impl VideoPacketizer {
    /// Create an H.264 packetizer with explicit payload type and SSRC.
    pub fn h264(pt: u8, ssrc: u32, sps: &[u8], pps: &[u8]) -> Result<Self> {
        Self::new(VideoCodec::H264, RtpHeader::new(pt, VIDEO_CLOCK_RATE, ssrc), None, sps, pps)
    }

    /// Create an H.264 packetizer with a random SSRC (RFC 3550 §8.1).
    pub fn h264_with_random_ssrc(pt: u8, sps: &[u8], pps: &[u8]) -> Result<Self> {
        Self::new(
            VideoCodec::H264,
            RtpHeader::with_random_ssrc(pt, VIDEO_CLOCK_RATE),
            None,
            sps,
            pps,
        )
    }

    /// Create an H.265 packetizer with explicit payload type and SSRC.
    ///
    /// The VPS is retained for SDP generation; the aggregation unit itself
    /// bundles SPS and PPS, matching the two-entry wire layout.
    pub fn h265(pt: u8, ssrc: u32, vps: &[u8], sps: &[u8], pps: &[u8]) -> Result<Self> {
        if vps.is_empty() {
            return Err(StreamError::MissingParameterSets);
        }
        Self::new(
            VideoCodec::H265,
            RtpHeader::new(pt, VIDEO_CLOCK_RATE, ssrc),
            Some(vps.to_vec()),
            sps,
            pps,
        )
    }

    fn new(
        codec: VideoCodec,
        header: RtpHeader,
        vps: Option<Vec<u8>>,
        sps: &[u8],
        pps: &[u8],
    ) -> Result<Self> {
        if sps.is_empty() || pps.is_empty() {
            return Err(StreamError::MissingParameterSets);
        }
        let aggregation = build_aggregation(codec, sps, pps)?;
        tracing::debug!(
            codec = codec.name(),
            sps_len = sps.len(),
            pps_len = pps.len(),
            "video packetizer created"
        );
        Ok(Self {
            header,
            codec,
            max_packet_size: DEFAULT_MAX_PACKET_SIZE,
            aggregation,
            sps: sps.to_vec(),
            pps: pps.to_vec(),
            vps,
            rtp_port: 0,
            rtcp_port: 0,
        })
    }

    pub fn codec(&self) -> VideoCodec {
        self.codec
    }

    /// Replace the cached parameter sets and rebuild the aggregation unit.
    ///
    /// Called when the encoder signals a parameter set change; subsequent
    /// keyframes emit the new bundle.
    pub fn set_parameter_sets(&mut self, sps: &[u8], pps: &[u8]) -> Result<()> {
        if sps.is_empty() || pps.is_empty() {
            return Err(StreamError::MissingParameterSets);
        }
        self.aggregation = build_aggregation(self.codec, sps, pps)?;
        self.sps = sps.to_vec();
        self.pps = pps.to_vec();
        tracing::debug!(
            codec = self.codec.name(),
            sps_len = sps.len(),
            pps_len = pps.len(),
            "parameter sets replaced"
        );
        Ok(())
    }

    /// Set the packet size budget (RTP header included).
    ///
    /// Must leave room for the RTP header, a fragmentation header, and at
    /// least one payload byte.
    pub fn set_max_packet_size(&mut self, size: usize) -> Result<()> {
        if size <= RTP_HEADER_LENGTH + FU_HEADER_LENGTH {
            return Err(StreamError::InvalidMaxPacketSize { size });
        }
        self.max_packet_size = size;
        Ok(())
    }

    fn frame(&self, packet: Vec<u8>, timestamp_us: u64) -> RtpFrame {
        RtpFrame::new(packet, timestamp_us, self.rtp_port, self.rtcp_port, VIDEO_CHANNEL)
    }

    /// Emit the cached parameter-set bundle as one marked packet.
    fn aggregation_frame(&mut self, timestamp_us: u64) -> RtpFrame {
        let hdr = self.header.write(true, timestamp_us);
        let mut packet = Vec::with_capacity(RTP_HEADER_LENGTH + self.aggregation.len());
        packet.extend_from_slice(&hdr);
        packet.extend_from_slice(&self.aggregation);
        self.frame(packet, timestamp_us)
    }

    fn get_profile_level_id(&self) -> Option<String> {
        // SPS bytes 1–3: profile_idc, constraint_set flags, level_idc (RFC 6184 §8.1).
        if self.sps.len() < 4 {
            return None;
        }
        Some(format!("{:02x}{:02x}{:02x}", self.sps[1], self.sps[2], self.sps[3]))
    }
}

/// Build the two-entry aggregation payload: type byte, then each parameter
/// set prefixed by its big-endian u16 length. Total length is
/// `sps.len() + pps.len() + 5`.
fn build_aggregation(codec: VideoCodec, sps: &[u8], pps: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(sps.len() + pps.len() + 5);
    out.push(codec.aggregation_header());
    for set in [sps, pps] {
        let len = u16::try_from(set.len())
            .map_err(|_| StreamError::ParameterSetTooLarge { size: set.len() })?;
        out.extend_from_slice(&len.to_be_bytes());
        out.extend_from_slice(set);
    }
    Ok(out)
}

impl Packetizer for VideoPacketizer {
    fn packetize(&mut self, access_unit: &[u8], meta: FrameMeta) -> Result<Vec<RtpFrame>> {
        let header_len = START_CODE_LENGTH + self.codec.nal_header_len();
        if access_unit.len() < header_len {
            return Err(StreamError::TruncatedAccessUnit {
                needed: header_len,
                got: access_unit.len(),
            });
        }
        let nal_header = &access_unit[START_CODE_LENGTH..header_len];
        let payload = &access_unit[header_len..];
        let pts = meta.presentation_time_us;
        let nal_type = self.codec.nal_type(nal_header);

        let mut frames = Vec::new();

        // Keyframe boundary: resend the parameter sets ahead of the slice so
        // receivers can join mid-stream.
        if meta.is_key_frame || self.codec.is_keyframe_nal(nal_type) {
            frames.push(self.aggregation_frame(pts));
        }

        let mtu_payload = self.max_packet_size - RTP_HEADER_LENGTH;
        let nalu_length = payload.len() + self.codec.nal_header_len();

        if nalu_length <= mtu_payload - FU_HEADER_LENGTH {
            // Single NAL unit packet. The boundary is inclusive; an empty
            // payload still emits the header bytes as one packet.
            let hdr = self.header.write(true, pts);
            let mut packet = Vec::with_capacity(RTP_HEADER_LENGTH + nalu_length);
            packet.extend_from_slice(&hdr);
            packet.extend_from_slice(nal_header);
            packet.extend_from_slice(payload);
            frames.push(self.frame(packet, pts));
        } else {
            let indicator = self.codec.fu_indicator(nal_header[0]);
            let type_bits = self.codec.fu_type(nal_header[0]);
            let capacity = mtu_payload - FU_HEADER_LENGTH;

            let mut offset = 0usize;
            let mut first = true;
            while offset < payload.len() {
                let remaining = payload.len() - offset;
                let last = remaining <= capacity;
                let chunk = &payload[offset..offset + remaining.min(capacity)];

                let mut fu_header = type_bits;
                if first {
                    fu_header |= FU_START_BIT;
                }
                if last {
                    fu_header |= FU_END_BIT;
                }

                let hdr = self.header.write(last, pts);
                let mut packet =
                    Vec::with_capacity(RTP_HEADER_LENGTH + FU_HEADER_LENGTH + chunk.len());
                packet.extend_from_slice(&hdr);
                packet.push(indicator);
                packet.push(fu_header);
                packet.extend_from_slice(chunk);
                frames.push(self.frame(packet, pts));

                offset += chunk.len();
                first = false;
            }

            tracing::trace!(
                codec = self.codec.name(),
                nal_type,
                nalu_length,
                fragments = frames.len(),
                "fragmented NAL unit"
            );
        }

        tracing::trace!(
            codec = self.codec.name(),
            nal_type,
            packets = frames.len(),
            seq = self.header.sequence(),
            "access unit packetized"
        );

        Ok(frames)
    }

    fn codec_name(&self) -> &'static str {
        self.codec.name()
    }

    /// 90 kHz clock rate per RFC 6184 §8.1 / RFC 7798 §7.1.
    fn clock_rate(&self) -> u32 {
        VIDEO_CLOCK_RATE
    }

    fn payload_type(&self) -> u8 {
        self.header.pt
    }

    /// SDP media-level attributes.
    ///
    /// `a=rtpmap` precedes `a=fmtp` — clients parse attributes sequentially
    /// and the fmtp line references the payload type defined by rtpmap.
    fn sdp_attributes(&self) -> Vec<String> {
        let pt = self.header.pt;
        let fmtp = match self.codec {
            VideoCodec::H264 => {
                let mut line = format!("a=fmtp:{pt} packetization-mode=1");
                if let Some(pl) = self.get_profile_level_id() {
                    line.push_str(&format!(";profile-level-id={pl}"));
                }
                line.push_str(&format!(
                    ";sprop-parameter-sets={},{}",
                    BASE64_STANDARD.encode(&self.sps),
                    BASE64_STANDARD.encode(&self.pps)
                ));
                line
            }
            VideoCodec::H265 => {
                let vps = self.vps.as_deref().unwrap_or_default();
                format!(
                    "a=fmtp:{pt} sprop-vps={};sprop-sps={};sprop-pps={}",
                    BASE64_STANDARD.encode(vps),
                    BASE64_STANDARD.encode(&self.sps),
                    BASE64_STANDARD.encode(&self.pps)
                )
            }
        };

        vec![
            format!("a=rtpmap:{pt} {}/{}", self.codec.name(), VIDEO_CLOCK_RATE),
            fmtp,
            "a=control:track1".to_string(),
        ]
    }

    fn next_sequence(&self) -> u16 {
        self.header.sequence()
    }

    fn set_ports(&mut self, rtp_port: u16, rtcp_port: u16) {
        self.rtp_port = rtp_port;
        self.rtcp_port = rtcp_port;
    }
}
