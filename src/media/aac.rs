//! AAC RTP packetizer.
//!
//! Deliberately the simple counterpart of [`super::video`]: encoded AAC
//! frames fit the path MTU, so each frame maps to exactly one RTP packet —
//! 12-byte header plus the frame bytes, marker bit always set (one packet is
//! one complete access unit). The RTP timestamp runs at the audio sample
//! rate instead of the 90 kHz video clock.

use super::frame::{AUDIO_CHANNEL, RtpFrame};
use super::rtp::{RTP_HEADER_LENGTH, RtpHeader};
use super::{FrameMeta, Packetizer};
use crate::error::{Result, StreamError};

/// Sample rates addressable by the 4-bit AudioSpecificConfig index
/// (ISO/IEC 14496-3 §1.6.3.4).
const SAMPLE_RATE_TABLE: [u32; 13] = [
    96_000, 88_200, 64_000, 48_000, 44_100, 32_000, 24_000, 22_050, 16_000, 12_000, 11_025, 8_000,
    7_350,
];

/// AAC audio packetizer: one encoded frame per RTP packet.
#[derive(Debug)]
pub struct AacPacketizer {
    header: RtpHeader,
    sample_rate: u32,
    channels: u8,
    rtp_port: u16,
    rtcp_port: u16,
}

impl AacPacketizer {
    /// Create with explicit payload type and SSRC.
    ///
    /// `sample_rate` doubles as the RTP clock rate; zero is rejected.
    pub fn new(pt: u8, ssrc: u32, sample_rate: u32, channels: u8) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StreamError::InvalidClockRate { rate: sample_rate });
        }
        Ok(Self {
            header: RtpHeader::new(pt, sample_rate, ssrc),
            sample_rate,
            channels,
            rtp_port: 0,
            rtcp_port: 0,
        })
    }

    /// Create with a random SSRC (RFC 3550 §8.1).
    pub fn with_random_ssrc(pt: u8, sample_rate: u32, channels: u8) -> Result<Self> {
        if sample_rate == 0 {
            return Err(StreamError::InvalidClockRate { rate: sample_rate });
        }
        Ok(Self {
            header: RtpHeader::with_random_ssrc(pt, sample_rate),
            sample_rate,
            channels,
            rtp_port: 0,
            rtcp_port: 0,
        })
    }

    /// 2-byte AudioSpecificConfig for AAC-LC: object type 2, the sample rate
    /// index, and the channel configuration. `None` for non-standard rates.
    fn audio_specific_config(&self) -> Option<u16> {
        let index = SAMPLE_RATE_TABLE
            .iter()
            .position(|&r| r == self.sample_rate)? as u16;
        Some((2 << 11) | (index << 7) | ((self.channels as u16) << 3))
    }
}

impl Packetizer for AacPacketizer {
    fn packetize(&mut self, access_unit: &[u8], meta: FrameMeta) -> Result<Vec<RtpFrame>> {
        let hdr = self.header.write(true, meta.presentation_time_us);
        let mut packet = Vec::with_capacity(RTP_HEADER_LENGTH + access_unit.len());
        packet.extend_from_slice(&hdr);
        packet.extend_from_slice(access_unit);

        Ok(vec![RtpFrame::new(
            packet,
            meta.presentation_time_us,
            self.rtp_port,
            self.rtcp_port,
            AUDIO_CHANNEL,
        )])
    }

    fn codec_name(&self) -> &'static str {
        "mpeg4-generic"
    }

    fn clock_rate(&self) -> u32 {
        self.sample_rate
    }

    fn payload_type(&self) -> u8 {
        self.header.pt
    }

    /// RFC 3640 AAC-hbr attributes for the DESCRIBE response.
    fn sdp_attributes(&self) -> Vec<String> {
        let pt = self.header.pt;
        let mut fmtp = format!("a=fmtp:{pt} profile-level-id=1;mode=AAC-hbr");
        if let Some(config) = self.audio_specific_config() {
            fmtp.push_str(&format!(";config={config:04x}"));
        }
        fmtp.push_str(";sizelength=13;indexlength=3;indexdeltalength=3");

        vec![
            format!(
                "a=rtpmap:{pt} {}/{}/{}",
                self.codec_name(),
                self.sample_rate,
                self.channels
            ),
            fmtp,
            "a=control:track2".to_string(),
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
