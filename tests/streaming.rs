//! Integration test: a keyframe access unit flowing through packetization
//! and the transport-side bandwidth feedback loop.
//!
//! Models one encoder tick of a live session: parameter sets cached at
//! setup, a keyframe slice large enough to fragment, then the transport
//! reporting write timings back to the bandwidth estimator.

use std::sync::Arc;

use rtpstream::{
    AacPacketizer, BandwidthEstimator, BandwidthListener, ConnectionQuality, FrameMeta, Packetizer,
    RtpFrame, VideoPacketizer,
};

const RTP_HEADER_LENGTH: usize = 12;

fn seq_of(frame: &RtpFrame) -> u16 {
    u16::from_be_bytes([frame.payload[2], frame.payload[3]])
}

fn marker_of(frame: &RtpFrame) -> bool {
    frame.payload[1] & 0x80 != 0
}

fn rtp_timestamp_of(frame: &RtpFrame) -> u32 {
    u32::from_be_bytes(frame.payload[4..8].try_into().unwrap())
}

#[test]
fn keyframe_emits_aggregation_then_three_fragments() {
    let sps = [0x67u8; 10];
    let pps = [0x68u8; 4];
    let mut packetizer = VideoPacketizer::h264(96, 0xAABBCCDD, &sps, &pps).unwrap();
    packetizer.set_max_packet_size(1400).unwrap();
    packetizer.set_ports(5000, 5001);

    // IDR access unit: 4-byte start code, 1 NAL header byte, 2999 payload
    // bytes — a 3000-byte NAL against a fragment capacity of
    // 1400 - 12 - 2 = 1386.
    let mut access_unit = vec![0, 0, 0, 1, 0x65];
    access_unit.extend(std::iter::repeat_n(0x42u8, 2999));

    let meta = FrameMeta {
        presentation_time_us: 33_333,
        is_key_frame: true,
    };
    let frames = packetizer.packetize(&access_unit, meta).unwrap();
    assert_eq!(frames.len(), 4);

    // Aggregation packet: type byte + two length-prefixed parameter sets.
    let stap = &frames[0];
    assert!(marker_of(stap));
    assert_eq!(stap.payload.len(), RTP_HEADER_LENGTH + 10 + 4 + 5);
    assert_eq!(stap.payload[RTP_HEADER_LENGTH], 24);
    assert_eq!(&stap.payload[RTP_HEADER_LENGTH + 1..RTP_HEADER_LENGTH + 3], &[0, 10]);
    assert_eq!(
        &stap.payload[RTP_HEADER_LENGTH + 13..RTP_HEADER_LENGTH + 15],
        &[0, 4]
    );

    // Fragments: 1386 + 1386 + 227 payload bytes.
    assert_eq!(frames[1].payload.len(), 1400);
    assert_eq!(frames[2].payload.len(), 1400);
    assert_eq!(frames[3].payload.len(), RTP_HEADER_LENGTH + 2 + 227);

    let fu = |f: &RtpFrame| f.payload[RTP_HEADER_LENGTH + 1];
    assert_eq!(fu(&frames[1]) & 0xc0, 0x80, "first fragment: start bit only");
    assert_eq!(fu(&frames[2]) & 0xc0, 0x00, "interior fragment: neither bit");
    assert_eq!(fu(&frames[3]) & 0xc0, 0x40, "last fragment: end bit only");

    assert!(!marker_of(&frames[1]));
    assert!(!marker_of(&frames[2]));
    assert!(marker_of(&frames[3]));

    // Contiguous sequence numbers across the whole emission.
    for (i, frame) in frames.iter().enumerate() {
        assert_eq!(seq_of(frame), i as u16);
        assert_eq!(rtp_timestamp_of(frame), 33_333 * 90_000 / 1_000_000);
        assert_eq!(frame.rtp_port, 5000);
        assert_eq!(frame.rtcp_port, 5001);
    }

    // The next delta frame picks up the sequence where the keyframe left off.
    let delta = [0u8, 0, 0, 1, 0x41, 0xAA, 0xBB];
    let next = packetizer
        .packetize(
            &delta,
            FrameMeta {
                presentation_time_us: 66_666,
                is_key_frame: false,
            },
        )
        .unwrap();
    assert_eq!(next.len(), 1);
    assert_eq!(seq_of(&next[0]), 4);
    assert!(marker_of(&next[0]));
}

#[test]
fn audio_track_one_packet_per_frame() {
    let mut packetizer = AacPacketizer::new(97, 0x11223344, 48_000, 2).unwrap();
    let frame_bytes = [0x21u8, 0x1b, 0x80, 0x00];

    for i in 0..3u64 {
        let frames = packetizer
            .packetize(
                &frame_bytes,
                FrameMeta {
                    presentation_time_us: i * 21_333, // 1024 samples at 48 kHz
                    is_key_frame: false,
                },
            )
            .unwrap();
        assert_eq!(frames.len(), 1);
        assert!(marker_of(&frames[0]));
        assert_eq!(seq_of(&frames[0]), i as u16);
        assert!(!frames[0].is_video());
    }
}

struct BitrateController(Arc<parking_lot::Mutex<Vec<f64>>>);

impl BandwidthListener for BitrateController {
    fn on_bandwidth_estimate(&self, bits_per_ms: f64) {
        self.0.lock().push(bits_per_ms);
    }
}

#[test]
fn transport_feedback_drives_bandwidth_estimate() {
    let estimator = Arc::new(BandwidthEstimator::new());
    let estimates = Arc::new(parking_lot::Mutex::new(Vec::new()));
    estimator.register(Box::new(BitrateController(estimates.clone())));

    let sps = [0x67u8, 0x42, 0x00, 0x1e];
    let pps = [0x68u8, 0xce, 0x38, 0x80];
    let mut packetizer = VideoPacketizer::h264(96, 0x5555AAAA, &sps, &pps).unwrap();

    // "Send" each packet and report its write timing, the way a transport
    // writer would after a successful socket write.
    let mut access_unit = vec![0, 0, 0, 1, 0x65];
    access_unit.extend(std::iter::repeat_n(0x42u8, 4000));
    let frames = packetizer
        .packetize(
            &access_unit,
            FrameMeta {
                presentation_time_us: 0,
                is_key_frame: true,
            },
        )
        .unwrap();

    for frame in &frames {
        estimator.add_sample(frame.length as u64, 2);
    }

    assert_eq!(estimates.lock().len(), frames.len());
    assert!(estimator.estimate().is_some());
    assert_ne!(estimator.quality(), ConnectionQuality::Unknown);

    // Stream teardown: the estimator is reusable for the next session.
    estimator.reset();
    assert_eq!(estimator.quality(), ConnectionQuality::Unknown);
    assert_eq!(estimator.estimate(), None);
}
