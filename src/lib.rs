pub mod error;
pub mod media;
pub mod network;

pub use error::{Result, StreamError};
pub use media::aac::AacPacketizer;
pub use media::video::{VideoCodec, VideoPacketizer};
pub use media::{FrameMeta, Packetizer, RtpFrame};
pub use network::{BandwidthEstimator, BandwidthListener, ConnectionQuality};
