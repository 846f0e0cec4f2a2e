use std::{fmt, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::settings::Settings;

/// Pixel formats the host media pipeline can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    I420,
    I422,
    I444,
    Nv12,
    Gray8,
    Yuy2,
    Yvyu,
    Uyvy,
    Bgra,
    Bgrx,
    Rgba,
}

impl Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::I420 => f.write_str("i420"),
            Self::I422 => f.write_str("i422"),
            Self::I444 => f.write_str("i444"),
            Self::Nv12 => f.write_str("nv12"),
            Self::Gray8 => f.write_str("gray8"),
            Self::Yuy2 => f.write_str("yuy2"),
            Self::Yvyu => f.write_str("yvyu"),
            Self::Uyvy => f.write_str("uyvy"),
            Self::Bgra => f.write_str("bgra"),
            Self::Bgrx => f.write_str("bgrx"),
            Self::Rgba => f.write_str("rgba"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorRange {
    Limited,
    #[default]
    Full,
}

impl Display for ColorRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited => f.write_str("limited"),
            Self::Full => f.write_str("full"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ColorSpace {
    Bt601,
    #[default]
    Bt709,
}

impl Display for ColorSpace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bt601 => f.write_str("bt601"),
            Self::Bt709 => f.write_str("bt709"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    /// Duration of one frame in microseconds, rounded to the nearest whole
    /// microsecond. Used as the advisory per-frame encode time budget.
    #[must_use]
    pub fn frame_interval_micros(self) -> u64 {
        ((f64::from(self.den) / f64::from(self.num)) * 1_000_000.0).round() as u64
    }
}

impl Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Negotiated properties of the video stream a session encodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoDescriptor {
    pub width: u32,
    pub height: u32,
    pub fps: FrameRate,
    pub format: PixelFormat,
    pub range: ColorRange,
    pub color_space: ColorSpace,
}

impl Display for VideoDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VideoDescriptor({}x{} @ {} fps, format={}, range={}, color_space={})",
            self.width, self.height, self.fps, self.format, self.range, self.color_space
        )
    }
}

/// One decoded frame in host plane/stride layout.
///
/// Planes must match the layout negotiated at construction (see
/// `EncoderAdapter::output_format`); `pts` is in frame-interval ticks of the
/// descriptor's timebase, one tick per frame.
#[derive(Debug, Clone, Copy)]
pub struct VideoFrame<'a> {
    pub planes: [&'a [u8]; 3],
    pub strides: [usize; 3],
    pub pts: i64,
}

/// A compressed frame owned by the adapter, handed out by `finish`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPacket {
    pub pts: i64,
    /// `pts` minus one frame tick.
    pub dts: i64,
    pub keyframe: bool,
    pub data: Vec<u8>,
}

/// Borrowed view of the packet produced by an encode call.
///
/// The payload stays valid until the next call on the adapter; the borrow
/// makes that window explicit, so a host that needs to keep the bytes copies
/// them out first.
#[derive(Debug, Clone, Copy)]
pub struct PacketRef<'a> {
    pub pts: i64,
    pub dts: i64,
    pub keyframe: bool,
    pub data: &'a [u8],
}

impl<'a> From<&'a EncodedPacket> for PacketRef<'a> {
    fn from(packet: &'a EncodedPacket) -> Self {
        Self {
            pts: packet.pts,
            dts: packet.dts,
            keyframe: packet.keyframe,
            data: &packet.data,
        }
    }
}

impl PacketRef<'_> {
    #[must_use]
    pub fn to_owned_packet(&self) -> EncodedPacket {
        EncodedPacket {
            pts: self.pts,
            dts: self.dts,
            keyframe: self.keyframe,
            data: self.data.to_vec(),
        }
    }
}

/// Registration record handed by value to the host's encoder registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderInfo {
    pub id: &'static str,
    pub display_name: &'static str,
    pub codec_tag: &'static str,
}

impl Display for EncoderInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "EncoderInfo(id={}, name={}, codec={})",
            self.id, self.display_name, self.codec_tag
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    #[error("invalid input geometry: {0}")]
    Validation(String),
    #[error("codec rejected configuration: {0}")]
    Configuration(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Lifecycle contract of one encode session.
///
/// Construction is the concrete adapter's `open`, teardown is `Drop`. The
/// host invokes every operation sequentially on one instance; the adapter
/// does no locking of its own.
pub trait EncoderAdapter {
    /// Re-derives the stored codec configuration from the settings bag.
    /// Returns whether the running context must be rebuilt for the change to
    /// take effect; the running context itself is never touched.
    fn update(&mut self, settings: &Settings) -> bool;

    /// Encodes one frame. Emits at most one packet per call; lookahead can
    /// delay output, in which case `Ok(None)` is returned and the packet
    /// surfaces on a later call or at `finish`.
    fn encode(&mut self, frame: &VideoFrame<'_>) -> Result<Option<PacketRef<'_>>, AdapterError>;

    /// Flushes the codec and drains every remaining packet.
    fn finish(&mut self) -> Result<Vec<EncodedPacket>, AdapterError>;

    /// Codec global header for container metadata, valid for the adapter's
    /// lifetime.
    fn extra_data(&self) -> Option<&[u8]>;

    /// The host-side pixel format the session expects to receive, i.e. the
    /// inverse of the construction-time format mapping.
    fn output_format(&self) -> PixelFormat;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_interval_rounds_to_whole_micros() {
        assert_eq!(FrameRate { num: 30, den: 1 }.frame_interval_micros(), 33_333);
        assert_eq!(FrameRate { num: 60, den: 1 }.frame_interval_micros(), 16_667);
        assert_eq!(
            FrameRate {
                num: 60_000,
                den: 1001
            }
            .frame_interval_micros(),
            16_683
        );
    }

    #[test]
    fn packet_ref_round_trips_to_owned() {
        let packet = EncodedPacket {
            pts: 7,
            dts: 6,
            keyframe: true,
            data: vec![1, 2, 3],
        };
        let view = PacketRef::from(&packet);
        assert_eq!(view.to_owned_packet(), packet);
    }
}
