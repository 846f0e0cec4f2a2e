//! AV1 encode-session adapter for a host media pipeline.
//!
//! The crate owns no encoding logic of its own: it maps host pixel formats
//! and a flat settings bag onto a rav1e encoder context and drives it one
//! frame at a time, draining compressed packets back into host-shaped
//! structures.

mod contract;
mod formats;
mod rav1e_backend;
mod settings;

pub use contract::{
    AdapterError, ColorRange, ColorSpace, EncodedPacket, EncoderAdapter, EncoderInfo, FrameRate,
    PacketRef, PixelFormat, VideoDescriptor, VideoFrame,
};
pub use formats::PlaneLayout;
pub use rav1e_backend::{Rav1eEncoderAdapter, default_settings};
pub use settings::{
    EncoderSettings, OPTIONS, OptionRange, Profile, RateControlMode, Settings, keys, option_range,
};

/// Registration record for the host's encoder registry. Built per call; the
/// host keeps whatever copies it needs.
#[must_use]
pub fn encoder_info() -> EncoderInfo {
    EncoderInfo {
        id: "av1-rav1e",
        display_name: "AV1 (rav1e)",
        codec_tag: "av01",
    }
}

/// Opens one encode session behind the host-facing trait.
pub fn open_session(
    settings: &Settings,
    descriptor: &VideoDescriptor,
) -> Result<Box<dyn EncoderAdapter>, AdapterError> {
    Ok(Box::new(Rav1eEncoderAdapter::open(settings, descriptor)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_info_is_stable() {
        let info = encoder_info();
        assert_eq!(info.id, "av1-rav1e");
        assert_eq!(info.codec_tag, "av01");
    }

    #[test]
    fn open_session_rejects_odd_geometry() {
        let descriptor = VideoDescriptor {
            width: 65,
            height: 64,
            fps: FrameRate { num: 30, den: 1 },
            format: PixelFormat::I420,
            range: ColorRange::Limited,
            color_space: ColorSpace::Bt709,
        };
        match open_session(&default_settings(), &descriptor) {
            Err(AdapterError::Validation(message)) => {
                assert!(message.contains("even"));
            }
            Ok(_) => panic!("odd geometry must not open a session"),
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }
}
