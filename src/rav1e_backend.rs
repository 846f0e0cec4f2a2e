use std::collections::VecDeque;
use std::time::{Duration, Instant};

use rav1e::prelude::{
    ChromaSampling, ColorDescription, ColorPrimaries, Config, Context, EncoderConfig,
    EncoderStatus, FrameType, MatrixCoefficients, Packet, PixelRange, Rational,
    TransferCharacteristics,
};
use tracing::{debug, info, warn};

use crate::contract::{
    AdapterError, ColorRange, ColorSpace, EncodedPacket, EncoderAdapter, PacketRef, PixelFormat,
    VideoDescriptor, VideoFrame,
};
use crate::formats::PlaneLayout;
use crate::settings::{keys, EncoderSettings, RateControlMode, Settings};

/// Settings bag seeded from the codec's own default configuration, so
/// options the host never touches stay at codec defaults instead of zero.
#[must_use]
pub fn default_settings() -> Settings {
    let enc = EncoderConfig::default();
    let mut bag = Settings::catalog_defaults();
    bag.set(keys::ERROR_RESILIENT, i64::from(enc.error_resilient));
    bag.set(
        keys::LOOKAHEAD_FRAMES,
        enc.speed_settings.rdo_lookahead_frames as i64,
    );
    bag.set(keys::RC_MODE, if enc.bitrate > 0 { 0 } else { 2 });
    bag.set(keys::RC_QUANTIZER_MIN, i64::from(enc.min_quantizer));
    bag.set(keys::RC_QUANTIZER_MAX, enc.quantizer as i64);
    bag.set(
        keys::RC_BUFFER_FRAME_DELAY,
        i64::from(enc.reservoir_frame_delay.unwrap_or(0)),
    );
    bag.set(keys::KF_INTERVAL_MIN, enc.min_key_frame_interval as i64);
    bag.set(keys::KF_INTERVAL_MAX, enc.max_key_frame_interval as i64);
    bag
}

/// One encode session over a rav1e context.
pub struct Rav1eEncoderAdapter {
    layout: PlaneLayout,
    width: u32,
    height: u32,
    settings: EncoderSettings,
    context: Context<u8>,
    sequence_header: Vec<u8>,
    frame_budget: Duration,
    frames_submitted: u64,
    in_flight: VecDeque<(u64, i64)>,
    ready: VecDeque<EncodedPacket>,
    current: Option<EncodedPacket>,
}

impl Rav1eEncoderAdapter {
    pub fn open(settings: &Settings, descriptor: &VideoDescriptor) -> Result<Self, AdapterError> {
        if descriptor.width % 2 != 0 || descriptor.height % 2 != 0 {
            return Err(AdapterError::Validation(format!(
                "resolution {}x{} must be even in both axes",
                descriptor.width, descriptor.height
            )));
        }
        if descriptor.fps.num == 0 || descriptor.fps.den == 0 {
            return Err(AdapterError::Validation(format!(
                "frame rate {} must have nonzero terms",
                descriptor.fps
            )));
        }

        let (layout, fallback) = PlaneLayout::map_host(descriptor.format);
        if fallback {
            warn!(
                "pixel format {} is not a codec input format, falling back to {}",
                descriptor.format,
                layout.host_format()
            );
        }

        let parsed = EncoderSettings::from_bag(settings);
        if !parsed.profile.supports(layout) {
            return Err(AdapterError::Configuration(format!(
                "profile {} does not admit {} input",
                parsed.profile, layout
            )));
        }

        let frame_budget = Duration::from_micros(descriptor.fps.frame_interval_micros());
        let config = build_codec_config(&parsed, descriptor, layout);
        let context: Context<u8> = config.new_context().map_err(|err| {
            AdapterError::Configuration(format!("codec context init failed: {err}"))
        })?;
        let sequence_header = context.container_sequence_header();

        info!(
            width = descriptor.width,
            height = descriptor.height,
            layout = %layout,
            budget_us = frame_budget.as_micros() as u64,
            "encoder session initialized"
        );

        Ok(Self {
            layout,
            width: descriptor.width,
            height: descriptor.height,
            settings: parsed,
            context,
            sequence_header,
            frame_budget,
            frames_submitted: 0,
            in_flight: VecDeque::new(),
            ready: VecDeque::new(),
            current: None,
        })
    }

    /// Advisory wall-clock budget for one encode call, derived from the
    /// descriptor frame rate.
    #[must_use]
    pub fn frame_time_budget(&self) -> Duration {
        self.frame_budget
    }

    #[must_use]
    pub fn plane_layout(&self) -> PlaneLayout {
        self.layout
    }

    fn validate_planes(&self, frame: &VideoFrame<'_>) -> Result<(), AdapterError> {
        for plane in 0..3 {
            let (rows, cols) = self.layout.plane_dimensions(plane, self.width, self.height);
            let stride = frame.strides[plane];
            if stride < cols {
                return Err(AdapterError::Validation(format!(
                    "plane {plane} stride {stride} is smaller than its row width {cols}"
                )));
            }
            let required = stride * (rows - 1) + cols;
            if frame.planes[plane].len() < required {
                return Err(AdapterError::Validation(format!(
                    "plane {plane} payload size mismatch: expected at least {required}, got {}",
                    frame.planes[plane].len()
                )));
            }
        }
        Ok(())
    }

    fn queue_packet(&mut self, packet: Packet<u8>) {
        let pts = self
            .in_flight
            .iter()
            .position(|(frameno, _)| *frameno == packet.input_frameno)
            .and_then(|index| self.in_flight.remove(index))
            .map_or(packet.input_frameno as i64, |(_, pts)| pts);
        self.ready.push_back(EncodedPacket {
            pts,
            dts: pts - 1,
            keyframe: packet.frame_type == FrameType::KEY,
            data: packet.data,
        });
    }

    fn drain_codec_queue(&mut self) -> Result<(), AdapterError> {
        loop {
            match self.context.receive_packet() {
                Ok(packet) => self.queue_packet(packet),
                Err(EncoderStatus::Encoded) => {}
                Err(
                    EncoderStatus::NeedMoreData
                    | EncoderStatus::LimitReached
                    | EncoderStatus::EnoughData,
                ) => break,
                Err(status) => {
                    return Err(AdapterError::Encode(format!(
                        "packet drain failed: {status:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

impl EncoderAdapter for Rav1eEncoderAdapter {
    fn update(&mut self, settings: &Settings) -> bool {
        let parsed = EncoderSettings::from_bag(settings);
        let changed = parsed != self.settings;
        if changed {
            warn!(
                "settings changed mid-session; the running codec context keeps its \
                 configuration until the session restarts"
            );
            self.settings = parsed;
        }
        changed
    }

    fn encode(&mut self, frame: &VideoFrame<'_>) -> Result<Option<PacketRef<'_>>, AdapterError> {
        let started = Instant::now();
        self.validate_planes(frame)?;

        let mut image = self.context.new_frame();
        for (index, plane) in image.planes.iter_mut().enumerate() {
            plane.copy_from_raw_u8(frame.planes[index], frame.strides[index], 1);
        }

        self.context.send_frame(image).map_err(|status| {
            AdapterError::Encode(format!("frame submit rejected: {status:?}"))
        })?;
        self.in_flight.push_back((self.frames_submitted, frame.pts));
        self.frames_submitted += 1;

        self.drain_codec_queue()?;

        let elapsed = started.elapsed();
        if elapsed > self.frame_budget {
            warn!(
                elapsed_us = elapsed.as_micros() as u64,
                budget_us = self.frame_budget.as_micros() as u64,
                "encode call exceeded the per-frame time budget"
            );
        }

        self.current = self.ready.pop_front();
        match self.current.as_ref() {
            Some(packet) => {
                debug!(
                    pts = packet.pts,
                    size = packet.data.len(),
                    keyframe = packet.keyframe,
                    "emitting packet"
                );
                Ok(Some(PacketRef::from(packet)))
            }
            None => {
                warn!("no packet ready for this encode call");
                Ok(None)
            }
        }
    }

    fn finish(&mut self) -> Result<Vec<EncodedPacket>, AdapterError> {
        self.context.flush();
        self.drain_codec_queue()?;
        self.current = None;
        Ok(self.ready.drain(..).collect())
    }

    fn extra_data(&self) -> Option<&[u8]> {
        if self.sequence_header.is_empty() {
            None
        } else {
            Some(&self.sequence_header)
        }
    }

    fn output_format(&self) -> PixelFormat {
        self.layout.host_format()
    }
}

fn chroma_sampling(layout: PlaneLayout) -> ChromaSampling {
    match layout {
        PlaneLayout::Planar420 => ChromaSampling::Cs420,
        PlaneLayout::Planar422 => ChromaSampling::Cs422,
        PlaneLayout::Planar444 => ChromaSampling::Cs444,
    }
}

fn color_description(color_space: ColorSpace) -> ColorDescription {
    match color_space {
        ColorSpace::Bt601 => ColorDescription {
            color_primaries: ColorPrimaries::BT601,
            transfer_characteristics: TransferCharacteristics::BT601,
            matrix_coefficients: MatrixCoefficients::BT601,
        },
        ColorSpace::Bt709 => ColorDescription {
            color_primaries: ColorPrimaries::BT709,
            transfer_characteristics: TransferCharacteristics::BT709,
            matrix_coefficients: MatrixCoefficients::BT709,
        },
    }
}

fn build_codec_config(
    settings: &EncoderSettings,
    descriptor: &VideoDescriptor,
    layout: PlaneLayout,
) -> Config {
    let mut enc = EncoderConfig::with_speed_preset(settings.speed);
    enc.width = descriptor.width as usize;
    enc.height = descriptor.height as usize;
    enc.bit_depth = 8;
    enc.chroma_sampling = chroma_sampling(layout);
    enc.pixel_range = match descriptor.range {
        ColorRange::Limited => PixelRange::Limited,
        ColorRange::Full => PixelRange::Full,
    };
    enc.color_description = Some(color_description(descriptor.color_space));
    // The codec timebase is the reciprocal of the frame rate.
    enc.time_base = Rational::new(u64::from(descriptor.fps.den), u64::from(descriptor.fps.num));
    enc.error_resilient = settings.error_resilient;
    if settings.lookahead_frames == 0 {
        enc.low_latency = true;
    } else {
        enc.speed_settings.rdo_lookahead_frames = settings.lookahead_frames;
    }
    enc.tile_cols = 1usize << settings.tile_cols_log2;
    enc.tile_rows = 1usize << settings.tile_rows_log2;
    enc.min_quantizer = settings.quantizer_min;
    enc.quantizer = usize::from(settings.quantizer_max);
    match settings.rc_mode {
        RateControlMode::ConstantQuality => {
            enc.bitrate = 0;
        }
        RateControlMode::Vbr => {
            enc.bitrate = settings.bitrate_kbps.saturating_mul(1000);
        }
        RateControlMode::Cbr => {
            enc.bitrate = settings.bitrate_kbps.saturating_mul(1000);
            enc.reservoir_frame_delay = Some(settings.reservoir_frame_delay.unwrap_or(12));
        }
    }
    if let Some(delay) = settings.reservoir_frame_delay {
        enc.reservoir_frame_delay = Some(delay);
    }
    enc.min_key_frame_interval = settings.kf_interval_min;
    enc.max_key_frame_interval = settings.kf_interval_max;

    let threads = if settings.threads == 0 {
        std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(4)
    } else {
        settings.threads
    };
    Config::new().with_encoder_config(enc).with_threads(threads)
}

impl std::fmt::Debug for Rav1eEncoderAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rav1eEncoderAdapter")
            .field("layout", &self.layout)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("frames_submitted", &self.frames_submitted)
            .field("ready", &self.ready.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::FrameRate;

    fn descriptor(format: PixelFormat) -> VideoDescriptor {
        VideoDescriptor {
            width: 64,
            height: 64,
            fps: FrameRate { num: 30, den: 1 },
            format,
            range: ColorRange::Limited,
            color_space: ColorSpace::Bt709,
        }
    }

    #[test]
    fn open_rejects_profile_layout_mismatch() {
        // default profile is main, which only admits 4:2:0
        let result = Rav1eEncoderAdapter::open(&default_settings(), &descriptor(PixelFormat::I444));
        match result {
            Err(AdapterError::Configuration(message)) => {
                assert!(message.contains("profile main"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn open_rejects_zero_frame_rate() {
        let mut desc = descriptor(PixelFormat::I420);
        desc.fps = FrameRate { num: 0, den: 1 };
        let result = Rav1eEncoderAdapter::open(&default_settings(), &desc);
        assert!(matches!(result, Err(AdapterError::Validation(_))));
    }

    #[test]
    fn default_settings_carry_codec_defaults() {
        let bag = default_settings();
        let enc = EncoderConfig::default();
        assert_eq!(bag.get(keys::RC_QUANTIZER_MAX), Some(enc.quantizer as i64));
        assert_eq!(
            bag.get(keys::KF_INTERVAL_MAX),
            Some(enc.max_key_frame_interval as i64)
        );
    }

    #[test]
    fn frame_budget_follows_descriptor_fps() {
        let adapter =
            Rav1eEncoderAdapter::open(&default_settings(), &descriptor(PixelFormat::I420))
                .expect("open should succeed");
        assert_eq!(adapter.frame_time_budget(), Duration::from_micros(33_333));
    }
}
