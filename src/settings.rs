use std::collections::BTreeMap;
use std::{fmt, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::formats::PlaneLayout;

/// Option names of the flat settings bag the host persists and surfaces in
/// its own configuration UI.
pub mod keys {
    pub const SPEED: &str = "Encoder.Speed";
    pub const THREADS: &str = "Encoder.Threads";
    pub const PROFILE: &str = "Encoder.Profile";
    pub const ERROR_RESILIENT: &str = "Encoder.ErrorResilient";
    pub const LOOKAHEAD_FRAMES: &str = "Encoder.LookaheadFrames";
    pub const TILE_COLS_LOG2: &str = "Encoder.TileColumnsLog2";
    pub const TILE_ROWS_LOG2: &str = "Encoder.TileRowsLog2";
    pub const RC_MODE: &str = "RateControl.Mode";
    pub const RC_BITRATE: &str = "RateControl.Bitrate";
    pub const RC_QUANTIZER_MIN: &str = "RateControl.Quantizer.Min";
    pub const RC_QUANTIZER_MAX: &str = "RateControl.Quantizer.Max";
    pub const RC_BUFFER_FRAME_DELAY: &str = "RateControl.Buffer.FrameDelay";
    pub const KF_INTERVAL_MIN: &str = "Keyframe.Interval.Min";
    pub const KF_INTERVAL_MAX: &str = "Keyframe.Interval.Max";
}

/// Documented range of one bag option. Reads clamp into `[min, max]`; these
/// bounds are the only validation the bag performs, the codec stays the
/// authority on acceptability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionRange {
    pub key: &'static str,
    pub min: i64,
    pub max: i64,
    pub default: i64,
}

pub const OPTIONS: &[OptionRange] = &[
    OptionRange {
        key: keys::SPEED,
        min: 0,
        max: 10,
        default: 6,
    },
    OptionRange {
        key: keys::THREADS,
        min: 0,
        max: 16,
        default: 0,
    },
    OptionRange {
        key: keys::PROFILE,
        min: 0,
        max: 2,
        default: 0,
    },
    OptionRange {
        key: keys::ERROR_RESILIENT,
        min: 0,
        max: 1,
        default: 0,
    },
    OptionRange {
        key: keys::LOOKAHEAD_FRAMES,
        min: 0,
        max: 250,
        default: 40,
    },
    OptionRange {
        key: keys::TILE_COLS_LOG2,
        min: 0,
        max: 6,
        default: 0,
    },
    OptionRange {
        key: keys::TILE_ROWS_LOG2,
        min: 0,
        max: 6,
        default: 0,
    },
    OptionRange {
        key: keys::RC_MODE,
        min: 0,
        max: 2,
        default: 2,
    },
    OptionRange {
        key: keys::RC_BITRATE,
        min: 1,
        max: i32::MAX as i64,
        default: 2500,
    },
    OptionRange {
        key: keys::RC_QUANTIZER_MIN,
        min: 0,
        max: 255,
        default: 0,
    },
    OptionRange {
        key: keys::RC_QUANTIZER_MAX,
        min: 0,
        max: 255,
        default: 100,
    },
    OptionRange {
        key: keys::RC_BUFFER_FRAME_DELAY,
        min: 0,
        max: 10_000,
        default: 0,
    },
    OptionRange {
        key: keys::KF_INTERVAL_MIN,
        min: 0,
        max: 9999,
        default: 12,
    },
    OptionRange {
        key: keys::KF_INTERVAL_MAX,
        min: 0,
        max: 9999,
        default: 240,
    },
];

#[must_use]
pub fn option_range(key: &str) -> Option<&'static OptionRange> {
    OPTIONS.iter().find(|option| option.key == key)
}

/// Flat bag of named numeric options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Settings(BTreeMap<String, i64>);

impl Settings {
    /// Every catalogued option at its documented default.
    #[must_use]
    pub fn catalog_defaults() -> Self {
        let mut bag = Self::default();
        for option in OPTIONS {
            bag.set(option.key, option.default);
        }
        bag
    }

    pub fn set(&mut self, key: &str, value: i64) {
        self.0.insert(key.to_owned(), value);
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<i64> {
        self.0.get(key).copied()
    }

    /// Stored value clamped into the option's documented range, or the
    /// documented default when the key is absent.
    #[must_use]
    pub fn resolve(&self, key: &str) -> i64 {
        match (self.get(key), option_range(key)) {
            (Some(value), Some(range)) => value.clamp(range.min, range.max),
            (Some(value), None) => value,
            (None, Some(range)) => range.default,
            (None, None) => 0,
        }
    }
}

/// Codec bitstream profile selected by the host. Each profile admits a fixed
/// set of input layouts; the pairing is verified once at session
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Profile {
    Main,
    High,
    Professional,
}

impl Profile {
    #[must_use]
    pub fn from_index(value: i64) -> Self {
        match value {
            1 => Self::High,
            2 => Self::Professional,
            _ => Self::Main,
        }
    }

    #[must_use]
    pub fn supports(self, layout: PlaneLayout) -> bool {
        match self {
            Self::Main => layout == PlaneLayout::Planar420,
            Self::High => layout == PlaneLayout::Planar444,
            Self::Professional => true,
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Main => f.write_str("main"),
            Self::High => f.write_str("high"),
            Self::Professional => f.write_str("professional"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RateControlMode {
    Vbr,
    Cbr,
    ConstantQuality,
}

impl RateControlMode {
    #[must_use]
    pub fn from_index(value: i64) -> Self {
        match value {
            0 => Self::Vbr,
            1 => Self::Cbr,
            _ => Self::ConstantQuality,
        }
    }
}

impl Display for RateControlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vbr => f.write_str("vbr"),
            Self::Cbr => f.write_str("cbr"),
            Self::ConstantQuality => f.write_str("constant-quality"),
        }
    }
}

/// Typed view of the bag, resolved through the catalog ranges. This is the
/// configuration the adapter stores and derives the codec config from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncoderSettings {
    pub speed: u8,
    pub threads: usize,
    pub profile: Profile,
    pub error_resilient: bool,
    pub lookahead_frames: usize,
    pub tile_cols_log2: u32,
    pub tile_rows_log2: u32,
    pub rc_mode: RateControlMode,
    pub bitrate_kbps: i32,
    pub quantizer_min: u8,
    pub quantizer_max: u8,
    pub reservoir_frame_delay: Option<i32>,
    pub kf_interval_min: u64,
    pub kf_interval_max: u64,
}

impl EncoderSettings {
    #[must_use]
    pub fn from_bag(bag: &Settings) -> Self {
        let frame_delay = bag.resolve(keys::RC_BUFFER_FRAME_DELAY);
        Self {
            speed: bag.resolve(keys::SPEED) as u8,
            threads: bag.resolve(keys::THREADS) as usize,
            profile: Profile::from_index(bag.resolve(keys::PROFILE)),
            error_resilient: bag.resolve(keys::ERROR_RESILIENT) != 0,
            lookahead_frames: bag.resolve(keys::LOOKAHEAD_FRAMES) as usize,
            tile_cols_log2: bag.resolve(keys::TILE_COLS_LOG2) as u32,
            tile_rows_log2: bag.resolve(keys::TILE_ROWS_LOG2) as u32,
            rc_mode: RateControlMode::from_index(bag.resolve(keys::RC_MODE)),
            bitrate_kbps: bag.resolve(keys::RC_BITRATE) as i32,
            quantizer_min: bag.resolve(keys::RC_QUANTIZER_MIN) as u8,
            quantizer_max: bag.resolve(keys::RC_QUANTIZER_MAX) as u8,
            reservoir_frame_delay: (frame_delay > 0).then_some(frame_delay as i32),
            kf_interval_min: bag.resolve(keys::KF_INTERVAL_MIN) as u64,
            kf_interval_max: bag.resolve(keys::KF_INTERVAL_MAX) as u64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_clamps_into_catalog_range() {
        let mut bag = Settings::default();
        bag.set(keys::SPEED, 99);
        bag.set(keys::RC_QUANTIZER_MAX, -5);
        assert_eq!(bag.resolve(keys::SPEED), 10);
        assert_eq!(bag.resolve(keys::RC_QUANTIZER_MAX), 0);
    }

    #[test]
    fn resolve_falls_back_to_catalog_default() {
        let bag = Settings::default();
        assert_eq!(bag.resolve(keys::KF_INTERVAL_MAX), 240);
        assert_eq!(bag.resolve(keys::RC_MODE), 2);
    }

    #[test]
    fn unknown_keys_pass_through_unclamped() {
        let mut bag = Settings::default();
        bag.set("Encoder.Unknown", 1234);
        assert_eq!(bag.resolve("Encoder.Unknown"), 1234);
        assert_eq!(bag.resolve("Encoder.Missing"), 0);
    }

    #[test]
    fn typed_view_resolves_modes_and_profile() {
        let mut bag = Settings::catalog_defaults();
        bag.set(keys::RC_MODE, 1);
        bag.set(keys::RC_BITRATE, 4000);
        bag.set(keys::PROFILE, 1);
        bag.set(keys::RC_BUFFER_FRAME_DELAY, 24);
        let parsed = EncoderSettings::from_bag(&bag);
        assert_eq!(parsed.rc_mode, RateControlMode::Cbr);
        assert_eq!(parsed.bitrate_kbps, 4000);
        assert_eq!(parsed.profile, Profile::High);
        assert_eq!(parsed.reservoir_frame_delay, Some(24));
    }

    #[test]
    fn profiles_admit_their_layouts() {
        assert!(Profile::Main.supports(PlaneLayout::Planar420));
        assert!(!Profile::Main.supports(PlaneLayout::Planar444));
        assert!(Profile::High.supports(PlaneLayout::Planar444));
        assert!(!Profile::High.supports(PlaneLayout::Planar420));
        for layout in [
            PlaneLayout::Planar420,
            PlaneLayout::Planar422,
            PlaneLayout::Planar444,
        ] {
            assert!(Profile::Professional.supports(layout));
        }
    }
}
