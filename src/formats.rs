use std::{fmt, fmt::Display};

use serde::{Deserialize, Serialize};

use crate::contract::PixelFormat;

/// Plane layouts the codec accepts as input. The codec consumes 8-bit planar
/// YUV only, so every host format maps onto one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaneLayout {
    Planar420,
    Planar422,
    Planar444,
}

impl Display for PlaneLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planar420 => f.write_str("planar 4:2:0"),
            Self::Planar422 => f.write_str("planar 4:2:2"),
            Self::Planar444 => f.write_str("planar 4:4:4"),
        }
    }
}

impl PlaneLayout {
    /// Fixed host-to-codec format table. Formats without a direct codec
    /// counterpart collapse onto the nearest supported layout; the second
    /// element reports whether that fallback happened so the caller can
    /// surface a warning.
    ///
    /// Fallback groups: semi-planar/monochrome formats share the 4:2:0
    /// target, packed 4:2:2 formats share the 4:2:2 target, and the 32-bit
    /// packed formats share the full-resolution 4:4:4 target.
    #[must_use]
    pub fn map_host(format: PixelFormat) -> (Self, bool) {
        match format {
            PixelFormat::I420 => (Self::Planar420, false),
            PixelFormat::I422 => (Self::Planar422, false),
            PixelFormat::I444 => (Self::Planar444, false),
            PixelFormat::Nv12 | PixelFormat::Gray8 => (Self::Planar420, true),
            PixelFormat::Yuy2 | PixelFormat::Yvyu | PixelFormat::Uyvy => (Self::Planar422, true),
            PixelFormat::Bgra | PixelFormat::Bgrx | PixelFormat::Rgba => (Self::Planar444, true),
        }
    }

    /// Inverse of `map_host`: the host format this layout is delivered as.
    #[must_use]
    pub fn host_format(self) -> PixelFormat {
        match self {
            Self::Planar420 => PixelFormat::I420,
            Self::Planar422 => PixelFormat::I422,
            Self::Planar444 => PixelFormat::I444,
        }
    }

    /// Rows and row width in bytes of the given plane at the negotiated
    /// resolution. Plane 0 is luma; planes 1 and 2 are chroma.
    #[must_use]
    pub fn plane_dimensions(self, plane: usize, width: u32, height: u32) -> (usize, usize) {
        let (width, height) = (width as usize, height as usize);
        if plane == 0 {
            return (height, width);
        }
        match self {
            Self::Planar420 => (height / 2, width / 2),
            Self::Planar422 => (height, width / 2),
            Self::Planar444 => (height, width),
        }
    }

    /// Total payload bytes of one tightly-packed frame in this layout.
    #[must_use]
    pub fn frame_bytes(self, width: u32, height: u32) -> usize {
        (0..3)
            .map(|plane| {
                let (rows, cols) = self.plane_dimensions(plane, width, height);
                rows * cols
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_formats_map_without_fallback() {
        assert_eq!(
            PlaneLayout::map_host(PixelFormat::I420),
            (PlaneLayout::Planar420, false)
        );
        assert_eq!(
            PlaneLayout::map_host(PixelFormat::I422),
            (PlaneLayout::Planar422, false)
        );
        assert_eq!(
            PlaneLayout::map_host(PixelFormat::I444),
            (PlaneLayout::Planar444, false)
        );
    }

    #[test]
    fn unsupported_formats_collapse_onto_shared_fallbacks() {
        for format in [PixelFormat::Nv12, PixelFormat::Gray8] {
            assert_eq!(PlaneLayout::map_host(format), (PlaneLayout::Planar420, true));
        }
        for format in [PixelFormat::Yuy2, PixelFormat::Yvyu, PixelFormat::Uyvy] {
            assert_eq!(PlaneLayout::map_host(format), (PlaneLayout::Planar422, true));
        }
        for format in [PixelFormat::Bgra, PixelFormat::Bgrx, PixelFormat::Rgba] {
            assert_eq!(PlaneLayout::map_host(format), (PlaneLayout::Planar444, true));
        }
    }

    #[test]
    fn mapped_layouts_round_trip_to_planar_host_formats() {
        for format in [
            PixelFormat::I420,
            PixelFormat::Nv12,
            PixelFormat::Yuy2,
            PixelFormat::Rgba,
        ] {
            let (layout, _) = PlaneLayout::map_host(format);
            let (again, fallback) = PlaneLayout::map_host(layout.host_format());
            assert_eq!(again, layout);
            assert!(!fallback);
        }
    }

    #[test]
    fn chroma_planes_shrink_per_layout() {
        assert_eq!(PlaneLayout::Planar420.plane_dimensions(0, 64, 48), (48, 64));
        assert_eq!(PlaneLayout::Planar420.plane_dimensions(1, 64, 48), (24, 32));
        assert_eq!(PlaneLayout::Planar422.plane_dimensions(2, 64, 48), (48, 32));
        assert_eq!(PlaneLayout::Planar444.plane_dimensions(1, 64, 48), (48, 64));
    }

    #[test]
    fn frame_bytes_accounts_for_subsampling() {
        assert_eq!(PlaneLayout::Planar420.frame_bytes(64, 48), 64 * 48 * 3 / 2);
        assert_eq!(PlaneLayout::Planar422.frame_bytes(64, 48), 64 * 48 * 2);
        assert_eq!(PlaneLayout::Planar444.frame_bytes(64, 48), 64 * 48 * 3);
    }
}
