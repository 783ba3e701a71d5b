//! Mean-luminance extraction from raw RGB24 frames.
//!
//! The quadrant cameras are used as photodiodes: each frame is collapsed to a
//! single perceptual brightness scalar via the Rec. 601 luma weights.

use crate::frame::ImageFrame;
use ndarray::{ArrayView3, Axis};
use serde::{Deserialize, Serialize};

/// Rec. 601 luma weights for the R, G and B channels.
pub const LUMA_WEIGHTS: [f64; 3] = [0.299, 0.587, 0.114];

/// Region of a frame over which luminance is averaged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CaptureRegion {
    /// Average over every pixel of the frame.
    Full,
    /// Average over a centered window whose sides are `fraction` (0..=1) of
    /// the frame sides. Clamped so the window is never smaller than one
    /// pixel.
    Center { fraction: f64 },
}

impl Default for CaptureRegion {
    fn default() -> Self {
        CaptureRegion::Full
    }
}

/// Compute the mean perceptual luminance of a frame, in [0, 255].
///
/// Returns `None` for truncated buffers (shorter than `width * height * 3`)
/// and for zero-pixel frames. Truncation is not an error: the frame is
/// simply dropped and the previous reading stays in effect.
pub fn mean_luminance(frame: &ImageFrame, region: CaptureRegion) -> Option<f64> {
    let expected = frame.expected_len();
    if frame.width == 0 || frame.height == 0 || frame.data.len() < expected {
        return None;
    }

    let view =
        ArrayView3::from_shape((frame.height, frame.width, 3), &frame.data[..expected]).ok()?;

    let view = match region {
        CaptureRegion::Full => view,
        CaptureRegion::Center { fraction } => {
            let fraction = fraction.clamp(0.0, 1.0);
            let rows = ((frame.height as f64 * fraction).round() as usize)
                .max(1)
                .min(frame.height);
            let cols = ((frame.width as f64 * fraction).round() as usize)
                .max(1)
                .min(frame.width);
            let row0 = (frame.height - rows) / 2;
            let col0 = (frame.width - cols) / 2;
            view.slice_move(ndarray::s![row0..row0 + rows, col0..col0 + cols, ..])
        }
    };

    let pixels = view.len_of(Axis(0)) * view.len_of(Axis(1));
    let channel_mean = |c: usize| {
        view.index_axis(Axis(2), c)
            .iter()
            .map(|&v| v as f64)
            .sum::<f64>()
            / pixels as f64
    };

    Some(
        LUMA_WEIGHTS[0] * channel_mean(0)
            + LUMA_WEIGHTS[1] * channel_mean(1)
            + LUMA_WEIGHTS[2] * channel_mean(2),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn solid_frame(width: usize, height: usize, rgb: [u8; 3]) -> ImageFrame {
        let mut data = Vec::with_capacity(width * height * 3);
        for _ in 0..width * height {
            data.extend_from_slice(&rgb);
        }
        ImageFrame::new(width, height, data)
    }

    #[test]
    fn solid_white_is_full_scale() {
        let frame = solid_frame(4, 4, [255, 255, 255]);
        let lum = mean_luminance(&frame, CaptureRegion::Full).unwrap();
        assert_relative_eq!(lum, 255.0, epsilon = 1e-9);
    }

    #[test]
    fn pure_channels_use_rec601_weights() {
        let red = solid_frame(3, 2, [255, 0, 0]);
        let green = solid_frame(3, 2, [0, 255, 0]);
        let blue = solid_frame(3, 2, [0, 0, 255]);
        assert_relative_eq!(
            mean_luminance(&red, CaptureRegion::Full).unwrap(),
            0.299 * 255.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            mean_luminance(&green, CaptureRegion::Full).unwrap(),
            0.587 * 255.0,
            epsilon = 1e-9
        );
        assert_relative_eq!(
            mean_luminance(&blue, CaptureRegion::Full).unwrap(),
            0.114 * 255.0,
            epsilon = 1e-9
        );
    }

    #[test]
    fn truncated_buffer_is_rejected() {
        let mut frame = solid_frame(4, 4, [10, 10, 10]);
        frame.data.truncate(frame.expected_len() - 1);
        assert!(mean_luminance(&frame, CaptureRegion::Full).is_none());
    }

    #[test]
    fn trailing_padding_is_ignored() {
        let mut frame = solid_frame(2, 2, [100, 100, 100]);
        frame.data.extend_from_slice(&[255, 255, 255]);
        let lum = mean_luminance(&frame, CaptureRegion::Full).unwrap();
        assert_relative_eq!(lum, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn center_region_excludes_border() {
        // 4x4 frame: bright 2x2 center, dark border.
        let mut data = vec![0u8; 4 * 4 * 3];
        for row in 1..3 {
            for col in 1..3 {
                let base = (row * 4 + col) * 3;
                data[base] = 255;
                data[base + 1] = 255;
                data[base + 2] = 255;
            }
        }
        let frame = ImageFrame::new(4, 4, data);
        let lum = mean_luminance(&frame, CaptureRegion::Center { fraction: 0.5 }).unwrap();
        assert_relative_eq!(lum, 255.0, epsilon = 1e-9);
    }

    #[test]
    fn tiny_fraction_clamps_to_one_pixel() {
        let frame = solid_frame(5, 5, [42, 42, 42]);
        let lum = mean_luminance(&frame, CaptureRegion::Center { fraction: 0.0 }).unwrap();
        assert_relative_eq!(lum, 42.0, epsilon = 1e-9);
    }

    #[test]
    fn zero_size_frame_is_rejected() {
        let frame = ImageFrame::new(0, 0, Vec::new());
        assert!(mean_luminance(&frame, CaptureRegion::Full).is_none());
    }
}
