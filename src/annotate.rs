// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Skeleton overlay drawing.
//!
//! [`DrawPolicy`] decides whether and in which style to draw; [`draw_pose`]
//! renders connections and landmark markers onto an RGB image.

use image::RgbImage;
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};

use crate::error::{AnnotatorError, Result};
use crate::results::Pose;
use crate::visualizer::Color;

/// Style of landmark markers or connection lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawingSpec {
    /// Stroke color.
    pub color: Color,
    /// Stroke thickness in pixels.
    pub thickness: u32,
    /// Landmark circle radius in pixels (unused for connections).
    pub circle_radius: u32,
}

impl DrawingSpec {
    /// Create a new drawing spec.
    #[must_use]
    pub const fn new(color: Color, thickness: u32, circle_radius: u32) -> Self {
        Self { color, thickness, circle_radius }
    }
}

/// Which overlay, if any, to draw on the returned image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawPolicy {
    /// Leave the image untouched.
    Skip,
    /// Every landmark is visible: draw the skeleton in green.
    Green,
    /// Some landmark is occluded: draw the skeleton in white.
    White,
}

impl DrawPolicy {
    /// Pick the overlay for a request.
    ///
    /// | `seen_all_keypoints` | pose detected | all visible | policy |
    /// |---|---|---|---|
    /// | true  | any   | any   | `Skip`  |
    /// | false | false | any   | `Skip`  |
    /// | false | true  | true  | `Green` |
    /// | false | true  | false | `White` |
    #[must_use]
    pub const fn decide(seen_all_keypoints: bool, pose_detected: bool, all_visible: bool) -> Self {
        match (seen_all_keypoints, pose_detected, all_visible) {
            (true, _, _) | (false, false, _) => Self::Skip,
            (false, true, true) => Self::Green,
            (false, true, false) => Self::White,
        }
    }

    /// Overlay color, or `None` for [`DrawPolicy::Skip`].
    #[must_use]
    pub const fn color(&self) -> Option<Color> {
        match self {
            Self::Skip => None,
            Self::Green => Some(Color::GREEN),
            Self::White => Some(Color::WHITE),
        }
    }

    /// Landmark and connection specs, or `None` for [`DrawPolicy::Skip`].
    #[must_use]
    pub const fn specs(&self) -> Option<(DrawingSpec, DrawingSpec)> {
        match self.color() {
            Some(color) => Some((
                DrawingSpec::new(color, 2, 2),
                DrawingSpec::new(color, 2, 0),
            )),
            None => None,
        }
    }

    /// Returns the lowercase name used in logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Skip => "skip",
            Self::Green => "green",
            Self::White => "white",
        }
    }
}

/// Draw the skeleton of `pose` onto `image`.
///
/// Landmarks with visibility below `visibility_threshold`, or outside the frame,
/// are skipped along with every connection touching them. Connections are drawn
/// first, then landmark markers with a white border ring.
///
/// # Errors
///
/// Returns [`AnnotatorError::Render`] if the pose has fewer landmarks than its
/// connection topology references.
pub fn draw_pose(
    image: &mut RgbImage,
    pose: &Pose,
    landmark_spec: &DrawingSpec,
    connection_spec: &DrawingSpec,
    visibility_threshold: f32,
) -> Result<()> {
    let (width, height) = image.dimensions();
    let connections = pose.format.connections();

    if let Some(max_index) = connections.iter().flatten().max() {
        if *max_index >= pose.len() {
            return Err(AnnotatorError::Render(format!(
                "{} pose has {} landmarks, skeleton needs {}",
                pose.format,
                pose.len(),
                max_index + 1
            )));
        }
    }

    let pixels: Vec<Option<(f32, f32)>> = pose
        .landmarks
        .iter()
        .map(|lm| {
            (lm.visibility >= visibility_threshold && lm.in_frame())
                .then(|| lm.to_pixel(width, height))
        })
        .collect();

    for [a, b] in connections {
        if let (Some(start), Some(end)) = (pixels[*a], pixels[*b]) {
            draw_thick_line(image, start, end, connection_spec);
        }
    }

    let border_radius = (landmark_spec.circle_radius + 1).max(landmark_spec.circle_radius * 6 / 5);
    for (x, y) in pixels.into_iter().flatten() {
        #[allow(clippy::cast_possible_truncation)]
        let center = (x.round() as i32, y.round() as i32);
        draw_ring(image, center, border_radius, landmark_spec.thickness, Color::WHITE);
        draw_ring(image, center, landmark_spec.circle_radius, landmark_spec.thickness, landmark_spec.color);
    }

    Ok(())
}

/// Draw a line `spec.thickness` pixels wide by stacking parallel 1px segments.
#[allow(clippy::cast_precision_loss)]
fn draw_thick_line(image: &mut RgbImage, start: (f32, f32), end: (f32, f32), spec: &DrawingSpec) {
    let color = spec.color.to_rgb();
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let len = dx.hypot(dy);
    let (nx, ny) = if len > f32::EPSILON { (-dy / len, dx / len) } else { (0.0, 0.0) };

    let thickness = spec.thickness.max(1);
    for t in 0..thickness {
        let offset = t as f32 - (thickness - 1) as f32 / 2.0;
        draw_line_segment_mut(
            image,
            (start.0 + nx * offset, start.1 + ny * offset),
            (end.0 + nx * offset, end.1 + ny * offset),
            color,
        );
    }
}

/// Draw a circle outline `thickness` pixels wide centered on `radius`.
fn draw_ring(image: &mut RgbImage, center: (i32, i32), radius: u32, thickness: u32, color: Color) {
    let radius = i32::try_from(radius).unwrap_or(i32::MAX);
    let thickness = i32::try_from(thickness.max(1)).unwrap_or(1);
    let inner = (radius - thickness / 2).max(0);
    let outer = radius + (thickness - 1) / 2;
    for r in inner..=outer {
        draw_hollow_circle_mut(image, center, r, color.to_rgb());
    }
}
