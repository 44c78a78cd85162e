// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose estimation output types.

use serde::{Deserialize, Serialize};

use crate::format::PoseFormat;

/// A single body landmark.
///
/// `x` and `y` are normalized by the original image width and height; `z` shares the
/// scale of `x` (always `0.0` for models without depth). `visibility` is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct Landmark {
    /// Horizontal position, 0 = left edge, 1 = right edge.
    pub x: f32,
    /// Vertical position, 0 = top edge, 1 = bottom edge.
    pub y: f32,
    /// Depth relative to the hips; smaller is closer to the camera.
    pub z: f32,
    /// Likelihood that the landmark is visible and not occluded.
    pub visibility: f32,
}

impl Landmark {
    /// Create a new landmark.
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// Whether the visibility score is strictly above `threshold`.
    #[must_use]
    pub fn is_visible(&self, threshold: f32) -> bool {
        self.visibility > threshold
    }

    /// Whether the landmark lies inside the image frame.
    #[must_use]
    pub fn in_frame(&self) -> bool {
        (0.0..=1.0).contains(&self.x) && (0.0..=1.0).contains(&self.y)
    }

    /// Pixel position for an image of the given size.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// The landmarks of one detected person, in the model's canonical order.
#[derive(Debug, Clone, PartialEq)]
pub struct Pose {
    /// Layout the landmarks follow.
    pub format: PoseFormat,
    /// One entry per landmark of `format`.
    pub landmarks: Vec<Landmark>,
}

impl Pose {
    /// Create a new pose.
    #[must_use]
    pub const fn new(format: PoseFormat, landmarks: Vec<Landmark>) -> Self {
        Self { format, landmarks }
    }

    /// Number of landmarks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.landmarks.len()
    }

    /// Check if the pose carries no landmarks.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// `true` iff every landmark's visibility exceeds `threshold`.
    ///
    /// An empty pose is never considered fully visible.
    #[must_use]
    pub fn all_visible(&self, threshold: f32) -> bool {
        !self.landmarks.is_empty() && self.landmarks.iter().all(|l| l.is_visible(threshold))
    }

    /// Number of landmarks whose visibility exceeds `threshold`.
    #[must_use]
    pub fn visible_count(&self, threshold: f32) -> usize {
        self.landmarks.iter().filter(|l| l.is_visible(threshold)).count()
    }
}
