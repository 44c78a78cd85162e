// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Landmark layouts produced by supported pose models.
//!
//! The format fixes the number and order of landmarks in a pose and the
//! connection topology used when drawing the skeleton.

use std::fmt;
use std::str::FromStr;

use crate::visualizer::skeleton::{
    BLAZEPOSE_CONNECTIONS, BLAZEPOSE_LANDMARKS, COCO_KEYPOINTS, COCO_SKELETON,
};

/// Pose model output layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseFormat {
    /// MediaPipe BlazePose landmark model: 33 landmarks with x, y, z and visibility.
    BlazePose,
    /// YOLO pose models trained on COCO-Pose: 17 keypoints with x, y and confidence.
    Coco,
}

impl PoseFormat {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BlazePose => "blazepose",
            Self::Coco => "coco",
        }
    }

    /// Number of landmarks in a detected pose.
    #[must_use]
    pub const fn num_landmarks(&self) -> usize {
        match self {
            Self::BlazePose => BLAZEPOSE_LANDMARKS.len(),
            Self::Coco => COCO_KEYPOINTS.len(),
        }
    }

    /// Landmark names in output order.
    #[must_use]
    pub const fn landmark_names(&self) -> &'static [&'static str] {
        match self {
            Self::BlazePose => &BLAZEPOSE_LANDMARKS,
            Self::Coco => &COCO_KEYPOINTS,
        }
    }

    /// Pairs of landmark indices forming the skeleton.
    #[must_use]
    pub const fn connections(&self) -> &'static [[usize; 2]] {
        match self {
            Self::BlazePose => &BLAZEPOSE_CONNECTIONS,
            Self::Coco => &COCO_SKELETON,
        }
    }

    /// Input size (height, width) used when neither the model nor the config fixes one.
    #[must_use]
    pub const fn default_input_size(&self) -> (usize, usize) {
        match self {
            Self::BlazePose => (256, 256),
            Self::Coco => (640, 640),
        }
    }

    /// Whether the model reports a depth coordinate.
    #[must_use]
    pub const fn has_depth(&self) -> bool {
        matches!(self, Self::BlazePose)
    }
}

impl fmt::Display for PoseFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PoseFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "blazepose" | "blaze" | "mediapipe" => Ok(Self::BlazePose),
            "coco" | "yolo" | "yolo-pose" => Ok(Self::Coco),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

/// Error returned when parsing an invalid format string.
#[derive(Debug, Clone)]
pub struct FormatParseError(String);

impl fmt::Display for FormatParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid pose format '{}', expected one of: blazepose, coco",
            self.0
        )
    }
}

impl std::error::Error for FormatParseError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_str() {
        assert_eq!("blazepose".parse::<PoseFormat>().unwrap(), PoseFormat::BlazePose);
        assert_eq!("MediaPipe".parse::<PoseFormat>().unwrap(), PoseFormat::BlazePose);
        assert_eq!("yolo".parse::<PoseFormat>().unwrap(), PoseFormat::Coco);
        assert!("holistic".parse::<PoseFormat>().is_err());
    }

    #[test]
    fn test_format_display() {
        assert_eq!(PoseFormat::BlazePose.to_string(), "blazepose");
        assert_eq!(PoseFormat::Coco.to_string(), "coco");
    }

    #[test]
    fn test_format_layout() {
        assert_eq!(PoseFormat::BlazePose.num_landmarks(), 33);
        assert_eq!(PoseFormat::Coco.num_landmarks(), 17);
        assert_eq!(PoseFormat::BlazePose.connections().len(), 35);
        assert_eq!(PoseFormat::Coco.connections().len(), 19);
        assert!(PoseFormat::BlazePose.has_depth());
        assert!(!PoseFormat::Coco.has_depth());
    }
}
