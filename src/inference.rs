// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Service configuration.
//!
//! This module defines the [`PoseConfig`] struct, which controls the pose model
//! (thresholds, input size, threads, device) and the output image (JPEG quality,
//! binary-to-text encoding of the response payload).

use std::fmt;
use std::str::FromStr;

use crate::device::Device;
use crate::format::PoseFormat;
use crate::io::ImageEncoding;
use crate::postprocessing::sigmoid;

/// How the BlazePose pose-flag output is scaled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PresenceScore {
    /// Raw logit; a sigmoid maps it to a probability.
    #[default]
    Logit,
    /// Already a probability in `[0, 1]`.
    Probability,
}

impl PresenceScore {
    /// Returns the canonical lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Logit => "logit",
            Self::Probability => "probability",
        }
    }

    /// Map a raw flag value to a probability.
    #[must_use]
    pub fn to_probability(self, raw: f32) -> f32 {
        match self {
            Self::Logit => sigmoid(raw),
            Self::Probability => raw,
        }
    }
}

impl fmt::Display for PresenceScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PresenceScore {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "logit" => Ok(Self::Logit),
            "probability" | "prob" => Ok(Self::Probability),
            _ => Err(format!("invalid presence score '{s}', expected logit or probability")),
        }
    }
}

/// Configuration for pose inference and annotation.
///
/// Uses a builder pattern for convenient construction.
///
/// # Example
///
/// ```rust
/// use pose_annotator::{ImageEncoding, PoseConfig};
///
/// let config = PoseConfig::new()
///     .with_visibility_threshold(0.6)
///     .with_jpeg_quality(90)
///     .with_image_encoding(ImageEncoding::Latin1);
/// ```
#[derive(Debug, Clone)]
pub struct PoseConfig {
    /// A landmark counts as visible when its visibility is strictly above this value.
    /// Also the cutoff below which landmarks are left out of the overlay.
    pub visibility_threshold: f32,
    /// Minimum pose-presence score (BlazePose) for a pose to be reported at all.
    pub presence_threshold: f32,
    /// Scale of the BlazePose pose-flag output compared against `presence_threshold`.
    pub presence_score: PresenceScore,
    /// Minimum person score (COCO/YOLO pose) for a pose to be reported at all.
    pub confidence_threshold: f32,
    /// Explicit input image size (height, width).
    /// If `None`, the model's input shape or metadata decides.
    pub imgsz: Option<(usize, usize)>,
    /// Number of intra-op threads for ONNX Runtime (`0` lets the runtime decide).
    pub num_threads: usize,
    /// Force a landmark layout instead of detecting it from the model.
    pub format: Option<PoseFormat>,
    /// Execution device.
    pub device: Device,
    /// JPEG quality of the returned image (1-100).
    pub jpeg_quality: u8,
    /// Encoding of the JPEG bytes inside the JSON response.
    pub image_encoding: ImageEncoding,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            visibility_threshold: 0.5,
            presence_threshold: 0.5,
            presence_score: PresenceScore::Logit,
            confidence_threshold: 0.25,
            imgsz: None,
            num_threads: 0,
            format: None,
            device: Device::Cpu,
            jpeg_quality: 95,
            image_encoding: ImageEncoding::Base64,
        }
    }
}

impl PoseConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the visibility threshold used for the all-visible aggregate and drawing.
    #[must_use]
    pub const fn with_visibility_threshold(mut self, threshold: f32) -> Self {
        self.visibility_threshold = threshold;
        self
    }

    /// Set the pose-presence threshold.
    #[must_use]
    pub const fn with_presence_threshold(mut self, threshold: f32) -> Self {
        self.presence_threshold = threshold;
        self
    }

    /// Set how the pose-flag output is scaled.
    #[must_use]
    pub const fn with_presence_score(mut self, score: PresenceScore) -> Self {
        self.presence_score = score;
        self
    }

    /// Set the person confidence threshold.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the input image size.
    ///
    /// # Arguments
    ///
    /// * `height` - The target image height.
    /// * `width` - The target image width.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the number of threads for inference. `0` means auto.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Force the landmark layout of the model.
    #[must_use]
    pub const fn with_format(mut self, format: PoseFormat) -> Self {
        self.format = Some(format);
        self
    }

    /// Set the execution device.
    #[must_use]
    pub fn with_device(mut self, device: Device) -> Self {
        self.device = device;
        self
    }

    /// Set the JPEG quality, clamped to 1-100.
    #[must_use]
    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    /// Set how image bytes are embedded in the JSON response.
    #[must_use]
    pub const fn with_image_encoding(mut self, encoding: ImageEncoding) -> Self {
        self.image_encoding = encoding;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = PoseConfig::default();
        assert!((config.visibility_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.presence_threshold - 0.5).abs() < f32::EPSILON);
        assert!((config.confidence_threshold - 0.25).abs() < f32::EPSILON);
        assert_eq!(config.jpeg_quality, 95);
        assert_eq!(config.image_encoding, ImageEncoding::Base64);
        assert_eq!(config.device, Device::Cpu);
        assert!(config.format.is_none());
        assert_eq!(config.presence_score, PresenceScore::Logit);
    }

    #[test]
    fn test_presence_score() {
        assert!((PresenceScore::Logit.to_probability(0.0) - 0.5).abs() < 1e-6);
        assert!(PresenceScore::Logit.to_probability(0.3) > 0.5);
        assert!((PresenceScore::Probability.to_probability(0.3) - 0.3).abs() < f32::EPSILON);

        assert_eq!("Probability".parse::<PresenceScore>().unwrap(), PresenceScore::Probability);
        assert_eq!(PresenceScore::Logit.to_string(), "logit");
        assert!("percent".parse::<PresenceScore>().is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = PoseConfig::new()
            .with_visibility_threshold(0.7)
            .with_confidence(0.4)
            .with_imgsz(320, 320)
            .with_threads(4)
            .with_format(PoseFormat::Coco)
            .with_device(Device::Cuda(1))
            .with_image_encoding(ImageEncoding::Latin1);

        assert!((config.visibility_threshold - 0.7).abs() < f32::EPSILON);
        assert!((config.confidence_threshold - 0.4).abs() < f32::EPSILON);
        assert_eq!(config.imgsz, Some((320, 320)));
        assert_eq!(config.num_threads, 4);
        assert_eq!(config.format, Some(PoseFormat::Coco));
        assert_eq!(config.device, Device::Cuda(1));
        assert_eq!(config.image_encoding, ImageEncoding::Latin1);
    }

    #[test]
    fn test_jpeg_quality_clamped() {
        assert_eq!(PoseConfig::new().with_jpeg_quality(0).jpeg_quality, 1);
        assert_eq!(PoseConfig::new().with_jpeg_quality(250).jpeg_quality, 100);
    }
}
