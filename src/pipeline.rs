// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The request pipeline: decode, estimate, draw, encode.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::annotate::{DrawPolicy, draw_pose};
use crate::error::Result;
use crate::inference::PoseConfig;
use crate::io::{ImageEncoding, decode_image, encode_jpeg};
use crate::model::PoseEstimator;
use crate::results::Landmark;

/// Output of [`process_image`] before the image is embedded as text.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    /// JPEG bytes of the (possibly annotated) image.
    pub jpeg: Vec<u8>,
    /// Landmarks in the model's canonical order; empty when no pose was found.
    pub keypoints: Vec<Landmark>,
    /// Every landmark's visibility is above the threshold. `false` without a pose.
    pub all_keypoints_visible: bool,
    /// Overlay that was applied.
    pub policy: DrawPolicy,
    /// Image dimensions (width, height).
    pub dimensions: (u32, u32),
}

impl ProcessedImage {
    /// Convert into the JSON response body.
    #[must_use]
    pub fn into_response(self, encoding: ImageEncoding) -> ProcessResponse {
        ProcessResponse {
            image: encoding.encode(&self.jpeg),
            keypoints: self.keypoints,
            all_keypoints_visible: self.all_keypoints_visible,
        }
    }
}

/// JSON body returned by `POST /process_image`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "server", derive(utoipa::ToSchema))]
pub struct ProcessResponse {
    /// Annotated JPEG, encoded as text (base64 or latin1).
    pub image: String,
    /// Detected landmarks.
    pub keypoints: Vec<Landmark>,
    /// Whether every landmark is visible.
    pub all_keypoints_visible: bool,
}

/// Run the full annotation pipeline on encoded image bytes.
///
/// # Errors
///
/// Returns the first failure of any stage: [`Decode`](crate::AnnotatorError::Decode),
/// [`Inference`](crate::AnnotatorError::Inference),
/// [`Render`](crate::AnnotatorError::Render) or
/// [`Encode`](crate::AnnotatorError::Encode).
pub fn process_image<E: PoseEstimator + ?Sized>(
    estimator: &mut E,
    bytes: &[u8],
    seen_all_keypoints: bool,
    config: &PoseConfig,
) -> Result<ProcessedImage> {
    let start = Instant::now();

    let image = decode_image(bytes)?;
    let pose = estimator.estimate(&image)?;

    let all_keypoints_visible = pose
        .as_ref()
        .is_some_and(|p| p.all_visible(config.visibility_threshold));
    let policy = DrawPolicy::decide(seen_all_keypoints, pose.is_some(), all_keypoints_visible);

    let mut rgb = image.into_rgb8();
    if let (Some(pose), Some((landmark_spec, connection_spec))) = (&pose, policy.specs()) {
        draw_pose(&mut rgb, pose, &landmark_spec, &connection_spec, config.visibility_threshold)?;
    }

    let jpeg = encode_jpeg(&rgb, config.jpeg_quality)?;

    tracing::debug!(
        width = rgb.width(),
        height = rgb.height(),
        landmarks = pose.as_ref().map_or(0, |p| p.len()),
        visible = pose.as_ref().map_or(0, |p| p.visible_count(config.visibility_threshold)),
        all_keypoints_visible,
        policy = policy.as_str(),
        elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
        "image processed"
    );

    Ok(ProcessedImage {
        jpeg,
        keypoints: pose.map(|p| p.landmarks).unwrap_or_default(),
        all_keypoints_visible,
        policy,
        dimensions: rgb.dimensions(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnnotatorError;
    use crate::format::PoseFormat;
    use crate::results::Pose;
    use image::{DynamicImage, GenericImageView, Rgb, RgbImage};

    /// Returns a fixed COCO pose (or none) regardless of the input.
    struct FixedEstimator {
        visibility: Option<f32>,
        calls: usize,
    }

    impl PoseEstimator for FixedEstimator {
        fn format(&self) -> PoseFormat {
            PoseFormat::Coco
        }

        fn input_size(&self) -> (usize, usize) {
            (640, 640)
        }

        fn estimate(&mut self, _image: &DynamicImage) -> Result<Option<Pose>> {
            self.calls += 1;
            Ok(self.visibility.map(|v| {
                let landmarks = (0..17)
                    .map(|i| {
                        let t = i as f32 / 16.0;
                        Landmark::new(0.2 + 0.6 * t, 0.2 + 0.6 * t, 0.0, v)
                    })
                    .collect();
                Pose::new(PoseFormat::Coco, landmarks)
            }))
        }
    }

    fn jpeg_input(width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([40, 40, 40]));
        encode_jpeg(&img, 95).unwrap()
    }

    fn no_draw_encode(bytes: &[u8], quality: u8) -> Vec<u8> {
        encode_jpeg(&decode_image(bytes).unwrap().into_rgb8(), quality).unwrap()
    }

    #[test]
    fn test_visible_pose_draws_green() {
        let input = jpeg_input(120, 80);
        let mut estimator = FixedEstimator { visibility: Some(0.9), calls: 0 };
        let config = PoseConfig::default();

        let out = process_image(&mut estimator, &input, false, &config).unwrap();

        assert!(out.all_keypoints_visible);
        assert_eq!(out.policy, DrawPolicy::Green);
        assert_eq!(out.keypoints.len(), 17);
        assert_ne!(out.jpeg, no_draw_encode(&input, config.jpeg_quality));
    }

    #[test]
    fn test_occluded_pose_draws_white() {
        let input = jpeg_input(120, 80);
        // Exactly at the threshold: not "visible", but still drawn
        let mut estimator = FixedEstimator { visibility: Some(0.5), calls: 0 };
        let config = PoseConfig::default();

        let out = process_image(&mut estimator, &input, false, &config).unwrap();

        assert!(!out.all_keypoints_visible);
        assert_eq!(out.policy, DrawPolicy::White);
        assert_ne!(out.jpeg, no_draw_encode(&input, config.jpeg_quality));
    }

    #[test]
    fn test_seen_all_keypoints_skips_drawing() {
        let input = jpeg_input(64, 48);
        let mut estimator = FixedEstimator { visibility: Some(0.9), calls: 0 };
        let config = PoseConfig::default();

        let out = process_image(&mut estimator, &input, true, &config).unwrap();

        assert!(out.all_keypoints_visible);
        assert_eq!(out.policy, DrawPolicy::Skip);
        assert_eq!(out.jpeg, no_draw_encode(&input, config.jpeg_quality));
    }

    #[test]
    fn test_no_pose() {
        let input = jpeg_input(64, 48);
        let mut estimator = FixedEstimator { visibility: None, calls: 0 };

        let out = process_image(&mut estimator, &input, false, &PoseConfig::default()).unwrap();

        assert!(out.keypoints.is_empty());
        assert!(!out.all_keypoints_visible);
        assert_eq!(out.policy, DrawPolicy::Skip);
    }

    #[test]
    fn test_undecodable_bytes() {
        let mut estimator = FixedEstimator { visibility: Some(0.9), calls: 0 };

        let err = process_image(&mut estimator, b"not an image", false, &PoseConfig::default())
            .unwrap_err();

        assert!(matches!(err, AnnotatorError::Decode(_)));
        assert!(!err.to_string().is_empty());
        assert_eq!(estimator.calls, 0);
    }

    #[test]
    fn test_output_keeps_dimensions() {
        let input = jpeg_input(97, 53);
        let mut estimator = FixedEstimator { visibility: Some(0.9), calls: 0 };

        let out = process_image(&mut estimator, &input, false, &PoseConfig::default()).unwrap();

        assert_eq!(out.dimensions, (97, 53));
        let decoded = image::load_from_memory(&out.jpeg).unwrap();
        assert_eq!(decoded.dimensions(), (97, 53));
    }

    #[test]
    fn test_idempotent() {
        let input = jpeg_input(80, 80);
        let mut estimator = FixedEstimator { visibility: Some(0.3), calls: 0 };
        let config = PoseConfig::default();

        let first = process_image(&mut estimator, &input, false, &config).unwrap();
        let second = process_image(&mut estimator, &input, false, &config).unwrap();

        assert_eq!(first.keypoints, second.keypoints);
        assert_eq!(first.all_keypoints_visible, second.all_keypoints_visible);
        assert_eq!(first.jpeg, second.jpeg);
    }

    #[test]
    fn test_into_response_encodings() {
        let input = jpeg_input(16, 16);
        let mut estimator = FixedEstimator { visibility: None, calls: 0 };
        let out = process_image(&mut estimator, &input, true, &PoseConfig::default()).unwrap();
        let jpeg = out.jpeg.clone();

        let response = out.clone().into_response(ImageEncoding::Base64);
        assert_eq!(ImageEncoding::Base64.decode(&response.image).unwrap(), jpeg);

        let response = out.into_response(ImageEncoding::Latin1);
        assert_eq!(response.image.chars().count(), jpeg.len());
        assert_eq!(ImageEncoding::Latin1.decode(&response.image).unwrap(), jpeg);
    }
}
