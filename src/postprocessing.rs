// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Post-processing of raw pose model outputs.
//!
//! Turns the output tensors of a BlazePose landmark model or a YOLO pose model
//! into at most one [`Pose`] with landmarks normalized to the original image.

use ndarray::{Array2, s};

use crate::format::PoseFormat;
use crate::inference::PoseConfig;
use crate::preprocessing::PreprocessResult;
use crate::results::{Landmark, Pose};

/// Values per BlazePose landmark: x, y, z, visibility logit, presence logit.
const BLAZEPOSE_LANDMARK_DIM: usize = 5;

/// Total landmarks in the BlazePose output (33 body + 6 auxiliary ROI points).
const BLAZEPOSE_OUTPUT_LANDMARKS: usize = 39;

/// Values per COCO keypoint: x, y, confidence.
const COCO_KPT_DIM: usize = 3;

/// A raw output tensor: shape and row-major data.
#[derive(Debug, Clone)]
pub struct RawOutput {
    /// Tensor shape.
    pub shape: Vec<usize>,
    /// Flattened tensor data.
    pub data: Vec<f32>,
}

impl RawOutput {
    /// Create a new raw output.
    #[must_use]
    pub const fn new(shape: Vec<usize>, data: Vec<f32>) -> Self {
        Self { shape, data }
    }

    fn last_dim(&self) -> usize {
        self.shape.last().copied().unwrap_or(self.data.len())
    }
}

/// Logistic sigmoid.
#[must_use]
pub fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Guess the landmark layout from the model's output shapes.
///
/// A 195-wide output (39 landmarks x 5 values) identifies BlazePose; a rank-3
/// output with exactly `4 + 1 + 17 * 3` features on either axis identifies a
/// single-class YOLO pose model. Wider heads (detection, multi-class pose) are
/// not guessed; their layout must come from metadata or configuration.
#[must_use]
pub fn detect_format(output_shapes: &[Vec<i64>]) -> Option<PoseFormat> {
    let blaze_width = (BLAZEPOSE_OUTPUT_LANDMARKS * BLAZEPOSE_LANDMARK_DIM) as i64;
    let coco_features = (4 + 1 + PoseFormat::Coco.num_landmarks() * COCO_KPT_DIM) as i64;

    if output_shapes.iter().any(|s| s.last() == Some(&blaze_width)) {
        return Some(PoseFormat::BlazePose);
    }
    if output_shapes
        .iter()
        .any(|s| s.len() == 3 && (s[1] == coco_features || s[2] == coco_features))
    {
        return Some(PoseFormat::Coco);
    }
    None
}

/// Decode model outputs into at most one pose.
///
/// Returns `None` when the model reports no person, or when the outputs do not
/// contain a tensor of the expected layout.
#[must_use]
pub fn postprocess(
    outputs: &[RawOutput],
    format: PoseFormat,
    preprocess: &PreprocessResult,
    config: &PoseConfig,
) -> Option<Pose> {
    match format {
        PoseFormat::BlazePose => postprocess_blazepose(outputs, preprocess, config),
        PoseFormat::Coco => postprocess_coco(outputs, preprocess, config),
    }
}

/// Post-process BlazePose landmark model output.
///
/// Expected outputs:
/// - landmarks `[1, 195]` in input-pixel space, 5 values per landmark
/// - pose flag `[1, 1]`, presence score of a person in the frame, scaled as
///   [`PoseConfig::presence_score`] says
///
/// Other outputs (segmentation, heatmap, world landmarks) are ignored.
fn postprocess_blazepose(
    outputs: &[RawOutput],
    preprocess: &PreprocessResult,
    config: &PoseConfig,
) -> Option<Pose> {
    let num_landmarks = PoseFormat::BlazePose.num_landmarks();
    let landmarks_out = outputs.iter().find(|o| {
        o.last_dim() == BLAZEPOSE_OUTPUT_LANDMARKS * BLAZEPOSE_LANDMARK_DIM
            && o.data.len() >= num_landmarks * BLAZEPOSE_LANDMARK_DIM
    })?;

    if let Some(flag) = outputs.iter().find(|o| o.data.len() == 1) {
        let presence = config.presence_score.to_probability(flag.data[0]);
        if presence.is_nan() || presence < config.presence_threshold {
            return None;
        }
    }

    let landmarks = landmarks_out
        .data
        .chunks_exact(BLAZEPOSE_LANDMARK_DIM)
        .take(num_landmarks)
        .map(|v| {
            let (x, y) = preprocess.to_normalized(v[0], v[1]);
            let z = preprocess.normalize_depth(v[2]);
            let visibility = sigmoid(v[3]);
            Landmark::new(x, y, z, if visibility.is_nan() { 0.0 } else { visibility })
        })
        .collect();

    Some(Pose::new(PoseFormat::BlazePose, landmarks))
}

/// Post-process YOLO pose model output.
///
/// Output shape is `[1, 4 + nc + 51, N]` or transposed `[1, N, 4 + nc + 51]`, where
/// each prediction is box (cx, cy, w, h), class scores, then 17 x (x, y, conf).
/// Only the highest-scoring person is kept.
fn postprocess_coco(
    outputs: &[RawOutput],
    preprocess: &PreprocessResult,
    config: &PoseConfig,
) -> Option<Pose> {
    let num_keypoints = PoseFormat::Coco.num_landmarks();
    let kpt_features = num_keypoints * COCO_KPT_DIM;

    let output = outputs
        .iter()
        .find(|o| o.shape.len() >= 2 && o.data.len() >= 4 + 1 + kpt_features)?;

    let (num_preds, is_transposed) = parse_pose_shape(&output.shape, 4 + 1 + kpt_features);
    if output.data.is_empty() || num_preds == 0 {
        return None;
    }

    let actual_features = output.data.len() / num_preds;
    if actual_features < 4 + 1 + kpt_features {
        tracing::warn!(
            "pose model has insufficient features ({actual_features}), expected at least {}",
            4 + 1 + kpt_features
        );
        return None;
    }

    let output_2d = if is_transposed {
        Array2::from_shape_vec((num_preds, actual_features), output.data.clone()).ok()?
    } else {
        Array2::from_shape_vec((actual_features, num_preds), output.data.clone())
            .ok()?
            .t()
            .to_owned()
    };

    let num_classes = actual_features - 4 - kpt_features;

    let mut best: Option<(usize, f32)> = None;
    for i in 0..num_preds {
        let score = output_2d
            .slice(s![i, 4..4 + num_classes])
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(0.0_f32, f32::max);

        if score < config.confidence_threshold {
            continue;
        }
        if best.is_none_or(|(_, best_score)| score > best_score) {
            best = Some((i, score));
        }
    }

    let (idx, _) = best?;
    let kpt_start = 4 + num_classes;
    let landmarks = (0..num_keypoints)
        .map(|k| {
            let offset = kpt_start + k * COCO_KPT_DIM;
            let (x, y) = preprocess.to_normalized(output_2d[[idx, offset]], output_2d[[idx, offset + 1]]);
            let conf = output_2d[[idx, offset + 2]];
            Landmark::new(
                x.clamp(0.0, 1.0),
                y.clamp(0.0, 1.0),
                0.0,
                if conf.is_nan() { 0.0 } else { conf.clamp(0.0, 1.0) },
            )
        })
        .collect();

    Some(Pose::new(PoseFormat::Coco, landmarks))
}

/// Work out the prediction count and orientation of a YOLO pose output.
///
/// Returns `(num_preds, is_transposed)` where transposed means `[preds, features]`.
fn parse_pose_shape(shape: &[usize], min_features: usize) -> (usize, bool) {
    let (a, b) = match *shape {
        [_, a, b] | [a, b] => (a, b),
        _ => return (0, false),
    };
    if a >= min_features && (a < b || b < min_features) {
        (b, false)
    } else {
        (a, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::PresenceScore;
    use crate::preprocessing::{TensorLayout, preprocess_image};
    use image::{DynamicImage, RgbImage};

    fn identity_preprocess(size: usize) -> PreprocessResult {
        let img = DynamicImage::ImageRgb8(RgbImage::new(size as u32, size as u32));
        preprocess_image(&img, (size, size), TensorLayout::Nhwc, 0)
    }

    fn blazepose_output(visibility_logit: f32) -> RawOutput {
        let mut data = vec![0.0; 195];
        for i in 0..39 {
            data[i * 5] = 128.0; // x
            data[i * 5 + 1] = 64.0; // y
            data[i * 5 + 2] = -25.6; // z
            data[i * 5 + 3] = visibility_logit;
            data[i * 5 + 4] = 5.0;
        }
        RawOutput::new(vec![1, 195], data)
    }

    #[test]
    fn test_sigmoid() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-6);
        assert!(sigmoid(10.0) > 0.999);
        assert!(sigmoid(-10.0) < 0.001);
    }

    #[test]
    fn test_detect_format() {
        assert_eq!(
            detect_format(&[vec![1, 195], vec![1, 1], vec![1, 256, 256, 1]]),
            Some(PoseFormat::BlazePose)
        );
        assert_eq!(detect_format(&[vec![1, 56, 8400]]), Some(PoseFormat::Coco));
        assert_eq!(detect_format(&[vec![1, 8400, 56]]), Some(PoseFormat::Coco));
        // YOLO detection head: 4 box + 80 classes
        assert_eq!(detect_format(&[vec![1, 84, 8400]]), None);
        assert_eq!(detect_format(&[vec![1, 116, 8400], vec![1, 32, 160, 160]]), None);
        assert_eq!(detect_format(&[vec![1, 1000]]), None);
    }

    #[test]
    fn test_blazepose_decodes_33_normalized_landmarks() {
        let preprocess = identity_preprocess(256);
        let outputs = [blazepose_output(4.0), RawOutput::new(vec![1, 1], vec![0.99])];

        let pose = postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &PoseConfig::default())
            .unwrap();

        assert_eq!(pose.len(), 33);
        assert_eq!(pose.format, PoseFormat::BlazePose);
        let lm = pose.landmarks[0];
        assert!((lm.x - 0.5).abs() < 1e-4);
        assert!((lm.y - 0.25).abs() < 1e-4);
        assert!((lm.z + 0.1).abs() < 1e-4);
        assert!((lm.visibility - sigmoid(4.0)).abs() < 1e-6);
        assert!(pose.all_visible(0.5));
    }

    #[test]
    fn test_blazepose_low_visibility() {
        let preprocess = identity_preprocess(256);
        let outputs = [blazepose_output(-3.0)];

        let pose = postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &PoseConfig::default())
            .unwrap();
        assert!(!pose.all_visible(0.5));
    }

    #[test]
    fn test_blazepose_absent_person() {
        let preprocess = identity_preprocess(256);

        let outputs = [blazepose_output(4.0), RawOutput::new(vec![1, 1], vec![-6.0])];
        assert!(postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &PoseConfig::default()).is_none());

        let probability = PoseConfig::default().with_presence_score(PresenceScore::Probability);
        let outputs = [blazepose_output(4.0), RawOutput::new(vec![1, 1], vec![0.1])];
        assert!(postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &probability).is_none());
    }

    #[test]
    fn test_blazepose_flag_scale_is_configured() {
        let preprocess = identity_preprocess(256);
        // sigmoid(0.3) is above 0.5, the raw value is not
        let outputs = [blazepose_output(4.0), RawOutput::new(vec![1, 1], vec![0.3])];

        let logit = PoseConfig::default();
        assert!(postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &logit).is_some());

        let probability = PoseConfig::default().with_presence_score(PresenceScore::Probability);
        assert!(postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &probability).is_none());
    }

    #[test]
    fn test_blazepose_missing_landmark_tensor() {
        let preprocess = identity_preprocess(256);
        let outputs = [RawOutput::new(vec![1, 117], vec![0.0; 117])];
        assert!(postprocess(&outputs, PoseFormat::BlazePose, &preprocess, &PoseConfig::default()).is_none());
    }

    #[test]
    fn test_postprocess_coco_picks_best_candidate() {
        // Mock output for pose: [1, 56, 100]
        // 56 features = 4 bbox + 1 class + 51 keypoints (17*3)
        let num_preds = 100;
        let num_features = 56;
        let mut output = vec![0.0; num_preds * num_features];

        for (idx, score, kx) in [(0, 0.6, 100.0), (7, 0.9, 320.0)] {
            output[idx] = 320.0;
            output[idx + num_preds] = 320.0;
            output[idx + num_preds * 2] = 50.0;
            output[idx + num_preds * 3] = 50.0;
            output[idx + num_preds * 4] = score;
            for k in 0..17 {
                let offset = 5 + k * 3;
                output[idx + num_preds * offset] = kx;
                output[idx + num_preds * (offset + 1)] = 160.0;
                output[idx + num_preds * (offset + 2)] = 0.8;
            }
        }

        let preprocess = identity_preprocess(640);
        let outputs = [RawOutput::new(vec![1, num_features, num_preds], output)];
        let pose =
            postprocess(&outputs, PoseFormat::Coco, &preprocess, &PoseConfig::default()).unwrap();

        assert_eq!(pose.len(), 17);
        let lm = pose.landmarks[0];
        assert!((lm.x - 0.5).abs() < 1e-4);
        assert!((lm.y - 0.25).abs() < 1e-4);
        assert_eq!(lm.z, 0.0);
        assert!((lm.visibility - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_postprocess_coco_below_threshold() {
        let num_preds = 10;
        let mut output = vec![0.0; num_preds * 56];
        output[num_preds * 4] = 0.1;

        let preprocess = identity_preprocess(640);
        let outputs = [RawOutput::new(vec![1, 56, num_preds], output)];
        assert!(postprocess(&outputs, PoseFormat::Coco, &preprocess, &PoseConfig::default()).is_none());
    }

    #[test]
    fn test_nan_scores_handled() {
        let num_preds = 4;
        let output = vec![f32::NAN; num_preds * 56];
        let preprocess = identity_preprocess(640);
        let outputs = [RawOutput::new(vec![1, 56, num_preds], output)];
        assert!(postprocess(&outputs, PoseFormat::Coco, &preprocess, &PoseConfig::default()).is_none());
    }

    #[test]
    fn test_parse_pose_shape() {
        assert_eq!(parse_pose_shape(&[1, 56, 8400], 56), (8400, false));
        assert_eq!(parse_pose_shape(&[1, 8400, 56], 56), (8400, true));
        assert_eq!(parse_pose_shape(&[1, 56, 10], 56), (10, false));
        assert_eq!(parse_pose_shape(&[56], 56), (0, false));
    }
}
