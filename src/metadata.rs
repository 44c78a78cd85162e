// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX model metadata parsing.
//!
//! Pose models exported by Ultralytics carry YAML-ish custom metadata (`task`,
//! `imgsz`, `kpt_shape`, ...). Converted BlazePose models usually carry none, in
//! which case every field stays `None` and the caller falls back to the model's
//! tensor shapes.

use std::collections::HashMap;

use crate::error::{AnnotatorError, Result};
use crate::format::PoseFormat;

/// Metadata keys read from the ONNX custom metadata map.
pub const METADATA_KEYS: [&str; 5] = ["description", "task", "imgsz", "kpt_shape", "stride"];

/// Metadata extracted from a pose ONNX model.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelMetadata {
    /// Free-form model description.
    pub description: Option<String>,
    /// Task the model was exported for (e.g. `pose`).
    pub task: Option<String>,
    /// Input image size as (height, width).
    pub imgsz: Option<(usize, usize)>,
    /// Keypoint layout as (count, values per keypoint).
    pub kpt_shape: Option<(usize, usize)>,
    /// Model stride.
    pub stride: Option<u32>,
}

impl ModelMetadata {
    /// Build metadata from the custom key/value pairs of an ONNX model.
    ///
    /// # Errors
    ///
    /// Returns an error if a known key carries a malformed value.
    pub fn from_map(map: &HashMap<String, String>) -> Result<Self> {
        let yaml: Vec<String> = METADATA_KEYS
            .iter()
            .filter_map(|key| map.get(*key).map(|value| format!("{key}: {value}")))
            .collect();
        Self::from_yaml_str(&yaml.join("\n"))
    }

    /// Parse metadata from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if `imgsz`, `kpt_shape` or `stride` cannot be parsed.
    pub fn from_yaml_str(yaml_str: &str) -> Result<Self> {
        let mut metadata = Self::default();

        for line in yaml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim().trim_matches('\'').trim_matches('"');

            match key.trim() {
                "description" => metadata.description = Some(value.to_string()),
                "task" => metadata.task = Some(value.to_lowercase()),
                "imgsz" => metadata.imgsz = Some(parse_pair("imgsz", value)?),
                "kpt_shape" => metadata.kpt_shape = Some(parse_pair("kpt_shape", value)?),
                "stride" => {
                    metadata.stride = Some(value.parse().map_err(|_| {
                        AnnotatorError::ModelLoad(format!("Invalid stride value: {value}"))
                    })?);
                }
                _ => {}
            }
        }

        Ok(metadata)
    }

    /// Reject models exported for a task other than pose estimation.
    ///
    /// Models without a `task` entry pass; their layout is checked against the
    /// output shapes instead.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::ModelLoad`] when `task` names another task.
    pub fn check_task(&self) -> Result<()> {
        match self.task.as_deref() {
            None | Some("pose") => Ok(()),
            Some(other) => Err(AnnotatorError::ModelLoad(format!(
                "Model was exported for task '{other}', expected 'pose'"
            ))),
        }
    }

    /// The landmark layout implied by the metadata, if any.
    #[must_use]
    pub fn pose_format(&self) -> Option<PoseFormat> {
        match self.kpt_shape {
            Some((17, _)) => return Some(PoseFormat::Coco),
            Some((33, _)) => return Some(PoseFormat::BlazePose),
            _ => {}
        }
        (self.task.as_deref() == Some("pose")).then_some(PoseFormat::Coco)
    }
}

/// Parse `[a, b]`, `(a, b)` or a single `a` (meaning `a x a`).
fn parse_pair(key: &str, value: &str) -> Result<(usize, usize)> {
    let inner = value.trim_matches(|c| c == '[' || c == ']' || c == '(' || c == ')');
    let nums: Vec<usize> = inner
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse)
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| AnnotatorError::ModelLoad(format!("Invalid {key} value: {value}")))?;

    match nums.as_slice() {
        [a] => Ok((*a, *a)),
        [a, b] => Ok((*a, *b)),
        _ => Err(AnnotatorError::ModelLoad(format!(
            "Invalid {key} value: {value}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_METADATA: &str = r"
description: Ultralytics YOLO11n-pose model trained on coco-pose.yaml
task: pose
stride: 32
imgsz: [640, 640]
kpt_shape: [17, 3]
";

    #[test]
    fn test_parse_metadata() {
        let metadata = ModelMetadata::from_yaml_str(SAMPLE_METADATA).unwrap();
        assert_eq!(metadata.task.as_deref(), Some("pose"));
        assert_eq!(metadata.imgsz, Some((640, 640)));
        assert_eq!(metadata.kpt_shape, Some((17, 3)));
        assert_eq!(metadata.stride, Some(32));
        assert_eq!(metadata.pose_format(), Some(PoseFormat::Coco));
    }

    #[test]
    fn test_parse_inline_imgsz() {
        let metadata = ModelMetadata::from_yaml_str("imgsz: 256").unwrap();
        assert_eq!(metadata.imgsz, Some((256, 256)));
    }

    #[test]
    fn test_from_map() {
        let mut map = HashMap::new();
        map.insert("kpt_shape".to_string(), "[33, 5]".to_string());
        map.insert("unrelated".to_string(), "ignored".to_string());
        let metadata = ModelMetadata::from_map(&map).unwrap();
        assert_eq!(metadata.pose_format(), Some(PoseFormat::BlazePose));
    }

    #[test]
    fn test_default_metadata() {
        let metadata = ModelMetadata::from_yaml_str("").unwrap();
        assert_eq!(metadata, ModelMetadata::default());
        assert_eq!(metadata.pose_format(), None);
    }

    #[test]
    fn test_check_task() {
        assert!(ModelMetadata::default().check_task().is_ok());
        assert!(ModelMetadata::from_yaml_str(SAMPLE_METADATA).unwrap().check_task().is_ok());

        let detect = ModelMetadata::from_yaml_str("task: Detect\nimgsz: 640").unwrap();
        let err = detect.check_task().unwrap_err();
        assert!(matches!(err, AnnotatorError::ModelLoad(_)));
        assert!(err.to_string().contains("detect"));
    }

    #[test]
    fn test_malformed_value() {
        assert!(ModelMetadata::from_yaml_str("imgsz: [a, b]").is_err());
        assert!(ModelMetadata::from_yaml_str("stride: big").is_err());
    }
}
