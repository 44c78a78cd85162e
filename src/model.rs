// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Pose model loading and inference.
//!
//! [`PoseEstimator`] is the seam between the request pipeline and the model;
//! [`PoseModel`] implements it on top of an ONNX Runtime session.

use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::value::TensorRef;

use crate::device::Device;
use crate::error::{AnnotatorError, Result};
use crate::format::PoseFormat;
use crate::inference::PoseConfig;
use crate::metadata::{METADATA_KEYS, ModelMetadata};
use crate::postprocessing::{RawOutput, detect_format, postprocess};
use crate::preprocessing::{BLAZEPOSE_PAD_VALUE, TensorLayout, YOLO_PAD_VALUE, preprocess_image};
use crate::results::Pose;

/// Something that finds at most one person's pose in an image.
///
/// Implementations are not required to be reentrant; callers serialize access
/// (the server keeps a single instance behind a mutex).
pub trait PoseEstimator: Send {
    /// Landmark layout of the poses this estimator returns.
    fn format(&self) -> PoseFormat;

    /// Model input size as (height, width).
    fn input_size(&self) -> (usize, usize);

    /// Run pose estimation on a decoded image.
    ///
    /// Returns `Ok(None)` when no person is found.
    ///
    /// # Errors
    ///
    /// Returns [`AnnotatorError::Inference`] if the model fails to run.
    fn estimate(&mut self, image: &DynamicImage) -> Result<Option<Pose>>;
}

/// ONNX pose model.
///
/// # Example
///
/// ```no_run
/// use pose_annotator::{PoseEstimator, PoseModel};
///
/// let mut model = PoseModel::load("pose_landmark_full.onnx")?;
/// let image = image::open("person.jpg").expect("readable image");
/// if let Some(pose) = model.estimate(&image)? {
///     println!("{} landmarks, all visible: {}", pose.len(), pose.all_visible(0.5));
/// }
/// # Ok::<(), pose_annotator::AnnotatorError>(())
/// ```
pub struct PoseModel {
    /// ONNX Runtime session.
    session: Session,
    /// Landmark layout of the model outputs.
    format: PoseFormat,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names.
    output_names: Vec<String>,
    /// Input tensor layout.
    layout: TensorLayout,
    /// Input size (height, width).
    input_size: (usize, usize),
    /// Parsed custom metadata.
    metadata: ModelMetadata,
    /// Inference configuration.
    config: PoseConfig,
    /// Whether model has been warmed up.
    warmed_up: bool,
}

impl PoseModel {
    /// Load a pose model from an ONNX file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file doesn't exist or can't be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, PoseConfig::default())
    }

    /// Load a pose model with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, the session cannot be created,
    /// the requested device is not compiled in, the model metadata names a task
    /// other than pose, or the landmark format cannot be determined.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: PoseConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(AnnotatorError::ModelLoad(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let builder = Session::builder().map_err(|e| {
            AnnotatorError::ModelLoad(format!("Failed to create session builder: {e}"))
        })?;
        let builder = register_execution_provider(builder, &config.device)?;

        let session = builder
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| {
                AnnotatorError::ModelLoad(format!("Failed to set optimization level: {e}"))
            })?
            .with_intra_threads(config.num_threads)
            .map_err(|e| {
                AnnotatorError::ModelLoad(format!("Failed to set intra-thread count: {e}"))
            })?
            .commit_from_file(path)
            .map_err(|e| AnnotatorError::ModelLoad(format!("Failed to load model: {e}")))?;

        let metadata = Self::extract_metadata(&session)?;
        metadata.check_task()?;

        let input = session
            .inputs
            .first()
            .ok_or_else(|| AnnotatorError::ModelLoad("Model has no inputs".to_string()))?;
        let input_name = input.name.clone();
        let input_shape: Vec<i64> = input
            .input_type
            .tensor_shape()
            .map(|shape| shape.to_vec())
            .unwrap_or_default();

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        let output_shapes: Vec<Vec<i64>> = session
            .outputs
            .iter()
            .filter_map(|o| o.output_type.tensor_shape().map(|shape| shape.to_vec()))
            .collect();

        let format = config
            .format
            .or_else(|| metadata.pose_format())
            .or_else(|| detect_format(&output_shapes))
            .ok_or_else(|| {
                AnnotatorError::ModelLoad(format!(
                    "Cannot determine pose format from outputs {output_shapes:?}; set it explicitly"
                ))
            })?;

        let (layout, static_size) = TensorLayout::from_shape(&input_shape).unwrap_or((
            match format {
                PoseFormat::BlazePose => TensorLayout::Nhwc,
                PoseFormat::Coco => TensorLayout::Nchw,
            },
            None,
        ));
        let input_size = static_size
            .or(config.imgsz)
            .or(metadata.imgsz)
            .unwrap_or_else(|| format.default_input_size());

        tracing::info!(
            model = %path.display(),
            %format,
            ?layout,
            ?input_size,
            device = %config.device,
            "pose model loaded"
        );

        Ok(Self {
            session,
            format,
            input_name,
            output_names,
            layout,
            input_size,
            metadata,
            config,
            warmed_up: false,
        })
    }

    /// Extract custom metadata from the ONNX model session.
    fn extract_metadata(session: &Session) -> Result<ModelMetadata> {
        let model_metadata = session.metadata().map_err(|e| {
            AnnotatorError::ModelLoad(format!("Failed to get model metadata: {e}"))
        })?;

        let mut map: HashMap<String, String> = HashMap::new();
        for key in METADATA_KEYS {
            if let Ok(Some(value)) = model_metadata.custom(key) {
                map.insert(key.to_string(), value);
            }
        }

        ModelMetadata::from_map(&map)
    }

    /// Warm up the model by running inference with a dummy input.
    ///
    /// # Errors
    ///
    /// Returns an error if the dummy inference fails.
    pub fn warmup(&mut self) -> Result<()> {
        if self.warmed_up {
            return Ok(());
        }

        let dummy_input = Array4::<f32>::zeros(self.layout.tensor_shape(self.input_size));
        let _ = self.run_inference(&dummy_input)?;

        self.warmed_up = true;
        Ok(())
    }

    /// Run the ONNX session and collect every output as an f32 tensor.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<Vec<RawOutput>> {
        let input_contiguous = input.as_standard_layout();

        let input_tensor = TensorRef::from_array_view(&input_contiguous).map_err(|e| {
            AnnotatorError::Inference(format!("Failed to create input tensor: {e}"))
        })?;

        let inputs = ort::inputs![self.input_name.as_str() => input_tensor];

        let outputs = self
            .session
            .run(inputs)
            .map_err(|e| AnnotatorError::Inference(format!("Inference failed: {e}")))?;

        let mut raw = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let Some(output) = outputs.get(name.as_str()) else {
                continue;
            };
            // Non-f32 outputs are not used by any supported format
            let Ok((shape, data)) = output.try_extract_tensor::<f32>() else {
                continue;
            };
            let shape: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            raw.push(RawOutput::new(shape, data.to_vec()));
        }

        if raw.is_empty() {
            return Err(AnnotatorError::Inference(
                "Model produced no f32 outputs".to_string(),
            ));
        }

        Ok(raw)
    }

    /// Get the parsed model metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }
}

impl PoseEstimator for PoseModel {
    fn format(&self) -> PoseFormat {
        self.format
    }

    fn input_size(&self) -> (usize, usize) {
        self.input_size
    }

    fn estimate(&mut self, image: &DynamicImage) -> Result<Option<Pose>> {
        if !self.warmed_up {
            self.warmup()?;
        }

        let pad_value = match self.format {
            PoseFormat::BlazePose => BLAZEPOSE_PAD_VALUE,
            PoseFormat::Coco => YOLO_PAD_VALUE,
        };

        let start = Instant::now();
        let preprocess = preprocess_image(image, self.input_size, self.layout, pad_value);
        let outputs = self.run_inference(&preprocess.tensor)?;
        let pose = postprocess(&outputs, self.format, &preprocess, &self.config);

        tracing::debug!(
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            detected = pose.is_some(),
            "pose estimation finished"
        );

        Ok(pose)
    }
}

impl std::fmt::Debug for PoseModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoseModel")
            .field("format", &self.format)
            .field("layout", &self.layout)
            .field("input_size", &self.input_size)
            .field("device", &self.config.device)
            .finish_non_exhaustive()
    }
}

/// Register the execution provider for `device` on the session builder.
fn register_execution_provider(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        #[cfg(feature = "cuda")]
        Device::Cuda(index) => builder
            .with_execution_providers([ort::execution_providers::CUDAExecutionProvider::default()
                .with_device_id(i32::try_from(*index).unwrap_or(0))
                .build()])
            .map_err(|e| AnnotatorError::ModelLoad(format!("Failed to register CUDA EP: {e}"))),
        #[cfg(feature = "coreml")]
        Device::CoreMl => builder
            .with_execution_providers([ort::execution_providers::CoreMLExecutionProvider::default()
                .with_subgraphs(true)
                .build()])
            .map_err(|e| AnnotatorError::ModelLoad(format!("Failed to register CoreML EP: {e}"))),
        #[cfg(feature = "directml")]
        Device::DirectMl(index) => builder
            .with_execution_providers([
                ort::execution_providers::DirectMLExecutionProvider::default()
                    .with_device_id(i32::try_from(*index).unwrap_or(0))
                    .build(),
            ])
            .map_err(|e| AnnotatorError::ModelLoad(format!("Failed to register DirectML EP: {e}"))),
        #[allow(unreachable_patterns)]
        other => Err(AnnotatorError::Config(format!(
            "Device '{other}' requires building with --features {}",
            other.required_feature().unwrap_or("?")
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_not_found() {
        let result = PoseModel::load("nonexistent.onnx");
        assert!(matches!(result.unwrap_err(), AnnotatorError::ModelLoad(_)));
    }
}
